//! STOMP Text Codec
//!
//! Encodes and decodes STOMP 1.2 frames carried in WebSocket text messages.
//!
//! # Frame Layout
//!
//! ```text
//! COMMAND\n
//! name:value\n
//! ...
//! \n
//! body\0
//! ```
//!
//! A message may carry several frames back to back. End-of-line runs between
//! frames are heart-beats, so a message consisting only of `\n` decodes to
//! no frames at all.

use super::frame::{Command, Frame, header};

/// Heart-beat payload sent on an otherwise idle connection.
pub const HEARTBEAT: &str = "\n";

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Command line is not a STOMP command.
    #[error("unknown STOMP command: {0}")]
    UnknownCommand(String),

    /// Input ended before the header block was closed.
    #[error("truncated frame")]
    Truncated,

    /// Header line without a `:` separator.
    #[error("invalid header line: {0}")]
    InvalidHeader(String),

    /// Backslash followed by something other than `n`, `r`, `c` or `\`.
    #[error("invalid escape sequence: \\{0}")]
    InvalidEscape(char),

    /// Body not terminated by NUL.
    #[error("frame body is not NUL-terminated")]
    MissingNul,

    /// `content-length` header is not a valid length for this frame.
    #[error("invalid content-length: {0}")]
    ContentLength(String),
}

/// STOMP codec for text WebSocket messages.
#[derive(Debug, Default, Clone)]
pub struct StompCodec;

impl StompCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode a frame.
    ///
    /// Adds `content-length` for non-empty bodies unless the frame already
    /// carries one.
    #[must_use]
    pub fn encode(&self, frame: &Frame) -> String {
        let escape = frame.command.escapes_headers();
        let mut out = String::with_capacity(64 + frame.body.len());

        out.push_str(frame.command.as_str());
        out.push('\n');

        for (name, value) in &frame.headers {
            if escape {
                escape_into(&mut out, name);
                out.push(':');
                escape_into(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }

        if !frame.body.is_empty() && frame.header(header::CONTENT_LENGTH).is_none() {
            out.push_str(header::CONTENT_LENGTH);
            out.push(':');
            out.push_str(&frame.body.len().to_string());
            out.push('\n');
        }

        out.push('\n');
        out.push_str(&frame.body);
        out.push('\0');
        out
    }

    /// Decode every frame in a text message.
    ///
    /// # Errors
    ///
    /// Returns an error on the first frame that is malformed. Frames before
    /// it are discarded along with it.
    pub fn decode(&self, text: &str) -> Result<Vec<Frame>, CodecError> {
        let mut frames = Vec::new();
        let mut rest = text;

        loop {
            rest = rest.trim_start_matches(['\r', '\n']);
            if rest.is_empty() {
                break;
            }
            let (frame, remaining) = decode_one(rest)?;
            frames.push(frame);
            rest = remaining;
        }

        Ok(frames)
    }

    /// Decode a text message, skipping malformed frames.
    ///
    /// After a malformed frame, decoding resumes past the next NUL so the
    /// frames around it are still returned. Each skipped frame contributes
    /// one error.
    #[must_use]
    pub fn decode_lenient(&self, text: &str) -> (Vec<Frame>, Vec<CodecError>) {
        let mut frames = Vec::new();
        let mut errors = Vec::new();
        let mut rest = text;

        loop {
            rest = rest.trim_start_matches(['\r', '\n']);
            if rest.is_empty() {
                break;
            }
            match decode_one(rest) {
                Ok((frame, remaining)) => {
                    frames.push(frame);
                    rest = remaining;
                }
                Err(e) => {
                    errors.push(e);
                    match rest.find('\0') {
                        Some(end) => rest = &rest[end + 1..],
                        None => break,
                    }
                }
            }
        }

        (frames, errors)
    }
}

fn decode_one(input: &str) -> Result<(Frame, &str), CodecError> {
    let (command_line, mut rest) = split_line(input).ok_or(CodecError::Truncated)?;
    let command = Command::parse(command_line)
        .ok_or_else(|| CodecError::UnknownCommand(command_line.chars().take(32).collect()))?;

    let mut headers = Vec::new();
    loop {
        let (line, remaining) = split_line(rest).ok_or(CodecError::Truncated)?;
        rest = remaining;
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| CodecError::InvalidHeader(line.to_string()))?;

        if command.escapes_headers() {
            headers.push((unescape(name)?, unescape(value)?));
        } else {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    let content_length = headers
        .iter()
        .find(|(name, _)| name == header::CONTENT_LENGTH)
        .map(|(_, value)| {
            value
                .trim()
                .parse::<usize>()
                .map_err(|_| CodecError::ContentLength(value.clone()))
        })
        .transpose()?;

    let (body, remaining) = match content_length {
        Some(len) => {
            let body = rest
                .get(..len)
                .ok_or_else(|| CodecError::ContentLength(len.to_string()))?;
            let after = rest[len..]
                .strip_prefix('\0')
                .ok_or(CodecError::MissingNul)?;
            (body, after)
        }
        None => {
            let end = rest.find('\0').ok_or(CodecError::MissingNul)?;
            (&rest[..end], &rest[end + 1..])
        }
    };

    Ok((
        Frame {
            command,
            headers,
            body: body.to_string(),
        },
        remaining,
    ))
}

/// Split off one line, accepting `\n` or `\r\n`.
fn split_line(s: &str) -> Option<(&str, &str)> {
    let idx = s.find('\n')?;
    let line = &s[..idx];
    let line = line.strip_suffix('\r').unwrap_or(line);
    Some((line, &s[idx + 1..]))
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
}

fn unescape(s: &str) -> Result<String, CodecError> {
    if !s.contains('\\') {
        return Ok(s.to_string());
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some('\\') => out.push('\\'),
            Some(other) => return Err(CodecError::InvalidEscape(other)),
            None => return Err(CodecError::InvalidEscape(' ')),
        }
    }
    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn codec() -> StompCodec {
        StompCodec::new()
    }

    #[test]
    fn encode_subscribe() {
        let frame = Frame::subscribe("sub-0", "/topic/notifications");
        assert_eq!(
            codec().encode(&frame),
            "SUBSCRIBE\nid:sub-0\ndestination:/topic/notifications\nack:auto\n\n\0"
        );
    }

    #[test]
    fn encode_adds_content_length() {
        let frame = Frame::send("/app/x", "application/json", "{}");
        let text = codec().encode(&frame);
        assert!(text.contains("content-length:2\n"));
        assert!(text.ends_with("\n\n{}\0"));
    }

    #[test]
    fn encode_counts_bytes_not_chars() {
        let frame = Frame::send("/app/x", "text/plain", "알림");
        let text = codec().encode(&frame);
        assert!(text.contains("content-length:6\n"));
    }

    #[test]
    fn encode_escapes_except_connect() {
        let send = Frame::new(Command::Send).with_header("k", "a:b\nc");
        assert!(codec().encode(&send).contains("k:a\\cb\\nc\n"));

        let connect = Frame::new(Command::Connect).with_header("login", "a:b");
        assert!(codec().encode(&connect).contains("login:a:b\n"));
    }

    #[test]
    fn decode_message_frame() {
        let text = "MESSAGE\nsubscription:sub-0\ndestination:/topic/notifications\nmessage-id:7\n\n{\"a\":1}\0";
        let frames = codec().decode(text).unwrap();
        assert_eq!(frames.len(), 1);
        let frame = &frames[0];
        assert_eq!(frame.command, Command::Message);
        assert_eq!(frame.header(header::SUBSCRIPTION), Some("sub-0"));
        assert_eq!(frame.header(header::MESSAGE_ID), Some("7"));
        assert_eq!(frame.body, "{\"a\":1}");
    }

    #[test]
    fn decode_crlf_lines() {
        let text = "CONNECTED\r\nversion:1.2\r\nheart-beat:0,0\r\n\r\n\0";
        let frames = codec().decode(text).unwrap();
        assert_eq!(frames[0].command, Command::Connected);
        assert_eq!(frames[0].header(header::VERSION), Some("1.2"));
    }

    #[test]
    fn decode_multiple_frames_and_heartbeats() {
        let text = "\nRECEIPT\nreceipt-id:1\n\n\0\n\nMESSAGE\nsubscription:sub-1\n\nhi\0\n";
        let frames = codec().decode(text).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, Command::Receipt);
        assert_eq!(frames[1].body, "hi");
    }

    #[test]
    fn heartbeat_only_decodes_to_nothing() {
        assert!(codec().decode(HEARTBEAT).unwrap().is_empty());
        assert!(codec().decode("\r\n\n").unwrap().is_empty());
    }

    #[test]
    fn content_length_allows_embedded_nul() {
        let text = "MESSAGE\ncontent-length:3\n\na\0b\0";
        let frames = codec().decode(text).unwrap();
        assert_eq!(frames[0].body, "a\0b");
    }

    #[test]
    fn decode_unescapes_headers() {
        let text = "MESSAGE\nk:a\\cb\\\\c\\nd\n\n\0";
        let frames = codec().decode(text).unwrap();
        assert_eq!(frames[0].header("k"), Some("a:b\\c\nd"));
    }

    #[test]
    fn connected_headers_not_unescaped() {
        let text = "CONNECTED\nserver:x\\cy\n\n\0";
        let frames = codec().decode(text).unwrap();
        assert_eq!(frames[0].header("server"), Some("x\\cy"));
    }

    #[test]
    fn decode_errors() {
        let c = codec();
        assert!(matches!(
            c.decode("BOGUS\n\n\0"),
            Err(CodecError::UnknownCommand(_))
        ));
        assert_eq!(c.decode("MESSAGE\n\nbody"), Err(CodecError::MissingNul));
        assert_eq!(c.decode("MESSAGE\nk"), Err(CodecError::Truncated));
        assert!(matches!(
            c.decode("MESSAGE\nnocolon\n\n\0"),
            Err(CodecError::InvalidHeader(_))
        ));
        assert_eq!(
            c.decode("MESSAGE\nk:\\t\n\n\0"),
            Err(CodecError::InvalidEscape('t'))
        );
        assert!(matches!(
            c.decode("MESSAGE\ncontent-length:x\n\n\0"),
            Err(CodecError::ContentLength(_))
        ));
        assert!(matches!(
            c.decode("MESSAGE\ncontent-length:99\n\nab\0"),
            Err(CodecError::ContentLength(_))
        ));
        assert_eq!(
            c.decode("MESSAGE\ncontent-length:1\n\nab\0"),
            Err(CodecError::MissingNul)
        );
    }

    #[test]
    fn lenient_decode_keeps_frames_around_a_bad_one() {
        let text = "MESSAGE\nsubscription:sub-0\n\nfirst\0GARBAGE\n\n\0\nMESSAGE\nsubscription:sub-1\n\nsecond\0";
        let (frames, errors) = codec().decode_lenient(text);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].body, "first");
        assert_eq!(frames[1].body, "second");
        assert_eq!(errors, vec![CodecError::UnknownCommand("GARBAGE".to_string())]);
    }

    #[test]
    fn lenient_decode_stops_at_unterminated_tail() {
        let (frames, errors) = codec().decode_lenient("RECEIPT\nreceipt-id:1\n\n\0MESSAGE\n\nbody");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, Command::Receipt);
        assert_eq!(errors, vec![CodecError::MissingNul]);
    }

    #[test]
    fn lenient_decode_matches_strict_on_clean_input() {
        let text = "\nRECEIPT\nreceipt-id:1\n\n\0\n\nMESSAGE\nsubscription:sub-1\n\nhi\0\n";
        let (frames, errors) = codec().decode_lenient(text);
        assert!(errors.is_empty());
        assert_eq!(frames, codec().decode(text).unwrap());
    }

    proptest! {
        #[test]
        fn escaped_headers_and_body_survive(
            value in "[a-z:\\\\\r\n ]{0,16}",
            body in "[^\\x00]{0,64}",
        ) {
            let frame = Frame::new(Command::Message)
                .with_header("k", value.clone())
                .with_body(body.clone());
            let decoded = codec().decode(&codec().encode(&frame)).unwrap();
            prop_assert_eq!(decoded.len(), 1);
            prop_assert_eq!(decoded[0].header("k"), Some(value.as_str()));
            prop_assert_eq!(&decoded[0].body, &body);
        }
    }
}
