//! Framing: `<command>|<data>|<timestamp>` in ASCII, capped at `MAX_PAYLOAD` bytes.
//! No escaping: callers never put the delimiter inside `command` or `data`.

use crate::protocol::{Command, Message, DELIMITER, MAX_PAYLOAD};

/// Encode a message into one datagram. When the result would exceed `MAX_PAYLOAD`,
/// `data` is cut from the end (on a char boundary); command and timestamp are kept whole.
pub fn encode(msg: &Message) -> Result<Vec<u8>, EncodeError> {
    let command = msg.command.as_str();
    let timestamp = msg.timestamp.to_string();
    let header = command.len() + timestamp.len() + 2 * DELIMITER.len_utf8();
    if header > MAX_PAYLOAD {
        return Err(EncodeError::HeaderTooLong(header));
    }
    let data = truncate_on_char_boundary(&msg.data, MAX_PAYLOAD - header);
    let mut out = Vec::with_capacity(header + data.len());
    out.extend_from_slice(command.as_bytes());
    out.push(DELIMITER as u8);
    out.extend_from_slice(data.as_bytes());
    out.push(DELIMITER as u8);
    out.extend_from_slice(timestamp.as_bytes());
    Ok(out)
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Error encoding a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("command and timestamp alone take {0} bytes")]
    HeaderTooLong(usize),
}

/// Decode one datagram. Splits on the first two delimiters; everything after the
/// second one is the timestamp. Any failure means the datagram is discarded whole.
pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
    let text = std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)?;
    let mut fields = text.splitn(3, DELIMITER);
    let (Some(command), Some(data), Some(timestamp)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(DecodeError::MissingDelimiter);
    };
    if command.is_empty() {
        return Err(DecodeError::EmptyCommand);
    }
    let timestamp = timestamp
        .trim_end_matches('\0')
        .parse::<u64>()
        .map_err(|_| DecodeError::InvalidTimestamp)?;
    Ok(Message {
        command: Command::parse(command),
        data: data.to_string(),
        timestamp,
    })
}

/// Malformed datagram. The message is dropped; nothing is replied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed message: not valid text")]
    InvalidUtf8,
    #[error("malformed message: fewer than two delimiters")]
    MissingDelimiter,
    #[error("malformed message: empty command")]
    EmptyCommand,
    #[error("malformed message: bad timestamp")]
    InvalidTimestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_plain() {
        let msg = Message::new(Command::Tag1Detected, "F1AAF73", 12_345);
        let bytes = encode(&msg).unwrap();
        assert_eq!(bytes, b"tag1_detected|F1AAF73|12345");
        assert_eq!(decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn roundtrip_empty_data() {
        let msg = Message::new(Command::GetStatus, "", 0);
        let bytes = encode(&msg).unwrap();
        assert_eq!(bytes, b"get_status||0");
        assert_eq!(decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn oversized_data_is_truncated_from_the_end() {
        let data = "x".repeat(400);
        let msg = Message::new(Command::StatusUpdate, data, 987_654);
        let bytes = encode(&msg).unwrap();
        assert_eq!(bytes.len(), MAX_PAYLOAD);
        let back = decode(&bytes).unwrap();
        assert_eq!(back.command, Command::StatusUpdate);
        assert_eq!(back.timestamp, 987_654);
        let header = "status_update".len() + "987654".len() + 2;
        assert_eq!(back.data.len(), MAX_PAYLOAD - header);
        assert!(msg.data.starts_with(&back.data));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let data = "ż".repeat(200);
        let msg = Message::new(Command::Error, data, 1);
        let bytes = encode(&msg).unwrap();
        assert!(bytes.len() <= MAX_PAYLOAD);
        let back = decode(&bytes).unwrap();
        assert!(back.data.chars().all(|c| c == 'ż'));
    }

    #[test]
    fn header_too_long_fails() {
        let msg = Message::new(Command::Unknown("c".repeat(260)), "", 1);
        assert!(matches!(encode(&msg), Err(EncodeError::HeaderTooLong(_))));
    }

    #[test]
    fn fewer_than_two_delimiters_is_malformed() {
        assert_eq!(decode(b"heartbeat"), Err(DecodeError::MissingDelimiter));
        assert_eq!(decode(b"heartbeat|alive"), Err(DecodeError::MissingDelimiter));
        assert_eq!(decode(b""), Err(DecodeError::MissingDelimiter));
    }

    #[test]
    fn other_malformed_inputs() {
        assert_eq!(decode(b"|data|1"), Err(DecodeError::EmptyCommand));
        assert_eq!(decode(b"heartbeat|x|soon"), Err(DecodeError::InvalidTimestamp));
        assert_eq!(decode(b"heartbeat|x|1|2"), Err(DecodeError::InvalidTimestamp));
        assert_eq!(decode(&[0x68, 0xFF, b'|', b'|', b'1']), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn unknown_command_still_decodes() {
        let msg = decode(b"launch|now|5").unwrap();
        assert_eq!(msg.command, Command::Unknown("launch".into()));
    }

    #[test]
    fn trailing_nul_tolerated() {
        let msg = decode(b"heartbeat|walizka_alive|15000\0").unwrap();
        assert_eq!(msg.timestamp, 15_000);
    }
}
