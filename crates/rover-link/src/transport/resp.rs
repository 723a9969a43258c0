//! Minimal RESP2 (Redis serialization protocol) codec.
//!
//! Only what a publish/subscribe client needs: commands are encoded as arrays
//! of bulk strings, and replies/pushes are decoded into [`RespValue`].
//!
//! ```text
//! +OK\r\n                   simple string
//! -ERR bad password\r\n     error
//! :3\r\n                    integer
//! $5\r\nhello\r\n           bulk string ($-1 = null)
//! *2\r\n...                 array of N values (*-1 = null)
//! ```
//!
//! [`decode_value`] works on an accumulating receive buffer: it returns
//! `Ok(None)` when the buffer holds only part of a frame, so the caller reads
//! more bytes and tries again.

use thiserror::Error;

/// Largest bulk string the server will ever send (Redis' own limit).
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;

/// Upper bound on pre-allocated array capacity for a declared element count.
const MAX_PREALLOC: usize = 64;

/// Errors produced while decoding RESP frames.
#[derive(Debug, Error, PartialEq)]
pub enum RespError {
    /// The first byte of a frame is not a RESP2 type marker.
    #[error("unknown RESP type marker 0x{0:02X}")]
    UnknownType(u8),

    /// A length or integer line is not a valid decimal number.
    #[error("invalid integer line: {0:?}")]
    InvalidInteger(String),

    /// A bulk length is negative (other than -1) or too large.
    #[error("invalid bulk length {0}")]
    InvalidLength(i64),

    /// A bulk string is not followed by CRLF.
    #[error("bulk string not terminated by CRLF")]
    MissingCrlf,

    /// A simple string or error line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

/// A decoded RESP2 value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    /// Returns the bytes of a bulk or simple string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::Bulk(Some(bytes)) => Some(bytes),
            RespValue::Simple(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes a command as an array of bulk strings.
///
/// # Examples
///
/// ```rust
/// use rover_link::transport::resp::encode_command;
///
/// let bytes = encode_command(&[b"PUBLISH", b"ch", b"hi"]);
/// assert_eq!(bytes, b"*3\r\n$7\r\nPUBLISH\r\n$2\r\nch\r\n$2\r\nhi\r\n");
/// ```
pub fn encode_command(args: &[&[u8]]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    buf.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.extend_from_slice(arg);
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes one value from the start of `buf`.
///
/// Returns the value and the number of bytes it occupied, or `None` if the
/// buffer does not yet contain a complete frame.
///
/// # Errors
///
/// Returns [`RespError`] if the bytes can never form a valid frame.
pub fn decode_value(buf: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
    parse(buf, 0)
}

fn parse(buf: &[u8], pos: usize) -> Result<Option<(RespValue, usize)>, RespError> {
    let Some(&marker) = buf.get(pos) else {
        return Ok(None);
    };
    if !matches!(marker, b'+' | b'-' | b':' | b'$' | b'*') {
        return Err(RespError::UnknownType(marker));
    }
    let Some((line, next)) = read_line(buf, pos + 1) else {
        return Ok(None);
    };

    match marker {
        b'+' => Ok(Some((RespValue::Simple(utf8(line)?), next))),
        b'-' => Ok(Some((RespValue::Error(utf8(line)?), next))),
        b':' => Ok(Some((RespValue::Integer(parse_int(line)?), next))),
        b'$' => parse_bulk(buf, line, next),
        _ => parse_array(buf, line, next),
    }
}

fn parse_bulk(
    buf: &[u8],
    line: &[u8],
    start: usize,
) -> Result<Option<(RespValue, usize)>, RespError> {
    let len = parse_int(line)?;
    if len == -1 {
        return Ok(Some((RespValue::Bulk(None), start)));
    }
    if !(0..=MAX_BULK_LEN).contains(&len) {
        return Err(RespError::InvalidLength(len));
    }

    let end = start + len as usize;
    if buf.len() < end + 2 {
        return Ok(None);
    }
    if &buf[end..end + 2] != b"\r\n" {
        return Err(RespError::MissingCrlf);
    }
    Ok(Some((RespValue::Bulk(Some(buf[start..end].to_vec())), end + 2)))
}

fn parse_array(
    buf: &[u8],
    line: &[u8],
    start: usize,
) -> Result<Option<(RespValue, usize)>, RespError> {
    let count = parse_int(line)?;
    if count == -1 {
        return Ok(Some((RespValue::Array(None), start)));
    }
    if count < 0 {
        return Err(RespError::InvalidLength(count));
    }

    let mut items = Vec::with_capacity((count as usize).min(MAX_PREALLOC));
    let mut cursor = start;
    for _ in 0..count {
        match parse(buf, cursor)? {
            Some((value, next)) => {
                items.push(value);
                cursor = next;
            }
            None => return Ok(None),
        }
    }
    Ok(Some((RespValue::Array(Some(items)), cursor)))
}

/// Returns the line starting at `pos` (without CRLF) and the index after it.
fn read_line(buf: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(pos..)?;
    let idx = rest.windows(2).position(|w| w == b"\r\n")?;
    Some((&rest[..idx], pos + idx + 2))
}

fn utf8(line: &[u8]) -> Result<String, RespError> {
    String::from_utf8(line.to_vec()).map_err(|_| RespError::InvalidUtf8)
}

fn parse_int(line: &[u8]) -> Result<i64, RespError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| RespError::InvalidInteger(String::from_utf8_lossy(line).into_owned()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> RespValue {
        RespValue::Bulk(Some(s.as_bytes().to_vec()))
    }

    #[test]
    fn test_encode_subscribe_command() {
        let bytes = encode_command(&[b"SUBSCRIBE", b"remotecommands"]);
        assert_eq!(bytes, b"*2\r\n$9\r\nSUBSCRIBE\r\n$14\r\nremotecommands\r\n".to_vec());
    }

    #[test]
    fn test_encode_preserves_binary_payload() {
        let bytes = encode_command(&[b"PUBLISH", b"c", b"a\r\nb"]);
        let (value, _) = decode_value(&bytes).unwrap().unwrap();
        assert_eq!(
            value,
            RespValue::Array(Some(vec![bulk("PUBLISH"), bulk("c"), bulk("a\r\nb")]))
        );
    }

    #[test]
    fn test_decode_simple_string() {
        let (value, used) = decode_value(b"+OK\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Simple("OK".into()));
        assert_eq!(used, 5);
    }

    #[test]
    fn test_decode_error_reply() {
        let (value, _) = decode_value(b"-WRONGPASS invalid password\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Error("WRONGPASS invalid password".into()));
    }

    #[test]
    fn test_decode_integer() {
        let (value, _) = decode_value(b":-12\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Integer(-12));
    }

    #[test]
    fn test_decode_null_bulk_and_null_array() {
        assert_eq!(
            decode_value(b"$-1\r\n").unwrap().unwrap().0,
            RespValue::Bulk(None)
        );
        assert_eq!(
            decode_value(b"*-1\r\n").unwrap().unwrap().0,
            RespValue::Array(None)
        );
    }

    #[test]
    fn test_decode_message_push() {
        // Arrange
        let frame = b"*3\r\n$7\r\nmessage\r\n$14\r\nremotecommands\r\n$13\r\n{\"stop\":true}\r\n";

        // Act
        let (value, used) = decode_value(frame).unwrap().unwrap();

        // Assert
        assert_eq!(used, frame.len());
        assert_eq!(
            value,
            RespValue::Array(Some(vec![
                bulk("message"),
                bulk("remotecommands"),
                bulk("{\"stop\":true}"),
            ]))
        );
    }

    #[test]
    fn test_decode_partial_frame_returns_none() {
        let frame = b"*3\r\n$7\r\nmessage\r\n$14\r\nremotecommands\r\n$13\r\n{\"stop\":true}\r\n";
        for cut in 0..frame.len() {
            assert_eq!(decode_value(&frame[..cut]).unwrap(), None, "cut at {cut}");
        }
    }

    #[test]
    fn test_decode_reports_consumed_bytes_with_trailing_data() {
        let (value, used) = decode_value(b":1\r\n:2\r\n").unwrap().unwrap();
        assert_eq!(value, RespValue::Integer(1));
        assert_eq!(used, 4);
    }

    #[test]
    fn test_decode_unknown_marker_is_an_error() {
        assert_eq!(decode_value(b"?what\r\n"), Err(RespError::UnknownType(b'?')));
    }

    #[test]
    fn test_decode_bad_integer_is_an_error() {
        assert!(matches!(
            decode_value(b":abc\r\n"),
            Err(RespError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_decode_bulk_without_crlf_is_an_error() {
        assert_eq!(decode_value(b"$2\r\nhiXX"), Err(RespError::MissingCrlf));
    }

    #[test]
    fn test_decode_negative_bulk_length_is_an_error() {
        assert_eq!(decode_value(b"$-5\r\n"), Err(RespError::InvalidLength(-5)));
    }
}
