//! Collector replies.

use bytes::Bytes;

use super::wire_format::{
    encode_reply_header, ACK_REPLY, ERROR_REPLY, MAX_REPLY_LEN, REPLY_HEADER_SIZE,
};
use crate::error::{ClientError, Result};

/// Interpretation of a reply frame body sent after a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `"BETS ACK\n"`: the batch was stored.
    Ack,
    /// `"ERROR\n"`: the collector rejected the batch.
    Error,
    /// Anything else, passed through as text.
    Other(String),
}

impl Reply {
    /// Classify a reply body.
    pub fn parse(body: &[u8]) -> Self {
        if body == ACK_REPLY {
            Reply::Ack
        } else if body == ERROR_REPLY {
            Reply::Error
        } else {
            Reply::Other(String::from_utf8_lossy(body).into_owned())
        }
    }
}

/// Build a complete reply frame (`[u16 length][body]`).
///
/// The client only reads replies; this is what a collector writes.
pub fn build_reply_frame(body: &[u8]) -> Result<Bytes> {
    if body.len() > MAX_REPLY_LEN {
        return Err(ClientError::PayloadTooLarge {
            len: body.len(),
            max: MAX_REPLY_LEN as u64,
        });
    }
    let mut buf = Vec::with_capacity(REPLY_HEADER_SIZE + body.len());
    buf.extend_from_slice(&encode_reply_header(body.len() as u16));
    buf.extend_from_slice(body);
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_literals() {
        assert_eq!(Reply::parse(b"BETS ACK\n"), Reply::Ack);
        assert_eq!(Reply::parse(b"ERROR\n"), Reply::Error);
    }

    #[test]
    fn test_parse_requires_exact_match() {
        assert_eq!(
            Reply::parse(b"BETS ACK"),
            Reply::Other("BETS ACK".to_string())
        );
        assert_eq!(Reply::parse(b"error\n"), Reply::Other("error\n".to_string()));
        assert_eq!(Reply::parse(b""), Reply::Other(String::new()));
    }

    #[test]
    fn test_build_reply_frame() {
        let frame = build_reply_frame(ERROR_REPLY).unwrap();
        assert_eq!(&frame[..], b"\x00\x06ERROR\n");
    }

    #[test]
    fn test_build_reply_frame_too_large() {
        let body = vec![0u8; MAX_REPLY_LEN + 1];
        assert!(build_reply_frame(&body).is_err());
    }
}
