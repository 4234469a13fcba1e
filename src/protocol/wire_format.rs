//! Wire format encoding and decoding.
//!
//! Batch frames (client → collector), canonical revision:
//! ```text
//! ┌────────┬──────────────┬──────────────────────┐
//! │ Marker │ Length       │ Records              │
//! │ 1 byte │ 8 bytes      │ Length bytes         │
//! │ 0 | 1  │ uint64 BE    │ 6 × (u16 len, bytes) │
//! └────────┴──────────────┴──────────────────────┘
//! ```
//!
//! Reply frames (collector → client):
//! ```text
//! ┌───────────┬──────────────┐
//! │ Length    │ Body         │
//! │ uint16 BE │ Length bytes │
//! └───────────┴──────────────┘
//! ```
//!
//! All multi-byte integers are Big Endian.

use bytes::BufMut;
use serde::Deserialize;

use crate::error::{ClientError, Result};

/// Marker byte: more batches follow.
pub const MARKER_CONTINUE: u8 = 0;

/// Marker byte: this is the last batch.
pub const MARKER_FINAL: u8 = 1;

/// Reply header size in bytes (u16 length).
pub const REPLY_HEADER_SIZE: usize = 2;

/// Largest body a reply frame can carry.
pub const MAX_REPLY_LEN: usize = u16::MAX as usize;

/// Reply body acknowledging a batch.
pub const ACK_REPLY: &[u8] = b"BETS ACK\n";

/// Reply body rejecting a batch.
pub const ERROR_REPLY: &[u8] = b"ERROR\n";

/// Batch header layout.
///
/// The collector protocol went through three revisions. `V3` is canonical;
/// the others exist for peers that were never upgraded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolRevision {
    /// `u8` marker + `u16` length.
    V1,
    /// `u64` length, no marker. Cannot flag the final batch on the wire.
    V2,
    /// `u8` marker + `u64` length.
    #[default]
    V3,
}

impl ProtocolRevision {
    /// Whether the header starts with a marker byte.
    #[inline]
    pub fn has_marker(self) -> bool {
        !matches!(self, ProtocolRevision::V2)
    }

    /// Size of the batch header in bytes.
    #[inline]
    pub fn header_size(self) -> usize {
        match self {
            ProtocolRevision::V1 => 1 + 2,
            ProtocolRevision::V2 => 8,
            ProtocolRevision::V3 => 1 + 8,
        }
    }

    /// Largest payload the length field can describe.
    #[inline]
    pub fn max_payload_len(self) -> u64 {
        match self {
            ProtocolRevision::V1 => u64::from(u16::MAX),
            ProtocolRevision::V2 | ProtocolRevision::V3 => u64::MAX,
        }
    }
}

impl std::str::FromStr for ProtocolRevision {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(ProtocolRevision::V1),
            "v2" | "2" => Ok(ProtocolRevision::V2),
            "v3" | "3" => Ok(ProtocolRevision::V3),
            other => Err(ClientError::Config(format!(
                "unknown protocol revision: {other}"
            ))),
        }
    }
}

/// Decoded batch header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchHeader {
    /// Last batch of the session.
    pub is_final: bool,
    /// Byte length of the concatenated records.
    pub payload_length: u64,
}

impl BatchHeader {
    pub fn new(is_final: bool, payload_length: u64) -> Self {
        Self {
            is_final,
            payload_length,
        }
    }

    /// Marker byte for this header.
    #[inline]
    pub fn marker(&self) -> u8 {
        if self.is_final {
            MARKER_FINAL
        } else {
            MARKER_CONTINUE
        }
    }

    /// Append the header for `revision` to `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::PayloadTooLarge`] if the payload length does not
    /// fit the revision's length field.
    pub fn encode_into<B: BufMut>(&self, buf: &mut B, revision: ProtocolRevision) -> Result<()> {
        if self.payload_length > revision.max_payload_len() {
            return Err(ClientError::PayloadTooLarge {
                len: self.payload_length as usize,
                max: revision.max_payload_len(),
            });
        }
        if revision.has_marker() {
            buf.put_u8(self.marker());
        }
        match revision {
            ProtocolRevision::V1 => buf.put_u16(self.payload_length as u16),
            ProtocolRevision::V2 | ProtocolRevision::V3 => buf.put_u64(self.payload_length),
        }
        Ok(())
    }

    /// Decode a header for `revision`.
    ///
    /// Returns `Ok(None)` if the buffer is too short. `V2` headers decode
    /// with `is_final = false` since the revision carries no marker.
    pub fn decode(buf: &[u8], revision: ProtocolRevision) -> Result<Option<Self>> {
        if buf.len() < revision.header_size() {
            return Ok(None);
        }
        let (is_final, rest) = if revision.has_marker() {
            let is_final = match buf[0] {
                MARKER_CONTINUE => false,
                MARKER_FINAL => true,
                other => {
                    return Err(ClientError::Format(format!(
                        "invalid batch marker {other}"
                    )))
                }
            };
            (is_final, &buf[1..])
        } else {
            (false, buf)
        };
        let payload_length = match revision {
            ProtocolRevision::V1 => u64::from(u16::from_be_bytes([rest[0], rest[1]])),
            ProtocolRevision::V2 | ProtocolRevision::V3 => u64::from_be_bytes([
                rest[0], rest[1], rest[2], rest[3], rest[4], rest[5], rest[6], rest[7],
            ]),
        };
        Ok(Some(Self {
            is_final,
            payload_length,
        }))
    }
}

/// Encode a reply header (u16 length).
#[inline]
pub fn encode_reply_header(len: u16) -> [u8; REPLY_HEADER_SIZE] {
    len.to_be_bytes()
}

/// Decode a reply header.
#[inline]
pub fn decode_reply_header(buf: [u8; REPLY_HEADER_SIZE]) -> usize {
    u16::from_be_bytes(buf) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(header: BatchHeader, revision: ProtocolRevision) -> Vec<u8> {
        let mut buf = Vec::new();
        header.encode_into(&mut buf, revision).unwrap();
        buf
    }

    #[test]
    fn test_v3_header_layout() {
        let bytes = encode(BatchHeader::new(true, 0x0102_0304_0506_0708), ProtocolRevision::V3);
        assert_eq!(bytes, [1, 1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(bytes.len(), ProtocolRevision::V3.header_size());
    }

    #[test]
    fn test_v1_header_layout() {
        let bytes = encode(BatchHeader::new(false, 0x0A0B), ProtocolRevision::V1);
        assert_eq!(bytes, [0, 0x0A, 0x0B]);
    }

    #[test]
    fn test_v2_header_has_no_marker() {
        let bytes = encode(BatchHeader::new(true, 5), ProtocolRevision::V2);
        assert_eq!(bytes, [0, 0, 0, 0, 0, 0, 0, 5]);
    }

    #[test]
    fn test_v1_rejects_large_payload() {
        let mut buf = Vec::new();
        let result = BatchHeader::new(false, 70_000).encode_into(&mut buf, ProtocolRevision::V1);
        assert!(matches!(result, Err(ClientError::PayloadTooLarge { .. })));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_header_decode_round_trip() {
        for revision in [ProtocolRevision::V1, ProtocolRevision::V3] {
            for is_final in [false, true] {
                let header = BatchHeader::new(is_final, 1234);
                let bytes = encode(header, revision);
                assert_eq!(BatchHeader::decode(&bytes, revision).unwrap(), Some(header));
            }
        }
    }

    #[test]
    fn test_decode_too_short_buffer() {
        let bytes = [1u8; 8];
        assert_eq!(BatchHeader::decode(&bytes, ProtocolRevision::V3).unwrap(), None);
    }

    #[test]
    fn test_decode_invalid_marker() {
        let bytes = [7u8, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = BatchHeader::decode(&bytes, ProtocolRevision::V3).unwrap_err();
        assert!(err.to_string().contains("invalid batch marker"));
    }

    #[test]
    fn test_revision_from_str() {
        assert_eq!("v1".parse::<ProtocolRevision>().unwrap(), ProtocolRevision::V1);
        assert_eq!("V3".parse::<ProtocolRevision>().unwrap(), ProtocolRevision::V3);
        assert_eq!("2".parse::<ProtocolRevision>().unwrap(), ProtocolRevision::V2);
        assert!("v4".parse::<ProtocolRevision>().is_err());
        assert_eq!(ProtocolRevision::default(), ProtocolRevision::V3);
    }

    #[test]
    fn test_reply_header() {
        let header = encode_reply_header(ACK_REPLY.len() as u16);
        assert_eq!(header, [0, 9]);
        assert_eq!(decode_reply_header(header), 9);
    }
}
