//! Batch frames.
//!
//! A [`BetBatch`] is an ordered group of records sent as one frame. The
//! header carries the continuation marker and the byte length of the
//! concatenated records; see [`wire_format`](super::wire_format).
//!
//! # Example
//!
//! ```
//! use bet_client::codec::BetRecord;
//! use bet_client::protocol::{decode_batch_frame, BetBatch, ProtocolRevision};
//!
//! let bet = BetRecord::new("1", "Ana", "Diaz", "30111222", "1990-01-01", "42");
//! let batch = BetBatch::new(vec![bet.clone()], true);
//! let frame = batch.encode(ProtocolRevision::V3).unwrap();
//!
//! let (is_final, records) = decode_batch_frame(&frame, ProtocolRevision::V3).unwrap();
//! assert!(is_final);
//! assert_eq!(records, vec![bet]);
//! ```

use bytes::{Bytes, BytesMut};

use super::wire_format::{BatchHeader, ProtocolRevision};
use crate::codec::BetRecord;
use crate::error::{ClientError, Result};

/// An ordered group of bets plus the final-batch flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BetBatch {
    records: Vec<BetRecord>,
    is_final: bool,
}

impl BetBatch {
    pub fn new(records: Vec<BetRecord>, is_final: bool) -> Self {
        Self { records, is_final }
    }

    #[inline]
    pub fn records(&self) -> &[BetRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<BetRecord> {
        self.records
    }

    /// Number of bets in the batch.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Last batch of the session.
    #[inline]
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Byte length of the concatenated records.
    pub fn payload_len(&self) -> usize {
        payload_len(&self.records)
    }

    /// Full frame size (header + records) under `revision`.
    pub fn frame_len(&self, revision: ProtocolRevision) -> usize {
        frame_len(&self.records, revision)
    }

    /// Encode the batch as a complete frame.
    ///
    /// # Errors
    ///
    /// Fails with a validation error if a field or the payload does not fit
    /// its length prefix. No partial frame is returned.
    pub fn encode(&self, revision: ProtocolRevision) -> Result<Bytes> {
        let payload_len = self.payload_len();
        let mut buf = BytesMut::with_capacity(revision.header_size() + payload_len);
        BatchHeader::new(self.is_final, payload_len as u64).encode_into(&mut buf, revision)?;
        for record in &self.records {
            record.encode_into(&mut buf)?;
        }
        Ok(buf.freeze())
    }
}

/// Byte length of `records` once concatenated.
pub fn payload_len(records: &[BetRecord]) -> usize {
    records.iter().map(BetRecord::encoded_len).sum()
}

/// Frame size for `records` under `revision`.
pub fn frame_len(records: &[BetRecord], revision: ProtocolRevision) -> usize {
    revision.header_size() + payload_len(records)
}

/// Decode a complete batch frame into its final flag and records.
///
/// The frame must hold exactly one batch: the header's length has to match
/// the bytes that follow it, and the records have to consume them exactly.
pub fn decode_batch_frame(
    frame: &[u8],
    revision: ProtocolRevision,
) -> Result<(bool, Vec<BetRecord>)> {
    let header = BatchHeader::decode(frame, revision)?.ok_or_else(|| {
        ClientError::Format(format!("batch frame of {} bytes has no header", frame.len()))
    })?;
    let payload = &frame[revision.header_size()..];
    if payload.len() as u64 != header.payload_length {
        return Err(ClientError::Format(format!(
            "batch header claims {} bytes but frame carries {}",
            header.payload_length,
            payload.len()
        )));
    }

    let mut cursor = payload;
    let mut records = Vec::new();
    while !cursor.is_empty() {
        records.push(BetRecord::decode(&mut cursor)?);
    }
    Ok((header.is_final, records))
}
