//! Protocol module - wire format, batch frames and replies.
//!
//! This module implements the framing between client and collector:
//! - Batch header encoding/decoding for each protocol revision
//! - Batch frames built from encoded bet records
//! - Reply classification (ack, error, other)

mod batch;
mod reply;
mod wire_format;

pub use batch::{decode_batch_frame, frame_len, payload_len, BetBatch};
pub use reply::{build_reply_frame, Reply};
pub use wire_format::{
    decode_reply_header, encode_reply_header, BatchHeader, ProtocolRevision, ACK_REPLY,
    ERROR_REPLY, MARKER_CONTINUE, MARKER_FINAL, MAX_REPLY_LEN, REPLY_HEADER_SIZE,
};
