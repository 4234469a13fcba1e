//! Codec module - payload encoding for bets and lottery results.
//!
//! - [`BetRecord`] - one bet as six length-prefixed string fields
//! - [`Winners`] - list of winning documents decoded from the results frame
//! - [`field`] - the shared `[u16 length][bytes]` string field
//!
//! All integers are Big Endian. Batch framing lives in
//! [`protocol`](crate::protocol).

pub mod field;
mod record;
mod winners;

pub use record::BetRecord;
pub use winners::Winners;
