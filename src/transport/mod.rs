//! Transport module - framed byte stream to the collector.
//!
//! Provides whole-frame send/receive over any tokio stream and TCP dialing.

mod framed;

pub use framed::{connect, FramedStream};
