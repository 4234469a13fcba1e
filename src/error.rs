//! Error types for bet-client.

use thiserror::Error;

/// Main error type for all session operations.
///
/// Every variant is fatal for the session. A clean interruption is not an
/// error; see [`SessionOutcome::Interrupted`](crate::SessionOutcome).
#[derive(Debug, Error)]
pub enum ClientError {
    /// Dialing the collector failed.
    #[error("Connection to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while writing to or reading from the connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection before a full frame arrived.
    #[error("Short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    /// Malformed length-prefixed payload.
    #[error("Format error: {0}")]
    Format(String),

    /// A string field does not fit its 16-bit length prefix.
    #[error("Field {field} is {len} bytes, maximum is {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    /// A batch payload does not fit the length field of the protocol revision.
    #[error("Batch payload of {len} bytes exceeds the {max} byte length field")]
    PayloadTooLarge { len: usize, max: u64 },

    /// A single record cannot fit the frame limit on its own.
    #[error("Record frame of {size} bytes exceeds the {limit} byte frame limit")]
    RecordTooLarge { size: usize, limit: usize },

    /// The collector answered with its error literal.
    #[error("Server rejected batch of {amount} bets")]
    ServerRejected { amount: usize },

    /// The record source failed.
    #[error("Record provider error: {0}")]
    Provider(#[from] csv::Error),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_yaml_ng::Error> for ClientError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// Result type alias using ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;
