//! # bet-client
//!
//! Client for the lottery bet collector.
//!
//! Reads an agency's bets, uploads them in size-bounded batches over TCP and
//! waits for the list of winning documents once the last batch is
//! acknowledged.
//!
//! ## Architecture
//!
//! - **Codec** (`codec`): bet records and the winners payload
//! - **Protocol** (`protocol`): batch headers, batch frames, replies
//! - **Batcher** (`batcher`): adaptive batch sizing under a frame budget
//! - **Transport** (`transport`): write-all / read-exact framing over TCP
//! - **Session** (`session`): connection lifecycle and results wait
//!
//! ## Example
//!
//! ```ignore
//! use bet_client::{ClientConfig, CsvRecordProvider, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::load(Some("config.yaml".as_ref()))?;
//!     let provider = CsvRecordProvider::open(config.id.clone(), &config.data_path)?;
//!
//!     let mut session = Session::builder(config).build();
//!     let outcome = session.run(provider).await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod batcher;
pub mod codec;
pub mod config;
pub mod error;
pub mod log;
pub mod protocol;
pub mod provider;
pub mod session;
pub mod transport;

pub use batcher::{BatchBuilder, BatchLimits};
pub use codec::{BetRecord, Winners};
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use log::{EventLog, MemoryLog, Severity, TracingLog};
pub use protocol::{BetBatch, ProtocolRevision, Reply};
pub use provider::{CsvRecordProvider, RecordProvider};
pub use session::{Session, SessionBuilder, SessionOutcome, SessionState};
