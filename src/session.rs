//! Session builder and state machine.
//!
//! The [`SessionBuilder`] provides a fluent API for configuring the event log
//! and cancellation token. The [`Session`] drives one agency's upload:
//! 1. Connect to the collector (one connection per batch)
//! 2. Send the next batch and wait for its reply
//! 3. After the final batch is acknowledged, send the client id
//! 4. Wait for the lottery results on a helper task, racing cancellation
//!
//! ```text
//! Idle ─► Connecting ─► Sending ─► AwaitingAck ─┬─► Connecting (more batches)
//!                                                └─► AwaitingResults ─► Done
//! any ─► Cancelled (token)        any ─► Aborted (error)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use bet_client::{ClientConfig, CsvRecordProvider, Session, SessionOutcome};
//!
//! let config = ClientConfig::load(None)?;
//! let provider = CsvRecordProvider::open(config.id.clone(), &config.data_path)?;
//! let mut session = Session::builder(config).build();
//!
//! match session.run(provider).await? {
//!     SessionOutcome::Completed(winners) => println!("{} winners", winners.count()),
//!     SessionOutcome::Interrupted => println!("interrupted"),
//! }
//! ```

use std::fmt;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use crate::batcher::BatchBuilder;
use crate::codec::Winners;
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::log::{EventLog, TracingLog};
use crate::protocol::{BetBatch, Reply};
use crate::provider::RecordProvider;
use crate::transport::{connect, FramedStream};

type Connection = FramedStream<TcpStream>;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Sending,
    AwaitingAck,
    AwaitingResults,
    Done,
    Cancelled,
    Aborted,
}

impl SessionState {
    /// Whether the session can no longer make progress.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Done | SessionState::Cancelled | SessionState::Aborted
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a session ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// All batches acknowledged and the results received.
    Completed(Winners),
    /// The cancellation token fired first.
    Interrupted,
}

/// Builder for configuring and creating a [`Session`].
pub struct SessionBuilder<L = TracingLog> {
    config: ClientConfig,
    log: L,
    cancel: CancellationToken,
}

impl SessionBuilder<TracingLog> {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            log: TracingLog,
            cancel: CancellationToken::new(),
        }
    }
}

impl<L: EventLog> SessionBuilder<L> {
    /// Replace the event log.
    pub fn log<L2: EventLog>(self, log: L2) -> SessionBuilder<L2> {
        SessionBuilder {
            config: self.config,
            log,
            cancel: self.cancel,
        }
    }

    /// Use an existing cancellation token, e.g. one wired to SIGTERM.
    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Session<L> {
        Session {
            config: self.config,
            log: self.log,
            cancel: self.cancel,
            state: SessionState::Idle,
            sent: 0,
        }
    }
}

/// One agency's upload to the collector.
pub struct Session<L = TracingLog> {
    config: ClientConfig,
    log: L,
    cancel: CancellationToken,
    state: SessionState,
    /// Bets acknowledged so far.
    sent: usize,
}

/// Result of racing a suspension point against the cancellation token.
enum Raced<T> {
    Ready(T),
    Cancelled,
}

impl Session<TracingLog> {
    /// Create a new session builder.
    pub fn builder(config: ClientConfig) -> SessionBuilder<TracingLog> {
        SessionBuilder::new(config)
    }
}

impl<L: EventLog> Session<L> {
    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Bets acknowledged by the collector so far.
    #[inline]
    pub fn bets_sent(&self) -> usize {
        self.sent
    }

    /// Token that interrupts the session when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the session to completion.
    ///
    /// Returns [`SessionOutcome::Interrupted`] if the token fires at an
    /// iteration boundary, during a network wait or during the inter-batch
    /// pause. Every error is fatal and leaves the session `Aborted`.
    pub async fn run<P: RecordProvider>(&mut self, provider: P) -> Result<SessionOutcome> {
        let mut batches = BatchBuilder::new(provider, self.config.batch_limits());

        let result = match self.send_batches(&mut batches).await {
            Ok(Some(conn)) => self.await_results(conn).await,
            Ok(None) => Ok(SessionOutcome::Interrupted),
            Err(e) => Err(e),
        };

        match &result {
            Ok(SessionOutcome::Completed(_)) => self.transition(SessionState::Done),
            Ok(SessionOutcome::Interrupted) => {
                self.transition(SessionState::Cancelled);
                self.log.info(format_args!(
                    "action: shutdown | result: success | client_id: {} | bets_sent: {}",
                    self.config.id, self.sent
                ));
            }
            Err(e) => {
                self.transition(SessionState::Aborted);
                self.log.critical(format_args!(
                    "action: loop_finished | result: fail | client_id: {} | error: {}",
                    self.config.id, e
                ));
            }
        }
        result
    }

    /// Batch loop. Returns the connection the final ack arrived on, or
    /// `None` if cancelled.
    async fn send_batches<P: RecordProvider>(
        &mut self,
        batches: &mut BatchBuilder<P>,
    ) -> Result<Option<Connection>> {
        let mut pending: Option<BetBatch> = None;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(None);
            }

            self.transition(SessionState::Connecting);
            let mut conn = match self.race(connect(&self.config.server_address)).await {
                Raced::Ready(Ok(conn)) => conn,
                Raced::Ready(Err(e)) => {
                    self.log.error(format_args!(
                        "action: connect | result: fail | client_id: {} | error: {}",
                        self.config.id, e
                    ));
                    return Err(e);
                }
                Raced::Cancelled => return Ok(None),
            };

            self.transition(SessionState::Sending);
            let batch = match pending.take() {
                Some(batch) => batch,
                None => batches.next_batch()?.ok_or_else(|| {
                    ClientError::Format("record source drained before the final batch".to_string())
                })?,
            };
            let frame = batch.encode(self.config.protocol_revision)?;
            if let Err(e) = conn.write_all(&frame).await {
                self.log.error(format_args!(
                    "action: send_batch | result: fail | client_id: {} | error: {}",
                    self.config.id, e
                ));
                return Err(e);
            }

            self.transition(SessionState::AwaitingAck);
            let body = match self.race(conn.read_frame()).await {
                Raced::Ready(Ok(body)) => body,
                Raced::Ready(Err(e)) => {
                    self.log.error(format_args!(
                        "action: receive_message | result: fail | client_id: {} | error: {}",
                        self.config.id, e
                    ));
                    return Err(e);
                }
                Raced::Cancelled => {
                    close(conn).await;
                    return Ok(None);
                }
            };

            match Reply::parse(&body) {
                Reply::Ack => {
                    self.sent += batch.len();
                    self.log.info(format_args!(
                        "action: apuestas_enviadas | result: success | cantidad: {}",
                        batch.len()
                    ));
                    if batch.is_final() {
                        conn.write_all(self.config.id.as_bytes()).await?;
                        return Ok(Some(conn));
                    }
                }
                Reply::Error => {
                    self.log.error(format_args!(
                        "action: apuestas_enviadas | result: fail | cantidad: {}",
                        batch.len()
                    ));
                    close(conn).await;
                    return Err(ClientError::ServerRejected {
                        amount: batch.len(),
                    });
                }
                Reply::Other(text) => {
                    self.log.error(format_args!(
                        "action: receive_message | result: fail | client_id: {} | msg: {:?}",
                        self.config.id, text
                    ));
                    if self.config.strict_replies {
                        close(conn).await;
                        return Err(ClientError::Format(format!(
                            "unexpected reply {text:?}"
                        )));
                    }
                    pending = Some(batch);
                }
            }

            close(conn).await;
            let pause = tokio::time::sleep(self.config.loop_period);
            if let Raced::Cancelled = self.race(pause).await {
                return Ok(None);
            }
        }
    }

    /// Read the results frame on a helper task while watching the token.
    async fn await_results(&mut self, conn: Connection) -> Result<SessionOutcome> {
        self.transition(SessionState::AwaitingResults);

        let mut reader = tokio::spawn(async move {
            let mut conn = conn;
            let body = conn.read_frame().await?;
            Ok::<_, ClientError>((conn, body))
        });

        let cancel = self.cancel.clone();
        let joined = tokio::select! {
            _ = cancel.cancelled() => None,
            joined = &mut reader => Some(joined),
        };

        let Some(joined) = joined else {
            // Aborting drops the task's connection.
            reader.abort();
            let _ = reader.await;
            return Ok(SessionOutcome::Interrupted);
        };

        let (conn, body) = joined.map_err(|e| ClientError::Io(std::io::Error::other(e)))??;
        close(conn).await;

        let winners = Winners::decode(&body)?;
        self.log.info(format_args!(
            "action: consulta_ganadores | result: success | cant_ganadores: {} | dni: {:?}",
            winners.count(),
            winners.documents()
        ));
        Ok(SessionOutcome::Completed(winners))
    }

    /// Await `fut` unless the token fires first.
    async fn race<F: std::future::Future>(&self, fut: F) -> Raced<F::Output> {
        tokio::select! {
            _ = self.cancel.cancelled() => Raced::Cancelled,
            out = fut => Raced::Ready(out),
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(
            from = %self.state,
            to = %next,
            client_id = %self.config.id,
            "Session transition"
        );
        self.state = next;
    }
}

/// Close the write side and drop the connection.
async fn close(mut conn: Connection) {
    if let Err(e) = conn.shutdown().await {
        tracing::debug!("Connection shutdown failed: {}", e);
    }
}
