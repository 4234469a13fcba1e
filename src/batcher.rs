//! Adaptive batch building.
//!
//! The [`BatchBuilder`] pulls records from a [`RecordProvider`] and cuts them
//! into [`BetBatch`]es whose frames fit the transport budget:
//!
//! 1. Take up to `ceiling` records from the backlog head.
//! 2. While the frame is over the limit, halve the ceiling and retry from
//!    the same head.
//! 3. A single record over the limit is a fatal configuration error.
//!
//! Frame sizes are computed from [`BetRecord::encoded_len`], so shrinking
//! never re-encodes. A shrunken ceiling is kept for the following batches.
//!
//! The builder reads one record past the ceiling so it knows whether the
//! batch it returns is the last one.

use std::collections::VecDeque;

use crate::codec::BetRecord;
use crate::error::{ClientError, Result};
use crate::protocol::{BetBatch, ProtocolRevision};
use crate::provider::RecordProvider;

/// Default number of records per batch.
pub const DEFAULT_BATCH_CEILING: usize = 100;

/// Default frame budget in bytes.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 8 * 1024;

/// Size limits for batch building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum records per batch.
    pub ceiling: usize,
    /// Maximum encoded frame size, header included. Capped by what the
    /// revision's length field can describe.
    pub max_frame_bytes: usize,
    /// Header layout used to size frames.
    pub revision: ProtocolRevision,
}

impl BatchLimits {
    /// Frame budget after capping `max_frame_bytes` to the largest frame the
    /// revision can encode.
    pub fn effective_frame_bytes(&self) -> usize {
        let payload = usize::try_from(self.revision.max_payload_len()).unwrap_or(usize::MAX);
        let encodable = self.revision.header_size().saturating_add(payload);
        self.max_frame_bytes.min(encodable)
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_BATCH_CEILING,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            revision: ProtocolRevision::default(),
        }
    }
}

/// Cuts a record stream into transport-safe batches, in source order.
pub struct BatchBuilder<P> {
    provider: P,
    backlog: VecDeque<BetRecord>,
    exhausted: bool,
    final_emitted: bool,
    ceiling: usize,
    max_frame_bytes: usize,
    revision: ProtocolRevision,
}

impl<P: RecordProvider> BatchBuilder<P> {
    pub fn new(provider: P, limits: BatchLimits) -> Self {
        Self {
            provider,
            backlog: VecDeque::new(),
            exhausted: false,
            final_emitted: false,
            ceiling: limits.ceiling.max(1),
            max_frame_bytes: limits.effective_frame_bytes(),
            revision: limits.revision,
        }
    }

    /// Current ceiling, after any shrinking.
    #[inline]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Records read from the provider but not yet placed in a batch.
    #[inline]
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Whether the final batch has been handed out.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.final_emitted
    }

    /// Build the next batch.
    ///
    /// Returns `Ok(None)` once the final batch has been returned. An empty
    /// source still yields one empty final batch, so the collector always
    /// sees the end of the agency's bets.
    ///
    /// # Errors
    ///
    /// Provider errors propagate unchanged. A record whose frame alone
    /// exceeds the limit yields [`ClientError::RecordTooLarge`]; the record
    /// stays at the backlog head.
    pub fn next_batch(&mut self) -> Result<Option<BetBatch>> {
        if self.final_emitted {
            return Ok(None);
        }

        self.fill(self.ceiling.saturating_add(1))?;

        let count = self.fitting_count()?;
        let records: Vec<BetRecord> = self.backlog.drain(..count).collect();
        let is_final = self.backlog.is_empty() && self.exhausted;
        if is_final {
            self.final_emitted = true;
        }

        tracing::trace!(
            records = records.len(),
            ceiling = self.ceiling,
            is_final,
            "Batch built"
        );
        Ok(Some(BetBatch::new(records, is_final)))
    }

    /// Read from the provider until the backlog holds `want` records or the
    /// provider is exhausted.
    fn fill(&mut self, want: usize) -> Result<()> {
        while self.backlog.len() < want && !self.exhausted {
            match self.provider.next_record()? {
                Some(record) => self.backlog.push_back(record),
                None => self.exhausted = true,
            }
        }
        Ok(())
    }

    /// Largest head count whose frame fits, halving the ceiling on overflow.
    fn fitting_count(&mut self) -> Result<usize> {
        let mut count = self.ceiling.min(self.backlog.len());
        if count == 0 {
            return Ok(0);
        }

        loop {
            let head = self.backlog.range(..count);
            let size = self.revision.header_size()
                + head.map(BetRecord::encoded_len).sum::<usize>();
            if size <= self.max_frame_bytes {
                return Ok(count);
            }
            if count == 1 {
                return Err(ClientError::RecordTooLarge {
                    size,
                    limit: self.max_frame_bytes,
                });
            }

            count /= 2;
            self.ceiling = count;
            tracing::debug!(
                size,
                limit = self.max_frame_bytes,
                ceiling = self.ceiling,
                "Batch over frame limit, shrinking"
            );
        }
    }
}
