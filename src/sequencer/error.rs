/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Sequencer error types.

use thiserror::Error;

/// Errors that can occur when interacting with the Sequencer.
///
/// All of them are returned synchronously from construction or slot
/// acquisition. Failures of the commit actions themselves are invisible to
/// the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SequencerError {
    /// The caller's cancellation token fired (or its deadline elapsed)
    /// before a ticket became available. Nothing was consumed.
    #[error("slot acquisition was cancelled")]
    Cancelled,

    /// The sequencer has been shut down.
    #[error("sequencer has been closed")]
    Closed,

    /// A non-blocking acquisition found no free ticket.
    #[error("no free slot in the window")]
    WouldBlock,

    /// The configured window capacity is zero or too large.
    #[error("invalid window capacity {capacity}: must be between 1 and {max}")]
    InvalidCapacity {
        /// The capacity requested.
        capacity: usize,
        /// The largest capacity supported.
        max: usize,
    },

    /// The configured backlog bound is zero.
    #[error("invalid backlog bound: max_backlog must be at least 1")]
    InvalidBacklog,
}

impl SequencerError {
    /// Returns `true` if the sequencer is gone and the caller should stop
    /// submitting work.
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
