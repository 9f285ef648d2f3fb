/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Sequencer lifecycle and introspection types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a Sequencer.
///
/// Transitions are one-way: `Open -> Closing -> Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencerState {
    /// Accepting acquisitions and commits.
    Open,

    /// Close was requested and the final flush is in progress.
    Closing,

    /// Terminal. Acquisitions fail and late commits are discarded.
    Closed,
}

impl SequencerState {
    /// Returns `true` if the sequencer still accepts work.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for SequencerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Closing => write!(f, "closing"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Point-in-time snapshot of a Sequencer's bookkeeping.
///
/// While the sequencer is open,
/// `available + (in_flight - ready) + withheld == capacity`.
///
/// # Examples
///
/// ```
/// use sliding_sequencer::Sequencer;
///
/// let sequencer = Sequencer::new(8).unwrap();
/// let stats = sequencer.stats();
/// assert_eq!(stats.capacity, 8);
/// assert_eq!(stats.available, 8);
/// assert_eq!(stats.last_committed, None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerStats {
    /// Configured window size.
    pub capacity: usize,

    /// Tickets free for immediate acquisition.
    pub available: usize,

    /// Acquired slots not yet flushed, ready or not.
    pub in_flight: usize,

    /// Ready slots blocked behind an earlier unready slot.
    pub ready: usize,

    /// Tickets held back because the backlog bound is exceeded.
    pub withheld: usize,

    /// Sequence index the next acquisition will receive.
    pub next_sequence: u64,

    /// Sequence index of the most recently flushed slot.
    pub last_committed: Option<u64>,

    /// Lifecycle state at snapshot time.
    pub state: SequencerState,
}

impl SequencerStats {
    /// Slots acquired whose commit trigger has not fired yet.
    #[inline]
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.in_flight - self.ready
    }
}
