/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Commit event types.
//!
//! This module defines the events emitted by the Sequencer after each commit
//! action has run.

/// Event emitted after a slot's commit action has executed.
///
/// Events are emitted strictly in sequence order and can be used for
/// auditing, metrics or real-time monitoring of the commit stream.
///
/// # Examples
///
/// ```
/// use sliding_sequencer::sequencer::CommitEvent;
///
/// let event = CommitEvent::new(7, 1_234_567_890, 2);
/// assert_eq!(event.sequence_num, 7);
/// assert_eq!(event.backlog, 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitEvent {
    /// Sequence index of the committed slot.
    pub sequence_num: u64,

    /// Nanosecond timestamp taken right after the commit action returned.
    pub timestamp_ns: u64,

    /// Ready slots still waiting behind a gap when this one was flushed.
    pub backlog: usize,
}

impl CommitEvent {
    /// Creates a new commit event.
    #[must_use]
    pub fn new(sequence_num: u64, timestamp_ns: u64, backlog: usize) -> Self {
        Self {
            sequence_num,
            timestamp_ns,
            backlog,
        }
    }
}
