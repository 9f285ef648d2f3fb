/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Commit handle returned by slot acquisition.

use super::core::Shared;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// One-shot commit trigger bound to an acquired slot.
///
/// Calling [`commit`](Self::commit) marks the slot ready, runs the ordered
/// flush and frees one ticket of window capacity. The handle is consumed by
/// the call, so a slot cannot be committed twice.
///
/// Dropping a handle without committing leaves its slot unready forever:
/// every later slot stays blocked behind it until the sequencer is closed.
///
/// # Examples
///
/// ```
/// use sliding_sequencer::Sequencer;
///
/// let sequencer = Sequencer::new(2).unwrap();
/// let handle = sequencer.try_acquire(|| println!("first")).unwrap();
/// assert_eq!(handle.sequence_num(), 0);
/// handle.commit();
/// ```
#[must_use = "a slot that is never committed blocks every later slot"]
pub struct CommitHandle {
    shared: Arc<Shared>,
    sequence_num: u64,
    committed: bool,
}

impl CommitHandle {
    pub(crate) fn new(shared: Arc<Shared>, sequence_num: u64) -> Self {
        Self {
            shared,
            sequence_num,
            committed: false,
        }
    }

    /// Returns the sequence index assigned to this slot.
    #[inline]
    #[must_use]
    pub fn sequence_num(&self) -> u64 {
        self.sequence_num
    }

    /// Signals that the unit of work has concluded.
    ///
    /// The slot's action runs as soon as every earlier slot has committed,
    /// possibly on this call, possibly on a later one. After the sequencer has
    /// been closed this is a no-op and the action is never run.
    pub fn commit(mut self) {
        self.committed = true;
        self.shared.commit(self.sequence_num);
    }
}

impl Drop for CommitHandle {
    fn drop(&mut self) {
        if !self.committed && !self.shared.is_closed() {
            warn!(
                sequence_num = self.sequence_num,
                "commit handle dropped without committing; later slots are blocked"
            );
        }
    }
}

impl fmt::Debug for CommitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitHandle")
            .field("sequence_num", &self.sequence_num)
            .field("committed", &self.committed)
            .finish()
    }
}
