/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! In-flight slot bookkeeping.

use std::fmt;

/// Opaque commit action stored with a slot and run by the ordered flush.
pub(crate) type CommitAction = Box<dyn FnOnce() + Send + 'static>;

/// One acquired, not yet flushed unit of work.
pub(crate) struct Slot {
    action: CommitAction,
    ready: bool,
}

impl Slot {
    pub(crate) fn new(action: CommitAction) -> Self {
        Self {
            action,
            ready: false,
        }
    }

    #[inline]
    pub(crate) fn is_ready(&self) -> bool {
        self.ready
    }

    /// Flags the slot as ready. Returns `false` if it already was.
    pub(crate) fn mark_ready(&mut self) -> bool {
        !std::mem::replace(&mut self.ready, true)
    }

    pub(crate) fn into_action(self) -> CommitAction {
        self.action
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}

/// A flushed slot whose action is queued for execution.
pub(crate) struct PendingCommit {
    pub(crate) sequence_num: u64,
    pub(crate) action: CommitAction,
}

impl fmt::Debug for PendingCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCommit")
            .field("sequence_num", &self.sequence_num)
            .finish_non_exhaustive()
    }
}
