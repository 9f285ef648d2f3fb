/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Core Sequencer implementation.
//!
//! This module provides the bounded-window Sequencer: a fair ticket pool that
//! limits how many units of work are outstanding, the in-flight slot map, and
//! the ordered flush that runs commit actions strictly in sequence order.

use super::config::{SequencerBuilder, SequencerConfig};
use super::error::SequencerError;
use super::event::CommitEvent;
use super::handle::CommitHandle;
use super::slot::{CommitAction, PendingCommit, Slot};
use super::stats::{SequencerState, SequencerStats};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{Semaphore, TryAcquireError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Type alias for commit listener functions.
pub(crate) type CommitListener = Arc<dyn Fn(&CommitEvent) + Send + Sync>;

/// A bounded-window sequencer (reorder buffer).
///
/// At most `capacity` slots may be outstanding (acquired but not yet
/// committed) at once. Slots complete in any order, but the commit actions
/// supplied at acquisition run strictly in acquisition order, one at a time.
///
/// The sequencer is cheap to clone; clones share the same window.
///
/// # Examples
///
/// ```
/// use sliding_sequencer::{CancellationToken, Sequencer};
/// use std::sync::{Arc, Mutex};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let sequencer = Sequencer::new(4)?;
/// let output = Arc::new(Mutex::new(Vec::new()));
/// let cancel = CancellationToken::new();
///
/// let mut handles = Vec::new();
/// for i in 0..4 {
///     let output = Arc::clone(&output);
///     let action = move || output.lock().unwrap().push(i);
///     handles.push(sequencer.acquire(&cancel, action).await?);
/// }
///
/// // Complete the units out of order.
/// for handle in handles.into_iter().rev() {
///     handle.commit();
/// }
///
/// assert_eq!(*output.lock().unwrap(), vec![0, 1, 2, 3]);
/// sequencer.close();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Sequencer {
    shared: Arc<Shared>,
}

/// State shared between a sequencer, its clones and its commit handles.
pub(crate) struct Shared {
    capacity: usize,

    /// Backlog bound; `None` frees a ticket on every commit trigger.
    max_backlog: Option<usize>,

    /// Fair ticket pool. One permit per unit of free window capacity.
    tickets: Semaphore,

    /// Lifecycle signal, cancelled once by `close`.
    shutdown: CancellationToken,

    window: Mutex<Window>,

    listeners: Vec<CommitListener>,
}

/// Bookkeeping guarded by the sequencer lock.
struct Window {
    next_sequence: u64,
    last_committed: Option<u64>,
    slots: BTreeMap<u64, Slot>,

    /// Number of ready entries in `slots`.
    ready: usize,

    /// Tickets held back by the backlog bound.
    withheld: usize,

    /// Flushed actions waiting to run, in sequence order.
    queue: VecDeque<PendingCommit>,

    /// Whether some caller is currently running `queue`.
    draining: bool,

    state: SequencerState,
}

impl Window {
    fn new() -> Self {
        Self {
            next_sequence: 0,
            last_committed: None,
            slots: BTreeMap::new(),
            ready: 0,
            withheld: 0,
            queue: VecDeque::new(),
            draining: false,
            state: SequencerState::Open,
        }
    }

    /// Moves the contiguous ready prefix following `last_committed` into the
    /// run queue. Stops at the first gap. Returns the number of slots flushed.
    fn flush(&mut self) -> usize {
        let mut expected = self.last_committed.map_or(0, |seq| seq + 1);
        let mut flushed = 0;

        // Every index below `expected` is gone from the map, so the first
        // entry is the only candidate.
        while let Some(entry) = self.slots.first_entry() {
            if *entry.key() != expected || !entry.get().is_ready() {
                break;
            }
            let slot = entry.remove();
            self.ready -= 1;
            self.last_committed = Some(expected);
            self.queue.push_back(PendingCommit {
                sequence_num: expected,
                action: slot.into_action(),
            });
            expected += 1;
            flushed += 1;
        }

        flushed
    }

    /// Returns how many tickets to release after a commit trigger.
    fn replenish(&mut self, max_backlog: Option<usize>) -> usize {
        match max_backlog {
            None => 1,
            Some(bound) => {
                self.withheld += 1;
                if self.ready <= bound {
                    std::mem::take(&mut self.withheld)
                } else {
                    0
                }
            }
        }
    }

    /// Empties the slot map. The returned slots are never run.
    fn abandon(&mut self) -> BTreeMap<u64, Slot> {
        self.ready = 0;
        self.withheld = 0;
        std::mem::take(&mut self.slots)
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Window> {
        // A panic elsewhere cannot leave the map half-updated, so keep going.
        self.window.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Turns a granted ticket into a slot.
    fn open_slot(self: &Arc<Self>, action: CommitAction) -> Result<CommitHandle, SequencerError> {
        let mut window = self.lock();
        if !window.state.is_open() {
            // Ticket won a race against close; hand it back.
            self.tickets.add_permits(1);
            return Err(SequencerError::Closed);
        }

        let sequence_num = window.next_sequence;
        window.next_sequence += 1;
        window.slots.insert(sequence_num, Slot::new(action));
        trace!(sequence_num, in_flight = window.slots.len(), "slot acquired");

        Ok(CommitHandle::new(Arc::clone(self), sequence_num))
    }

    /// Commit trigger for slot `sequence_num`.
    pub(crate) fn commit(&self, sequence_num: u64) {
        let mut window = self.lock();
        if !window.state.is_open() {
            debug!(sequence_num, state = %window.state, "commit after close, action discarded");
            return;
        }

        let Some(slot) = window.slots.get_mut(&sequence_num) else {
            warn!(sequence_num, "commit for unknown slot ignored");
            return;
        };
        if !slot.mark_ready() {
            warn!(sequence_num, "slot committed twice, ignoring");
            return;
        }
        window.ready += 1;

        let flushed = window.flush();
        let released = window.replenish(self.max_backlog);
        if released > 0 {
            self.tickets.add_permits(released);
        } else {
            debug!(
                sequence_num,
                backlog = window.ready,
                withheld = window.withheld,
                "backlog bound exceeded, ticket withheld"
            );
        }
        trace!(sequence_num, flushed, backlog = window.ready, "slot ready");

        self.drain(window);
    }

    /// Runs queued commit actions in order, outside the lock.
    ///
    /// Only one caller drains at a time; anyone flushing while a drain is in
    /// progress leaves its actions on the queue for the active drainer.
    fn drain<'a>(&'a self, mut window: MutexGuard<'a, Window>) {
        if window.draining {
            return;
        }
        window.draining = true;
        let mut guard = DrainGuard {
            shared: self,
            armed: true,
        };

        while let Some(pending) = window.queue.pop_front() {
            let backlog = window.ready;
            drop(window);

            (pending.action)();
            self.notify(&CommitEvent::new(
                pending.sequence_num,
                nanos_since_epoch(),
                backlog,
            ));

            window = self.lock();
        }

        window.draining = false;
        guard.armed = false;
    }

    fn notify(&self, event: &CommitEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

/// Releases the drain flag if a commit action or listener panics.
struct DrainGuard<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.lock().draining = false;
        }
    }
}

/// Completes the `Closing -> Closed` transition when dropped.
struct CloseGuard<'a> {
    shared: &'a Shared,
}

impl Drop for CloseGuard<'_> {
    fn drop(&mut self) {
        self.shared.lock().state = SequencerState::Closed;
        debug!("sequencer closed");
    }
}

impl Sequencer {
    /// Creates a sequencer with a window of `capacity` slots.
    ///
    /// # Errors
    ///
    /// Returns [`SequencerError::InvalidCapacity`] if `capacity` is zero or
    /// larger than [`Semaphore::MAX_PERMITS`].
    ///
    /// # Examples
    ///
    /// ```
    /// use sliding_sequencer::{Sequencer, SequencerError};
    ///
    /// assert!(Sequencer::new(32).is_ok());
    /// assert!(matches!(
    ///     Sequencer::new(0),
    ///     Err(SequencerError::InvalidCapacity { .. })
    /// ));
    /// ```
    pub fn new(capacity: usize) -> Result<Self, SequencerError> {
        Self::with_config(SequencerConfig::new(capacity))
    }

    /// Creates a sequencer from a configuration.
    ///
    /// # Errors
    ///
    /// See [`SequencerConfig::validate`].
    pub fn with_config(config: SequencerConfig) -> Result<Self, SequencerError> {
        config.validate()?;
        Ok(Self::from_parts(config, Vec::new()))
    }

    /// Starts a [`SequencerBuilder`] for a window of `capacity` slots.
    #[must_use]
    pub fn builder(capacity: usize) -> SequencerBuilder {
        SequencerBuilder::new(capacity)
    }

    /// Assembles a sequencer from an already validated configuration.
    pub(crate) fn from_parts(config: SequencerConfig, listeners: Vec<CommitListener>) -> Self {
        debug!(
            capacity = config.capacity,
            max_backlog = ?config.max_backlog,
            listeners = listeners.len(),
            "sequencer created"
        );

        Self {
            shared: Arc::new(Shared {
                capacity: config.capacity,
                max_backlog: config.max_backlog,
                tickets: Semaphore::new(config.capacity),
                shutdown: CancellationToken::new(),
                window: Mutex::new(Window::new()),
                listeners,
            }),
        }
    }

    /// Acquires a slot, waiting for free window capacity.
    ///
    /// Waiters are served in FIFO order, so sequence indices follow
    /// acquisition order. `action` is stored with the slot and runs once the
    /// returned handle and every earlier handle have been committed.
    ///
    /// If closing, cancellation and a free ticket are all ready at once,
    /// close wins, then cancellation. A failed call consumes nothing.
    ///
    /// # Errors
    ///
    /// - [`SequencerError::Closed`] if the sequencer is or becomes closed
    /// - [`SequencerError::Cancelled`] if `cancel` fires first
    pub async fn acquire<F>(
        &self,
        cancel: &CancellationToken,
        action: F,
    ) -> Result<CommitHandle, SequencerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let permit = tokio::select! {
            biased;
            () = self.shared.shutdown.cancelled() => return Err(SequencerError::Closed),
            () = cancel.cancelled() => {
                trace!("slot acquisition cancelled");
                return Err(SequencerError::Cancelled);
            }
            permit = self.shared.tickets.acquire() => {
                permit.map_err(|_| SequencerError::Closed)?
            }
        };

        // The ticket now belongs to the slot; a commit trigger returns it.
        permit.forget();
        self.shared.open_slot(Box::new(action))
    }

    /// Acquires a slot, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// - [`SequencerError::Closed`] if the sequencer is or becomes closed
    /// - [`SequencerError::Cancelled`] if the deadline elapses first
    pub async fn acquire_timeout<F>(
        &self,
        timeout: Duration,
        action: F,
    ) -> Result<CommitHandle, SequencerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        match tokio::time::timeout(timeout, self.acquire(&cancel, action)).await {
            Ok(result) => result,
            Err(_) => {
                trace!(?timeout, "slot acquisition timed out");
                Err(SequencerError::Cancelled)
            }
        }
    }

    /// Acquires a slot only if a ticket is free right now.
    ///
    /// # Errors
    ///
    /// - [`SequencerError::Closed`] if the sequencer is closed
    /// - [`SequencerError::WouldBlock`] if the window is full
    pub fn try_acquire<F>(&self, action: F) -> Result<CommitHandle, SequencerError>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.shared.is_closed() {
            return Err(SequencerError::Closed);
        }
        match self.shared.tickets.try_acquire() {
            Ok(permit) => {
                permit.forget();
                self.shared.open_slot(Box::new(action))
            }
            Err(TryAcquireError::Closed) => Err(SequencerError::Closed),
            Err(TryAcquireError::NoPermits) => Err(SequencerError::WouldBlock),
        }
    }

    /// Shuts the sequencer down.
    ///
    /// Blocked and future acquisitions fail with [`SequencerError::Closed`].
    /// One final flush runs any ready prefix; every slot still in flight
    /// afterwards is abandoned and its action dropped unrun. Does not wait
    /// for outstanding handles. Idempotent.
    pub fn close(&self) {
        let mut window = self.shared.lock();
        if window.state != SequencerState::Open {
            return;
        }
        window.state = SequencerState::Closing;
        self.shared.shutdown.cancel();
        self.shared.tickets.close();

        let flushed = window.flush();
        let abandoned = window.abandon();
        if abandoned.is_empty() {
            debug!(flushed, last_committed = ?window.last_committed, "sequencer closing");
        } else {
            warn!(
                flushed,
                abandoned = abandoned.len(),
                first_abandoned = ?abandoned.keys().next(),
                last_committed = ?window.last_committed,
                "sequencer closing with slots in flight"
            );
        }

        // Reaches `Closed` even if a commit action panics during the drain.
        let finish = CloseGuard {
            shared: &self.shared,
        };
        self.shared.drain(window);
        drop(finish);

        // Dropped outside the lock: captured state may have its own Drop.
        drop(abandoned);
    }

    /// Waits until [`close`](Self::close) has been called.
    pub async fn closed(&self) {
        self.shared.shutdown.cancelled().await;
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SequencerState {
        self.shared.lock().state
    }

    /// Returns the window size.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns the sequence index of the most recently flushed slot.
    #[must_use]
    pub fn last_committed(&self) -> Option<u64> {
        self.shared.lock().last_committed
    }

    /// Returns a snapshot of the window's bookkeeping.
    #[must_use]
    pub fn stats(&self) -> SequencerStats {
        let window = self.shared.lock();
        SequencerStats {
            capacity: self.shared.capacity,
            available: self.shared.tickets.available_permits(),
            in_flight: window.slots.len(),
            ready: window.ready,
            withheld: window.withheld,
            next_sequence: window.next_sequence,
            last_committed: window.last_committed,
            state: window.state,
        }
    }
}

impl fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("capacity", &self.shared.capacity)
            .field("max_backlog", &self.shared.max_backlog)
            .field("closed", &self.shared.is_closed())
            .finish_non_exhaustive()
    }
}

/// Returns the current time in nanoseconds since the Unix epoch.
#[inline]
fn nanos_since_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
