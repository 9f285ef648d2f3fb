/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! # Sliding Sequencer
//!
//! A bounded-window sequencer for pipelines that must apply an externally
//! visible effect (appending to a log, acknowledging a source, writing a
//! result stream) in submission order while still running the work itself
//! in parallel.
//!
//! ## Key Features
//!
//! - **Bounded concurrency**: at most `capacity` units of work are
//!   outstanding at any instant; further acquisitions wait in FIFO order.
//!
//! - **Strict commit order**: commit actions run one at a time, in the order
//!   their slots were acquired, no matter the order units complete in.
//!
//! - **Cancellation**: acquisitions take a `CancellationToken` or a timeout
//!   and leave no trace when abandoned.
//!
//! - **Clean shutdown**: closing wakes every blocked acquirer and flushes
//!   whatever ready prefix remains.
//!
//! - **Optional backlog bound**: cap how many completed results may pile up
//!   behind a stalled unit.
//!
//! ## Example
//!
//! ```
//! use sliding_sequencer::{CancellationToken, Sequencer};
//! use std::sync::{Arc, Mutex};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let sequencer = Sequencer::new(4)?;
//! let log = Arc::new(Mutex::new(Vec::new()));
//! let cancel = CancellationToken::new();
//!
//! let mut handles = Vec::new();
//! for i in 0..4u64 {
//!     let log = Arc::clone(&log);
//!     handles.push(sequencer.acquire(&cancel, move || log.lock().unwrap().push(i)).await?);
//! }
//!
//! // Units finish as 3, 1, 2, 0.
//! let mut handles: Vec<_> = handles.into_iter().map(Some).collect();
//! for i in [3, 1, 2, 0] {
//!     handles[i].take().unwrap().commit();
//! }
//!
//! assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
//! assert_eq!(sequencer.last_committed(), Some(3));
//! # Ok(())
//! # }
//! ```

pub mod sequencer;

pub use sequencer::{
    CommitEvent, CommitHandle, Sequencer, SequencerBuilder, SequencerConfig, SequencerError,
    SequencerState, SequencerStats,
};
pub use tokio_util::sync::CancellationToken;
