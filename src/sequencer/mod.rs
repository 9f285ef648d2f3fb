/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Sequencer module for in-order commits of concurrently executed work.
//!
//! This module provides a bounded-window Sequencer (a reorder buffer). A
//! fixed number of units of work may run concurrently, finish in any order,
//! and still have their commit actions applied strictly in the order their
//! slots were acquired.
//!
//! # Architecture
//!
//! - A fair ticket pool bounds how many slots are outstanding at once
//! - Each acquired slot receives a monotonic sequence index
//! - A commit trigger marks its slot ready and frees one ticket
//! - The ordered flush runs the longest contiguous ready prefix, in order
//! - Closing wakes blocked acquirers and abandons slots still in flight
//!
//! # Examples
//!
//! ```no_run
//! use sliding_sequencer::sequencer::Sequencer;
//! use sliding_sequencer::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sequencer = Sequencer::builder(32)
//!     .listener(|event| println!("committed {}", event.sequence_num))
//!     .build()?;
//!
//! let cancel = CancellationToken::new();
//! for i in 0..100 {
//!     let handle = sequencer.acquire(&cancel, move || println!("result {i}")).await?;
//!     tokio::spawn(async move {
//!         // ... run the unit of work ...
//!         handle.commit();
//!     });
//! }
//!
//! sequencer.close();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod event;
pub mod handle;
mod slot;
pub mod stats;

#[cfg(test)]
mod tests;

// Re-export main types
pub use config::{SequencerBuilder, SequencerConfig};
pub use core::Sequencer;
pub use error::SequencerError;
pub use event::CommitEvent;
pub use handle::CommitHandle;
pub use stats::{SequencerState, SequencerStats};
