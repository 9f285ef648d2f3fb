/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! Sequencer configuration and builder.
//!
//! [`SequencerConfig`] is the plain, serde-friendly description of a window.
//! [`SequencerBuilder`] layers commit listeners on top of it, since closures
//! cannot be deserialized.

use super::core::{CommitListener, Sequencer};
use super::error::SequencerError;
use super::event::CommitEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Configuration for a [`Sequencer`].
///
/// # Examples
///
/// ```
/// use sliding_sequencer::sequencer::SequencerConfig;
///
/// let config: SequencerConfig = serde_json::from_str(r#"{"capacity": 16}"#).unwrap();
/// assert_eq!(config.capacity, 16);
/// assert_eq!(config.max_backlog, None);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Maximum number of slots acquired but not yet marked ready.
    pub capacity: usize,

    /// Upper bound on ready slots waiting behind a gap.
    ///
    /// `None` leaves the backlog unbounded: a commit trigger always frees
    /// its ticket, even when its action cannot run yet. With `Some(b)`, the
    /// ticket is withheld while more than `b` ready slots are queued.
    #[serde(default)]
    pub max_backlog: Option<usize>,
}

impl SequencerConfig {
    /// Creates a configuration with the given window size and no backlog bound.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            max_backlog: None,
        }
    }

    /// Sets the backlog bound.
    #[must_use]
    pub const fn with_max_backlog(mut self, max_backlog: usize) -> Self {
        self.max_backlog = Some(max_backlog);
        self
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// - [`SequencerError::InvalidCapacity`] if `capacity` is zero or exceeds
    ///   the number of permits a [`Semaphore`] can hold
    /// - [`SequencerError::InvalidBacklog`] if `max_backlog` is `Some(0)`
    pub fn validate(&self) -> Result<(), SequencerError> {
        if self.capacity == 0 || self.capacity > Semaphore::MAX_PERMITS {
            return Err(SequencerError::InvalidCapacity {
                capacity: self.capacity,
                max: Semaphore::MAX_PERMITS,
            });
        }
        if self.max_backlog == Some(0) {
            return Err(SequencerError::InvalidBacklog);
        }
        Ok(())
    }
}

/// Fluent builder for a [`Sequencer`].
///
/// # Examples
///
/// ```
/// use sliding_sequencer::Sequencer;
///
/// let sequencer = Sequencer::builder(4)
///     .max_backlog(64)
///     .listener(|event| println!("committed {}", event.sequence_num))
///     .build()
///     .unwrap();
/// assert_eq!(sequencer.capacity(), 4);
/// ```
pub struct SequencerBuilder {
    config: SequencerConfig,
    listeners: Vec<CommitListener>,
}

impl SequencerBuilder {
    /// Starts a builder for a window of `capacity` slots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::from_config(SequencerConfig::new(capacity))
    }

    /// Starts a builder from an existing configuration.
    #[must_use]
    pub fn from_config(config: SequencerConfig) -> Self {
        Self {
            config,
            listeners: Vec::new(),
        }
    }

    /// Bounds the ready-but-uncommitted backlog.
    #[must_use]
    pub fn max_backlog(mut self, max_backlog: usize) -> Self {
        self.config.max_backlog = Some(max_backlog);
        self
    }

    /// Registers a commit listener.
    ///
    /// Listeners are called after every commit action, in sequence order,
    /// outside the sequencer's internal lock.
    #[must_use]
    pub fn listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&CommitEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Validates the configuration and creates the sequencer.
    ///
    /// # Errors
    ///
    /// See [`SequencerConfig::validate`].
    pub fn build(self) -> Result<Sequencer, SequencerError> {
        self.config.validate()?;
        Ok(Sequencer::from_parts(self.config, self.listeners))
    }
}

impl std::fmt::Debug for SequencerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequencerBuilder")
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
