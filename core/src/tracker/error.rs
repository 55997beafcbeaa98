//! Error types for event handling

use super::TrackerSignal;
use crate::storage::StoreError;
use thiserror::Error;

/// Failure while applying one event. The handling loop logs it and moves on.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("store write failed")]
    Store(#[from] StoreError),

    /// The event was applied to the tracking state but some writes failed.
    #[error("event applied with store failures")]
    Partial {
        #[source]
        source: Box<TrackerError>,
        signals: Vec<TrackerSignal>,
    },
}

impl TrackerError {
    /// Signals the event produced before or despite the failure.
    pub fn signals(&self) -> &[TrackerSignal] {
        match self {
            TrackerError::Store(_) => &[],
            TrackerError::Partial { signals, .. } => signals,
        }
    }
}

/// Collects failures so a transition can run to completion before
/// reporting the first one.
#[derive(Debug, Default)]
pub(super) struct Failures(Option<TrackerError>);

impl Failures {
    pub fn note<T>(&mut self, result: Result<T, TrackerError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) if self.0.is_none() => {
                self.0 = Some(e);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Further store failure in the same event");
                None
            }
        }
    }

    pub fn finish<T>(self, value: T) -> Result<T, TrackerError> {
        match self.0 {
            Some(e) => Err(e),
            None => Ok(value),
        }
    }

    /// Like [`Failures::finish`], keeping `signals` on the error.
    pub fn finish_with(self, signals: Vec<TrackerSignal>) -> Result<Vec<TrackerSignal>, TrackerError> {
        match self.0 {
            None => Ok(signals),
            Some(e) if signals.is_empty() => Err(e),
            Some(e) => Err(TrackerError::Partial {
                source: Box::new(e),
                signals,
            }),
        }
    }
}
