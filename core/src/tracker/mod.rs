//! Activity state machine: turns classified events into activities, records
//! and counters.

pub mod handler;
pub mod processor;
pub mod signal;

mod area_change;
mod chat;
mod encounters;
mod error;
mod lifecycle;

#[cfg(test)]
mod processor_tests;

pub use chat::ChatCommand;
pub use error::TrackerError;
pub use handler::SignalHandler;
pub use processor::ActivityTracker;
pub use signal::TrackerSignal;
