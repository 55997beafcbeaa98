pub mod cache;
mod stats;

pub use cache::{TrackingMode, TrackingState};
pub use stats::StatsAggregate;
