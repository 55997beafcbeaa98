pub mod activity;
pub mod client_log;
pub mod context;
pub mod game_data;
pub mod state;
pub mod storage;
pub mod tracker;

// Re-exports for convenience
pub use activity::{ActiveRun, Activity, ActivityRecord, ActivityType};
pub use client_log::{EventClassifier, EventKind, LineSource, ReplayGuard, TrackingEvent};
pub use context::{
    AppConfig, AppConfigExt, ConfigError, PipelineError, PipelineOptions, Progress,
    TrackingPipeline, TrackingSession,
};
pub use game_data::{TagDef, stats};
pub use state::{StatsAggregate, TrackingMode, TrackingState};
pub use storage::{
    ActivityStore, MemoryStore, RosterStore, SqliteStore, StatsStore, StoreError, TrackerStore,
};
pub use tracker::{ActivityTracker, ChatCommand, SignalHandler, TrackerError, TrackerSignal};
