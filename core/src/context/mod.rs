mod config;
mod error;
mod pipeline;
mod queue;
mod session;

pub use config::{AppConfig, AppConfigExt, TrackerSettings, default_log_file};
pub use error::{ConfigError, PipelineError};
pub use pipeline::{PipelineOptions, Progress, TrackingPipeline};
pub use queue::{EventReceiver, EventSender, event_queue};
pub use session::TrackingSession;
