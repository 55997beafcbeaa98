mod classifier;
mod error;
mod event;
mod reader;
pub mod replay;

pub use classifier::{
    EventClassifier, area_name, chat_command, instance_endpoint, level_up_level, next_area_level,
    parse_timestamp, player_name,
};
pub use error::{ParseError, ReaderError};
pub use event::*;
pub use reader::{HistoryScan, LineSource, NextLine, ScannedLine, count_lines};
pub use replay::{LineVerdict, ReplayGuard, fingerprint};
