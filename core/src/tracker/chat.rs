//! In-game `::command` chat control of the current activity.

use super::error::Failures;
use super::lifecycle::finish_activity;
use super::{TrackerError, TrackerSignal};
use crate::client_log::{TrackingEvent, chat_command};
use crate::game_data::{TagDef, is_default_tag, is_valid_tag_id};
use crate::state::TrackingState;
use crate::storage::TrackerStore;
use waystone_types::TrackerSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Tag(String),
    Untag(String),
    Pause,
    Resume,
    Finish,
}

impl ChatCommand {
    /// Parse the text after `::`. Unknown or malformed commands yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let command = parts.next()?;
        let arg = parts.next();
        if parts.next().is_some() {
            return None;
        }
        match (command, arg) {
            ("tag", Some(id)) => Some(ChatCommand::Tag(id.to_string())),
            ("untag", Some(id)) => Some(ChatCommand::Untag(id.to_string())),
            ("pause", None) => Some(ChatCommand::Pause),
            ("resume", None) => Some(ChatCommand::Resume),
            ("finish", None) => Some(ChatCommand::Finish),
            _ => None,
        }
    }
}

pub(super) fn handle_chat_command(
    event: &TrackingEvent,
    state: &mut TrackingState,
    store: &mut dyn TrackerStore,
    settings: &TrackerSettings,
) -> Result<Vec<TrackerSignal>, TrackerError> {
    let mut signals = Vec::new();
    // Replayed commands were already applied when they were typed
    if !state.is_live() {
        return Ok(signals);
    }
    let Some(command) = chat_command(&event.raw_line).ok().and_then(ChatCommand::parse) else {
        tracing::debug!(line = event.line_number, "Ignoring unrecognized chat command");
        return Ok(signals);
    };
    let at = event.timestamp;
    let mut failures = Failures::default();

    match command {
        ChatCommand::Tag(id) | ChatCommand::Untag(id)
            if !is_valid_tag_id(&id) || is_default_tag(&id) =>
        {
            tracing::debug!(tag = %id, "Rejected chat tag");
        }
        ChatCommand::Tag(id) => {
            let Some(activity) = state.innermost_mut() else {
                return Ok(signals);
            };
            if activity.add_tag(&id) {
                let (timestamp, area, tags) =
                    (activity.timestamp(), activity.area.clone(), activity.tags().to_vec());
                failures.note(store.add_tag(&TagDef::custom(&id)).map_err(TrackerError::from));
                failures.note(sync_persisted_tags(state, store, timestamp, &area, &tags));
                signals.push(TrackerSignal::TagsChanged { area, tags });
            }
        }
        ChatCommand::Untag(id) => {
            let Some(activity) = state.innermost_mut() else {
                return Ok(signals);
            };
            if activity.remove_tag(&id) {
                let (timestamp, area, tags) =
                    (activity.timestamp(), activity.area.clone(), activity.tags().to_vec());
                failures.note(sync_persisted_tags(state, store, timestamp, &area, &tags));
                signals.push(TrackerSignal::TagsChanged { area, tags });
            }
        }
        ChatCommand::Pause => {
            if let Some(activity) = state.innermost_mut()
                && !activity.manually_paused
            {
                activity.pause(at);
                signals.push(TrackerSignal::PauseChanged {
                    area: activity.area.clone(),
                    paused: true,
                });
            }
        }
        ChatCommand::Resume => {
            if let Some(activity) = state.innermost_mut()
                && activity.manually_paused
            {
                activity.resume(at);
                signals.push(TrackerSignal::PauseChanged {
                    area: activity.area.clone(),
                    paused: false,
                });
            }
        }
        ChatCommand::Finish => {
            let nested_active = state.current.as_ref().is_some_and(|run| run.nested_active());
            if state.current.is_some() && !nested_active {
                failures.note(finish_activity(state, store, settings, None, at, &mut signals));
            }
        }
    }
    failures.finish_with(signals)
}

fn sync_persisted_tags(
    state: &TrackingState,
    store: &mut dyn TrackerStore,
    timestamp: i64,
    area: &str,
    tags: &[String],
) -> Result<(), TrackerError> {
    if state.is_persisted(timestamp, area) {
        store.update_activity_tags(timestamp, area, tags)?;
    }
    Ok(())
}
