use super::Activity;
use chrono::NaiveDateTime;

/// The current activity plus at most one nested sub-map.
///
/// Only the innermost active activity has a running stopwatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRun {
    pub main: Activity,
    nested: Option<Activity>,
    nested_active: bool,
}

impl ActiveRun {
    pub fn new(main: Activity) -> Self {
        Self {
            main,
            nested: None,
            nested_active: false,
        }
    }

    pub fn innermost(&self) -> &Activity {
        match (&self.nested, self.nested_active) {
            (Some(nested), true) => nested,
            _ => &self.main,
        }
    }

    pub fn innermost_mut(&mut self) -> &mut Activity {
        match (&mut self.nested, self.nested_active) {
            (Some(nested), true) => nested,
            _ => &mut self.main,
        }
    }

    pub fn nested(&self) -> Option<&Activity> {
        self.nested.as_ref()
    }

    pub fn nested_mut(&mut self) -> Option<&mut Activity> {
        self.nested.as_mut()
    }

    pub fn nested_active(&self) -> bool {
        self.nested_active && self.nested.is_some()
    }

    /// Step into the sub-map. `make` builds it on first entry; later entries
    /// resume the existing one.
    pub fn enter_nested(&mut self, at: NaiveDateTime, make: impl FnOnce() -> Activity) {
        self.main.stop_stopwatch(at);
        let nested = self.nested.get_or_insert_with(make);
        if !nested.manually_paused {
            nested.start_stopwatch(at);
        }
        self.nested_active = true;
    }

    /// Step back out to the main activity.
    pub fn leave_nested(&mut self, at: NaiveDateTime) {
        if let Some(nested) = self.nested.as_mut() {
            nested.stop_stopwatch(at);
            nested.last_ended_at = Some(at);
        }
        if !self.main.manually_paused {
            self.main.start_stopwatch(at);
        }
        self.nested_active = false;
    }

    pub fn clear_nested_active(&mut self) {
        self.nested_active = false;
    }

    pub fn into_parts(self) -> (Activity, Option<Activity>) {
        (self.main, self.nested)
    }
}
