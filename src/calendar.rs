// File: ./src/calendar.rs
use crate::error::Result;
use crate::model::CalendarEvent;
use crate::storage::LocalStorage;
use std::path::{Path, PathBuf};
use tracing::info;

/// Ordered collection of compiled events, exported once per request.
///
/// Events are kept exactly as added. Compiling the same class twice yields
/// duplicate events; callers that want a clean feed compile each class once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Calendar {
    name: String,
    events: Vec<CalendarEvent>,
}

impl Calendar {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            events: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_event(&mut self, event: CalendarEvent) -> &mut Self {
        self.events.push(event);
        self
    }

    pub fn add_events<I>(&mut self, events: I) -> &mut Self
    where
        I: IntoIterator<Item = CalendarEvent>,
    {
        self.events.extend(events);
        self
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<CalendarEvent> {
        self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Writes `<file_stem>.ics` into `dir` and returns the full path.
    pub fn export<P: AsRef<Path>>(&self, dir: P, file_stem: &str) -> Result<PathBuf> {
        let dir = dir.as_ref();
        let path = dir.join(format!("{}.ics", file_stem));
        LocalStorage::atomic_write(&path, self.to_ics())?;
        info!(path = %path.display(), events = self.len(), "calendar exported");
        Ok(path)
    }
}
