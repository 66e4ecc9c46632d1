// File: ./src/request.rs
//! JSON request bodies and the two pipeline entry points built on them.
use crate::aggregate::{attach_lessons, registered_classes};
use crate::calendar::Calendar;
use crate::compile::{CompileOptions, compile_class};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::loader::load_document;
use crate::model::{ClassAggregate, Recurrence};
use crate::period::PeriodTable;
use crate::storage::LocalStorage;
use crate::table::{LayoutStrategy, SniffingLayout};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of weekly occurrences, or the last date to repeat on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Repeat {
    Count(u32),
    Until(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reminders {
    One(u32),
    Many(Vec<u32>),
}

impl Reminders {
    fn into_vec(self) -> Vec<u32> {
        match self {
            Reminders::One(m) => vec![m],
            Reminders::Many(list) => list,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarRequest {
    pub registered_file: Option<PathBuf>,
    pub schedule_file: Option<PathBuf>,
    /// `YYYY-MM-DD`, any day of the first teaching week.
    pub start_date: Option<String>,
    pub repeat: Option<Repeat>,
    pub remind_before: Option<Reminders>,
    pub practical_delay: Option<u32>,
    pub practical_groups: Option<Vec<String>>,
}

impl CalendarRequest {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Makes relative document paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for path in [&mut self.registered_file, &mut self.schedule_file]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("registered_file", self.registered_file.is_none()),
            ("schedule_file", self.schedule_file.is_none()),
            ("start_date", self.start_date.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    fn compile_options(&self, config: &Config) -> Result<CompileOptions> {
        let start = self.start_date.as_deref().unwrap_or_default();
        let anchor = parse_date(start)?;
        let defaults = &config.defaults;
        let recurrence = match &self.repeat {
            None => Recurrence::Count(defaults.repeat),
            Some(Repeat::Count(n)) => Recurrence::Count(*n),
            Some(Repeat::Until(date)) => Recurrence::Until(parse_date(date)?),
        };

        let mut options = CompileOptions::new(anchor, recurrence);
        options.reminders = self
            .remind_before
            .clone()
            .map(Reminders::into_vec)
            .unwrap_or_else(|| defaults.remind_before.clone());
        options.practical_delay_weeks = self.practical_delay.unwrap_or(defaults.practical_delay);
        options.practical_groups = self
            .practical_groups
            .clone()
            .unwrap_or_else(|| defaults.practical_groups.clone())
            .into_iter()
            .collect();
        Ok(options)
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|_| Error::parse("date", text))
}

/// Loads both documents and aggregates the registered classes.
fn load_classes(
    request: &CalendarRequest,
    config: &Config,
    periods: &PeriodTable,
) -> Result<Vec<ClassAggregate>> {
    request.validate()?;
    let (Some(registered_file), Some(schedule_file)) =
        (&request.registered_file, &request.schedule_file)
    else {
        return Err(Error::Config("document paths are required".to_string()));
    };

    let layout = SniffingLayout;
    let registration = load_document(&LocalStorage::read(registered_file)?)?;
    let registration = layout.extract(&registration, &config.registration.class_id)?;
    let universe = registered_classes(&registration, &config.registration)?;

    let timetable = load_document(&LocalStorage::read(schedule_file)?)?;
    let timetable = layout.extract(&timetable, &config.timetable.class_id)?;
    attach_lessons(&timetable, &universe, periods, &config.timetable)
}

/// Runs the whole pipeline for one request.
pub fn handle_calendar(
    request: &CalendarRequest,
    config: &Config,
    periods: &PeriodTable,
) -> Result<Calendar> {
    request.validate()?;
    let options = request.compile_options(config)?;
    let classes = load_classes(request, config, periods)?;

    let mut calendar = Calendar::new(config.calendar_name.clone());
    for class in &classes {
        calendar.add_events(compile_class(class, &options)?);
    }
    info!(
        classes = classes.len(),
        events = calendar.len(),
        "calendar compiled"
    );
    Ok(calendar)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonView {
    /// 0 = Monday.
    pub weekday: u8,
    /// `HH:MM -> HH:MM`.
    pub period: String,
    pub location: String,
    pub group: String,
    pub is_practical: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassView {
    pub id: String,
    pub subject: crate::model::Subject,
    pub teacher: String,
    pub lessons: Vec<LessonView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonsResponse {
    pub classes: Vec<ClassView>,
}

/// Lists the aggregated classes without compiling them. A lesson is
/// practical when its group contains one of the configured keywords.
pub fn handle_lessons(
    request: &CalendarRequest,
    config: &Config,
    periods: &PeriodTable,
) -> Result<LessonsResponse> {
    let keywords = &config.defaults.practical_keywords;
    let classes = load_classes(request, config, periods)?
        .into_iter()
        .map(|class| ClassView {
            lessons: class
                .lessons
                .iter()
                .map(|lesson| LessonView {
                    weekday: lesson.weekday,
                    period: lesson.period.to_string(),
                    location: lesson.location.clone(),
                    group: lesson.group.clone(),
                    is_practical: keywords.iter().any(|k| lesson.group.contains(k.as_str())),
                })
                .collect(),
            id: class.id,
            subject: class.subject,
            teacher: class.teacher,
        })
        .collect();
    Ok(LessonsResponse { classes })
}

/// `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl ToString) -> Self {
        Self {
            error: error.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"error\":{:?}}}", self.error))
    }
}
