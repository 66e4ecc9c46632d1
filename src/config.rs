// File: ./src/config.rs
use crate::error::{Error, Result};
use crate::period::PeriodTable;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Header labels of the registration export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationHeaders {
    pub class_id: String,
    pub subject_id: String,
    pub subject_name: String,
}

impl Default for RegistrationHeaders {
    fn default() -> Self {
        Self {
            class_id: "Lớp môn học".to_string(),
            subject_id: "Mã môn học".to_string(),
            subject_name: "Môn học".to_string(),
        }
    }
}

/// Header labels of the institutional timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimetableHeaders {
    pub class_id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub teacher: String,
    pub weekday: String,
    pub period: String,
    pub location: String,
    pub group: String,
    /// Weekday cell value meaning Sunday.
    pub sunday_token: String,
}

impl Default for TimetableHeaders {
    fn default() -> Self {
        Self {
            class_id: "Mã lớp".to_string(),
            subject_id: "Mã học phần".to_string(),
            subject_name: "Học phần".to_string(),
            teacher: "Giảng viên".to_string(),
            weekday: "Thứ".to_string(),
            period: "Tiết".to_string(),
            location: "Giảng đường".to_string(),
            group: "Nhóm".to_string(),
            sunday_token: "CN".to_string(),
        }
    }
}

/// Values used when a request leaves an optional field out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestDefaults {
    /// Occurrences per lesson, first one included.
    pub repeat: u32,
    pub remind_before: Vec<u32>,
    /// Weeks practical lessons start after theory ones.
    pub practical_delay: u32,
    pub practical_groups: Vec<String>,
    /// Substrings marking a group as practical in lesson listings.
    pub practical_keywords: Vec<String>,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            repeat: 15,
            remind_before: vec![15],
            practical_delay: 1,
            practical_groups: vec![],
            practical_keywords: vec!["TH".to_string(), "BT".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CSV period table; the bundled one is used when unset.
    pub period_table: Option<PathBuf>,
    pub calendar_name: String,
    pub registration: RegistrationHeaders,
    pub timetable: TimetableHeaders,
    pub defaults: RequestDefaults,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            period_table: None,
            calendar_name: "Timetable".to_string(),
            registration: RegistrationHeaders::default(),
            timetable: TimetableHeaders::default(),
            defaults: RequestDefaults::default(),
        }
    }
}

impl Config {
    /// `TKBCAL_CONFIG` first, then the platform config directory.
    pub fn get_path() -> Option<PathBuf> {
        if let Ok(path) = env::var("TKBCAL_CONFIG") {
            return Some(PathBuf::from(path));
        }
        ProjectDirs::from("com", "tkbcal", "tkbcal").map(|proj| proj.config_dir().join("config.toml"))
    }

    /// Loads the config file, or the defaults when there is none.
    pub fn load() -> Result<Self> {
        match Self::get_path() {
            Some(path) if path.exists() => Self::load_from(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn period_table(&self) -> Result<PeriodTable> {
        match &self.period_table {
            Some(path) => PeriodTable::load(path).map_err(|e| match e {
                Error::Io(io) => Error::Config(format!(
                    "period table {}: {}",
                    path.display(),
                    io
                )),
                other => other,
            }),
            None => PeriodTable::builtin(),
        }
    }
}
