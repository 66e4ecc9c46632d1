// File: ./src/model/item.rs
// Plain records produced by the aggregation passes
use crate::error::{Error, Result};
use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: String,
    pub name: String,
}

/// A time-of-day span. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Period {
    start: NaiveTime,
    end: NaiveTime,
}

impl Period {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start > end {
            return Err(Error::range(
                "period",
                format!("{} -> {}", start.format("%H:%M"), end.format("%H:%M")),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn delta(&self) -> TimeDelta {
        self.end - self.start
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

/// One weekly meeting of a class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    /// 0 = Monday ... 6 = Sunday
    pub weekday: u8,
    pub period: Period,
    pub location: String,
    pub group: String,
}

/// A class section the student is registered for, as read from the
/// registration export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClass {
    pub id: String,
    pub subject: Subject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassAggregate {
    pub id: String,
    pub subject: Subject,
    pub teacher: String,
    pub lessons: Vec<Lesson>,
}

impl ClassAggregate {
    pub fn new(id: impl Into<String>, subject: Subject, teacher: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            subject,
            teacher: teacher.into(),
            lessons: Vec::new(),
        }
    }

    pub fn add_lesson(&mut self, lesson: Lesson) {
        self.lessons.push(lesson);
    }
}
