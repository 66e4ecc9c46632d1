// File: ./src/model/event.rs
use crate::error::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rrule::RRuleSet;
use std::str::FromStr;

/// Weekly recurrence of an event.
///
/// `Count(n)` follows RFC 5545 `COUNT`: the first occurrence is included, so
/// `Count(1)` is a single, non-repeating meeting. `Until(d)` keeps every
/// weekly occurrence that starts on or before the end of day `d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    Count(u32),
    Until(NaiveDate),
}

impl Recurrence {
    /// Renders the value of an `RRULE` property.
    pub fn to_rrule(&self) -> String {
        match self {
            Recurrence::Count(n) => format!("FREQ=WEEKLY;COUNT={}", n),
            Recurrence::Until(date) => format!(
                "FREQ=WEEKLY;UNTIL={}",
                date.and_time(end_of_day()).format("%Y%m%dT%H%M%S")
            ),
        }
    }

    /// Parses the subset of `RRULE` values this crate writes.
    pub fn from_rrule(value: &str) -> Result<Self> {
        let mut weekly = false;
        let mut recurrence = None;
        let value = value.trim().replace("\\;", ";");
        for part in value.split(';') {
            let Some((key, val)) = part.split_once('=') else {
                continue;
            };
            match key.trim().to_uppercase().as_str() {
                "FREQ" => weekly = val.trim().eq_ignore_ascii_case("WEEKLY"),
                "COUNT" => {
                    let n = val
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| Error::parse("recurrence count", val))?;
                    recurrence = Some(Recurrence::Count(n));
                }
                "UNTIL" => {
                    let val = val.trim();
                    let date = val
                        .get(..8)
                        .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok())
                        .ok_or_else(|| Error::parse("recurrence end date", val))?;
                    recurrence = Some(Recurrence::Until(date));
                }
                _ => {}
            }
        }
        if !weekly {
            return Err(Error::parse("weekly recurrence", value));
        }
        recurrence.ok_or_else(|| Error::parse("recurrence bound", value))
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reminder {
    pub minutes_before: u32,
}

/// A weekly recurring calendar entry, in floating local time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub summary: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub location: String,
    pub description: String,
    pub recurrence: Recurrence,
    pub alarms: Vec<Reminder>,
}

impl CalendarEvent {
    /// Expands the recurrence into concrete start instants, at most `limit`.
    pub fn occurrences(&self, limit: u16) -> Result<Vec<NaiveDateTime>> {
        // Floating times are expanded in UTC so wall-clock times never shift.
        let dtstart = self.start.format("%Y%m%dT%H%M%SZ").to_string();
        let rule = match self.recurrence {
            Recurrence::Count(n) => format!("FREQ=WEEKLY;COUNT={}", n),
            Recurrence::Until(date) => format!(
                "FREQ=WEEKLY;UNTIL={}Z",
                date.and_time(end_of_day()).format("%Y%m%dT%H%M%S")
            ),
        };
        let rrule_string = format!("DTSTART:{}\nRRULE:{}", dtstart, rule);

        let rrule_set = RRuleSet::from_str(&rrule_string)
            .map_err(|e| Error::parse("recurrence rule", format!("{rrule_string}: {e}")))?;
        let result = rrule_set.all(limit);
        Ok(result.dates.iter().map(|d| d.naive_utc()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monday_lesson(recurrence: Recurrence) -> CalendarEvent {
        let day = NaiveDate::from_ymd_opt(2024, 2, 19).unwrap();
        CalendarEvent {
            summary: "Calculus".to_string(),
            start: day.and_hms_opt(7, 0, 0).unwrap(),
            end: day.and_hms_opt(9, 20, 0).unwrap(),
            location: "A2-301".to_string(),
            description: String::new(),
            recurrence,
            alarms: vec![],
        }
    }

    #[test]
    fn count_includes_first_occurrence() {
        let dates = monday_lesson(Recurrence::Count(5)).occurrences(100).unwrap();
        assert_eq!(dates.len(), 5);
        assert_eq!(
            dates[0],
            NaiveDate::from_ymd_opt(2024, 2, 19)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap()
        );
        assert_eq!(
            dates[4].date(),
            NaiveDate::from_ymd_opt(2024, 3, 18).unwrap()
        );
    }

    #[test]
    fn until_is_inclusive_of_the_end_date() {
        let until = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let dates = monday_lesson(Recurrence::Until(until))
            .occurrences(100)
            .unwrap();
        assert_eq!(dates.len(), 3);
        assert_eq!(dates.last().unwrap().date(), until);
    }

    #[test]
    fn rrule_text_parses_back() {
        let until = Recurrence::Until(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap());
        assert_eq!(until.to_rrule(), "FREQ=WEEKLY;UNTIL=20240531T235959");
        assert_eq!(Recurrence::from_rrule(&until.to_rrule()).unwrap(), until);
        assert_eq!(
            Recurrence::from_rrule("FREQ=WEEKLY;COUNT=15").unwrap(),
            Recurrence::Count(15)
        );
        assert!(Recurrence::from_rrule("FREQ=DAILY;COUNT=3").is_err());
    }
}
