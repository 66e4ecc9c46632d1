// File: ./src/model/adapter.rs
// Handles ICS serialization/deserialization
use crate::calendar::Calendar;
use crate::error::{Error, Result};
use crate::model::event::{CalendarEvent, Recurrence, Reminder};
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use icalendar::{
    Alarm, Calendar as IcsCalendar, CalendarComponent, Component, Event, EventLike,
};
use uuid::Uuid;

const ICS_DATETIME: &str = "%Y%m%dT%H%M%S";

impl CalendarEvent {
    /// Deterministic UID: the same event at the same position always gets
    /// the same identifier.
    fn uid(&self, index: usize) -> String {
        let name = format!(
            "{}|{}|{}|{}|{}",
            index,
            self.summary,
            self.start.format(ICS_DATETIME),
            self.end.format(ICS_DATETIME),
            self.location
        );
        Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
    }

    fn to_ics_event(&self, index: usize) -> Event {
        let uid = self.uid(index);
        let mut event = Event::new();
        event.uid(&uid);
        event.summary(&self.summary);
        event.timestamp(Utc::now());
        event.add_property("DTSTART", self.start.format(ICS_DATETIME).to_string());
        event.add_property("DTEND", self.end.format(ICS_DATETIME).to_string());
        if !self.location.is_empty() {
            event.add_property("LOCATION", &self.location);
        }
        if !self.description.is_empty() {
            event.description(&self.description);
        }
        event.add_property("RRULE", self.recurrence.to_rrule());

        for (n, reminder) in self.alarms.iter().enumerate() {
            let trigger = -Duration::minutes(i64::from(reminder.minutes_before));
            let mut alarm = Alarm::display(&self.summary, trigger);
            alarm.uid(&format!("{}-alarm-{}", uid, n));
            event.alarm(alarm);
        }
        event
    }
}

impl Calendar {
    pub fn to_ics(&self) -> String {
        let mut calendar = IcsCalendar::new();
        calendar.name(self.name());
        for (index, event) in self.events().iter().enumerate() {
            calendar.push(event.to_ics_event(index));
        }
        calendar.to_string()
    }

    pub fn from_ics(raw_ics: &str) -> Result<Self> {
        let parsed: IcsCalendar = raw_ics
            .parse()
            .map_err(|e| Error::MalformedDocument(format!("ics: {}", e)))?;

        // Unfold lines (remove CRLF+Space) before the manual scans below
        let unfolded = raw_ics.replace("\r\n ", "").replace("\n ", "");
        let name = unfolded
            .lines()
            .find_map(|line| {
                line.strip_prefix("X-WR-CALNAME:")
                    .or_else(|| line.strip_prefix("NAME:"))
            })
            .unwrap_or_default()
            .trim()
            .to_string();
        let triggers = alarm_triggers_per_event(&unfolded);

        let mut calendar = Calendar::new(name);
        let vevents = parsed.components.iter().filter_map(|c| match c {
            CalendarComponent::Event(e) => Some(e),
            _ => None,
        });
        for (index, vevent) in vevents.enumerate() {
            let prop = |key: &str| vevent.properties().get(key).map(|p| p.value().to_string());

            let start = prop("DTSTART")
                .ok_or_else(|| Error::MalformedDocument("VEVENT without DTSTART".into()))
                .and_then(|v| parse_ics_datetime(&v))?;
            let end = match prop("DTEND") {
                Some(v) => parse_ics_datetime(&v)?,
                None => start,
            };
            let recurrence = match prop("RRULE") {
                Some(v) => Recurrence::from_rrule(&v)?,
                None => Recurrence::Count(1),
            };
            let alarms = triggers
                .get(index)
                .map(|list| {
                    list.iter()
                        .filter_map(|t| parse_trigger_minutes(t))
                        .map(|minutes_before| Reminder { minutes_before })
                        .collect()
                })
                .unwrap_or_default();

            calendar.add_event(CalendarEvent {
                summary: unescape(vevent.get_summary().unwrap_or_default()),
                start,
                end,
                location: unescape(&prop("LOCATION").unwrap_or_default()),
                description: unescape(vevent.get_description().unwrap_or_default()),
                recurrence,
                alarms,
            });
        }
        Ok(calendar)
    }
}

fn parse_ics_datetime(val: &str) -> Result<NaiveDateTime> {
    let val = val.trim();
    if val.len() == 8 {
        return NaiveDate::parse_from_str(val, "%Y%m%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| Error::parse("ics date", val));
    }
    NaiveDateTime::parse_from_str(val.trim_end_matches('Z'), ICS_DATETIME)
        .map_err(|_| Error::parse("ics date-time", val))
}

/// TRIGGER values of every VALARM, grouped by enclosing VEVENT in order.
fn alarm_triggers_per_event(unfolded: &str) -> Vec<Vec<String>> {
    let mut events = Vec::new();
    let mut current: Option<Vec<String>> = None;
    for line in unfolded.lines() {
        let line = line.trim_end();
        if line == "BEGIN:VEVENT" {
            current = Some(Vec::new());
        } else if line == "END:VEVENT" {
            if let Some(done) = current.take() {
                events.push(done);
            }
        } else if line.starts_with("TRIGGER")
            && let Some(list) = current.as_mut()
            && let Some((_, value)) = line.split_once(':')
        {
            list.push(value.trim().to_string());
        }
    }
    events
}

/// Minutes before start for a negative relative trigger such as `-PT15M`.
fn parse_trigger_minutes(val: &str) -> Option<u32> {
    let duration = val.strip_prefix('-')?;
    let duration = duration.strip_prefix('P')?;
    let mut seconds: u64 = 0;
    let mut num_buf = String::new();
    let mut in_time = false;
    for c in duration.chars() {
        if c == 'T' {
            in_time = true;
        } else if c.is_ascii_digit() {
            num_buf.push(c);
        } else if !num_buf.is_empty() {
            let n = num_buf.parse::<u64>().ok()?;
            let unit: u64 = match c {
                'W' => 7 * 24 * 3600,
                'D' => 24 * 3600,
                'H' if in_time => 3600,
                'M' if in_time => 60,
                'S' if in_time => 1,
                _ => return None,
            };
            seconds = seconds.checked_add(n.checked_mul(unit)?)?;
            num_buf.clear();
        }
    }
    u32::try_from(seconds / 60).ok()
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n")
        .replace("\\N", "\n")
        .replace("\\,", ",")
        .replace("\\;", ";")
        .replace("\\\\", "\\")
}
