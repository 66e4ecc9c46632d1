// File: ./src/compile.rs
//! Class aggregates -> weekly recurring calendar events.
use crate::error::{Error, Result};
use crate::model::{CalendarEvent, ClassAggregate, Lesson, Recurrence, Reminder};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::HashSet;
use tracing::debug;

/// Date of `weekday_index` (0 = Monday ... 6 = Sunday) inside the
/// Monday-based week that contains `anchor`.
pub fn weekday_date(anchor: NaiveDate, weekday_index: u8) -> Result<NaiveDate> {
    if weekday_index > 6 {
        return Err(Error::range("weekday index", weekday_index));
    }
    let monday = anchor
        .checked_sub_days(Days::new(u64::from(anchor.weekday().num_days_from_monday())))
        .ok_or_else(|| Error::range("date", anchor))?;
    monday
        .checked_add_days(Days::new(u64::from(weekday_index)))
        .ok_or_else(|| Error::range("date", anchor))
}

/// Parameters shared by every class of one compilation request.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Any day of the first teaching week.
    pub anchor: NaiveDate,
    pub recurrence: Recurrence,
    /// Group codes whose lessons are practical (exact match).
    pub practical_groups: HashSet<String>,
    /// Whole weeks practical lessons start after the anchor week.
    pub practical_delay_weeks: u32,
    /// Minutes before start, one alarm each, in order.
    pub reminders: Vec<u32>,
}

impl CompileOptions {
    pub fn new(anchor: NaiveDate, recurrence: Recurrence) -> Self {
        Self {
            anchor,
            recurrence,
            practical_groups: HashSet::new(),
            practical_delay_weeks: 0,
            reminders: Vec::new(),
        }
    }

    pub fn is_practical(&self, lesson: &Lesson) -> bool {
        self.practical_groups.contains(&lesson.group)
    }

    fn practical_anchor(&self) -> Result<NaiveDate> {
        self.anchor
            .checked_add_days(Days::new(7 * u64::from(self.practical_delay_weeks)))
            .ok_or_else(|| Error::range("practical delay", self.practical_delay_weeks))
    }
}

/// Compiles one event per lesson: theory lessons first (anchored on
/// `options.anchor`), then practical lessons (anchored
/// `practical_delay_weeks` later). Every event carries the same recurrence
/// and the same alarms.
pub fn compile_class(class: &ClassAggregate, options: &CompileOptions) -> Result<Vec<CalendarEvent>> {
    if class.lessons.is_empty() {
        return Err(Error::EmptyResult(format!("class {} has no lessons", class.id)));
    }
    if options.recurrence == Recurrence::Count(0) {
        return Err(Error::range("recurrence count", 0));
    }

    let (practical, theory): (Vec<&Lesson>, Vec<&Lesson>) =
        class.lessons.iter().partition(|l| options.is_practical(l));

    let mut events = Vec::with_capacity(class.lessons.len());
    for lesson in theory {
        events.push(lesson_event(class, lesson, options.anchor, options)?);
    }
    if !practical.is_empty() {
        let anchor = options.practical_anchor()?;
        for lesson in practical {
            events.push(lesson_event(class, lesson, anchor, options)?);
        }
    }
    debug!(class = %class.id, events = events.len(), "class compiled");
    Ok(events)
}

fn lesson_event(
    class: &ClassAggregate,
    lesson: &Lesson,
    anchor: NaiveDate,
    options: &CompileOptions,
) -> Result<CalendarEvent> {
    let date = weekday_date(anchor, lesson.weekday)?;
    Ok(CalendarEvent {
        summary: class.subject.name.clone(),
        start: date.and_time(lesson.period.start()),
        end: date.and_time(lesson.period.end()),
        location: lesson.location.clone(),
        description: describe(class, lesson),
        recurrence: options.recurrence,
        alarms: options
            .reminders
            .iter()
            .map(|&minutes_before| Reminder { minutes_before })
            .collect(),
    })
}

fn describe(class: &ClassAggregate, lesson: &Lesson) -> String {
    let mut lines = vec![format!("Class: {}", class.id)];
    if !class.subject.id.is_empty() {
        lines.push(format!("Subject: {}", class.subject.id));
    }
    if !class.teacher.is_empty() {
        lines.push(format!("Teacher: {}", class.teacher));
    }
    if !lesson.location.is_empty() {
        lines.push(format!("Location: {}", lesson.location));
    }
    if !lesson.group.is_empty() {
        lines.push(format!("Group: {}", lesson.group));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Period, Subject};
    use chrono::{NaiveTime, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn lesson(weekday: u8, group: &str) -> Lesson {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        Lesson {
            weekday,
            period: Period::new(t(7, 0), t(9, 20)).unwrap(),
            location: "A2-301".to_string(),
            group: group.to_string(),
        }
    }

    fn class(lessons: Vec<Lesson>) -> ClassAggregate {
        ClassAggregate {
            id: "INT1001 1".to_string(),
            subject: Subject {
                id: "INT1001".to_string(),
                name: "Nhập môn lập trình".to_string(),
            },
            teacher: "T. An".to_string(),
            lessons,
        }
    }

    #[test]
    fn weekday_date_stays_in_the_anchor_week() {
        let mondays = [date(2024, 2, 19), date(2024, 12, 30), date(2025, 2, 10)];
        for monday in mondays {
            for offset in 0..7u64 {
                let anchor = monday + Days::new(offset);
                for index in 0..7u8 {
                    let d = weekday_date(anchor, index).unwrap();
                    assert_eq!(d.weekday().num_days_from_monday(), u32::from(index));
                    assert_eq!(d.iso_week(), monday.iso_week());
                }
            }
        }
    }

    #[test]
    fn weekday_date_examples() {
        assert_eq!(weekday_date(date(2024, 2, 19), 0).unwrap(), date(2024, 2, 19));
        assert_eq!(weekday_date(date(2024, 2, 19), 6).unwrap(), date(2024, 2, 25));
        // Sunday anchors belong to the week that started the Monday before
        assert_eq!(weekday_date(date(2025, 2, 16), 0).unwrap(), date(2025, 2, 10));
        assert!(matches!(
            weekday_date(date(2024, 2, 19), 7),
            Err(Error::Range { .. })
        ));
    }

    #[test]
    fn week_start_before_the_calendar_range_is_an_error() {
        let anchor = if NaiveDate::MIN.weekday() == Weekday::Mon {
            NaiveDate::MIN + Days::new(1)
        } else {
            NaiveDate::MIN
        };
        assert!(matches!(weekday_date(anchor, 0), Err(Error::Range { .. })));
    }

    #[test]
    fn monday_lesson_starts_on_anchor_with_uniform_rule() {
        let options = CompileOptions::new(date(2024, 2, 19), Recurrence::Count(5));
        let events = compile_class(&class(vec![lesson(0, "CL")]), &options).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].start, date(2024, 2, 19).and_hms_opt(7, 0, 0).unwrap());
        assert_eq!(events[0].end, date(2024, 2, 19).and_hms_opt(9, 20, 0).unwrap());
        assert_eq!(events[0].recurrence, Recurrence::Count(5));
        assert_eq!(events[0].summary, "Nhập môn lập trình");
    }

    #[test]
    fn practical_lessons_are_delayed_by_whole_weeks() {
        let mut options = CompileOptions::new(date(2024, 2, 19), Recurrence::Count(5));
        options.practical_groups.insert("1".to_string());
        options.practical_delay_weeks = 1;
        options.reminders = vec![15, 60];

        let events =
            compile_class(&class(vec![lesson(0, "1"), lesson(2, "CL")]), &options).unwrap();
        assert_eq!(events.len(), 2);
        // theory first
        assert_eq!(events[0].start.date(), date(2024, 2, 21));
        assert_eq!(events[1].start.date(), date(2024, 2, 26));
        assert_eq!(events[1].start.weekday(), Weekday::Mon);
        for event in &events {
            assert_eq!(event.recurrence, Recurrence::Count(5));
            assert_eq!(
                event.alarms,
                vec![Reminder { minutes_before: 15 }, Reminder { minutes_before: 60 }]
            );
        }
    }

    #[test]
    fn until_rule_is_shared_by_both_groups() {
        let until = Recurrence::Until(date(2024, 5, 31));
        let mut options = CompileOptions::new(date(2024, 2, 21), until);
        options.practical_groups.insert("2".to_string());
        options.practical_delay_weeks = 2;
        let events =
            compile_class(&class(vec![lesson(4, "2"), lesson(1, "")]), &options).unwrap();
        assert!(events.iter().all(|e| e.recurrence == until));
        assert_eq!(events[1].start.date(), date(2024, 3, 8));
    }

    #[test]
    fn one_event_per_lesson_with_description() {
        let options = CompileOptions::new(date(2024, 2, 19), Recurrence::Count(15));
        let events =
            compile_class(&class(vec![lesson(0, "CL"), lesson(3, "CL")]), &options).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[1].description.contains("Class: INT1001 1"));
        assert!(events[1].description.contains("Teacher: T. An"));
        assert!(events.iter().all(|e| e.alarms.is_empty()));
    }

    #[test]
    fn rejects_empty_class_and_zero_count() {
        let options = CompileOptions::new(date(2024, 2, 19), Recurrence::Count(5));
        assert!(matches!(
            compile_class(&class(vec![]), &options),
            Err(Error::EmptyResult(_))
        ));
        let zero = CompileOptions::new(date(2024, 2, 19), Recurrence::Count(0));
        assert!(matches!(
            compile_class(&class(vec![lesson(0, "")]), &zero),
            Err(Error::Range { .. })
        ));
    }

    #[test]
    fn out_of_range_weekday_fails_the_class() {
        let options = CompileOptions::new(date(2024, 2, 19), Recurrence::Count(5));
        assert!(matches!(
            compile_class(&class(vec![lesson(7, "")]), &options),
            Err(Error::Range { .. })
        ));
    }
}
