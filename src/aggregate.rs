// File: ./src/aggregate.rs
//! Registration rows + timetable rows -> per-class lesson aggregates.
use crate::config::{RegistrationHeaders, TimetableHeaders};
use crate::error::{Error, Result};
use crate::model::{ClassAggregate, Lesson, RegisteredClass, Subject};
use crate::period::PeriodTable;
use crate::table::{Row, Table};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// A column the aggregator reads, named by a configured header label.
pub trait Field: Copy + Eq + std::fmt::Debug + 'static {
    type Headers;
    const ALL: &'static [Self];

    fn label(self, headers: &Self::Headers) -> &str;

    fn required(self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationField {
    ClassId,
    SubjectId,
    SubjectName,
}

impl Field for RegistrationField {
    type Headers = RegistrationHeaders;
    const ALL: &'static [Self] = &[Self::ClassId, Self::SubjectId, Self::SubjectName];

    fn label(self, headers: &RegistrationHeaders) -> &str {
        match self {
            Self::ClassId => &headers.class_id,
            Self::SubjectId => &headers.subject_id,
            Self::SubjectName => &headers.subject_name,
        }
    }

    fn required(self) -> bool {
        matches!(self, Self::ClassId)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimetableField {
    ClassId,
    SubjectId,
    SubjectName,
    Teacher,
    Weekday,
    Period,
    Location,
    Group,
}

impl Field for TimetableField {
    type Headers = TimetableHeaders;
    const ALL: &'static [Self] = &[
        Self::ClassId,
        Self::SubjectId,
        Self::SubjectName,
        Self::Teacher,
        Self::Weekday,
        Self::Period,
        Self::Location,
        Self::Group,
    ];

    fn label(self, headers: &TimetableHeaders) -> &str {
        match self {
            Self::ClassId => &headers.class_id,
            Self::SubjectId => &headers.subject_id,
            Self::SubjectName => &headers.subject_name,
            Self::Teacher => &headers.teacher,
            Self::Weekday => &headers.weekday,
            Self::Period => &headers.period,
            Self::Location => &headers.location,
            Self::Group => &headers.group,
        }
    }

    fn required(self) -> bool {
        matches!(self, Self::ClassId | Self::Weekday | Self::Period)
    }
}

/// Field -> column index, resolved once per table.
struct ColumnMap<F> {
    columns: Vec<(F, usize)>,
}

impl<F: Field> ColumnMap<F> {
    fn resolve(table: &Table, headers: &F::Headers) -> Result<Self> {
        let mut columns = Vec::with_capacity(F::ALL.len());
        for &field in F::ALL {
            let label = field.label(headers);
            match table.column(label) {
                Some(index) => columns.push((field, index)),
                None if field.required() => {
                    return Err(Error::HeaderNotFound {
                        label: label.to_string(),
                    });
                }
                None => debug!(?field, label, "optional column missing"),
            }
        }
        Ok(Self { columns })
    }

    fn get<'r>(&self, row: &'r Row, field: F) -> Option<&'r str> {
        let (_, index) = self.columns.iter().find(|(f, _)| *f == field)?;
        row.get(*index)?.as_deref()
    }

    fn text(&self, row: &Row, field: F) -> String {
        self.get(row, field).unwrap_or_default().to_string()
    }
}

/// Registration pass: the classes the student is registered for, in row
/// order, without duplicates. Rows with a blank class id are skipped.
pub fn registered_classes(
    table: &Table,
    headers: &RegistrationHeaders,
) -> Result<Vec<RegisteredClass>> {
    use RegistrationField as F;
    let columns = ColumnMap::<F>::resolve(table, headers)?;

    let mut seen = HashSet::new();
    let mut classes = Vec::new();
    for row in table.rows() {
        let Some(id) = columns.get(row, F::ClassId) else {
            continue;
        };
        if !seen.insert(id.to_string()) {
            continue;
        }
        classes.push(RegisteredClass {
            id: id.to_string(),
            subject: Subject {
                id: columns.text(row, F::SubjectId),
                name: columns.text(row, F::SubjectName),
            },
        });
    }

    if classes.is_empty() {
        return Err(Error::EmptyResult(
            "no registered classes in the registration document".to_string(),
        ));
    }
    info!(classes = classes.len(), "registration universe read");
    Ok(classes)
}

/// Timetable pass: one aggregate per registered class that has at least one
/// timetable row, in order of first appearance.
///
/// The first row of a class fixes its subject and teacher; every row adds a
/// lesson. Registered classes without rows are dropped.
pub fn attach_lessons(
    table: &Table,
    universe: &[RegisteredClass],
    periods: &PeriodTable,
    headers: &TimetableHeaders,
) -> Result<Vec<ClassAggregate>> {
    use TimetableField as F;
    let columns = ColumnMap::<F>::resolve(table, headers)?;
    let registered: HashMap<&str, &RegisteredClass> =
        universe.iter().map(|c| (c.id.as_str(), c)).collect();

    let mut index_of: HashMap<String, usize> = HashMap::new();
    let mut aggregates: Vec<ClassAggregate> = Vec::new();
    for row in table.rows() {
        let Some(class_id) = columns.get(row, F::ClassId) else {
            continue;
        };
        let Some(registration) = registered.get(class_id) else {
            continue;
        };

        let slot = *index_of.entry(class_id.to_string()).or_insert_with(|| {
            let subject = Subject {
                id: columns
                    .get(row, F::SubjectId)
                    .unwrap_or(registration.subject.id.as_str())
                    .to_string(),
                name: columns
                    .get(row, F::SubjectName)
                    .unwrap_or(registration.subject.name.as_str())
                    .to_string(),
            };
            aggregates.push(ClassAggregate::new(
                class_id,
                subject,
                columns.text(row, F::Teacher),
            ));
            aggregates.len() - 1
        });

        let weekday_code = columns.get(row, F::Weekday).unwrap_or_default();
        let period_code = columns.get(row, F::Period).unwrap_or_default();
        aggregates[slot].add_lesson(Lesson {
            weekday: parse_weekday(weekday_code, &headers.sunday_token)?,
            period: periods.resolve(period_code)?,
            location: columns.text(row, F::Location),
            group: columns.text(row, F::Group),
        });
    }

    for class in universe {
        if !index_of.contains_key(&class.id) {
            debug!(class = %class.id, "registered class has no timetable rows, dropped");
        }
    }
    if aggregates.is_empty() {
        return Err(Error::EmptyResult(
            "none of the registered classes appear in the timetable".to_string(),
        ));
    }
    info!(classes = aggregates.len(), "lessons attached");
    Ok(aggregates)
}

/// Normalizes a timetable weekday code to 0 = Monday ... 6 = Sunday.
///
/// Numeric codes are 2-based (`2` = Monday, `8` = Sunday); the Sunday token
/// (compared case-insensitively) maps to 6.
pub fn parse_weekday(code: &str, sunday_token: &str) -> Result<u8> {
    let code = code.trim();
    if !sunday_token.is_empty() && code.eq_ignore_ascii_case(sunday_token) {
        return Ok(6);
    }
    let number = code
        .parse::<i64>()
        .ok()
        .or_else(|| {
            code.parse::<f64>()
                .ok()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e6)
                .map(|f| f as i64)
        })
        .ok_or_else(|| Error::parse("weekday code", code))?;
    match number {
        2..=8 => Ok((number - 2) as u8),
        _ => Err(Error::range("weekday code", number)),
    }
}
