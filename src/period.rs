// File: ./src/period.rs
//! Period number -> time-of-day lookup.
//!
//! The table is built once by the entry point and handed to the pipeline by
//! reference. `reload` takes `&mut self`, so while any compilation holds a
//! shared borrow no reload can happen; a process that shares one table
//! between threads keeps it behind an `RwLock` (one writer, many readers).
use crate::error::{Error, Result};
use crate::model::Period;
use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

static PERIOD_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9]+)(?:-([0-9]+))?").unwrap());

const BUILTIN_PERIODS: &str = include_str!("../config/periods.csv");

#[derive(Debug, Clone, Default)]
pub struct PeriodTable {
    source: Option<PathBuf>,
    entries: BTreeMap<u32, Period>,
}

impl PeriodTable {
    /// Table bundled with the crate (`config/periods.csv`).
    pub fn builtin() -> Result<Self> {
        Self::from_reader(BUILTIN_PERIODS.as_bytes())
    }

    /// Reads a CSV file whose first three columns are period, start and end.
    /// The file is remembered as the source for `reload`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let entries = read_entries(std::fs::File::open(path)?)?;
        debug!(path = %path.display(), periods = entries.len(), "period table loaded");
        Ok(Self {
            source: Some(path.to_path_buf()),
            entries,
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(Self {
            source: None,
            entries: read_entries(reader)?,
        })
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, Period)>,
    {
        Self {
            source: None,
            entries: entries.into_iter().collect(),
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Re-reads the backing file and replaces every entry. Tables without a
    /// backing file are left untouched. Returns the number of periods.
    ///
    /// On error the previous entries are kept.
    pub fn reload(&mut self) -> Result<usize> {
        if let Some(path) = &self.source {
            self.entries = read_entries(std::fs::File::open(path)?)?;
            debug!(path = %path.display(), periods = self.entries.len(), "period table reloaded");
        }
        Ok(self.entries.len())
    }

    pub fn get(&self, number: u32) -> Option<Period> {
        self.entries.get(&number).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Period)> + '_ {
        self.entries.iter().map(|(n, p)| (*n, *p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves a period code such as `"3"`, `"1-3"` or `"Tiết 7-9"`.
    ///
    /// Only the first `N` or `N-M` group found anywhere in the code counts.
    /// A range spans from the start of its first period to the end of its
    /// last one.
    pub fn resolve(&self, code: &str) -> Result<Period> {
        let caps = PERIOD_CODE
            .captures(code)
            .ok_or_else(|| Error::parse("period code", code))?;
        // Digit runs past u32 are reported as a missing period
        let number = |m: regex::Match<'_>| {
            m.as_str()
                .parse::<u32>()
                .map_err(|_| Error::Lookup(u32::MAX))
        };
        let first = number(caps.get(1).ok_or_else(|| Error::parse("period code", code))?)?;
        let last = match caps.get(2) {
            Some(m) => number(m)?,
            None => first,
        };

        let start = self.get(first).ok_or(Error::Lookup(first))?;
        let end = self.get(last).ok_or(Error::Lookup(last))?;
        Period::new(start.start(), end.end())
    }
}

fn read_entries<R: Read>(reader: R) -> Result<BTreeMap<u32, Period>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut entries = BTreeMap::new();
    for record in csv_reader.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or_default();
        if field(0).is_empty() {
            continue;
        }
        let number = parse_period_number(field(0))?;
        let period = Period::new(parse_time(field(1))?, parse_time(field(2))?)?;
        entries.insert(number, period);
    }
    Ok(entries)
}

fn parse_period_number(raw: &str) -> Result<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return Ok(n);
    }
    // Spreadsheet exports write integers as `1.0`
    match raw.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f >= 0.0 && f <= f64::from(u32::MAX) => Ok(f as u32),
        _ => Err(Error::parse("period number", raw)),
    }
}

fn parse_time(raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| Error::parse("time of day", raw))
}
