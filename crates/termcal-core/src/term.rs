use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::datetime::{format_date, month_start_for_date, parse_date, shift_days};
use crate::error::CalendarError;

/// Number of teaching weeks in every term.
pub const TERM_WEEKS: u32 = 8;

/// Days from a term's start to its last day (8 * 7 - 1).
pub const TERM_LAST_DAY_OFFSET: i64 = (TERM_WEEKS as i64) * 7 - 1;

/// One teaching period of the academic year, exactly eight weeks long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub name: String,
    pub start: NaiveDate,
}

/// A single numbered week inside a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermWeek {
    pub week: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Term {
    pub fn new(name: impl Into<String>, start: NaiveDate) -> Self {
        Self {
            name: name.into(),
            start,
        }
    }

    /// Builds a term from its external string form, validating both fields.
    pub fn from_record(name: &str, start: &str) -> Result<Self, CalendarError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CalendarError::EmptyTermName);
        }
        let start = parse_date(&format!("start of term '{name}'"), start)?;
        Ok(Self::new(name, start))
    }

    pub fn end(&self) -> NaiveDate {
        shift_days(self.start, TERM_LAST_DAY_OFFSET)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end()
    }

    /// 1-based week number of `date`, if the date falls inside this term.
    pub fn week_for(&self, date: NaiveDate) -> Option<u32> {
        if !self.contains(date) {
            return None;
        }
        let days = (date - self.start).num_days();
        u32::try_from(days / 7 + 1).ok()
    }

    pub fn week_start(&self, week: u32) -> Option<NaiveDate> {
        if !(1..=TERM_WEEKS).contains(&week) {
            return None;
        }
        Some(shift_days(self.start, i64::from(week - 1) * 7))
    }

    pub fn weeks(&self) -> Vec<TermWeek> {
        (1..=TERM_WEEKS)
            .filter_map(|week| {
                let start = self.week_start(week)?;
                Some(TermWeek {
                    week,
                    start,
                    end: shift_days(start, 6),
                })
            })
            .collect()
    }

    /// True when any day of the term falls in the month containing `date`.
    pub fn owns_month_of(&self, date: NaiveDate) -> bool {
        let month = month_start_for_date(date);
        month_start_for_date(self.start) <= month && month <= month_start_for_date(self.end())
    }
}

impl std::fmt::Display for Term {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({} to {})",
            self.name,
            format_date(self.start),
            format_date(self.end())
        )
    }
}

#[derive(Debug, Deserialize)]
struct TermRecord {
    name: String,
    start: String,
}

#[derive(Debug, Deserialize)]
struct TomlTermFile {
    #[serde(default)]
    term: Vec<TomlTermRecord>,
}

#[derive(Debug, Deserialize)]
struct TomlTermRecord {
    name: String,
    start: toml::Value,
}

/// Parses the backend's `terms.json`.
///
/// Accepts either an object keyed by term name (`{"Lent": "2013-01-17"}`)
/// or an array of `{"name", "start"}` records. Document order becomes the
/// calendar's iteration order.
pub fn parse_terms_json(text: &str) -> Result<Vec<Term>, CalendarError> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Object(map) => map
            .iter()
            .map(|(name, start)| match start {
                Value::String(raw) => Term::from_record(name, raw),
                other => Err(CalendarError::InvalidDate {
                    field: format!("start of term '{name}'"),
                    value: other.to_string(),
                }),
            })
            .collect(),
        other => {
            let records: Vec<TermRecord> = serde_json::from_value(other)?;
            records
                .iter()
                .map(|record| Term::from_record(&record.name, &record.start))
                .collect()
        }
    }
}

/// Parses a `[[term]]` table array; `start` may be a TOML date or a string.
pub fn parse_terms_toml(text: &str) -> Result<Vec<Term>, CalendarError> {
    let file: TomlTermFile = toml::from_str(text)?;
    file.term
        .iter()
        .map(|record| {
            let raw = match &record.start {
                toml::Value::String(raw) => raw.clone(),
                toml::Value::Datetime(datetime) => datetime.to_string(),
                other => other.to_string(),
            };
            Term::from_record(&record.name, &raw)
        })
        .collect()
}

#[tracing::instrument]
pub fn load_terms(path: &Path) -> anyhow::Result<Vec<Term>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read term file {}", path.display()))?;

    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    debug!(is_toml, "parsing term file");

    let terms = if is_toml {
        parse_terms_toml(&text)
    } else {
        parse_terms_json(&text)
    }
    .with_context(|| format!("invalid term file {}", path.display()))?;

    info!(
        file = %path.display(),
        count = terms.len(),
        "loaded term definitions"
    );
    Ok(terms)
}
