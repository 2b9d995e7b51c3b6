use chrono::NaiveDate;

/// Errors raised while building a term calendar or reading its inputs.
///
/// Lookups that simply have no answer (a date outside every term, no next
/// term) are `None`, not errors.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CalendarError {
    #[error("calendar start {start} is after calendar end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("invalid date '{value}' for {field}: expected YYYY-MM-DD")]
    InvalidDate { field: String, value: String },

    #[error("term definition has an empty name")]
    EmptyTermName,

    #[error("failed to parse term definitions: {0}")]
    TermSource(#[from] serde_json::Error),

    #[error("failed to parse term definitions: {0}")]
    TermSourceToml(#[from] toml::de::Error),
}
