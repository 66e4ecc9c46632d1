// File: ./src/error.rs
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the compilation pipeline and its collaborators.
///
/// `HeaderNotFound`: the document does not have the expected shape.
/// `EmptyResult`: it does, but nothing in it can be scheduled.
#[derive(Debug, Error)]
pub enum Error {
    #[error("header '{label}' not found in document")]
    HeaderNotFound { label: String },

    #[error("nothing to schedule: {0}")]
    EmptyResult(String),

    #[error("cannot parse {what} from '{input}'")]
    Parse { what: &'static str, input: String },

    #[error("period {0} is missing from the period table")]
    Lookup(u32),

    #[error("{what} out of range: {value}")]
    Range { what: &'static str, value: String },

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn parse(what: &'static str, input: impl Into<String>) -> Self {
        Self::Parse {
            what,
            input: input.into(),
        }
    }

    pub(crate) fn range(what: &'static str, value: impl ToString) -> Self {
        Self::Range {
            what,
            value: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Self::MalformedDocument(format!("csv: {err}"))
    }
}

impl From<calamine::Error> for Error {
    fn from(err: calamine::Error) -> Self {
        Self::MalformedDocument(format!("spreadsheet: {err}"))
    }
}
