use std::fmt;

use thiserror::Error;

use crate::types::Field;

/// Pipeline stage that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CourierSummary,
    GeographicProfile,
    Incidents,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::CourierSummary => "courier summary",
            Stage::GeographicProfile => "geographic profile",
            Stage::Incidents => "incident aggregator",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("schema mismatch at line {line}: expected {expected} columns, found {found}")]
    SchemaMismatch {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("input did not contain any data rows")]
    EmptyInput,

    #[error("{stage}: record {record} has no `{field}` column")]
    MissingColumn {
        stage: Stage,
        field: Field,
        record: usize,
    },

    #[error("postal code {code:?} is too short to derive a 3-character prefix")]
    InvalidPostalCode { code: String },

    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

pub type AuditResult<T> = Result<T, AuditError>;
