//! Domain error types.

use chrono::NaiveDate;

/// Strict amount parsing failure. The lenient parser coerces this to zero.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unparseable amount: {value:?}")]
pub struct AmountParseError {
    pub value: String,
}

/// Why a single transaction row was skipped during ingestion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RowError {
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    #[error("invalid date in '{field}': {value:?}")]
    InvalidDate { field: &'static str, value: String },
}

/// A rejected row together with its position in the ingestion order.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("row {row}: {error}")]
pub struct RowRejection {
    pub row: usize,
    pub error: RowError,
}

/// Top-level error type for tradeledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid balance category: {name}")]
    InvalidCategory { name: String },

    #[error("invalid investment type: {name}")]
    InvalidInvestmentType { name: String },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("cannot close position: {reason}")]
    InvalidClose { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("transaction source error: {reason}")]
    Source { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<csv::Error> for LedgerError {
    fn from(err: csv::Error) -> Self {
        LedgerError::Source {
            reason: err.to_string(),
        }
    }
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(err: &LedgerError) -> Self {
        let code: u8 = match err {
            LedgerError::Io(_) => 1,
            LedgerError::ConfigParse { .. }
            | LedgerError::ConfigMissing { .. }
            | LedgerError::ConfigInvalid { .. } => 2,
            LedgerError::Source { .. } => 3,
            LedgerError::InvalidCategory { .. }
            | LedgerError::InvalidInvestmentType { .. }
            | LedgerError::InvalidDateRange { .. }
            | LedgerError::InvalidClose { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_rejection_display_includes_row_and_reason() {
        let rejection = RowRejection {
            row: 7,
            error: RowError::MissingField { field: "Acct" },
        };
        assert_eq!(rejection.to_string(), "row 7: missing required field 'Acct'");
    }

    #[test]
    fn invalid_range_display() {
        let err = LedgerError::InvalidDateRange {
            start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "invalid date range: start 2024-02-01 is after end 2024-01-01"
        );
    }
}
