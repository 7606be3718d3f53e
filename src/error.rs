//! Error types for the analysis stages
//!
//! Record-level problems (missing or unparseable numbers) are never errors:
//! the cleaner drops those rows and counts them. The variants here cover the
//! structural problems that make a stage impossible to run.

use thiserror::Error;

/// Errors raised by configuration, table parsing and statistics setup
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing required column '{column}' in {table}")]
    MissingColumn { column: String, table: String },

    #[error("Malformed segment table at line {line}: {reason}")]
    MalformedSegmentTable { line: usize, reason: String },

    #[error("Unknown indicator '{0}'")]
    UnknownIndicator(String),

    #[error("Student-t distribution unavailable for df={df}: {reason}")]
    Distribution { df: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_message() {
        let err = AnalysisError::MissingColumn {
            column: "year".to_string(),
            table: "raw survey export".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Missing required column 'year' in raw survey export"
        );
    }

    #[test]
    fn test_distribution_message_includes_df() {
        let err = AnalysisError::Distribution {
            df: 0,
            reason: "freedom must be positive".to_string(),
        };
        assert!(err.to_string().contains("df=0"));
    }
}
