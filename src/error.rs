//! Error types for nearest-neighbor computation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading sources or processing a batch.
///
/// A batch with fewer than two entities is not an error: it simply yields an
/// empty [`ResultMapping`](crate::ResultMapping).
#[derive(Debug, Error)]
pub enum NearestError {
    /// A coordinate field could not be parsed as a floating point number.
    ///
    /// `record` is the 1-based record number in the source, counting skipped
    /// header rows.
    #[error("record {record}: {field} {value:?} is not a number")]
    Parse {
        record: usize,
        field: &'static str,
        value: String,
    },

    /// A source could not be opened or read.
    #[error("source {} unavailable: {source}", .path.display())]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The record stream of a source is malformed (e.g. invalid UTF-8).
    #[error("malformed record stream: {0}")]
    Csv(#[from] csv::Error),

    /// A chunk job panicked and the failure policy aborts the batch.
    #[error("worker for chunk {chunk} failed: {message}")]
    WorkerFailed { chunk: usize, message: String },

    /// Rejected configuration value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The row sink could not accept output.
    #[error("output failed: {0}")]
    Output(#[from] io::Error),
}

impl NearestError {
    /// Returns true if the error only concerns one source, so processing can
    /// continue with the next one.
    pub fn is_source_local(&self) -> bool {
        matches!(
            self,
            NearestError::Parse { .. }
                | NearestError::SourceUnavailable { .. }
                | NearestError::Csv(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = NearestError::Parse {
            record: 3,
            field: "latitude",
            value: "north".to_string(),
        };
        assert_eq!(err.to_string(), "record 3: latitude \"north\" is not a number");
        assert!(err.is_source_local());
    }

    #[test]
    fn test_worker_failure_is_not_source_local() {
        let err = NearestError::WorkerFailed {
            chunk: 2,
            message: "boom".to_string(),
        };
        assert!(!err.is_source_local());
        assert!(err.to_string().contains("chunk 2"));
    }
}
