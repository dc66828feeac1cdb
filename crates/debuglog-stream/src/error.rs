//! Error types for log streaming

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A request parameter failed validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParamError {
    #[error("{name} value {value:?} is not a valid unsigned number")]
    InvalidUnsigned { name: &'static str, value: String },

    #[error("{name} value {value:?} is not a valid boolean")]
    InvalidBool { name: &'static str, value: String },

    #[error(
        "level value {0:?} is not one of \"TRACE\", \"DEBUG\", \"INFO\", \"WARNING\", \"ERROR\""
    )]
    InvalidLevel(String),
}

/// Errors that end a log stream
#[derive(Debug, Error)]
pub enum StreamError {
    /// Bad request parameter (reported in the ack record)
    #[error(transparent)]
    Validation(#[from] ParamError),

    /// Log file missing or unreadable (reported in the ack record)
    #[error("cannot open log file: {source}")]
    SourceOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Backward scan or seek failed (reported in the ack record)
    #[error("cannot position log file: {0}")]
    Positioning(#[source] io::Error),

    /// The subscriber stopped accepting writes mid-stream
    #[error("cannot write to subscriber: {0}")]
    Transport(#[source] io::Error),

    /// Reading the log file failed mid-stream
    #[error("cannot read log file: {0}")]
    SourceIo(#[source] io::Error),

    /// The ack record could not be encoded
    #[error("cannot encode ack record: {0}")]
    Ack(#[from] serde_json::Error),
}

impl StreamError {
    /// Whether this error is reported to the subscriber before tailing starts
    pub fn is_ack_level(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::SourceOpen { .. } | Self::Positioning(_)
        )
    }
}

/// Result type for stream operations
pub type Result<T> = std::result::Result<T, StreamError>;
