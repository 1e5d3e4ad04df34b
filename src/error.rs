//! Fatal request errors.
//!
//! Every variant aborts the remaining pipeline steps. The caller only ever
//! sees a generic failure response; the [`ErrorKind`] survives in the logs.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The invocation payload lacked the object-retrieval context.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    #[error("fetching source object failed: {0}")]
    Fetch(String),

    #[error("writing scratch file {path} failed: {source}")]
    ScratchWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter could not run, exited non-zero, timed out, or left no output.
    #[error("document conversion failed: {0}")]
    Conversion(String),

    #[error("converted output is not a PDF (starts with {leading:?})")]
    ConversionVerification { leading: String },

    #[error("PDF parse failed: {0}")]
    Parse(String),

    #[error("delivering response failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidEvent,
    FetchFailure,
    ScratchWriteFailure,
    ConversionFailure,
    ConversionVerificationFailure,
    ParseFailure,
    DeliveryFailure,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidEvent => "InvalidEvent",
            ErrorKind::FetchFailure => "FetchFailure",
            ErrorKind::ScratchWriteFailure => "ScratchWriteFailure",
            ErrorKind::ConversionFailure => "ConversionFailure",
            ErrorKind::ConversionVerificationFailure => "ConversionVerificationFailure",
            ErrorKind::ParseFailure => "ParseFailure",
            ErrorKind::DeliveryFailure => "DeliveryFailure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidEvent(_) => ErrorKind::InvalidEvent,
            PipelineError::Fetch(_) => ErrorKind::FetchFailure,
            PipelineError::ScratchWrite { .. } => ErrorKind::ScratchWriteFailure,
            PipelineError::Conversion(_) => ErrorKind::ConversionFailure,
            PipelineError::ConversionVerification { .. } => {
                ErrorKind::ConversionVerificationFailure
            }
            PipelineError::Parse(_) => ErrorKind::ParseFailure,
            PipelineError::Delivery(_) => ErrorKind::DeliveryFailure,
        }
    }

    pub(crate) fn scratch(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::ScratchWrite {
            path: path.into(),
            source,
        }
    }
}
