//! Error types for the printer library

use thiserror::Error;

/// Printer error types
///
/// One variant per pipeline stage. Callers that face end users are expected to
/// collapse these into a generic failure and log the detail.
#[derive(Debug, Error)]
pub enum PrintError {
    /// Missing, malformed or non-image payload
    #[error("Decode error: {0}")]
    Decode(String),

    /// Image could not be normalized to the paper resolution
    #[error("Resize error: {0}")]
    Resize(String),

    /// PDF document could not be built or serialized
    #[error("PDF build error: {0}")]
    PdfBuild(String),

    /// Host OS has no known print command
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Print command failed to spawn, timed out or exited nonzero
    #[error("Print command error: {message}")]
    PrintCommand {
        message: String,
        /// Exit code, when the process ran to completion
        exit_code: Option<i32>,
    },

    /// IO error while persisting job files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PrintError {
    /// Short machine-readable kind, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            PrintError::Decode(_) => "decode",
            PrintError::Resize(_) => "resize",
            PrintError::PdfBuild(_) => "pdf_build",
            PrintError::UnsupportedPlatform(_) => "unsupported_platform",
            PrintError::PrintCommand { .. } => "print_command",
            PrintError::Io(_) => "io",
        }
    }

    /// Print command error without an exit code (spawn failure, timeout)
    pub fn command(message: impl Into<String>) -> Self {
        PrintError::PrintCommand {
            message: message.into(),
            exit_code: None,
        }
    }
}

impl From<lopdf::Error> for PrintError {
    fn from(e: lopdf::Error) -> Self {
        PrintError::PdfBuild(e.to_string())
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
