//! Error types for the Ultron core.
//!
//! Neither error is fatal to a session. The session controller recovers from
//! both locally: extraction failures leave the session untouched, completion
//! failures become a fallback reply.

use thiserror::Error;

/// Failure to turn an uploaded document into text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The upload is not a PDF (by declared MIME type)
    #[error("Unsupported document type: {0}")]
    UnsupportedType(String),

    /// The bytes could not be parsed as a PDF document
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// A page exists but its content could not be decoded
    #[error("Failed to decode page {page}: {reason}")]
    PageDecode { page: u32, reason: String },

    /// Reading the document from disk failed
    #[error("IO error: {0}")]
    Io(String),

    /// The background extraction task panicked or was cancelled
    #[error("Extraction task failed: {0}")]
    Join(String),
}

impl From<std::io::Error> for ExtractionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Failure to obtain a reply from the generation backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Connection, TLS, or body read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body was not valid JSON
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No credential is available for the backend
    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

impl From<reqwest::Error> for CompletionError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
