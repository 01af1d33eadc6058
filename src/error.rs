//! Error types for the edgequake-newsbrief library.
//!
//! Two error types reflect the two places failures come from:
//!
//! * [`PipelineError`]: everything that can go wrong while a job runs.
//!   A fatal variant moves the job to `failed` and the message becomes the
//!   status message polled by callers. [`PipelineError::MalformedResponse`]
//!   is the one non-fatal variant: the classifier downgrades it to an empty
//!   subject map and never lets it escape.
//!
//! * [`StorageError`]: returned by [`crate::storage::Repository`]
//!   implementations. The persister wraps it in
//!   [`PipelineError::Persistence`].
//!
//! [`ErrorKind`] groups the variants into the five families a service layer
//! reports on (extraction, configuration, parse, render, persistence).

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced while running a newspaper job.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Extraction ────────────────────────────────────────────────────────
    /// The source document could not be read from the file store.
    #[error("Cannot read source document '{path}': {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The source bytes are not a loadable PDF container.
    #[error("Source document '{path}' is not a readable PDF: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    // ── Summarization ─────────────────────────────────────────────────────
    /// No usable summarization credential or provider.
    #[error("Summarization provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The model answered, but not with a JSON object of subject → brief.
    #[error("Summarization response is not a subject map: {detail}")]
    MalformedResponse { detail: String },

    /// The summarization call itself failed or timed out.
    #[error("Summarization request failed: {message}")]
    SummarizationFailed { message: String },

    // ── Rendering ─────────────────────────────────────────────────────────
    /// pdfium could not lay out or serialise the brief document.
    #[error("Failed to render brief '{title}': {detail}")]
    RenderFailed { title: String, detail: String },

    /// The rendered brief could not be written to its artifact path.
    #[error("Failed to write brief artifact '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Persistence ───────────────────────────────────────────────────────
    /// The storage collaborator rejected a read or write.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StorageError),

    // ── Environment ───────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The pdfium shared library could not be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumUnavailable(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure families reported to status pollers and service layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Extraction,
    Configuration,
    Parse,
    Summarization,
    Render,
    Persistence,
    Internal,
}

impl PipelineError {
    /// The failure family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::SourceUnreadable { .. } | PipelineError::CorruptPdf { .. } => {
                ErrorKind::Extraction
            }
            PipelineError::ProviderNotConfigured { .. } | PipelineError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            PipelineError::MalformedResponse { .. } => ErrorKind::Parse,
            PipelineError::SummarizationFailed { .. } => ErrorKind::Summarization,
            PipelineError::RenderFailed { .. } | PipelineError::ArtifactWriteFailed { .. } => {
                ErrorKind::Render
            }
            PipelineError::Persistence(_) => ErrorKind::Persistence,
            PipelineError::PdfiumUnavailable(_) | PipelineError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Whether this error must abort the running job.
    pub fn is_fatal(&self) -> bool {
        self.kind() != ErrorKind::Parse
    }
}

/// Errors returned by [`crate::storage::Repository`] implementations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("subject '{0}' does not exist")]
    SubjectNotFound(String),

    #[error("no subjects are registered")]
    NoSubjects,

    #[error("storage backend error: {0}")]
    Backend(String),
}
