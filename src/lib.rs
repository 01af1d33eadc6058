//! # edgequake-newsbrief
//!
//! Turn a day's newspaper PDF into subject-wise briefs using an LLM.
//!
//! ## Why this crate?
//!
//! Exam aspirants read the same newspaper every morning and file what they
//! read under syllabus subjects (Economy, Environment, Polity, …). This crate
//! does the filing: it extracts the edition's text, asks a model which
//! subjects the day covers, renders one short PDF brief per subject, and
//! stores each brief as an Article linked to its subject.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Job (uploaded PDF)
//!  │
//!  ├─ 1. Extract    pdfium text layer (CPU-bound, spawn_blocking)     10%
//!  ├─ 2. Summarize  one LLM call → {"Economy": "- …", …}              40%
//!  ├─ 3. Render     A4 PDF per brief → summaries/<date>/<slug>.pdf    70%
//!  └─ 4. Persist    Article per brief + subject article count        100%
//! ```
//!
//! Jobs run one at a time through a [`JobQueue`]; the status of the most
//! recently started job can be polled or watched as a stream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_newsbrief::{Job, JobQueue, MemoryRepository, Pipeline, PipelineConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Summarization credential is read from GEMINI_API_KEY by default
//!     let config = PipelineConfig::builder().uploads_dir("uploads").build()?;
//!     let repository = Arc::new(MemoryRepository::new());
//!     let queue = JobQueue::start(Pipeline::new(config, repository.clone()));
//!
//!     let id = queue.enqueue(Job::new("np-1", "The Hindu", "2024-03-01", "hindu.pdf"))?;
//!     queue.shutdown().await?;
//!     eprintln!("{id}: {} articles", repository.articles().await.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `newsbrief` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-newsbrief = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod engine;
pub mod error;
pub mod files;
pub mod pipeline;
pub mod process;
pub mod prompts;
pub mod queue;
pub mod status;
pub mod storage;
pub mod types;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder, UnmatchedSubjectPolicy};
pub use error::{ErrorKind, PipelineError, StorageError};
pub use files::{FileStore, LocalFileStore};
pub use pipeline::classify::{LlmSummaryModel, SummaryModel};
pub use pipeline::extract::{PdfTextExtractor, TextExtractor};
pub use pipeline::render::{ArtifactRenderer, PdfArtifactRenderer, RenderedArtifact};
pub use process::{JobOutcome, Pipeline};
pub use prompts::PromptPart;
pub use queue::{JobHandle, JobQueue};
pub use status::{JobState, JobStatus, NoopProgress, ProgressReporter, Stage, StatusTracker};
pub use storage::{MemoryRepository, Repository};
pub use types::{Article, Job, NewArticle, Subject, SubjectBrief};
