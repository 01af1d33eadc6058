//! Single-job pipeline run: source document → briefs → artifacts → Articles.
//!
//! [`Pipeline::run`] is what the queue's worker calls for every job. It can
//! also be called directly (with [`crate::status::NoopProgress`]) when a
//! caller wants to process one document without queueing.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::files::{FileStore, LocalFileStore};
use crate::pipeline::classify::SubjectClassifier;
use crate::pipeline::extract::{resolve_source, PdfTextExtractor, TextExtractor};
use crate::pipeline::persist::{artifact_heading, RecordPersister};
use crate::pipeline::render::{artifact_path, ArtifactRenderer, PdfArtifactRenderer};
use crate::status::{ProgressReporter, Stage};
use crate::storage::Repository;
use crate::types::{Article, Job};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What a completed run produced.
#[derive(Debug, Clone, Default)]
pub struct JobOutcome {
    /// Articles created, in the order the model listed their subjects.
    pub articles: Vec<Article>,
    /// Briefs dropped because no subject matched them.
    pub skipped_briefs: usize,
    pub duration_ms: u64,
}

/// The four stages wired to their collaborators.
pub struct Pipeline {
    config: PipelineConfig,
    classifier: SubjectClassifier,
    persister: RecordPersister,
    extractor: Arc<dyn TextExtractor>,
    renderer: Arc<dyn ArtifactRenderer>,
    files: Arc<dyn FileStore>,
    repository: Arc<dyn Repository>,
}

impl Pipeline {
    /// Pipeline with pdfium extraction and rendering on the local file system.
    pub fn new(config: PipelineConfig, repository: Arc<dyn Repository>) -> Self {
        Self {
            classifier: SubjectClassifier::new(config.clone()),
            persister: RecordPersister::new(config.unmatched_subject),
            extractor: Arc::new(PdfTextExtractor),
            renderer: Arc::new(PdfArtifactRenderer),
            files: Arc::new(LocalFileStore),
            repository,
            config,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ArtifactRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_file_store(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = files;
        self
    }

    /// Run one job end to end.
    ///
    /// Stages are reported to `progress` as they start. An error from any
    /// stage aborts the run; briefs already rendered and persisted before the
    /// failure stay in place.
    pub async fn run(
        &self,
        job: &Job,
        progress: &dyn ProgressReporter,
    ) -> Result<JobOutcome, PipelineError> {
        let start = Instant::now();
        let repository = self.repository.as_ref();
        info!("Processing '{}' ({}) for {}", job.name, job.newspaper_id, job.date);

        // ── Step 1: Extract ──────────────────────────────────────────────
        progress.report_stage(Stage::Extracting);
        if job.mime_type != "application/pdf" {
            warn!("Job declares mime type '{}', expecting a PDF", job.mime_type);
        }
        let source = resolve_source(&self.config.uploads_dir, &job.file_path)?;
        let bytes = self
            .files
            .read_file(&source)
            .await
            .map_err(|e| PipelineError::SourceUnreadable {
                path: source.clone(),
                source: e,
            })?;
        let text = self.extractor.extract_text(&source, bytes).await?;

        // ── Step 2: Summarize ────────────────────────────────────────────
        progress.report_stage(Stage::Summarizing);
        let briefs = self.classifier.classify(&text, &job.date, repository).await?;

        // ── Step 3: Render + persist, one brief at a time ────────────────
        progress.report_stage(Stage::Rendering);
        let mut outcome = JobOutcome::default();

        for brief in &briefs {
            let Some(subject) = self.persister.resolve(repository, &brief.subject).await? else {
                outcome.skipped_briefs += 1;
                continue;
            };

            let artifact = artifact_path(self.config.output_root(), &job.date, &brief.subject);
            let write_err = |e: std::io::Error| PipelineError::ArtifactWriteFailed {
                path: artifact.absolute.clone(),
                source: e,
            };

            self.files.ensure_dir(artifact.dir()).await.map_err(write_err)?;
            let rendered = self
                .renderer
                .render(&artifact_heading(&brief.subject, &job.date), &brief.body)
                .await?;
            self.files
                .write_file(&artifact.absolute, &rendered.bytes)
                .await
                .map_err(write_err)?;
            debug!("Wrote {}", artifact.absolute.display());

            let article = self
                .persister
                .persist(
                    repository,
                    job,
                    &subject,
                    brief,
                    &artifact.relative,
                    rendered.page_count,
                )
                .await?;
            outcome.articles.push(article);
        }

        outcome.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Finished '{}': {} articles, {} briefs skipped, {}ms",
            job.name,
            outcome.articles.len(),
            outcome.skipped_briefs,
            outcome.duration_ms
        );
        Ok(outcome)
    }
}
