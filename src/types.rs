//! Data types shared by the queue, the pipeline stages and the storage
//! collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One request to process a single newspaper document end to end.
///
/// Immutable once enqueued. The queue consumes it when its run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Identifier of the newspaper record that owns the document.
    pub newspaper_id: String,
    /// Display name of the document.
    pub name: String,
    /// Processing date as a calendar date string (`YYYY-MM-DD`).
    pub date: String,
    /// Where the uploaded source document was stored.
    pub file_path: String,
    /// MIME type reported at upload time.
    pub mime_type: String,
}

impl Job {
    pub fn new(
        newspaper_id: impl Into<String>,
        name: impl Into<String>,
        date: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            newspaper_id: newspaper_id.into(),
            name: name.into(),
            date: date.into(),
            file_path: file_path.into(),
            mime_type: "application/pdf".to_string(),
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }
}

/// A short subject-scoped summary produced by the classifier.
///
/// Transient: the [`Article`] is the durable form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectBrief {
    pub subject: String,
    pub body: String,
}

impl SubjectBrief {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// A subject briefs are filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub article_count: u32,
}

/// A persisted brief, linked to a subject and a newspaper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub subject_id: String,
    pub newspaper_id: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub date: String,
    /// Artifact path relative to the output directory.
    pub pdf_path: Option<String>,
    pub page_count: u32,
    /// Estimated reading time in minutes.
    pub read_time: u32,
    pub created_at: DateTime<Utc>,
}

/// Fields the pipeline supplies when creating an [`Article`].
///
/// The storage collaborator assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewArticle {
    pub subject_id: String,
    pub newspaper_id: String,
    pub title: String,
    pub content: String,
    pub summary: String,
    pub date: String,
    pub pdf_path: Option<String>,
    pub page_count: u32,
    pub read_time: u32,
}
