//! Storage collaborator boundary.
//!
//! The pipeline never owns Article or Subject records: it reads subjects and
//! writes articles through [`Repository`]. [`MemoryRepository`] is the
//! in-process implementation used by the CLI and the tests; a service layer
//! plugs its database in by implementing the same trait.

use crate::error::StorageError;
use crate::types::{Article, NewArticle, Subject};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// The narrow interface the pipeline needs from persistent storage.
///
/// Reads issued right after a write in the same job must observe that write.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError>;

    async fn create_article(&self, article: NewArticle) -> Result<Article, StorageError>;

    async fn update_subject_article_count(
        &self,
        subject_id: &str,
        count: u32,
    ) -> Result<(), StorageError>;

    async fn count_articles_for_subject(&self, subject_id: &str) -> Result<u32, StorageError>;
}

/// Subjects every fresh [`MemoryRepository`] starts with.
pub const DEFAULT_SUBJECTS: &[(&str, &str, &str)] = &[
    ("Economy", "economy", "Economic policies, trade, budget, and financial matters"),
    ("Politics", "politics", "Political developments, governance, and policy decisions"),
    (
        "International Relations",
        "international-relations",
        "Foreign policy, diplomacy, and global affairs",
    ),
    (
        "Environment",
        "environment",
        "Environmental issues, climate change, and sustainability",
    ),
    (
        "Science & Technology",
        "science-technology",
        "Scientific developments and technological advances",
    ),
    ("Social Issues", "social-issues", "Society, culture, and social welfare matters"),
    ("History", "history", "Historical events and their contemporary relevance"),
    ("Geography", "geography", "Physical and human geography topics"),
    ("Current Affairs", "current-affairs", "General current affairs and miscellaneous news"),
];

#[derive(Default)]
struct Tables {
    subjects: Vec<Subject>,
    articles: Vec<Article>,
}

/// In-memory [`Repository`] keeping subjects in insertion order.
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    /// Repository seeded with [`DEFAULT_SUBJECTS`].
    pub fn new() -> Self {
        let subjects = DEFAULT_SUBJECTS
            .iter()
            .map(|(name, slug, description)| Subject {
                id: Uuid::new_v4().to_string(),
                name: name.to_string(),
                slug: slug.to_string(),
                description: Some(description.to_string()),
                article_count: 0,
            })
            .collect();
        Self::with_subjects(subjects)
    }

    /// Repository with exactly the given subjects and no articles.
    pub fn with_subjects(subjects: Vec<Subject>) -> Self {
        Self {
            tables: RwLock::new(Tables {
                subjects,
                articles: Vec::new(),
            }),
        }
    }

    pub async fn create_subject(
        &self,
        name: impl Into<String>,
        slug: impl Into<String>,
        description: Option<String>,
    ) -> Subject {
        let subject = Subject {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            slug: slug.into(),
            description,
            article_count: 0,
        };
        self.tables.write().await.subjects.push(subject.clone());
        subject
    }

    pub async fn subject_by_id(&self, id: &str) -> Option<Subject> {
        let tables = self.tables.read().await;
        tables.subjects.iter().find(|s| s.id == id).cloned()
    }

    pub async fn subject_by_slug(&self, slug: &str) -> Option<Subject> {
        let tables = self.tables.read().await;
        tables.subjects.iter().find(|s| s.slug == slug).cloned()
    }

    /// All articles, oldest first.
    pub async fn articles(&self) -> Vec<Article> {
        self.tables.read().await.articles.clone()
    }

    /// Articles filed under a subject, newest date first.
    pub async fn articles_for_subject(&self, subject_id: &str) -> Vec<Article> {
        let tables = self.tables.read().await;
        let mut found: Vec<Article> = tables
            .articles
            .iter()
            .filter(|a| a.subject_id == subject_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.date.cmp(&a.date));
        found
    }

    /// Articles produced for a processing date, newest first.
    pub async fn articles_by_date(&self, date: &str) -> Vec<Article> {
        let tables = self.tables.read().await;
        let mut found: Vec<Article> = tables
            .articles
            .iter()
            .filter(|a| a.date == date)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }

    /// Case-insensitive search over title, summary and content.
    pub async fn search_articles(&self, query: &str, subject_id: Option<&str>) -> Vec<Article> {
        let needle = query.to_lowercase();
        let tables = self.tables.read().await;
        let mut found: Vec<Article> = tables
            .articles
            .iter()
            .filter(|a| subject_id.map_or(true, |id| a.subject_id == id))
            .filter(|a| {
                a.title.to_lowercase().contains(&needle)
                    || a.summary.to_lowercase().contains(&needle)
                    || a.content.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_subjects(&self) -> Result<Vec<Subject>, StorageError> {
        Ok(self.tables.read().await.subjects.clone())
    }

    async fn create_article(&self, new: NewArticle) -> Result<Article, StorageError> {
        let mut tables = self.tables.write().await;
        if !tables.subjects.iter().any(|s| s.id == new.subject_id) {
            return Err(StorageError::SubjectNotFound(new.subject_id));
        }
        let article = Article {
            id: Uuid::new_v4().to_string(),
            subject_id: new.subject_id,
            newspaper_id: new.newspaper_id,
            title: new.title,
            content: new.content,
            summary: new.summary,
            date: new.date,
            pdf_path: new.pdf_path,
            page_count: new.page_count,
            read_time: new.read_time,
            created_at: Utc::now(),
        };
        tables.articles.push(article.clone());
        Ok(article)
    }

    async fn update_subject_article_count(
        &self,
        subject_id: &str,
        count: u32,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let subject = tables
            .subjects
            .iter_mut()
            .find(|s| s.id == subject_id)
            .ok_or_else(|| StorageError::SubjectNotFound(subject_id.to_string()))?;
        subject.article_count = count;
        Ok(())
    }

    async fn count_articles_for_subject(&self, subject_id: &str) -> Result<u32, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .articles
            .iter()
            .filter(|a| a.subject_id == subject_id)
            .count() as u32)
    }
}
