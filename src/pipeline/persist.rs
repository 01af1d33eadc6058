//! Record persistence: rendered brief → Article, plus subject bookkeeping.

use crate::config::UnmatchedSubjectPolicy;
use crate::error::{PipelineError, StorageError};
use crate::storage::Repository;
use crate::types::{Article, Job, NewArticle, Subject, SubjectBrief};
use tracing::{debug, warn};

/// Assumed reading speed for the read-time estimate.
pub const WORDS_PER_MINUTE: usize = 200;

/// Files briefs under subjects and writes Article records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordPersister {
    policy: UnmatchedSubjectPolicy,
}

impl RecordPersister {
    pub fn new(policy: UnmatchedSubjectPolicy) -> Self {
        Self { policy }
    }

    /// Find the subject a brief belongs to.
    ///
    /// Returns `Ok(None)` when the brief should be dropped. The subject list
    /// is read fresh so a subject created mid-job is visible immediately.
    pub async fn resolve(
        &self,
        repository: &dyn Repository,
        subject_name: &str,
    ) -> Result<Option<Subject>, PipelineError> {
        let subjects = repository.list_subjects().await?;
        Ok(resolve_subject(&subjects, subject_name, self.policy)?.cloned())
    }

    /// Create the Article for one brief and refresh the subject's count.
    pub async fn persist(
        &self,
        repository: &dyn Repository,
        job: &Job,
        subject: &Subject,
        brief: &SubjectBrief,
        pdf_path: &str,
        page_count: u32,
    ) -> Result<Article, PipelineError> {
        let article = repository
            .create_article(NewArticle {
                subject_id: subject.id.clone(),
                newspaper_id: job.newspaper_id.clone(),
                title: article_title(&brief.subject, &job.date),
                content: brief.body.clone(),
                summary: brief.body.clone(),
                date: job.date.clone(),
                pdf_path: Some(pdf_path.to_string()),
                page_count,
                read_time: estimate_read_time(&brief.body),
            })
            .await?;

        let count = repository.count_articles_for_subject(&subject.id).await?;
        repository
            .update_subject_article_count(&subject.id, count)
            .await?;

        debug!(
            "Stored article {} under '{}' ({} total)",
            article.id, subject.name, count
        );
        Ok(article)
    }
}

/// Case-insensitive exact name match, then the policy's fallback.
pub fn resolve_subject<'a>(
    subjects: &'a [Subject],
    name: &str,
    policy: UnmatchedSubjectPolicy,
) -> Result<Option<&'a Subject>, StorageError> {
    let wanted = name.trim().to_lowercase();
    if let Some(found) = subjects.iter().find(|s| s.name.to_lowercase() == wanted) {
        return Ok(Some(found));
    }

    match policy {
        UnmatchedSubjectPolicy::Skip => {
            warn!("No subject named '{}'; skipping brief", name);
            Ok(None)
        }
        UnmatchedSubjectPolicy::AssignToFirst => {
            let first = subjects.first().ok_or(StorageError::NoSubjects)?;
            warn!("No subject named '{}'; filing under '{}'", name, first.name);
            Ok(Some(first))
        }
    }
}

/// `"<Subject> Summary (<date>)"`.
pub fn article_title(subject: &str, date: &str) -> String {
    format!("{} Summary ({})", subject, date)
}

/// `"<Subject> - <date>"`, the heading printed on the artifact.
pub fn artifact_heading(subject: &str, date: &str) -> String {
    format!("{} - {}", subject, date)
}

/// Whole minutes at [`WORDS_PER_MINUTE`], rounded up, never below one.
pub fn estimate_read_time(body: &str) -> u32 {
    let words = body.split_whitespace().count();
    words.div_ceil(WORDS_PER_MINUTE).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryRepository;

    fn subject(name: &str) -> Subject {
        Subject {
            id: format!("id-{}", name.to_lowercase()),
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            article_count: 0,
        }
    }

    #[test]
    fn match_is_case_insensitive() {
        let subjects = vec![subject("Economy"), subject("Environment")];
        let found = resolve_subject(&subjects, "  environment ", UnmatchedSubjectPolicy::Skip)
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "Environment");
    }

    #[test]
    fn unmatched_follows_policy() {
        let subjects = vec![subject("Economy"), subject("Environment")];
        let first = resolve_subject(&subjects, "Astrology", UnmatchedSubjectPolicy::AssignToFirst)
            .unwrap()
            .unwrap();
        assert_eq!(first.name, "Economy");

        assert!(resolve_subject(&subjects, "Astrology", UnmatchedSubjectPolicy::Skip)
            .unwrap()
            .is_none());
    }

    #[test]
    fn no_subjects_is_an_error_when_falling_back() {
        assert_eq!(
            resolve_subject(&[], "Economy", UnmatchedSubjectPolicy::AssignToFirst).unwrap_err(),
            StorageError::NoSubjects
        );
        assert!(resolve_subject(&[], "Economy", UnmatchedSubjectPolicy::Skip)
            .unwrap()
            .is_none());
    }

    #[test]
    fn read_time_rounds_up() {
        assert_eq!(estimate_read_time(""), 1);
        assert_eq!(estimate_read_time("one two three"), 1);
        assert_eq!(estimate_read_time(&"w ".repeat(200)), 1);
        assert_eq!(estimate_read_time(&"w ".repeat(201)), 2);
    }

    #[test]
    fn titles() {
        assert_eq!(article_title("Economy", "2024-03-01"), "Economy Summary (2024-03-01)");
        assert_eq!(artifact_heading("Economy", "2024-03-01"), "Economy - 2024-03-01");
    }

    #[tokio::test]
    async fn persist_creates_article_and_refreshes_count() {
        let repo = MemoryRepository::new();
        let persister = RecordPersister::default();
        let job = Job::new("np-1", "The Hindu", "2024-03-01", "uploads/hindu.pdf");
        let brief = SubjectBrief::new("economy", "- RBI holds repo rate");

        let economy = persister.resolve(&repo, &brief.subject).await.unwrap().unwrap();
        let article = persister
            .persist(&repo, &job, &economy, &brief, "summaries/2024-03-01/economy.pdf", 2)
            .await
            .unwrap();

        assert_eq!(article.subject_id, economy.id);
        assert_eq!(article.newspaper_id, "np-1");
        assert_eq!(article.title, "economy Summary (2024-03-01)");
        assert_eq!(article.content, article.summary);
        assert_eq!(article.pdf_path.as_deref(), Some("summaries/2024-03-01/economy.pdf"));
        assert_eq!(article.page_count, 2);
        assert_eq!(article.read_time, 1);

        let refreshed = repo.subject_by_id(&economy.id).await.unwrap();
        assert_eq!(refreshed.article_count, 1);
    }
}
