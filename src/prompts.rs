//! Prompts for the subject classification call.
//!
//! Kept out of [`crate::pipeline::classify`] so prompt wording can change
//! without touching parsing or error handling, and so tests can inspect the
//! exact text sent to the model.

use crate::types::Subject;

/// Default instruction for turning a day's newspaper into subject briefs.
///
/// Placeholders: `{date}` and `{subjects}` (one `- <name>` line per subject).
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an analyst creating UPSC subject-wise briefs. Given the raw newspaper text, extract concise bullets per subject only if relevant. Date: {date}.
Subjects:
{subjects}
Return a strict JSON object mapping subject name to a short markdown summary (<= 10 bullets). Only include subjects that are genuinely covered by the text. Example: {"Economy":"- bullet...","Environment":"- bullet..."}"#;

/// One part of a multi-part prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    /// Instructions for the model.
    Instruction(String),
    /// Document text the instructions apply to.
    Document(String),
}

impl PromptPart {
    pub fn text(&self) -> &str {
        match self {
            PromptPart::Instruction(t) | PromptPart::Document(t) => t,
        }
    }
}

/// Render the `- <name>` subject list.
pub fn subject_list(subjects: &[Subject]) -> String {
    subjects
        .iter()
        .map(|s| format!("- {}", s.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the two-part briefing prompt: instructions, then the newspaper text.
pub fn briefing_prompt(
    template: Option<&str>,
    date: &str,
    subjects: &[Subject],
    text: &str,
) -> Vec<PromptPart> {
    let instruction = template
        .unwrap_or(DEFAULT_SYSTEM_PROMPT)
        .replace("{date}", date)
        .replace("{subjects}", &subject_list(subjects));
    vec![
        PromptPart::Instruction(instruction),
        PromptPart::Document(text.to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject(name: &str) -> Subject {
        Subject {
            id: name.to_lowercase(),
            name: name.to_string(),
            slug: name.to_lowercase(),
            description: None,
            article_count: 0,
        }
    }

    #[test]
    fn prompt_names_date_and_every_subject() {
        let parts = briefing_prompt(
            None,
            "2024-03-01",
            &[subject("Economy"), subject("Environment")],
            "RBI holds repo rate",
        );
        assert_eq!(parts.len(), 2);
        let instruction = parts[0].text();
        assert!(instruction.contains("Date: 2024-03-01."));
        assert!(instruction.contains("- Economy\n- Environment"));
        assert!(instruction.contains("strict JSON object"));
        assert_eq!(parts[1], PromptPart::Document("RBI holds repo rate".into()));
    }

    #[test]
    fn custom_template_is_filled() {
        let parts = briefing_prompt(Some("{date}|{subjects}"), "d", &[subject("History")], "t");
        assert_eq!(parts[0].text(), "d|- History");
    }
}
