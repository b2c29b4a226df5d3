//! Requirements list: an ordered heading→description mapping plus the
//! parser for the model's bullet output.
//!
//! The model is asked to emit `- **Heading**: Description` lines. Parsing is
//! line-oriented: only lines starting with `-` count, bold markers are
//! stripped, and the line is split once on the first `:`. Lines without a
//! colon or with an empty heading are dropped. Re-inserting an existing
//! heading replaces its description in place (last write wins), preserving
//! the original position.

use crate::mistral::{LlmClient, LlmError};
use crate::models::RequirementEntry;
use crate::prompts;

/// Ordered mapping from heading to description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequirementsList {
    entries: Vec<RequirementEntry>,
}

impl RequirementsList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RequirementEntry] {
        &self.entries
    }

    pub fn get(&self, heading: &str) -> Option<&RequirementEntry> {
        self.entries.iter().find(|e| e.heading == heading)
    }

    /// Insert or replace an entry. An existing heading keeps its position;
    /// a new heading is appended.
    pub fn upsert(&mut self, heading: String, description: String) {
        match self.entries.iter_mut().find(|e| e.heading == heading) {
            Some(entry) => entry.description = description,
            None => self.entries.push(RequirementEntry {
                heading,
                description,
            }),
        }
    }

    /// Parse bullet lines into a list. Non-bullet lines are ignored.
    pub fn parse_bullets(text: &str) -> Self {
        let mut list = Self::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if !trimmed.starts_with('-') {
                continue;
            }
            let rest = trimmed.trim_start_matches('-').trim();
            let rest = rest.replace("**", "");
            let Some((heading, description)) = rest.split_once(':') else {
                continue;
            };
            let heading = heading.trim();
            if heading.is_empty() {
                continue;
            }
            list.upsert(heading.to_string(), description.trim().to_string());
        }
        list
    }

    /// Render the list back into the bullet format the model is prompted
    /// with. Also serves as the upload summary shown to the client.
    pub fn to_markdown(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("- **{}**: {}", e.heading, e.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Ask the model for the document's requirements list.
///
/// A reply with no parseable bullets is rejected as an invalid response
/// rather than silently producing an empty list.
pub async fn extract_requirements(
    llm: &dyn LlmClient,
    document_text: &str,
) -> Result<RequirementsList, LlmError> {
    let reply = llm
        .complete(&prompts::extraction_messages(document_text))
        .await?;

    let list = RequirementsList::parse_bullets(&reply);
    if list.is_empty() {
        return Err(LlmError::InvalidResponse(
            "extraction reply contained no requirement bullets".to_string(),
        ));
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_bullets() {
        let text = "- **Cost Analysis**: Provide a detailed cost breakdown.\n\
                    - **Timeline**: Describe delivery milestones.";
        let list = RequirementsList::parse_bullets(text);
        assert_eq!(list.len(), 2);
        assert_eq!(list.entries()[0].heading, "Cost Analysis");
        assert_eq!(
            list.entries()[0].description,
            "Provide a detailed cost breakdown."
        );
    }

    #[test]
    fn splits_on_first_colon_only() {
        let list = RequirementsList::parse_bullets("- **Schedule**: Phase 1: design, Phase 2: build");
        assert_eq!(list.entries()[0].heading, "Schedule");
        assert_eq!(
            list.entries()[0].description,
            "Phase 1: design, Phase 2: build"
        );
    }

    #[test]
    fn ignores_non_bullet_and_malformed_lines() {
        let text = "Here is the list:\n- no colon here\n- **Valid**: yes\n  continuation line";
        let list = RequirementsList::parse_bullets(text);
        assert_eq!(list.len(), 1);
        assert_eq!(list.entries()[0].heading, "Valid");
    }

    #[test]
    fn drops_empty_headings() {
        let list = RequirementsList::parse_bullets("- : dangling description");
        assert!(list.is_empty());
    }

    #[test]
    fn last_write_wins_keeps_position() {
        let text = "- **A**: first\n- **B**: middle\n- **A**: second";
        let list = RequirementsList::parse_bullets(text);
        assert_eq!(list.len(), 2);
        assert_eq!(list.entries()[0].heading, "A");
        assert_eq!(list.entries()[0].description, "second");
        assert_eq!(list.entries()[1].heading, "B");
    }

    #[test]
    fn markdown_round_trips() {
        let text = "- **Security**: FedRAMP authorization required.\n- **Support**: 24/7 help desk.";
        let list = RequirementsList::parse_bullets(text);
        assert_eq!(list.to_markdown(), text);
        assert_eq!(RequirementsList::parse_bullets(&list.to_markdown()), list);
    }
}
