//! Requirements-list editing via free-text instructions.
//!
//! The model is asked for the complete updated list, a blank line, then a
//! one-line change summary. Real replies do not always honor the blank-line
//! boundary, so parsing does not depend on it: every bullet line anywhere in
//! the reply forms the new list, and the summary is the first non-empty,
//! non-bullet line after the final bullet. A reply with no bullets at all is
//! rejected and the current list is left untouched — the caller only commits
//! the new list on a successful parse.

use serde::Serialize;

use crate::mistral::{LlmClient, LlmError};
use crate::prompts;
use crate::requirements::RequirementsList;

/// Fallback summary when the reply omits its summary line.
const DEFAULT_SUMMARY: &str = "Updated the requirements list.";

/// Kind of change, classified from the summary line's leading verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EditOp {
    Add,
    Remove,
    Update,
}

/// Result of a successful edit: the full replacement list plus a summary.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub op: EditOp,
    pub summary: String,
    pub requirements: RequirementsList,
}

/// Apply a free-text edit instruction to the current list.
///
/// On success the returned list replaces the session's list wholesale.
/// On a parse failure (`InvalidResponse`) the current list is unchanged.
pub async fn apply_edit(
    llm: &dyn LlmClient,
    instruction: &str,
    current: &RequirementsList,
) -> Result<EditOutcome, LlmError> {
    let reply = llm
        .complete(&prompts::edit_messages(instruction, &current.to_markdown()))
        .await?;

    parse_edit_reply(&reply)
}

/// Parse the model's two-part edit reply.
fn parse_edit_reply(reply: &str) -> Result<EditOutcome, LlmError> {
    let requirements = RequirementsList::parse_bullets(reply);
    if requirements.is_empty() {
        return Err(LlmError::InvalidResponse(
            "edit reply contained no requirement bullets".to_string(),
        ));
    }

    let summary = summary_line(reply).unwrap_or_else(|| DEFAULT_SUMMARY.to_string());
    let op = classify_op(&summary);

    Ok(EditOutcome {
        op,
        summary,
        requirements,
    })
}

/// First non-empty, non-bullet line after the final bullet line.
fn summary_line(reply: &str) -> Option<String> {
    let lines: Vec<&str> = reply.lines().collect();
    let last_bullet = lines
        .iter()
        .rposition(|line| line.trim().starts_with('-'))?;

    lines[last_bullet + 1..]
        .iter()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .map(|line| line.to_string())
}

fn classify_op(summary: &str) -> EditOp {
    let lower = summary.to_lowercase();
    if lower.starts_with("add") {
        EditOp::Add
    } else if lower.starts_with("remov") || lower.starts_with("delet") {
        EditOp::Remove
    } else {
        EditOp::Update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list_and_summary() {
        let reply = "- **Cost**: Breakdown required.\n- **Timeline**: Milestones.\n\n\
                     Added: Timeline requirement.";
        let outcome = parse_edit_reply(reply).unwrap();
        assert_eq!(outcome.requirements.len(), 2);
        assert_eq!(outcome.summary, "Added: Timeline requirement.");
        assert_eq!(outcome.op, EditOp::Add);
    }

    #[test]
    fn missing_boundary_still_parses() {
        // No blank line between the list and the summary.
        let reply = "- **Cost**: Breakdown required.\nRemoved: the staffing entry.";
        let outcome = parse_edit_reply(reply).unwrap();
        assert_eq!(outcome.requirements.len(), 1);
        assert_eq!(outcome.op, EditOp::Remove);
    }

    #[test]
    fn stray_blank_lines_inside_list_are_harmless() {
        let reply = "- **A**: one.\n\n- **B**: two.\n\nUpdated: description of A.";
        let outcome = parse_edit_reply(reply).unwrap();
        assert_eq!(outcome.requirements.len(), 2);
        assert_eq!(outcome.op, EditOp::Update);
    }

    #[test]
    fn missing_summary_uses_fallback() {
        let reply = "- **A**: one.\n- **B**: two.";
        let outcome = parse_edit_reply(reply).unwrap();
        assert_eq!(outcome.summary, DEFAULT_SUMMARY);
        assert_eq!(outcome.op, EditOp::Update);
    }

    #[test]
    fn preamble_before_bullets_is_ignored() {
        let reply = "Here is the updated list:\n- **A**: one.\n\nAdded: A.";
        let outcome = parse_edit_reply(reply).unwrap();
        assert_eq!(outcome.requirements.len(), 1);
        assert_eq!(outcome.summary, "Added: A.");
    }

    #[test]
    fn reply_without_bullets_is_rejected() {
        let err = parse_edit_reply("I cannot do that.").unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn op_classification_by_leading_verb() {
        assert_eq!(classify_op("Added: X"), EditOp::Add);
        assert_eq!(classify_op("Removed: Y"), EditOp::Remove);
        assert_eq!(classify_op("Deleted: Y"), EditOp::Remove);
        assert_eq!(classify_op("Updated: Z"), EditOp::Update);
        assert_eq!(classify_op("Renamed: Z"), EditOp::Update);
    }
}
