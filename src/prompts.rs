//! Prompt templates for the router, extractor, editor, and answerer.
//!
//! All provider interaction goes through these builders so the exact wording
//! lives in one place. The parsers in [`crate::requirements`] and
//! [`crate::editor`] depend on the output contracts stated here.

use crate::mistral::ChatMessage;

/// Fixed refusal string the answerer must return verbatim when the retrieved
/// context does not contain the answer. Public so tests can assert on it.
pub const REFUSAL_ANSWER: &str =
    "I could not find the answer to that question in the uploaded document.";

/// Classify a chat message as an edit instruction or a question.
///
/// The model must reply with exactly one token, `EDIT` or `QUESTION`.
pub fn router_messages(message: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You classify user messages for an RFI assistant. Reply with exactly one word: \
             EDIT if the message asks to change the requirements list (add, remove, rename, \
             merge, or rewrite entries), or QUESTION if it asks for information from the \
             document. Reply with nothing else.",
        ),
        ChatMessage::user("Add a requirement about cost analysis"),
        ChatMessage::assistant("EDIT"),
        ChatMessage::user("Remove the section on staffing plans"),
        ChatMessage::assistant("EDIT"),
        ChatMessage::user("What is the RFI deadline?"),
        ChatMessage::assistant("QUESTION"),
        ChatMessage::user("Who is the point of contact for submissions?"),
        ChatMessage::assistant("QUESTION"),
        ChatMessage::user(message.to_string()),
    ]
}

/// Derive the initial requirements list from the full document text.
pub fn extraction_messages(document_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You analyze government Request-for-Information (RFI) documents. From the \
             document, derive the list of requirements a good vendor submission should \
             address. Respond with only a bullet list, one requirement per line, in the \
             exact format:\n- **Heading**: Description\nDo not add any other text.",
        ),
        ChatMessage::user(format!("Document:\n\n{}", document_text)),
    ]
}

/// Rewrite the full requirements list per a free-text edit instruction.
///
/// Output contract (parsed by [`crate::editor`]): the complete updated list
/// in the same bullet format, then a blank line, then a single summary line
/// starting with `Added:`, `Removed:`, or `Updated:`.
pub fn edit_messages(instruction: &str, formatted_list: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(
            "You maintain a requirements list for an RFI submission. Apply the user's \
             instruction to the current list and respond in exactly two parts:\n\
             1. The complete updated list, one entry per line, in the format \
             `- **Heading**: Description`. Keep every entry the instruction does not \
             change.\n\
             2. After a single blank line, one summary line starting with `Added:`, \
             `Removed:`, or `Updated:` naming what changed.\n\
             Respond with nothing else.",
        ),
        ChatMessage::user(format!(
            "Current requirements:\n{}\n\nInstruction: {}",
            formatted_list, instruction
        )),
    ]
}

/// Answer a question strictly from retrieved document context.
pub fn answer_messages(context: &str, question: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(format!(
            "You answer questions about an uploaded RFI document. Use only the excerpts \
             provided below; do not rely on outside knowledge. Cite page numbers when \
             they appear in the excerpt headers. If the excerpts do not contain the \
             answer, reply with exactly: {}",
            REFUSAL_ANSWER
        )),
        ChatMessage::user(format!(
            "Document excerpts:\n\n{}\n\nQuestion: {}",
            context, question
        )),
    ]
}
