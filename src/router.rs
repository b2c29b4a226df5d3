//! Edit-versus-question classification of chat messages.
//!
//! One few-shot LLM call; the reply is compared exactly (after trimming)
//! against `EDIT`. Anything else — including a decorated `EDIT.` or a reply
//! with trailing text — routes to the question branch, which is the safe
//! default: a misrouted edit instruction yields an unhelpful answer, while a
//! misrouted question would mutate the requirements list.

use crate::mistral::{LlmClient, LlmError};
use crate::prompts;

/// Which pipeline a chat message should take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Edit,
    Question,
}

/// Classify a chat message via the router prompt.
pub async fn classify(llm: &dyn LlmClient, message: &str) -> Result<Route, LlmError> {
    let reply = llm.complete(&prompts::router_messages(message)).await?;
    if reply.trim() == "EDIT" {
        Ok(Route::Edit)
    } else {
        Ok(Route::Question)
    }
}
