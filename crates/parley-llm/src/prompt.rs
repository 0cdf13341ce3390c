//! Prompt assembly for one-shot completions.
//!
//! Every completion request carries a single flat prompt: the persona
//! preamble, the serialized context pairs, and the current user message.
//! There is no chat-role structure on the wire; the rendered prompt is the
//! whole conversation as far as the model is concerned.

use parley_core::ContextPair;

/// Persona preamble used when no override is configured.
pub const DEFAULT_PERSONA: &str = "You are a helpful AI customer support agent. You should:
1. Be friendly, professional, and empathetic
2. Give clear and concise answers
3. Ask clarifying questions when needed
4. Say so honestly when you do not know something
5. Work to resolve the customer's issue efficiently
6. Keep replies natural and conversational
7. Respond in the user's language (Hindi or English)";

/// Render the full prompt for a completion request.
///
/// Context pairs are serialized oldest-first under a `Previous conversation:`
/// heading, each as a `User:` line followed by an `Assistant:` line. The
/// heading is present even when the context is empty.
pub fn build_prompt(persona: &str, context: &[ContextPair], user_message: &str) -> String {
    let mut history = String::new();
    for pair in context {
        history.push_str("User: ");
        history.push_str(&pair.user_message);
        history.push_str("\nAssistant: ");
        history.push_str(&pair.ai_response);
        history.push_str("\n\n");
    }
    format!("{persona}\n\nPrevious conversation:\n{history}\nCurrent user message: {user_message}")
}

// =============================================================================
// Tests
// =============================================================================
