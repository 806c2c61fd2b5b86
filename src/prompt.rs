//! Prompt templates for the answer flow.

/// Exact answer the model is instructed to give when the retrieved
/// context does not contain the information. Also returned verbatim by
/// the orchestrator when generation is unavailable.
pub const FALLBACK_ANSWER: &str = "I don't have enough information to answer \
     this question based on the provided documents.";

/// System message sent ahead of every grounded question.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers \
     questions based on provided context.";

/// Build the grounding prompt: the retrieved context, the question, and
/// the instruction to answer from the context alone or fall back to the
/// exact refusal sentence.
pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are a helpful assistant. Use ONLY the context below to answer \
         the question.\n\
         If the answer is not in the context, say exactly:\n\
         \"{FALLBACK_ANSWER}\"\n\n\
         ---------------------\n\
         CONTEXT:\n\
         {context}\n\
         ---------------------\n\n\
         QUESTION: {query}\n\
         ANSWER:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_fallback_instruction() {
        let prompt = build_prompt("q", "c");
        assert!(prompt.contains(FALLBACK_ANSWER));
    }

    #[test]
    fn prompt_contains_question_and_context_verbatim() {
        let prompt = build_prompt(
            "What color is the sky?",
            "The sky is blue on clear days.",
        );

        assert!(prompt.contains("QUESTION: What color is the sky?"));
        assert!(prompt.contains("CONTEXT:\nThe sky is blue on clear days."));
        assert!(prompt.ends_with("ANSWER:"));
    }
}
