// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// Marker the model is told to end with; also sent as a hard stop sequence.
pub const STOP_MARKER: &str = "END_RESPONSE";

/// System prompt for single-value extraction queries.
pub const DIRECT_ANSWER_SYSTEM: &str =
    "You are a helpful assistant that analyzes resumes. Provide direct, concise answers.";

/// Builds the user message for a single-value extraction query over a document.
pub fn document_query(document_text: &str, query: &str) -> String {
    format!("Here is a resume:\n\n{document_text}\n\nQuestion: {query}")
}

/// Removes every echoed stop marker and surrounding whitespace.
pub fn strip_stop_marker(text: &str) -> String {
    text.replace(STOP_MARKER, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_stop_marker_trailing() {
        assert_eq!(strip_stop_marker("• Add metrics\nEND_RESPONSE"), "• Add metrics");
    }

    #[test]
    fn test_strip_stop_marker_absent() {
        assert_eq!(strip_stop_marker("  plain answer "), "plain answer");
    }

    #[test]
    fn test_strip_stop_marker_only_marker_is_empty() {
        assert!(strip_stop_marker("END_RESPONSE").is_empty());
    }

    #[test]
    fn test_document_query_embeds_text_and_question() {
        let q = document_query("Jane Doe\nPython", "What is it?");
        assert!(q.starts_with("Here is a resume:\n\nJane Doe\nPython"));
        assert!(q.ends_with("Question: What is it?"));
    }
}
