// Chat prompt templates.

use crate::llm_client::prompts::STOP_MARKER;
use crate::models::conversation::ConversationTurn;

pub const CHAT_SYSTEM: &str = "You are an AI assistant specialized in analyzing resumes and providing insights.
You can answer questions about the resume content, suggest improvements, and provide career advice based on the resume information.
Keep your responses professional, constructive, and focused on the resume content.
Due to token limits, you must:
• Prioritize the most important points first
• Be concise and direct in your suggestions
• Focus on 2-3 key improvements when asked about CV enhancements
• Use bullet points (•) without any numbering or headers
• Start each point directly with the suggestion
• Avoid lengthy explanations
End your response with END_RESPONSE when you've completed answering the current question.";

pub const QUESTION_INSTRUCTION: &str = "Provide a focused and complete response to this specific question only.
Keep your response within the token limit by being concise and direct.";

pub const IMPROVEMENT_INSTRUCTION: &str = "For CV improvements:
• List 2-3 most important suggestions using bullet points (•)
• Start each point directly with the action or improvement
• Do not use numbers or headers
• Be specific but brief
Example format:
• Add quantifiable achievements to work experience
• Include a technical skills section";

/// User message for a question. `history` is oldest first.
pub fn question_message(
    document_text: &str,
    history: &[ConversationTurn],
    question: &str,
    improvement: bool,
) -> String {
    let mut message = format!("Here is the resume content:\n{document_text}\n\n");

    if !history.is_empty() {
        message.push_str("Previous conversation:\n");
        for turn in history {
            message.push_str(&format!("Q: {}\nA: {}\n", turn.question, turn.answer));
        }
        message.push('\n');
    }

    message.push_str(&format!("Question: {question}\n\n{QUESTION_INSTRUCTION}\n"));
    if improvement {
        message.push_str(&format!("\n{IMPROVEMENT_INSTRUCTION}\n"));
    }
    message.push_str(&format!("\nEnd your response with {STOP_MARKER}."));
    message
}

/// User message for the whole-resume analysis.
pub fn analysis_message(document_text: &str) -> String {
    format!(
        "Please analyze this resume and provide a comprehensive evaluation covering:
1. Overall impression
2. Key strengths
3. Areas for improvement
4. Suggested enhancements

Resume content:
{document_text}"
    )
}
