// Question answering over a stored document, grounded by recent conversation turns.
// All backend calls go through llm_client.

pub mod chat;
pub mod handlers;
pub mod history;
pub mod prompts;
