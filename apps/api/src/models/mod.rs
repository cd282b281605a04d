pub mod conversation;
pub mod document;
