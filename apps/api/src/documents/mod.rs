// Document ingestion, retrieval and re-analysis.

pub mod handlers;
pub mod pipeline;
pub mod repository;
pub mod storage;
