// Fact extraction prompt templates.
// Both queries are answered against the full document text via `llm_client::prompts::document_query`.

pub const EDUCATION_QUERY: &str = "What is the highest education level mentioned in this resume? \
Respond with ONLY ONE of these exact values: High School, Associate's, Bachelor's, Master's, PhD. \
If none found, respond with High School.";

pub const EXPERIENCE_QUERY: &str = r#"Extract ALL full-time professional work experiences from the resume with their start and end dates.
Format your response EXACTLY as follows (one experience per line):
Company Name | Start Date (MM/YYYY) | End Date (MM/YYYY or PRESENT)

Rules:
- Only include full-time professional roles
- Skip internships, part-time work, or academic experience
- Use PRESENT for current roles
- If exact month is unknown, use 01 for start dates and 12 for end dates
- If no professional experience found, respond with NONE"#;
