//! Document text extraction. Turns uploaded PDF/DOCX bytes into plaintext.
//!
//! Extraction failures are terminal for an upload; there are no retries.

mod docx;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unsupported document format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Document contains no extractable text")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Docx,
}

impl DocumentFormat {
    /// Resolves the declared format from an extension (with or without a leading dot).
    pub fn from_extension(ext: &str) -> Result<Self, ExtractionError> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            other => Err(ExtractionError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Resolves the format from the extension of an uploaded file name.
    pub fn from_file_name(file_name: &str) -> Result<Self, ExtractionError> {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => Self::from_extension(ext),
            _ => Err(ExtractionError::UnsupportedFormat(file_name.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

/// Extracts plaintext from a document.
///
/// PDF: page text concatenated in page order.
/// DOCX: paragraph text in document order, one paragraph per line.
/// An all-whitespace result is `EmptyContent`, never success.
pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<String, ExtractionError> {
    let text = match format {
        DocumentFormat::Pdf => pdf_extract::extract_text_from_mem(bytes)
            .map_err(|e| ExtractionError::ExtractionFailed(format!("pdf: {e}")))?,
        DocumentFormat::Docx => docx::extract_paragraphs(bytes)?,
    };

    if text.trim().is_empty() {
        warn!("Extracted empty text from {}", format.as_str());
        return Err(ExtractionError::EmptyContent);
    }

    info!(
        "Successfully extracted {} characters from {}",
        text.len(),
        format.as_str()
    );
    Ok(text)
}

/// Runs `extract_text` on the blocking pool. PDF parsing is CPU-bound and may panic
/// on malformed input; a panic is reported as `ExtractionFailed`.
pub async fn extract_text_blocking(
    bytes: bytes::Bytes,
    format: DocumentFormat,
) -> Result<String, ExtractionError> {
    tokio::task::spawn_blocking(move || extract_text(&bytes, format))
        .await
        .map_err(|e| ExtractionError::ExtractionFailed(format!("extractor aborted: {e}")))?
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};

    /// Builds a minimal DOCX package whose body holds one `<w:p>` per paragraph.
    pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
            .collect();
        docx_with_body(&body)
    }

    pub fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::FileOptions::default();
        writer.start_file("[Content_Types].xml", options).unwrap();
        writer.write_all(b"<Types/>").unwrap();
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }
}
