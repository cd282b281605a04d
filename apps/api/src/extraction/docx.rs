//! DOCX reader: walks `word/document.xml` and collects paragraph text.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Returns paragraph text in document order, paragraphs separated by `\n`.
pub(super) fn extract_paragraphs(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::ExtractionFailed(format!("docx container: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::ExtractionFailed(format!("docx body: {e}")))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::ExtractionFailed(format!("docx body: {e}")))?;

    paragraphs_from_xml(&xml).map(|paragraphs| paragraphs.join("\n"))
}

/// Paragraphs are returned in the order they open. A paragraph nested inside another
/// (text boxes) does not split its enclosing paragraph.
fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs: Vec<String> = Vec::new();
    // Indexes into `paragraphs` of every open `w:p`, innermost last.
    let mut open: Vec<usize> = Vec::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:p" => {
                    open.push(paragraphs.len());
                    paragraphs.push(String::new());
                }
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    open.pop();
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                let separator = match e.name().as_ref() {
                    b"w:tab" => "\t",
                    b"w:br" | b"w:cr" => "\n",
                    b"w:p" => {
                        paragraphs.push(String::new());
                        continue;
                    }
                    _ => continue,
                };
                if let Some(&i) = open.last() {
                    paragraphs[i].push_str(separator);
                }
            }
            Ok(Event::Text(t)) if in_text_run => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractionError::ExtractionFailed(format!("docx text: {e}")))?;
                if let Some(&i) = open.last() {
                    paragraphs[i].push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::ExtractionFailed(format!(
                    "docx xml at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}
