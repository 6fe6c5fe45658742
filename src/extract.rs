//! PDF text extraction.
//!
//! The ingestion boundary to raw document bytes: returns the full extracted
//! text plus a nullable page count. Extraction failure is fatal for the
//! entry; a missing page count is not (the data model keeps it nullable
//! rather than coercing to zero).

use crate::error::QaError;

#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    pub text: String,
    pub pages: Option<i32>,
}

pub fn extract_pdf(bytes: &[u8]) -> Result<ExtractedDocument, QaError> {
    let text =
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| QaError::Extract(e.to_string()))?;

    let pages = lopdf::Document::load_mem(bytes)
        .ok()
        .map(|doc| doc.get_pages().len() as i32);

    Ok(ExtractedDocument { text, pages })
}
