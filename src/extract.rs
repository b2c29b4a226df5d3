//! PDF text extraction for uploaded documents.
//!
//! Extraction is pipeline-layer: the HTTP handler supplies bytes plus a
//! declared content type; this module returns per-page plain UTF-8 text.
//! Errors never panic — the caller rejects the upload and mutates nothing.

/// The only content type accepted for uploads.
pub const MIME_PDF: &str = "application/pdf";

/// Extraction error, surfaced to the client as a 400.
#[derive(Debug)]
pub enum ExtractError {
    UnsupportedContentType(String),
    Pdf(String),
    EmptyDocument,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::UnsupportedContentType(ct) => {
                write!(f, "unsupported content-type: {} (expected {})", ct, MIME_PDF)
            }
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::EmptyDocument => write!(f, "document contains no extractable text"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extracts per-page plain text from an uploaded document.
///
/// Returns one string per page. Fails if the declared content type is not
/// PDF, the bytes cannot be parsed, or no page yields any text.
pub fn extract_pages(bytes: &[u8], content_type: &str) -> Result<Vec<String>, ExtractError> {
    if content_type != MIME_PDF {
        return Err(ExtractError::UnsupportedContentType(
            content_type.to_string(),
        ));
    }

    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(ExtractError::EmptyDocument);
    }

    Ok(pages)
}

/// Joins per-page text into the full document text, pages separated by a
/// blank line. Used for the requirements-extraction prompt; the chunker
/// flattens pages itself so it can track per-page spans.
pub fn join_pages(pages: &[String]) -> String {
    pages
        .iter()
        .map(|p| p.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_pdf_content_type_returns_error() {
        let err = extract_pages(b"hello", "text/plain").unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedContentType(_)));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let err = extract_pages(b"not a pdf", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn join_pages_trims_and_separates() {
        let pages = vec!["  alpha \n".to_string(), "beta".to_string()];
        assert_eq!(join_pages(&pages), "alpha\n\nbeta");
    }
}
