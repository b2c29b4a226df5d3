//! Overlapping fixed-size text chunker.
//!
//! Splits per-page document text into [`DocumentChunk`]s of at most
//! `max_chars` characters with `overlap_chars` of trailing overlap between
//! consecutive chunks. Window ends prefer paragraph, newline, then space
//! boundaries so chunks stay readable. Each chunk records the 1-based page
//! numbers its span overlaps, which the answer pipeline surfaces as sources.

use crate::models::DocumentChunk;

/// Page separator inserted between pages when the document is flattened
/// into a single string for windowing.
const PAGE_SEPARATOR: &str = "\n\n";

/// Split per-page text into overlapping chunks.
///
/// Guarantees: at least one chunk for any input with non-empty text,
/// contiguous indices starting at 0, and a consistent `total_chunks` on
/// every chunk. `overlap_chars` must be less than `max_chars`.
pub fn chunk_document(
    pages: &[String],
    max_chars: usize,
    overlap_chars: usize,
) -> Vec<DocumentChunk> {
    debug_assert!(overlap_chars < max_chars);

    // Flatten pages into one string, remembering each page's byte span.
    let mut text = String::new();
    let mut page_spans: Vec<(usize, usize, usize)> = Vec::new(); // (start, end, page_no)
    for (i, page) in pages.iter().enumerate() {
        let trimmed = page.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !text.is_empty() {
            text.push_str(PAGE_SEPARATOR);
        }
        let start = text.len();
        text.push_str(trimmed);
        page_spans.push((start, text.len(), i + 1));
    }

    if text.is_empty() {
        return Vec::new();
    }

    let mut spans: Vec<(usize, usize)> = Vec::new();
    let mut start = 0usize;
    while start < text.len() {
        let hard_end = floor_char_boundary(&text, (start + max_chars).min(text.len()));
        let mut end = if hard_end < text.len() {
            seek_break(&text, start, hard_end)
        } else {
            hard_end
        };
        // A window narrower than the next character collapses to an empty
        // span; take that one character so the walk always advances.
        if end <= start {
            end = ceil_char_boundary(&text, start + 1);
        }
        spans.push((start, end));
        if end >= text.len() {
            break;
        }
        // Step back by the overlap, but always make forward progress.
        let next = floor_char_boundary(&text, end.saturating_sub(overlap_chars));
        start = if next > start { next } else { end };
    }

    let total = spans.len();
    spans
        .iter()
        .enumerate()
        .map(|(index, &(s, e))| DocumentChunk {
            text: text[s..e].trim().to_string(),
            index,
            total_chunks: total,
            page_numbers: pages_for_span(&page_spans, s, e),
        })
        .collect()
}

/// Find a natural break at or before `hard_end`, preferring a paragraph
/// break, then a newline, then a space. Falls back to the hard boundary if
/// no break exists in the second half of the window (avoids tiny chunks).
fn seek_break(text: &str, start: usize, hard_end: usize) -> usize {
    let window = &text[start..hard_end];
    let min_pos = window.len() / 2;

    for pat in ["\n\n", "\n", " "] {
        if let Some(pos) = window.rfind(pat) {
            if pos >= min_pos {
                return start + pos + pat.len();
            }
        }
    }
    hard_end
}

/// Ordered set of 1-based page numbers whose span overlaps `[start, end)`.
fn pages_for_span(page_spans: &[(usize, usize, usize)], start: usize, end: usize) -> Vec<usize> {
    page_spans
        .iter()
        .filter(|&&(ps, pe, _)| ps < end && pe > start)
        .map(|&(_, _, page)| page)
        .collect()
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}
