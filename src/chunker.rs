//! Splits documents into overlapping chunks using a recursive separator
//! strategy.
//!
//! Text is split on the coarsest separator present (paragraph break,
//! then line break, then space), fragments are greedily merged back up
//! to the chunk size with a configurable backward overlap, and any
//! fragment still too large is re-split with progressively finer
//! separators. The empty separator hard-slices by characters, so the
//! recursion always terminates.
//!
//! Sizes are measured in characters, not bytes; multi-byte UTF-8 input
//! is handled correctly.

use std::collections::VecDeque;

use tracing::info;

use crate::loader::Document;

/// Separator ladder, coarsest first. The final empty separator means
/// "slice by characters".
const SEPARATORS: &[&str] = &["\n\n", "\n", " ", ""];

/// A bounded substring of a source document, tagged with its origin
/// and position.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// The chunk text content.
    pub text: String,
    /// Filename of the source document.
    pub source: String,
    /// Zero-based, sequential position within the source document.
    pub chunk_id: usize,
}

impl Chunk {
    /// Composite identifier, unique across the corpus as long as each
    /// filename is indexed at most once between resets.
    pub fn id(&self) -> String {
        format!("{}_{}", self.source, self.chunk_id)
    }
}

/// Split every document into chunks, preserving document order and
/// in-document segment order.
pub fn chunk_documents(
    documents: &[Document],
    chunk_size: usize,
    overlap: usize,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();

    for doc in documents {
        for (i, text) in
            split_text(&doc.content, chunk_size, overlap).into_iter().enumerate()
        {
            chunks.push(Chunk {
                text,
                source: doc.filename.clone(),
                chunk_id: i,
            });
        }
    }

    info!(
        "created {} chunks from {} documents",
        chunks.len(),
        documents.len()
    );
    chunks
}

/// Split `text` into segments of at most `chunk_size` characters, with
/// consecutive segments overlapping by up to `overlap` characters
/// (snapped to separator boundaries).
///
/// Segments are whitespace-trimmed; empty segments are dropped, so a
/// whitespace-only input yields no segments.
///
/// # Examples
///
/// ```
/// use ragbert::chunker::split_text;
///
/// let segments = split_text("short text", 512, 50);
/// assert_eq!(segments, vec!["short text".to_string()]);
/// ```
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    split_recursive(text, chunk_size, overlap, SEPARATORS)
}

fn split_recursive(
    text: &str,
    chunk_size: usize,
    overlap: usize,
    separators: &[&str],
) -> Vec<String> {
    let (index, separator) = separators
        .iter()
        .enumerate()
        .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
        .map(|(i, sep)| (i, *sep))
        .unwrap_or((separators.len().saturating_sub(1), ""));

    if separator.is_empty() {
        return hard_slice(text, chunk_size, overlap);
    }

    let finer = &separators[index + 1..];
    let mut segments = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for fragment in split_keeping_separator(text, separator) {
        if char_len(fragment) <= chunk_size {
            pending.push(fragment);
        } else {
            // Flush what fits before recursing into the oversized
            // fragment with finer separators.
            if !pending.is_empty() {
                merge_fragments(&pending, chunk_size, overlap, &mut segments);
                pending.clear();
            }
            segments.extend(split_recursive(
                fragment, chunk_size, overlap, finer,
            ));
        }
    }

    if !pending.is_empty() {
        merge_fragments(&pending, chunk_size, overlap, &mut segments);
    }

    segments
}

/// Split `text` before every occurrence of `sep`, so that the
/// fragments concatenate back to the input and every fragment after
/// the first starts with the separator.
fn split_keeping_separator<'a>(text: &'a str, sep: &str) -> Vec<&'a str> {
    let mut fragments = Vec::new();
    let mut start = 0;

    for (idx, _) in text.match_indices(sep) {
        if idx > start {
            fragments.push(&text[start..idx]);
            start = idx;
        }
    }
    if start < text.len() {
        fragments.push(&text[start..]);
    }

    fragments
}

/// Greedily merge fragments into segments of at most `chunk_size`
/// characters. When a segment is emitted, fragments are retained from
/// its tail until at most `overlap` characters remain, forming the
/// start of the next segment.
fn merge_fragments(
    fragments: &[&str],
    chunk_size: usize,
    overlap: usize,
    out: &mut Vec<String>,
) {
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for &fragment in fragments {
        let len = char_len(fragment);

        if total + len > chunk_size && !window.is_empty() {
            push_joined(&window, out);
            while total > overlap
                || (total + len > chunk_size && total > 0)
            {
                let popped = window.pop_front().unwrap_or_default();
                total -= char_len(popped);
            }
        }

        window.push_back(fragment);
        total += len;
    }

    push_joined(&window, out);
}

fn push_joined(window: &VecDeque<&str>, out: &mut Vec<String>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Last-resort splitting for text with no usable separators: fixed
/// character windows advancing by `chunk_size - overlap`.
fn hard_slice(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let char_to_byte: Vec<usize> = text
        .char_indices()
        .map(|(byte_idx, _)| byte_idx)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = char_to_byte.len() - 1;

    let step = chunk_size.saturating_sub(overlap).max(1);
    let mut segments = Vec::new();
    let mut start = 0;

    while start < char_count {
        let end = (start + chunk_size).min(char_count);
        let piece = text[char_to_byte[start]..char_to_byte[end]].trim();
        if !piece.is_empty() {
            segments.push(piece.to_string());
        }
        if end == char_count {
            break;
        }
        start += step;
    }

    segments
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
