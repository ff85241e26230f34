//! Overlapping-window text chunker and chunk identity assigner.
//!
//! [`split_records`] turns page records into windows of at most
//! `chunk_size` characters with `chunk_overlap` characters shared
//! between consecutive windows, preferring paragraph, then line, then
//! word boundaries before falling back to a hard cut. Input record
//! order is preserved in output chunk order; the identity assigner
//! depends on it.
//!
//! [`assign_chunk_ids`] then stamps each chunk with its
//! `source:page:chunk_index` id, threading a counter that resets
//! whenever `(source, page)` changes between adjacent chunks.

use crate::models::{Chunk, DocumentRecord};

/// Split every record into overlapping chunks, preserving record order.
///
/// `chunk_index` and `id` are left unassigned; run the result through
/// [`assign_chunk_ids`].
pub fn split_records(
    records: &[DocumentRecord],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for record in records {
        for piece in split_text(&record.text, chunk_size, chunk_overlap) {
            chunks.push(Chunk {
                text: piece,
                source_path: record.source_path.clone(),
                page: record.page,
                chunk_index: 0,
                id: String::new(),
            });
        }
    }
    chunks
}

/// Split one text into windows of at most `size` characters with
/// `overlap` characters of overlap. Window ends prefer a paragraph
/// break, then a newline, then a space, falling back to a hard cut;
/// a boundary is only taken if it keeps the window at least half full.
fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    debug_assert!(overlap < size);

    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut pieces = Vec::new();
    let mut start = 0usize;

    while start < len {
        let hard_end = (start + size).min(len);
        let end = if hard_end < len {
            find_break(&chars, start, hard_end)
        } else {
            hard_end
        };

        let piece: String = chars[start..end].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed.to_string());
        }

        if end >= len {
            break;
        }

        // Step back by the overlap, but always make forward progress.
        let next = end.saturating_sub(overlap);
        start = if next > start { next } else { end };
    }

    pieces
}

/// Best break position in `chars[start..hard_end]`, scanning for the
/// last paragraph break, then newline, then space. Boundaries in the
/// first half of the window are rejected to avoid degenerate chunks.
fn find_break(chars: &[char], start: usize, hard_end: usize) -> usize {
    let min_end = start + (hard_end - start) / 2;

    // Paragraph boundary: "\n\n"
    for i in (start + 1..hard_end).rev() {
        if chars[i] == '\n' && chars[i - 1] == '\n' {
            if i + 1 > min_end {
                return i + 1;
            }
            break;
        }
    }

    // Line boundary
    for i in (start..hard_end).rev() {
        if chars[i] == '\n' {
            if i + 1 > min_end {
                return i + 1;
            }
            break;
        }
    }

    // Word boundary
    for i in (start..hard_end).rev() {
        if chars[i] == ' ' {
            if i + 1 > min_end {
                return i + 1;
            }
            break;
        }
    }

    hard_end
}

/// Assign ids of the form `source_path:page:chunk_index` to an ordered
/// chunk sequence, consuming and returning the same sequence.
///
/// The index starts at 0 and increments while consecutive chunks share
/// `(source_path, page)`; any change between adjacent chunks resets it
/// to 0. Processing order is exactly the input order; id correctness
/// depends on adjacency of same-page chunks.
pub fn assign_chunk_ids(mut chunks: Vec<Chunk>) -> Vec<Chunk> {
    let mut last_key: Option<(String, u32)> = None;
    let mut index: u32 = 0;

    for chunk in chunks.iter_mut() {
        let key = (chunk.source_path.clone(), chunk.page);
        if last_key.as_ref() == Some(&key) {
            index += 1;
        } else {
            index = 0;
        }

        chunk.chunk_index = index;
        chunk.id = format!("{}:{}:{}", chunk.source_path, chunk.page, index);
        last_key = Some(key);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, source: &str, page: u32) -> DocumentRecord {
        DocumentRecord {
            text: text.to_string(),
            source_path: source.to_string(),
            page,
        }
    }

    fn bare_chunk(source: &str, page: u32) -> Chunk {
        Chunk {
            text: "x".to_string(),
            source_path: source.to_string(),
            page,
            chunk_index: 0,
            id: String::new(),
        }
    }

    #[test]
    fn short_text_single_chunk() {
        let pieces = split_text("Hello, world!", 100, 10);
        assert_eq!(pieces, vec!["Hello, world!"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text("", 100, 10).is_empty());
        assert!(split_text("   \n\n  ", 100, 10).is_empty());
    }

    #[test]
    fn windows_never_exceed_chunk_size() {
        let text = "word ".repeat(500);
        for piece in split_text(&text, 80, 20) {
            assert!(piece.chars().count() <= 80, "oversized chunk: {}", piece);
        }
    }

    #[test]
    fn consecutive_windows_overlap() {
        // No boundaries at all forces hard cuts, making overlap exact.
        let text: String = "abcdefghij".repeat(10);
        let pieces = split_text(&text, 40, 10);
        assert!(pieces.len() > 1);
        for pair in pieces.windows(2) {
            let tail: String = pair[0].chars().rev().take(10).collect::<Vec<_>>()
                .into_iter().rev().collect();
            assert!(pair[1].starts_with(&tail));
        }
    }

    #[test]
    fn prefers_paragraph_boundary() {
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(60));
        let pieces = split_text(&text, 80, 0);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], "a".repeat(60));
        assert_eq!(pieces[1], "b".repeat(60));
    }

    #[test]
    fn prefers_word_boundary_over_hard_cut() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        for piece in split_text(text, 20, 0) {
            // Every chunk should start and end on a whole word.
            assert!(!piece.starts_with(' ') && !piece.ends_with(' '));
            assert!(text.contains(&piece));
        }
    }

    #[test]
    fn record_order_preserved_in_chunks() {
        let records = vec![
            record("first page text", "doc.pdf", 0),
            record("second page text", "doc.pdf", 1),
        ];
        let chunks = split_records(&records, 100, 10);
        assert_eq!(chunks[0].page, 0);
        assert_eq!(chunks[1].page, 1);
    }

    #[test]
    fn ids_count_up_within_a_page() {
        let chunks = vec![
            bare_chunk("docA.pdf", 0),
            bare_chunk("docA.pdf", 0),
            bare_chunk("docA.pdf", 0),
        ];
        let chunks = assign_chunk_ids(chunks);
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["docA.pdf:0:0", "docA.pdf:0:1", "docA.pdf:0:2"]);
        let indices: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn counter_resets_when_page_changes() {
        let chunks = vec![
            bare_chunk("docA.pdf", 0),
            bare_chunk("docA.pdf", 0),
            bare_chunk("docA.pdf", 1),
            bare_chunk("docA.pdf", 0),
        ];
        let chunks = assign_chunk_ids(chunks);
        let indices: Vec<u32> = chunks.iter().map(|c| c.chunk_index).collect();
        // Returning to page 0 resets as well: only adjacency matters.
        assert_eq!(indices, vec![0, 1, 0, 0]);
    }

    #[test]
    fn counter_resets_when_source_changes() {
        let chunks = vec![
            bare_chunk("docA.pdf", 0),
            bare_chunk("docB.pdf", 0),
            bare_chunk("docB.pdf", 0),
        ];
        let chunks = assign_chunk_ids(chunks);
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["docA.pdf:0:0", "docB.pdf:0:0", "docB.pdf:0:1"]);
    }

    #[test]
    fn empty_sequence_returns_empty() {
        assert!(assign_chunk_ids(Vec::new()).is_empty());
    }
}
