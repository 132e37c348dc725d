//! Fixed-size chunking with overlap and duplicate removal.

use std::collections::HashSet;

use serde_json::Value;

use super::pdf::PdfPage;
use crate::core::config::service::get_u64;
use crate::rag::ChunkRecord;

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 3200,
            chunk_overlap: 400,
        }
    }
}

impl ChunkingConfig {
    pub fn from_config(config: &Value) -> Self {
        Self {
            chunk_size: get_u64(config, &["ingest", "chunk_size_chars"], 3200) as usize,
            chunk_overlap: get_u64(config, &["ingest", "chunk_overlap_chars"], 400) as usize,
        }
    }
}

/// Split pages into chunk records, dropping duplicates (same content, source
/// and page) by their content-derived id.
pub fn chunk_pages(pages: &[PdfPage], config: &ChunkingConfig) -> Vec<ChunkRecord> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();
    let mut produced = 0usize;

    for page in pages {
        for text in split_text(&page.text, config) {
            produced += 1;
            let record = ChunkRecord::new(text, page.source.clone(), page.page);
            if seen.insert(record.chunk_id.clone()) {
                records.push(record);
            }
        }
    }

    if produced > records.len() {
        tracing::info!(
            "Chunked {} pages into {} chunks ({} duplicates removed)",
            pages.len(),
            records.len(),
            produced - records.len()
        );
    } else {
        tracing::info!("Chunked {} pages into {} chunks", pages.len(), records.len());
    }

    records
}

/// Split text into overlapping windows, preferring a sentence boundary in
/// the tail of each window.
pub fn split_text(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let chunk_size = config.chunk_size.max(1);
    let overlap = config.chunk_overlap.min(chunk_size.saturating_sub(1));

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len();
    let mut chunks = Vec::new();

    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total);
        let window: String = chars[start..end].iter().collect();

        let piece = if end < total {
            cut_at_sentence_boundary(&window)
        } else {
            window
        };
        let piece_len = piece.chars().count();

        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end == total {
            break;
        }
        // The next window starts `overlap` chars before the cut, so a
        // boundary cut shortens the stride instead of skipping text.
        start += piece_len.saturating_sub(overlap).max(1);
    }

    chunks
}

/// Look for a sentence ending in the last 20% of the window and cut there.
fn cut_at_sentence_boundary(window: &str) -> String {
    const ENDINGS: [&str; 6] = [". ", "! ", "? ", ".\n", "!\n", "?\n"];

    let chars: Vec<char> = window.chars().collect();
    let search_start_char = (chars.len() * 80) / 100;
    let search_start: usize = chars[..search_start_char].iter().map(|c| c.len_utf8()).sum();
    let tail = &window[search_start..];

    for ending in ENDINGS {
        if let Some(pos) = tail.rfind(ending) {
            let cut = search_start + pos + ending.len();
            return window[..cut].to_string();
        }
    }

    window.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str, source: &str, number: u32) -> PdfPage {
        PdfPage {
            source: source.to_string(),
            page: number,
            total_pages: number,
            text: text.to_string(),
        }
    }

    #[test]
    fn splits_long_text_with_overlap() {
        let config = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 20,
        };
        let text = "This is a test sentence. ".repeat(20);
        let chunks = split_text(&text, &config);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 100);
        }
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let config = ChunkingConfig::default();
        let chunks = split_text("short note", &config);
        assert_eq!(chunks, vec!["short note"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let config = ChunkingConfig::default();
        assert!(split_text("   \n ", &config).is_empty());
    }

    #[test]
    fn prefers_sentence_boundary_in_tail() {
        let config = ChunkingConfig {
            chunk_size: 50,
            chunk_overlap: 0,
        };
        let text = "Aaaa bbbb cccc dddd eeee ffff gggg hhhh iii. Next sentence continues well past the window end.";
        let chunks = split_text(text, &config);
        assert!(chunks[0].ends_with("iii."));
    }

    #[test]
    fn boundary_cut_does_not_skip_following_text() {
        // A sentence ending early in the search window used to leave the
        // text between the cut and the next fixed stride out of every chunk.
        let config = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 10,
        };
        let text = format!("{}. LOSTME{}", "a".repeat(82), "b".repeat(60));

        let chunks = split_text(&text, &config);
        let rejoined = chunks.join("");
        assert!(rejoined.contains("LOSTME"));
    }

    #[test]
    fn every_input_char_lands_in_some_chunk() {
        let config = ChunkingConfig {
            chunk_size: 60,
            chunk_overlap: 12,
        };
        let text = (0..40)
            .map(|i| format!("Sentence number {}. ", i))
            .collect::<String>();

        let chunks = split_text(&text, &config);
        let rejoined = chunks.join(" ");
        for i in 0..40 {
            assert!(
                rejoined.contains(&format!("number {}", i)),
                "sentence {} missing",
                i
            );
        }
    }

    #[test]
    fn non_ascii_text_does_not_panic() {
        let config = ChunkingConfig {
            chunk_size: 40,
            chunk_overlap: 10,
        };
        let text = "Cu-Mg 합금의 저항률은 2.0uOhm-cm이다. ".repeat(10);
        let chunks = split_text(&text, &config);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn duplicate_chunks_across_identical_pages_are_removed() {
        let config = ChunkingConfig::default();
        let pages = vec![
            page("identical content", "a.pdf", 1),
            page("identical content", "a.pdf", 1),
            page("identical content", "a.pdf", 2),
        ];

        let records = chunk_pages(&pages, &config);
        // Same page twice collapses; a different page is a different chunk.
        assert_eq!(records.len(), 2);
    }
}
