//! Splits markdown source text into indexable [`Chunk`]s.

use crate::types::{Chunk, SourceType};
use sha1::{Digest, Sha1};

const SECTION_SPLIT_THRESHOLD: usize = 2200;
const MAIN_WINDOW: usize = 1400;
const OTHER_WINDOW: usize = 1100;
const WINDOW_OVERLAP: usize = 180;

pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Split on `##` headings (daily/session files); sections longer than
/// [`SECTION_SPLIT_THRESHOLD`] are further split into sliding windows.
pub fn chunk_section_based(text: &str, source_path: &str, source_type: SourceType, session_key: Option<&str>) -> Vec<Chunk> {
    let lines: Vec<&str> = text.lines().collect();
    let mut sections: Vec<(usize, usize)> = Vec::new();
    let mut start = 0usize;
    for (i, line) in lines.iter().enumerate() {
        if line.starts_with("## ") && i > start {
            sections.push((start, i));
            start = i;
        }
    }
    sections.push((start, lines.len()));

    let mut out = Vec::new();
    for (s, e) in sections {
        if s >= e {
            continue;
        }
        let section_text = lines[s..e].join("\n");
        if section_text.len() <= SECTION_SPLIT_THRESHOLD {
            out.push(make_chunk(&section_text, source_path, source_type, s + 1, e, session_key));
        } else {
            out.extend(sliding_window_chunks(
                &section_text,
                source_path,
                source_type,
                s + 1,
                SECTION_SPLIT_THRESHOLD,
                WINDOW_OVERLAP,
                session_key,
            ));
        }
    }
    out
}

/// Sliding-window split for main long-term / extra files — no heading
/// structure to anchor on.
pub fn chunk_sliding_window(
    text: &str,
    source_path: &str,
    source_type: SourceType,
    is_main: bool,
    session_key: Option<&str>,
) -> Vec<Chunk> {
    let window = if is_main { MAIN_WINDOW } else { OTHER_WINDOW };
    sliding_window_chunks(text, source_path, source_type, 1, window, WINDOW_OVERLAP, session_key)
}

fn sliding_window_chunks(
    text: &str,
    source_path: &str,
    source_type: SourceType,
    start_line: usize,
    window: usize,
    overlap: usize,
    session_key: Option<&str>,
) -> Vec<Chunk> {
    if text.is_empty() {
        return Vec::new();
    }
    let bytes = text.as_bytes();
    let step = window.saturating_sub(overlap).max(1);
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < bytes.len() {
        let end = (pos + window).min(bytes.len());
        let slice = safe_slice(text, pos, end);
        out.push(make_chunk(slice, source_path, source_type, start_line, start_line, session_key));
        if end >= bytes.len() {
            break;
        }
        pos += step;
    }
    out
}

/// Slice on char boundaries to avoid panicking on multi-byte UTF-8.
fn safe_slice(text: &str, start: usize, end: usize) -> &str {
    let mut s = start.min(text.len());
    let mut e = end.min(text.len());
    while s > 0 && !text.is_char_boundary(s) {
        s -= 1;
    }
    while e < text.len() && !text.is_char_boundary(e) {
        e += 1;
    }
    &text[s..e]
}

fn make_chunk(
    text: &str,
    source_path: &str,
    source_type: SourceType,
    start_line: usize,
    end_line: usize,
    session_key: Option<&str>,
) -> Chunk {
    Chunk {
        content_hash: content_hash(text),
        text: text.to_string(),
        source_path: source_path.to_string(),
        source_type,
        start_line,
        end_line: end_line.max(start_line),
        session_key: session_key.map(|s| s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_split_keeps_short_sections_whole() {
        let text = "## A\nline one\n## B\nline two\n";
        let chunks = chunk_section_based(text, "daily.md", SourceType::MemoryDaily, None);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.contains("## A"));
        assert!(chunks[1].text.contains("## B"));
    }

    #[test]
    fn section_split_further_splits_long_sections() {
        let mut text = String::from("## Big\n");
        text.push_str(&"word ".repeat(1000));
        let chunks = chunk_section_based(&text, "daily.md", SourceType::MemoryDaily, None);
        assert!(chunks.len() > 1);
    }

    #[test]
    fn sliding_window_overlaps_adjacent_chunks() {
        let text = "x".repeat(3000);
        let chunks = chunk_sliding_window(&text, "main.md", SourceType::MemoryMain, true, None);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn identical_text_produces_identical_hash() {
        assert_eq!(content_hash("same"), content_hash("same"));
        assert_ne!(content_hash("same"), content_hash("different"));
    }

    #[test]
    fn safe_slice_never_panics_on_multibyte_boundary() {
        let text = "a".repeat(50) + "\u{1F600}\u{1F600}";
        // Force a split point that would land inside the emoji's bytes.
        let s = safe_slice(&text, 51, text.len());
        assert!(text.ends_with(s) || s.is_empty());
    }
}
