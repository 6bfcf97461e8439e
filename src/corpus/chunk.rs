use std::collections::VecDeque;

/// Split points tried in order, coarsest first. Text that still does not fit
/// after the last one is cut at the character limit.
const SEPARATORS: &[&str] = &["\n\n\n", "\n\n", "\n", ". ", ", ", " "];

#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    pub chunk_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_chars: 2000,
            overlap_chars: 400,
        }
    }
}

impl ChunkConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let read = |key: &str, fallback: usize| {
            dotenv::var(key)
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(fallback)
        };
        Self {
            chunk_chars: read("CHUNK_SIZE", defaults.chunk_chars),
            overlap_chars: read("CHUNK_OVERLAP", defaults.overlap_chars),
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Split `text` into passages of at most `chunk_chars` characters, carrying up
/// to `overlap_chars` of trailing pieces into the next passage.
pub fn split_passages(text: &str, config: ChunkConfig) -> Vec<String> {
    let limit = config.chunk_chars.max(1);
    let overlap = config.overlap_chars.min(limit / 2);
    merge_pieces(split_recursive(text, limit, SEPARATORS), limit, overlap)
}

fn split_recursive(text: &str, limit: usize, separators: &[&str]) -> Vec<String> {
    if char_len(text) <= limit {
        return vec![text.to_string()];
    }

    let Some((sep, rest)) = separators.split_first() else {
        let chars: Vec<char> = text.chars().collect();
        return chars.chunks(limit).map(|c| c.iter().collect()).collect();
    };

    if !text.contains(sep) {
        return split_recursive(text, limit, rest);
    }

    let parts: Vec<&str> = text.split(sep).collect();
    let last = parts.len() - 1;
    let mut out = Vec::new();
    for (i, part) in parts.into_iter().enumerate() {
        // Keep the separator on the left piece so concatenation restores the text.
        let piece = if i < last {
            format!("{}{}", part, sep)
        } else {
            part.to_string()
        };
        if !piece.is_empty() {
            out.extend(split_recursive(&piece, limit, rest));
        }
    }
    out
}

fn merge_pieces(pieces: Vec<String>, limit: usize, overlap: usize) -> Vec<String> {
    let mut passages = Vec::new();
    let mut window: VecDeque<String> = VecDeque::new();
    let mut total = 0usize;

    let flush = |window: &VecDeque<String>, passages: &mut Vec<String>| {
        let joined: String = window.iter().map(String::as_str).collect();
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            passages.push(trimmed.to_string());
        }
    };

    for piece in pieces {
        let len = char_len(&piece);
        if total + len > limit && !window.is_empty() {
            flush(&window, &mut passages);
            while total > overlap || (total + len > limit && total > 0) {
                let Some(front) = window.pop_front() else { break };
                total -= char_len(&front);
            }
        }
        total += len;
        window.push_back(piece);
    }
    flush(&window, &mut passages);
    passages
}
