//! Deterministic list extraction over retrieved passages.
//!
//! Used as the last stage before the not-found answer when the model abstains
//! on a list-shaped question. The stages are plain functions over strings:
//! candidate generation, post-filtering, domain prioritization, then
//! case-insensitive dedup with a cap.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

pub const DEFAULT_MAX_ITEMS: usize = 8;

/// Only the best-ranked passages are mined; lower ranks are noisier.
const SCANNED_CONTEXTS: usize = 4;

const BULLET_GLYPHS: &[char] = &['-', '*', '•', '–', '—', '▪', '●', '◦', '■', '▶', '➤'];

const LIST_QUERY_KEYWORDS: &[&str] = &[
    "list",
    "symptom",
    "sign",
    "features",
    "indications",
    "causes",
    "treatments",
    "risk factors",
    "complications",
];

const CORONARY_HINTS: &[&str] = &["myocardial infarction", "acute coronary"];

const CLINICAL_TERMS: &[&str] = &[
    "chest pain",
    "sweating",
    "diaphoresis",
    "nausea",
    "vomiting",
    "tachycardia",
    "bradycardia",
    "shortness of breath",
    "dyspnea",
    "palpitations",
    "weakness",
    "fatigue",
    "dizziness",
    "syncope",
    "jaw pain",
    "arm pain",
    "back pain",
];

static CITATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").expect("static regex"));

static BARE_INITIALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{1,3}$").expect("static regex"));

/// Whether the question expects an enumeration as its answer.
pub fn looks_like_list_query(query: &str) -> bool {
    let q = query.to_lowercase();
    LIST_QUERY_KEYWORDS.iter().any(|k| q.contains(k))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn has_letter(s: &str) -> bool {
    s.chars().any(char::is_alphabetic)
}

/// A bulleted (or symbol-led) line, cleaned of its marks.
pub fn bullet_candidate(line: &str) -> Option<String> {
    let first = line.chars().next()?;
    let bulleted = line.starts_with(BULLET_GLYPHS)
        || (!first.is_alphanumeric() && !first.is_whitespace());
    if !bulleted {
        return None;
    }

    let cleaned = line
        .trim_start_matches(|c: char| !is_word_char(c))
        .trim()
        .trim_end_matches(['.', ',', ';', ':', '·', '•']);

    let words = cleaned.split_whitespace().count();
    if (1..=12).contains(&words) && has_letter(cleaned) {
        Some(cleaned.to_string())
    } else {
        None
    }
}

/// Short fragments from a comma-separated line.
pub fn comma_candidates(line: &str) -> Vec<String> {
    if !line.contains(',') || line.chars().count() >= 200 {
        return Vec::new();
    }

    line.split(',')
        .map(|p| p.trim().trim_end_matches(['.', ',', ';', ':']))
        .filter(|p| (1..=5).contains(&p.split_whitespace().count()) && has_letter(p))
        .map(str::to_string)
        .collect()
}

/// Raw candidates from the first few contexts, in reading order.
pub fn candidates(contexts: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for context in contexts.iter().take(SCANNED_CONTEXTS) {
        for raw in context.lines() {
            let line = raw.trim();
            if line.chars().count() < 2 {
                continue;
            }
            if let Some(item) = bullet_candidate(line) {
                out.push(item);
            }
            out.extend(comma_candidates(line));
        }
    }
    out
}

fn is_noise(fragment: &str) -> bool {
    fragment.chars().count() < 3
        || BARE_INITIALS.is_match(fragment)
        || fragment.chars().filter(|c| c.is_ascii_digit()).count() > 3
}

/// Strip citation markers and drop fragments that are initials, codes or too short.
pub fn post_filter(candidates: Vec<String>) -> Vec<String> {
    candidates
        .into_iter()
        .map(|c| CITATION_MARKER.replace_all(&c, "").trim().to_string())
        .filter(|c| !is_noise(c))
        .collect()
}

fn hints_coronary(query_hint: &str) -> bool {
    let q = query_hint.to_lowercase();
    CORONARY_HINTS.iter().any(|h| q.contains(h))
        || q
            .split(|c: char| !c.is_alphanumeric())
            .any(|token| token == "mi")
}

/// Narrow to known clinical terms when the question is about a heart attack
/// and at least one fragment mentions one; otherwise pass everything through.
pub fn prioritize(fragments: Vec<String>, query_hint: &str) -> Vec<String> {
    if !hints_coronary(query_hint) {
        return fragments;
    }

    let matched: Vec<String> = fragments
        .iter()
        .filter(|f| {
            let lower = f.to_lowercase();
            CLINICAL_TERMS.iter().any(|t| lower.contains(t))
        })
        .cloned()
        .collect();

    if matched.is_empty() {
        fragments
    } else {
        matched
    }
}

/// Case-insensitive dedup keeping first-seen order, capped at `max_items`.
pub fn dedup_capped(items: Vec<String>, max_items: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.to_lowercase()))
        .take(max_items)
        .collect()
}

pub fn extract(contexts: &[String], query_hint: &str, max_items: usize) -> Vec<String> {
    let fragments = post_filter(candidates(contexts));
    dedup_capped(prioritize(fragments, query_hint), max_items)
}

/// Hyphen bullets, one item per line.
pub fn render_bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}
