pub mod chunk;
pub mod ingest;
pub mod types;

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cnidarium::{StateDelta, StateWrite, Storage};
use futures::StreamExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::pipeline::Retriever;

use types::{Passage, PassageId, SourceMeta};

// Key prefixes (no trailing slashes, cnidarium convention)
const PASSAGE_PREFIX: &str = "passage/text";
const SOURCE_PREFIX: &str = "passage/source";

const STOP_WORDS: &[&str] = &[
    "what", "which", "where", "when", "does", "have", "with", "that", "this", "from", "about",
    "some", "there", "their", "they", "your", "been", "were", "how", "could", "would", "should",
    "into", "also", "just", "like", "according", "provided", "context", "common", "list",
    "tell", "many", "much", "very", "please", "more", "most", "only", "the", "and", "are",
];

fn source_hash(source: &str) -> String {
    blake3::hash(source.as_bytes()).to_hex().to_string()
}
/// All passages of one source live under this prefix.
fn source_passages_prefix(source: &str) -> String {
    format!("{}/{}/", PASSAGE_PREFIX, source_hash(source))
}
fn passage_key(source: &str, id: &str) -> String {
    format!("{}{}", source_passages_prefix(source), id)
}
fn source_key(source: &str) -> String {
    format!("{}/{}", SOURCE_PREFIX, source_hash(source))
}

fn passage_id(source: &str, text: &str) -> PassageId {
    let mut hasher = blake3::Hasher::new();
    hasher.update(source.as_bytes());
    hasher.update(b"\n");
    hasher.update(text.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Lowercased search terms: punctuation stripped, stop words and short words
/// dropped, hyphenated terms kept whole and also split into parts.
pub fn keywords(query: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut push = |word: &str| {
        if word.chars().count() > 2 && !STOP_WORDS.contains(&word) {
            out.push(word.to_string());
        }
    };

    for word in query.split_whitespace() {
        let clean: String = word
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '-')
            .collect::<String>()
            .to_lowercase();
        let clean = clean.trim_matches('-');
        if clean.is_empty() {
            continue;
        }
        push(clean);
        if clean.contains('-') {
            for part in clean.split('-') {
                push(part);
            }
        }
    }

    let mut seen = HashSet::new();
    out.retain(|k| seen.insert(k.clone()));
    out
}

/// (distinct keywords present, total keyword occurrences) for one passage.
pub fn score(keywords: &[String], text: &str) -> (usize, usize) {
    let lower = text.to_lowercase();
    keywords.iter().fold((0, 0), |(distinct, total), k| {
        let hits = lower.matches(k.as_str()).count();
        (distinct + usize::from(hits > 0), total + hits)
    })
}

/// Best-first passages with at least one keyword hit, capped at `k`.
pub fn rank<'a>(passages: &'a [Passage], query: &str, k: usize) -> Vec<&'a Passage> {
    let keywords = keywords(query);
    if keywords.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<((usize, usize), &Passage)> = passages
        .iter()
        .map(|p| (score(&keywords, &p.text), p))
        .filter(|((distinct, _), _)| *distinct > 0)
        .collect();
    scored.sort_by(|(sa, a), (sb, b)| {
        sb.cmp(sa)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.ordinal.cmp(&b.ordinal))
    });
    scored.into_iter().take(k).map(|(_, p)| p).collect()
}

pub struct PassageStore {
    storage: Storage,
    /// All passages, loaded on first search and dropped on every write.
    /// Writers hold the write guard across their commit, so a load can never
    /// install passages older than the latest commit.
    cache: RwLock<Option<Vec<Passage>>>,
}

impl PassageStore {
    pub async fn new(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let prefixes = vec![PASSAGE_PREFIX.to_string(), SOURCE_PREFIX.to_string()];
        let storage = Storage::load(data_dir.to_path_buf(), prefixes)
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self {
            storage,
            cache: RwLock::new(None),
        })
    }

    /// Store the passages of one source, replacing whatever that source held
    /// before. Re-ingesting identical text is a no-op apart from timestamps.
    pub async fn add_passages(
        &self,
        name: &str,
        source: &str,
        label: &str,
        texts: &[String],
    ) -> Result<usize> {
        let mut cache = self.cache.write().await;

        let now = chrono::Utc::now().timestamp();
        let snapshot = self.storage.latest_snapshot();
        let stale = {
            use cnidarium::StateRead;
            let mut stream = snapshot.prefix_raw(&source_passages_prefix(source));
            let mut keys = Vec::new();
            while let Some(entry) = stream.next().await {
                let (key, _) = entry.context("Failed to scan existing passages")?;
                keys.push(key);
            }
            keys
        };

        let mut delta = StateDelta::new(snapshot);
        let replaced = stale.len();
        for key in stale {
            delta.delete(key);
        }

        for (ordinal, text) in texts.iter().enumerate() {
            let passage = Passage {
                id: passage_id(source, text),
                source: source.to_string(),
                ordinal,
                text: text.clone(),
                ingested_at: now,
            };
            delta.put_raw(
                passage_key(source, &passage.id),
                serde_json::to_vec(&passage).context("serialize passage")?,
            );
        }

        let meta = SourceMeta {
            source: source.to_string(),
            name: name.to_string(),
            label: label.to_string(),
            passage_count: texts.len(),
            size: texts.iter().map(String::len).sum(),
            ingested_at: now,
        };
        delta.put_raw(
            source_key(source),
            serde_json::to_vec(&meta).context("serialize source meta")?,
        );

        self.storage.commit(delta).await?;
        *cache = None;
        debug!(source, label, passages = texts.len(), replaced, "passages stored");
        Ok(texts.len())
    }

    async fn load_passages(&self) -> Result<Vec<Passage>> {
        let snapshot = self.storage.latest_snapshot();
        use cnidarium::StateRead;
        let mut stream = snapshot.prefix_raw(PASSAGE_PREFIX);
        let mut passages = Vec::new();

        while let Some(entry) = stream.next().await {
            match entry {
                Ok((_key, value)) => match serde_json::from_slice::<Passage>(&value) {
                    Ok(p) => passages.push(p),
                    Err(e) => warn!("Skipping undecodable passage: {}", e),
                },
                Err(e) => {
                    warn!("Error reading passage stream: {}", e);
                }
            }
        }
        Ok(passages)
    }

    async fn with_passages<T>(&self, f: impl FnOnce(&[Passage]) -> T) -> Result<T> {
        {
            let cache = self.cache.read().await;
            if let Some(passages) = cache.as_deref() {
                return Ok(f(passages));
            }
        }

        // Load under the write guard so no commit can land mid-load.
        let mut cache = self.cache.write().await;
        if let Some(passages) = cache.as_deref() {
            return Ok(f(passages));
        }
        let loaded = self.load_passages().await?;
        Ok(f(cache.insert(loaded)))
    }

    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        self.with_passages(|passages| {
            rank(passages, query, k)
                .into_iter()
                .map(|p| p.text.clone())
                .collect()
        })
        .await
    }

    pub async fn passage_count(&self) -> Result<usize> {
        self.with_passages(|passages| passages.len()).await
    }

    /// List ingested sources, newest first.
    pub async fn sources(&self, limit: usize) -> Result<Vec<SourceMeta>> {
        let snapshot = self.storage.latest_snapshot();
        use cnidarium::StateRead;
        let mut stream = snapshot.prefix_raw(SOURCE_PREFIX);
        let mut results = Vec::new();

        while let Some(entry) = stream.next().await {
            match entry {
                Ok((_key, value)) => {
                    if let Ok(meta) = serde_json::from_slice::<SourceMeta>(&value) {
                        results.push(meta);
                    }
                }
                Err(e) => {
                    warn!("Error reading source meta stream: {}", e);
                }
            }
        }

        results.sort_by(|a, b| b.ingested_at.cmp(&a.ingested_at));
        results.truncate(limit);
        Ok(results)
    }
}

#[async_trait]
impl Retriever for PassageStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>, BackendError> {
        self.search(query, k)
            .await
            .map_err(|e| BackendError::Storage(format!("{:#}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(source: &str, ordinal: usize, text: &str) -> Passage {
        Passage {
            id: passage_id(source, text),
            source: source.to_string(),
            ordinal,
            text: text.to_string(),
            ingested_at: 0,
        }
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            keywords("According to the provided context, list 5 common symptoms of acute myocardial infarction."),
            vec!["symptoms", "acute", "myocardial", "infarction"]
        );
        assert_eq!(
            keywords("What is non-ST-elevation MI?"),
            vec!["non-st-elevation", "non", "elevation"]
        );
        assert!(keywords("is it?").is_empty());
    }

    #[test]
    fn test_score_counts_distinct_and_total() {
        let kw = vec!["pain".to_string(), "chest".to_string(), "fever".to_string()];
        assert_eq!(score(&kw, "Chest pain radiating; pain worse on exertion"), (2, 3));
        assert_eq!(score(&kw, "No matching words"), (0, 0));
    }

    #[test]
    fn test_rank_prefers_more_distinct_keywords() {
        let passages = vec![
            passage("a", 0, "Infarction is tissue death."),
            passage("a", 1, "Myocardial infarction presents with chest pain."),
            passage("b", 0, "Renal physiology overview."),
        ];
        let ranked = rank(&passages, "symptoms of myocardial infarction", 5);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].ordinal, 1);
        assert_eq!(ranked[1].ordinal, 0);
    }

    #[test]
    fn test_rank_truncates_and_breaks_ties_by_position() {
        let passages = vec![
            passage("b", 0, "aspirin"),
            passage("a", 1, "aspirin"),
            passage("a", 0, "aspirin"),
        ];
        let ranked = rank(&passages, "aspirin", 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!((ranked[0].source.as_str(), ranked[0].ordinal), ("a", 0));
        assert_eq!((ranked[1].source.as_str(), ranked[1].ordinal), ("a", 1));
    }

    #[test]
    fn test_rank_empty_query() {
        let passages = vec![passage("a", 0, "anything")];
        assert!(rank(&passages, "?", 3).is_empty());
    }

    #[test]
    fn test_passage_id_depends_on_source() {
        assert_eq!(passage_id("a", "text"), passage_id("a", "text"));
        assert_ne!(passage_id("a", "text"), passage_id("b", "text"));
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn open_store() -> (tempfile::TempDir, PassageStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = PassageStore::new(dir.path()).await.unwrap();
        (dir, store)
    }

    #[test]
    fn test_passage_keys_grouped_by_source() {
        let key = passage_key("url:a", "abc");
        assert!(key.starts_with(&source_passages_prefix("url:a")));
        assert!(!key.starts_with(&source_passages_prefix("url:b")));
    }

    #[tokio::test]
    async fn test_store_search_sources_and_count() {
        let (_dir, store) = open_store().await;
        store
            .add_passages(
                "mi",
                "url:mi",
                "cardiology",
                &texts(&["Myocardial infarction causes chest pain.", "Renal overview."]),
            )
            .await
            .unwrap();

        assert_eq!(store.passage_count().await.unwrap(), 2);
        assert_eq!(
            store.search("myocardial infarction", 5).await.unwrap(),
            vec!["Myocardial infarction causes chest pain."]
        );

        let sources = store.sources(10).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].label, "cardiology");
        assert_eq!(sources[0].passage_count, 2);
    }

    #[tokio::test]
    async fn test_store_search_sees_later_ingest() {
        let (_dir, store) = open_store().await;
        store
            .add_passages("a", "url:a", "l", &texts(&["Aspirin reduces mortality."]))
            .await
            .unwrap();
        assert_eq!(store.search("aspirin", 5).await.unwrap().len(), 1);

        store
            .add_passages("b", "url:b", "l", &texts(&["Aspirin is an antiplatelet."]))
            .await
            .unwrap();
        assert_eq!(store.search("aspirin", 5).await.unwrap().len(), 2);
        assert_eq!(store.passage_count().await.unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_store_concurrent_search_and_ingest() {
        let (_dir, store) = open_store().await;
        store
            .add_passages("a", "url:a", "l", &texts(&["Aspirin reduces mortality."]))
            .await
            .unwrap();

        let new_texts = texts(&["Aspirin is an antiplatelet."]);
        let (searched, added) = tokio::join!(
            store.search("aspirin", 5),
            store.add_passages("b", "url:b", "l", &new_texts)
        );
        searched.unwrap();
        added.unwrap();

        assert_eq!(store.search("aspirin", 5).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_store_reingest_replaces_changed_passages() {
        let (_dir, store) = open_store().await;
        store
            .add_passages(
                "page",
                "url:page",
                "l",
                &texts(&["Old aspirin guidance.", "Old nitrate guidance."]),
            )
            .await
            .unwrap();
        store
            .add_passages("page", "url:page", "l", &texts(&["New aspirin guidance."]))
            .await
            .unwrap();

        assert_eq!(store.passage_count().await.unwrap(), 1);
        assert_eq!(
            store.search("aspirin guidance", 5).await.unwrap(),
            vec!["New aspirin guidance."]
        );
        let sources = store.sources(10).await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].passage_count, 1);
    }

    #[tokio::test]
    async fn test_store_reingest_leaves_other_sources() {
        let (_dir, store) = open_store().await;
        store
            .add_passages("a", "url:a", "l", &texts(&["Aspirin reduces mortality."]))
            .await
            .unwrap();
        store
            .add_passages("b", "url:b", "l", &texts(&["Aspirin is an antiplatelet."]))
            .await
            .unwrap();
        store
            .add_passages("a", "url:a", "l", &texts(&["Aspirin dosing is 75 mg."]))
            .await
            .unwrap();

        let mut hits = store.search("aspirin", 5).await.unwrap();
        hits.sort();
        assert_eq!(hits, vec!["Aspirin dosing is 75 mg.", "Aspirin is an antiplatelet."]);
    }
}
