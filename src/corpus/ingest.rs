use anyhow::{Context, Result};
use tracing::info;

use super::chunk::{split_passages, ChunkConfig};
use super::PassageStore;

/// Chunk plain text and store it under `source`. Returns the passage count.
pub async fn ingest_text(
    store: &PassageStore,
    name: &str,
    source: &str,
    label: &str,
    text: &str,
    chunking: ChunkConfig,
) -> Result<usize> {
    let passages = split_passages(text, chunking);
    if passages.is_empty() {
        anyhow::bail!("no text to ingest from {}", source);
    }
    let count = store.add_passages(name, source, label, &passages).await?;
    info!(source, label, passages = count, size = text.len(), "Text ingested");
    Ok(count)
}

/// Ingest a web page by fetching its content.
pub async fn ingest_url(
    store: &PassageStore,
    url: &str,
    label: &str,
    chunking: ChunkConfig,
) -> Result<usize> {
    let resp = reqwest::get(url)
        .await
        .context("Failed to fetch URL")?
        .error_for_status()
        .context("URL returned an error status")?;

    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = resp.bytes().await.context("Failed to read response body")?;

    // Convert HTML to text if applicable
    let text = if content_type.contains("html") {
        html2text::from_read(&body[..], 120)
            .unwrap_or_else(|_| String::from_utf8_lossy(&body).to_string())
    } else {
        String::from_utf8_lossy(&body).to_string()
    };

    let name = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    let source = format!("url:{}", url);
    ingest_text(store, name, &source, label, &text, chunking).await
}
