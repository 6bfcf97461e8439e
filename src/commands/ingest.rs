use crate::corpus::ingest as corpus_ingest;
use crate::state::Context;
use tracing::info;

/// Ingest a web page or text document from a URL
#[poise::command(slash_command, guild_only)]
pub async fn ingest(
    ctx: Context<'_>,
    #[description = "URL of the document"] url: String,
    #[description = "Topic label for this document"] label: String,
) -> Result<(), anyhow::Error> {
    ctx.defer().await?;

    info!(
        user = ctx.author().name,
        url,
        label,
        "Ingestion started"
    );

    let data = ctx.data();
    let passages = corpus_ingest::ingest_url(&data.store, &url, &label, data.chunking).await?;
    let total = data.store.passage_count().await?;

    ctx.say(format!(
        "Ingested **{}** as {} passage(s) under topic **'{}'**\nPassages indexed: {}",
        url, passages, label, total
    ))
    .await?;

    Ok(())
}
