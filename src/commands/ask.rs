use std::time::Duration;

use tracing::{error, info, warn};

use super::send_chunked;
use crate::pipeline::{AnswerMode, AnswerResult, Query};
use crate::state::Context;

/// Characters of each context shown under the answer.
const SNIPPET_CHARS: usize = 300;

/// Ask a question about ingested documents
#[poise::command(slash_command, guild_only)]
pub async fn ask(
    ctx: Context<'_>,
    #[description = "Your question"] question: String,
    #[description = "Number of passages to retrieve"] top_k: Option<u32>,
    #[description = "default | extractive"] mode: Option<String>,
) -> Result<(), anyhow::Error> {
    let config = ctx.data().answer_config.read().await.clone();

    let query = match mode
        .as_deref()
        .unwrap_or("default")
        .parse::<AnswerMode>()
        .and_then(|mode| {
            Query::new(
                &question,
                top_k.unwrap_or(config.default_top_k) as usize,
                config.max_top_k as usize,
                mode,
            )
        }) {
        Ok(q) => q,
        Err(e) => {
            ctx.say(format!("Invalid request: {}", e)).await?;
            return Ok(());
        }
    };

    // Acknowledge immediately so the user isn't staring at a loading spinner
    let user_mention = format!("<@{}>", ctx.author().id);
    ctx.say(format!(
        "Got it, searching the documents. I'll ping you when the answer is ready, {}",
        user_mention
    ))
    .await?;

    info!(
        user = ctx.author().name,
        question = query.text(),
        top_k = query.top_k(),
        mode = %query.mode(),
        "Query started"
    );

    // Runs on its own task; on timeout the task is detached and its result dropped.
    let pipeline = ctx.data().pipeline.clone();
    let task_query = query.clone();
    let handle = tokio::spawn(async move { pipeline.answer(&task_query).await });

    let result = match tokio::time::timeout(Duration::from_secs(config.timeout_secs), handle).await
    {
        Ok(Ok(Ok(result))) => result,
        Ok(Ok(Err(e))) => {
            error!(error = %e, "Answering failed");
            ctx.say(format!("{} sorry, I couldn't answer that right now ({}).", user_mention, e))
                .await?;
            return Ok(());
        }
        Ok(Err(e)) => {
            error!(error = %e, "Answering task panicked");
            ctx.say(format!("{} sorry, something went wrong internally.", user_mention))
                .await?;
            return Ok(());
        }
        Err(_) => {
            warn!(timeout_secs = config.timeout_secs, "Query timed out");
            ctx.say(format!(
                "{} the request timed out after {}s.",
                user_mention, config.timeout_secs
            ))
            .await?;
            return Ok(());
        }
    };

    info!(
        answer_len = result.answer.len(),
        contexts = result.contexts.len(),
        "Query complete"
    );

    send_chunked(&ctx, &render_reply(&user_mention, &query, &result)).await
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > SNIPPET_CHARS {
        let cut: String = trimmed.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", cut.trim_end())
    } else {
        trimmed.to_string()
    }
}

fn render_reply(user_mention: &str, query: &Query, result: &AnswerResult) -> String {
    let mut full = format!(
        "{} here's what I found:\n\n**Q:** {}\n**Mode:** {} | **Contexts:** {}\n\n**A:**\n{}",
        user_mention,
        query.text(),
        query.mode(),
        result.contexts.len(),
        result.answer
    );

    if !result.contexts.is_empty() {
        full.push_str("\n\n**Contexts:**\n");
        for (i, context) in result.contexts.iter().enumerate() {
            full.push_str(&format!("**[{}]** {}\n", i + 1, snippet(context)));
        }
    }
    full
}
