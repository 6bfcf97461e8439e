use crate::state::Context;

/// Check that the passage store is readable
#[poise::command(slash_command, guild_only)]
pub async fn health(ctx: Context<'_>) -> Result<(), anyhow::Error> {
    let passages = ctx.data().store.passage_count().await?;
    ctx.say(format!("Status: ok ({} passages indexed)", passages))
        .await?;
    Ok(())
}
