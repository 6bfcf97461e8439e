use crate::state::Context;

/// Configure answering parameters (admin only)
#[poise::command(slash_command, guild_only)]
pub async fn config(
    ctx: Context<'_>,
    #[description = "default_top_k | max_top_k | timeout_secs"] param: Option<String>,
    #[description = "New value"] value: Option<u32>,
) -> Result<(), anyhow::Error> {
    let user_id = ctx.author().id.get();
    if !ctx.data().is_admin(user_id) {
        ctx.say("This command is admin-only.").await?;
        return Ok(());
    }

    match (param.as_deref(), value) {
        // Show current config
        (None, _) => {
            let config = ctx.data().answer_config.read().await;
            ctx.say(format!(
                "**Answering Configuration:**\n\
                 `default_top_k`: {}\n\
                 `max_top_k`: {}\n\
                 `timeout_secs`: {}",
                config.default_top_k, config.max_top_k, config.timeout_secs
            ))
            .await?;
        }
        (Some(_), Some(0)) => {
            ctx.say("Values must be positive.").await?;
        }
        // Set a parameter
        (Some(key), Some(val)) => {
            let mut config = ctx.data().answer_config.write().await;
            match key {
                "default_top_k" => {
                    config.default_top_k = val;
                    ctx.say(format!("`default_top_k` set to {}", val)).await?;
                }
                "max_top_k" => {
                    config.max_top_k = val;
                    ctx.say(format!("`max_top_k` set to {}", val)).await?;
                }
                "timeout_secs" => {
                    config.timeout_secs = u64::from(val);
                    ctx.say(format!("`timeout_secs` set to {}", val)).await?;
                }
                _ => {
                    ctx.say(format!(
                        "Unknown param `{}`. Valid: `default_top_k`, `max_top_k`, `timeout_secs`",
                        key
                    ))
                    .await?;
                }
            }
        }
        (Some(_), None) => {
            ctx.say("Provide both `param` and `value`. Example: `/medrag config max_top_k 8`")
                .await?;
        }
    }

    Ok(())
}
