use super::send_chunked;
use crate::corpus::types::SourceMeta;
use crate::state::Context;

/// List ingested document sources
#[poise::command(slash_command, guild_only)]
pub async fn sources(
    ctx: Context<'_>,
    #[description = "Max sources to show"] limit: Option<u32>,
) -> Result<(), anyhow::Error> {
    let limit = limit.unwrap_or(20) as usize;
    let sources = ctx.data().store.sources(limit).await?;

    if sources.is_empty() {
        ctx.say("No documents ingested yet. Use `/medrag ingest` to add some.")
            .await?;
        return Ok(());
    }

    send_chunked(&ctx, &render_sources(&sources)).await
}

/// Group sources by label, one line per source.
fn render_sources(sources: &[SourceMeta]) -> String {
    let mut by_label: std::collections::BTreeMap<&str, Vec<&SourceMeta>> =
        std::collections::BTreeMap::new();
    for meta in sources {
        by_label.entry(meta.label.as_str()).or_default().push(meta);
    }

    let mut output = String::from("**Ingested Documents**\n\n");
    for (label, metas) in &by_label {
        output.push_str(&format!("**Topic: {}**\n", label));
        for meta in metas {
            output.push_str(&format!(
                "  - {} ({} KB, {} passages)\n    Source: {}\n",
                meta.name,
                meta.size / 1024,
                meta.passage_count,
                meta.source
            ));
        }
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, label: &str) -> SourceMeta {
        SourceMeta {
            source: format!("url:https://example.org/{}", name),
            name: name.to_string(),
            label: label.to_string(),
            passage_count: 3,
            size: 4096,
            ingested_at: 0,
        }
    }

    #[test]
    fn test_render_sources_groups_by_label() {
        let out = render_sources(&[
            meta("mi.html", "cardiology"),
            meta("ckd.html", "nephrology"),
            meta("acs.html", "cardiology"),
        ]);
        let cardio = out.find("**Topic: cardiology**").unwrap();
        let nephro = out.find("**Topic: nephrology**").unwrap();
        assert!(cardio < nephro);
        assert!(out.contains("  - mi.html (4 KB, 3 passages)\n    Source: url:https://example.org/mi.html"));
        let acs = out.find("acs.html").unwrap();
        assert!(cardio < acs && acs < nephro);
    }
}
