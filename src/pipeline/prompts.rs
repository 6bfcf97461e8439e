/// Which instruction template a generation call uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Cited, reasoned answer with an `Unknown` escape hatch.
    Reasoning,
    /// Bare extraction: the answer and nothing else.
    Extractive,
}

pub const REASONING_TEMPLATE: &str = r#"You are a medical expert assistant. Answer the question using ONLY the numbered document contexts below.

Rules (strict):
1. Use only information found in the contexts.
2. Be concise, accurate and factual. Prefer extraction over paraphrase.
3. If any context contains information relevant to the question, you MUST answer from it. Do not abstain when relevant evidence exists.
4. Only if NONE of the contexts are relevant, respond exactly: Unknown
5. Cite contexts by number, like [1] or [2], when you use them. Merge overlapping points that appear in several contexts.
6. If the question asks for a list (symptoms, causes, treatments, ...), answer with a short bullet list.
7. Never add knowledge that is not in the contexts.

Contexts:
{contexts}

Question: {query}

Answer:"#;

pub const EXTRACTIVE_TEMPLATE: &str = r#"You are a careful extractor. Using ONLY the numbered contexts below, extract the direct answer to the question.

Instructions:
- If the answer is a list (symptoms, causes, treatments, ...), output a concise bullet list with one item per line.
- Otherwise answer in 1-3 short sentences.
- No preamble and no explanation; output only the answer.
- Never write "Answer not found in provided documents". If nothing relevant is present, output exactly: Unknown

Example:
Question: According to the provided context, list 5 common symptoms of acute myocardial infarction.
Answer:
- Chest pain (often central, pressure-like)
- Sweating (diaphoresis)
- Nausea or vomiting
- Tachycardia or palpitations
- Shortness of breath (dyspnea)

Contexts:
{contexts}

Question: {query}

Answer:"#;

impl PromptKind {
    pub fn template(self) -> &'static str {
        match self {
            PromptKind::Reasoning => REASONING_TEMPLATE,
            PromptKind::Extractive => EXTRACTIVE_TEMPLATE,
        }
    }
}

/// Number contexts from 1 in retrieval order, one blank line apart.
pub fn format_contexts(contexts: &[String]) -> String {
    contexts
        .iter()
        .enumerate()
        .map(|(i, c)| format!("[{}] {}", i + 1, c.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render a full prompt payload for one generation call.
///
/// Placeholders are filled in a single left-to-right pass over the template,
/// so substituted text is never scanned for placeholders again.
pub fn format(kind: PromptKind, contexts: &[String], query: &str) -> String {
    let rendered_contexts = format_contexts(contexts);
    let mut out = String::new();
    let mut rest = kind.template();

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{query}") {
            out.push_str(query);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{contexts}") {
            out.push_str(&rendered_contexts);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
