pub mod attempt;
pub mod heuristic;
pub mod prompts;
pub mod retry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{BackendError, QueryError};

use attempt::{is_usable, AnswerAttempt, NOT_FOUND};
use prompts::PromptKind;
use retry::RetryPolicy;

/// Ranked passage lookup. Results are best-first and never longer than `k`.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<String>, BackendError>;
}

/// A text-generation backend: one prompt in, raw completion text out.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnswerMode {
    /// Reasoning pass first, extractive pass only on abstention.
    #[default]
    Default,
    /// Extractive pass only.
    Extractive,
}

impl FromStr for AnswerMode {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(AnswerMode::Default),
            "extractive" => Ok(AnswerMode::Extractive),
            other => Err(QueryError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerMode::Default => f.write_str("default"),
            AnswerMode::Extractive => f.write_str("extractive"),
        }
    }
}

/// A validated question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    top_k: usize,
    mode: AnswerMode,
}

impl Query {
    /// Trims the text, rejects blanks and a zero `top_k`, and caps `top_k` at `max_top_k`.
    pub fn new(
        text: &str,
        top_k: usize,
        max_top_k: usize,
        mode: AnswerMode,
    ) -> Result<Self, QueryError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(QueryError::EmptyQuery);
        }
        if top_k == 0 {
            return Err(QueryError::InvalidTopK);
        }
        Ok(Self {
            text: text.to_string(),
            top_k: top_k.min(max_top_k.max(1)),
            mode,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn mode(&self) -> AnswerMode {
        self.mode
    }
}

/// Final answer plus every context retrieval returned, in retrieval order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerResult {
    pub answer: String,
    pub contexts: Vec<String>,
}

/// Position in the fallback cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PrimaryGenerate,
    ExtractiveFallback,
    HeuristicCheck,
    Sentinel,
    Done,
}

pub fn entry_stage(mode: AnswerMode) -> Stage {
    match mode {
        AnswerMode::Default => Stage::PrimaryGenerate,
        AnswerMode::Extractive => Stage::ExtractiveFallback,
    }
}

/// Where to go after the reasoning pass.
///
/// A blank completion is neither an abstention nor an answer; it skips the
/// extractive pass and lands on the heuristic check so it can never reach
/// `Done` empty.
pub fn after_primary(attempt: &AnswerAttempt) -> Stage {
    if attempt.is_abstention() {
        Stage::ExtractiveFallback
    } else if attempt.is_usable() {
        Stage::Done
    } else {
        Stage::HeuristicCheck
    }
}

/// The extractive result replaces the candidate only when it is usable.
pub fn merge_fallback(candidate: String, fallback: &AnswerAttempt) -> String {
    if fallback.is_usable() {
        fallback.text.clone()
    } else {
        candidate
    }
}

pub fn needs_heuristic(answer: &str, query: &str) -> bool {
    !is_usable(answer) && heuristic::looks_like_list_query(query)
}

/// Trimmed answer, or the not-found text when nothing usable is left.
pub fn finalize(answer: &str) -> String {
    if is_usable(answer) {
        answer.trim().to_string()
    } else {
        NOT_FOUND.to_string()
    }
}

/// State of one cascade run. Generation is driven from outside; everything
/// here is synchronous.
struct Cascade<'a> {
    query: &'a Query,
    contexts: &'a [String],
    stage: Stage,
    answer: String,
}

impl<'a> Cascade<'a> {
    fn new(query: &'a Query, contexts: &'a [String]) -> Self {
        Self {
            query,
            contexts,
            stage: entry_stage(query.mode()),
            answer: String::new(),
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!(from = ?self.stage, to = ?next, "cascade transition");
        self.stage = next;
    }

    fn on_primary(&mut self, attempt: AnswerAttempt) {
        let next = after_primary(&attempt);
        if next == Stage::ExtractiveFallback {
            info!(answer_len = attempt.text.len(), "Reasoning pass abstained, trying extractive pass");
        }
        self.answer = attempt.text;
        self.advance(next);
    }

    fn on_extractive(&mut self, attempt: AnswerAttempt) {
        debug!(
            kind = ?attempt.kind,
            usable = attempt.is_usable(),
            "extractive pass complete"
        );
        let candidate = std::mem::take(&mut self.answer);
        self.answer = merge_fallback(candidate, &attempt);
        self.advance(Stage::HeuristicCheck);
    }

    fn on_heuristic_check(&mut self) {
        if needs_heuristic(&self.answer, self.query.text()) {
            let items = heuristic::extract(
                self.contexts,
                self.query.text(),
                heuristic::DEFAULT_MAX_ITEMS,
            );
            info!(items = items.len(), "Heuristic list extraction ran");
            if !items.is_empty() {
                self.answer = heuristic::render_bullets(&items);
            }
        }
        self.advance(Stage::Sentinel);
    }

    fn on_sentinel(&mut self) {
        self.answer = finalize(&self.answer);
        self.advance(Stage::Done);
    }
}

/// Retrieval, generation and the fallback cascade under one retry envelope.
pub struct Pipeline {
    retriever: Arc<dyn Retriever>,
    llm: Arc<dyn GenerationClient>,
    retry: RetryPolicy,
}

impl Pipeline {
    pub fn new(retriever: Arc<dyn Retriever>, llm: Arc<dyn GenerationClient>) -> Self {
        Self {
            retriever,
            llm,
            retry: RetryPolicy::default(),
        }
    }

    /// Answer a query. Backend failures are retried as a whole; once attempts
    /// run out the last error is returned. Unhelpful generations never error.
    pub async fn answer(&self, query: &Query) -> Result<AnswerResult, BackendError> {
        self.retry.run(|| self.attempt(query)).await
    }

    async fn attempt(&self, query: &Query) -> Result<AnswerResult, BackendError> {
        let contexts = self
            .retriever
            .similarity_search(query.text(), query.top_k())
            .await?;
        debug!(
            top_k = query.top_k(),
            retrieved = contexts.len(),
            mode = %query.mode(),
            "contexts retrieved"
        );

        let mut cascade = Cascade::new(query, &contexts);
        loop {
            match cascade.stage {
                Stage::PrimaryGenerate => {
                    let attempt = self.generate(PromptKind::Reasoning, &contexts, query).await?;
                    cascade.on_primary(attempt);
                }
                Stage::ExtractiveFallback => {
                    let attempt = self.generate(PromptKind::Extractive, &contexts, query).await?;
                    cascade.on_extractive(attempt);
                }
                Stage::HeuristicCheck => cascade.on_heuristic_check(),
                Stage::Sentinel => cascade.on_sentinel(),
                Stage::Done => break,
            }
        }

        let answer = finalize(&cascade.answer);
        Ok(AnswerResult { answer, contexts })
    }

    async fn generate(
        &self,
        kind: PromptKind,
        contexts: &[String],
        query: &Query,
    ) -> Result<AnswerAttempt, BackendError> {
        let prompt = prompts::format(kind, contexts, query.text());
        let text = self.llm.generate(&prompt).await?;
        debug!(?kind, response_len = text.len(), "generation complete");
        Ok(AnswerAttempt::new(text, kind))
    }
}
