use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::corpus::chunk::ChunkConfig;
use crate::corpus::PassageStore;
use crate::pipeline::Pipeline;

/// Answering parameters admins can change at runtime.
#[derive(Debug, Clone)]
pub struct AnswerConfig {
    pub default_top_k: u32,
    pub max_top_k: u32,
    /// Wall-clock limit for one `ask`, retries included.
    pub timeout_secs: u64,
}

impl Default for AnswerConfig {
    fn default() -> Self {
        Self {
            default_top_k: 5,
            max_top_k: 10,
            timeout_secs: 60,
        }
    }
}

impl AnswerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_top_k: dotenv::var("DEFAULT_TOP_K")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|k| *k > 0)
                .unwrap_or(defaults.default_top_k),
            max_top_k: dotenv::var("MAX_TOP_K")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|k| *k > 0)
                .unwrap_or(defaults.max_top_k),
            timeout_secs: dotenv::var("API_REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .filter(|t| *t > 0)
                .unwrap_or(defaults.timeout_secs),
        }
    }
}

pub struct AppState {
    pub store: Arc<PassageStore>,
    pub pipeline: Arc<Pipeline>,
    pub chunking: ChunkConfig,
    pub admin_ids: HashSet<u64>,
    pub answer_config: Arc<RwLock<AnswerConfig>>,
}

impl AppState {
    pub fn is_admin(&self, user_id: u64) -> bool {
        self.admin_ids.contains(&user_id)
    }
}

pub type Context<'a> = poise::Context<'a, AppState, anyhow::Error>;
