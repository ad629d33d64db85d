//! Classification collaborator contract.
//!
//! Relevance filtering and the zone fallback are LLM calls behind a narrow
//! trait, so the pipeline can be exercised with scripted implementations and
//! the HTTP client stays an implementation detail.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::{Classification, RawPost};

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("http error {status}")]
    Http {
        status: reqwest::StatusCode,
        retriable: bool,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("misaligned batch: sent {expected} posts, got {got} verdicts")]
    Misaligned { expected: usize, got: usize },
}

impl ClassifyError {
    /// Whether retrying (typically with a smaller batch) can plausibly help.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Http { retriable, .. } => *retriable,
            // Timeouts and connection resets come and go.
            Self::Transport(_) => true,
            // Smaller batches produce shorter, better-formed model output.
            Self::MalformedResponse(_) => true,
            Self::Misaligned { .. } => true,
        }
    }
}

#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify a batch of raw posts. Verdicts align positionally with the
    /// input; implementations must error rather than return a short batch.
    async fn classify(&self, posts: &[RawPost]) -> Result<Vec<Classification>, ClassifyError>;

    /// Constrained zone fallback: pick one of `zones` for the given ad text,
    /// or nothing when the model is unsure.
    async fn classify_zone(
        &self,
        text: &str,
        zones: &[String],
    ) -> Result<Option<String>, ClassifyError>;
}
