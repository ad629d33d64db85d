//! Chat-completions classification client.
//!
//! One request per batch: the posts are embedded as JSON in a filtering
//! prompt and the model answers with a JSON array of verdicts, one per post
//! in order. Models pad their output with prose and code fences often enough
//! that the payload is cut down to the outermost JSON array before parsing.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::{Classifier, ClassifyError};
use crate::entities::{Classification, RawPost};
use crate::zones::normalize_zone_text;

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(120))
        .build()
        .expect("Failed to build HTTP client")
});

const SYSTEM_PROMPT: &str = "You are an assistant that filters and analyzes rental-housing ads.";

const BATCH_PROMPT: &str = r#"Analyze the posts below and return a JSON array with one object per post, in the same order as the input.
Exclude every post where someone is LOOKING FOR a room or an apartment, and every post that is not about an actual rental. The only relevant posts are listings of rooms or homes offered for rent.

For each post produce:
{
  "relevant": true or false,
  "title": "paraphrased title",
  "overview": "one-line summary",
  "description": "original description",
  "price": "...",
  "zone": "...",
  "rooms": "...",
  "reliability": number 0-5 (based on whether the information is sufficient, the ad has photos and contact details, and does not look like a scam),
  "rating_reason": "...",
  "published_at": "ISO 8601 publication date if the post carries one"
}
Answer ONLY with JSON. No extra text.
POSTS:
"#;

pub struct ChatClassifier {
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClassifier {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    async fn complete(&self, user_prompt: &str) -> Result<String, ClassifyError> {
        let response = HTTP_CLIENT
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": user_prompt},
                ],
            }))
            .send()
            .await
            .map_err(|err| ClassifyError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Http {
                status,
                retriable: status.is_server_error()
                    || status == reqwest::StatusCode::TOO_MANY_REQUESTS,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| ClassifyError::MalformedResponse(err.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ClassifyError::MalformedResponse("response carries no choices".into()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// The outermost JSON array in the model's output, fences and prose ignored.
fn extract_json_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (end > start).then(|| &raw[start..=end])
}

#[async_trait]
impl Classifier for ChatClassifier {
    #[instrument(skip_all, fields(batch = posts.len()))]
    async fn classify(&self, posts: &[RawPost]) -> Result<Vec<Classification>, ClassifyError> {
        let payload = serde_json::to_string(posts)
            .map_err(|err| ClassifyError::MalformedResponse(err.to_string()))?;
        let content = self.complete(&format!("{BATCH_PROMPT}{payload}")).await?;

        let body = extract_json_array(&content).ok_or_else(|| {
            ClassifyError::MalformedResponse("no JSON array in model output".to_string())
        })?;
        let verdicts: Vec<Classification> = serde_json::from_str(body)
            .map_err(|err| ClassifyError::MalformedResponse(err.to_string()))?;

        if verdicts.len() != posts.len() {
            return Err(ClassifyError::Misaligned {
                expected: posts.len(),
                got: verdicts.len(),
            });
        }
        debug!(
            relevant = verdicts.iter().filter(|v| v.relevant).count(),
            "batch classified"
        );
        Ok(verdicts)
    }

    async fn classify_zone(
        &self,
        text: &str,
        zones: &[String],
    ) -> Result<Option<String>, ClassifyError> {
        if zones.is_empty() {
            return Ok(None);
        }
        let prompt = format!(
            "Which of these zones does the following rental ad belong to?\n\
             Zones: {}\n\
             Answer with exactly one zone name from the list, or NONE if unsure.\n\
             Ad:\n{}",
            zones.join(", "),
            text
        );
        let content = self.complete(&prompt).await?;
        let answer = normalize_zone_text(content.trim().trim_matches('"'));
        Ok(zones
            .iter()
            .find(|zone| normalize_zone_text(zone) == answer)
            .cloned())
    }
}
