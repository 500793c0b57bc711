//! Chat-completion classifier
//!
//! Sends one user message to an OpenAI-compatible chat-completion endpoint and
//! reads the first choice back as the verdict.

use super::{build_prompt, Classifier, Verdict};
use crate::config::ClassifierConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

/// Classifier backed by a hosted language model
#[derive(Clone)]
pub struct ChatClassifier {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    item_code: String,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

impl ChatClassifier {
    pub fn new(
        config: &ClassifierConfig,
        api_key: String,
        item_code: &str,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            item_code: item_code.to_string(),
        })
    }

    /// Sends the prompt and returns the raw reply text
    async fn call_api(&self, prompt: &str) -> Result<String, String> {
        let body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("classifier API error {}: {}", status, body));
        }

        let api_response: ApiResponse = response.json().await.map_err(|e| e.to_string())?;
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| "classifier returned no choices".to_string())
    }
}

#[async_trait]
impl Classifier for ChatClassifier {
    async fn classify(&self, text: &str) -> Verdict {
        let prompt = build_prompt(&self.item_code, text);
        match self.call_api(&prompt).await {
            Ok(reply) => {
                let verdict = Verdict::from_reply(&reply);
                tracing::debug!("Classifier replied {:?} -> {:?}", reply.trim(), verdict);
                verdict
            }
            Err(e) => {
                tracing::warn!("Classification failed, marking unclear: {}", e);
                Verdict::Unclear
            }
        }
    }
}
