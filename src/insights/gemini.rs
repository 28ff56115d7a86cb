use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{build_prompt, Insight, InsightProvider};
use crate::config::InsightsConfig;
use crate::{Error, FinancialGoal, Result, Transaction, UserConfig};

/// Insights from Google's Gemini `generateContent` endpoint, constrained to a
/// JSON array of insights.
pub struct GeminiProvider {
    client: Client,
    config: InsightsConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "title": { "type": "STRING" },
                "message": { "type": "STRING" },
                "type": { "type": "STRING", "description": "One of: tip, warning, prediction" }
            },
            "required": ["title", "message", "type"]
        }
    })
}

impl GeminiProvider {
    pub fn new(config: InsightsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Insights(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

/// Extracts the insight list from a `generateContent` response body.
/// A response with no text is an empty list.
fn parse_response(body: &str) -> Result<Vec<Insight>> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| Error::Insights(format!("bad response: {e}")))?;
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text).map_err(|e| Error::Insights(format!("bad insight list: {e}")))
}

#[async_trait]
impl InsightProvider for GeminiProvider {
    async fn insights(
        &self,
        transactions: &[Transaction],
        config: &UserConfig,
        goals: &[FinancialGoal],
    ) -> Result<Vec<Insight>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Insights("no API key configured".into()))?;
        let prompt = build_prompt(transactions, config, goals, self.config.recent_transactions)?;
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: response_schema(),
            },
        };

        debug!(model = %self.config.model, "requesting insights");
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Insights(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Insights(format!("API error {status}: {body}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Insights(e.to_string()))?;
        parse_response(&body)
    }
}
