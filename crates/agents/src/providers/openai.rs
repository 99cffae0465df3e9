//! OpenAI-compatible Chat Completions classifier client.

use std::time::Duration;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, warn},
};

use zapcrm_common::Temperature;

use crate::{
    model::{Classification, LeadClassifier},
    prompt,
};

/// Classifier speaking the OpenAI Chat Completions API, parameterized by
/// base URL so groq/gemini compat endpoints reuse the same client.
pub struct OpenAiCompatClassifier {
    provider: String,
    api_key: Secret<String>,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiCompatClassifier {
    pub fn new(
        provider: String,
        api_key: Secret<String>,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        // The timeout doubles as the classification deadline: expiry surfaces
        // as a plain request error, i.e. capability failure.
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            provider,
            api_key,
            model,
            base_url,
            client,
        })
    }
}

#[async_trait]
impl LeadClassifier for OpenAiCompatClassifier {
    fn provider(&self) -> &str {
        &self.provider
    }

    async fn classify(&self, directive: &str, message: &str) -> anyhow::Result<Classification> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": prompt::system_prompt(directive) },
                { "role": "user", "content": message },
            ],
            "response_format": { "type": "json_object" },
        });

        debug!(provider = %self.provider, model = %self.model, "classification request");

        let http_resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(provider = %self.provider, status = %status, body = %body_text, "classifier API error");
            anyhow::bail!("{} API error HTTP {status}: {body_text}", self.provider);
        }

        let resp = http_resp.json::<serde_json::Value>().await?;
        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("classifier response has no message content"))?;

        parse_output(content)
    }
}

#[derive(Deserialize)]
struct RawOutput {
    reply: Option<String>,
    temperature: Option<String>,
}

/// Parse the model's JSON answer into a [`Classification`].
///
/// Markdown code fences are tolerated (some models wrap JSON despite
/// `response_format`). A missing or empty `reply` is unparseable output —
/// fail, don't invent a message. An out-of-range temperature label coerces
/// to cold.
fn parse_output(content: &str) -> anyhow::Result<Classification> {
    let raw: RawOutput = serde_json::from_str(strip_code_fences(content))
        .map_err(|e| anyhow::anyhow!("unparseable classifier output: {e}"))?;

    let reply = raw
        .reply
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("classifier output missing reply"))?;
    let temperature = raw
        .temperature
        .as_deref()
        .map(Temperature::coerce)
        .unwrap_or(Temperature::Cold);

    Ok(Classification { reply, temperature })
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let inner = inner.split_once('\n').map_or("", |(_, rest)| rest);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
