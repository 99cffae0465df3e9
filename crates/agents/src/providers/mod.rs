//! LLM provider clients for the classifier.
//!
//! Every supported provider speaks the OpenAI Chat Completions shape, so a
//! single compat client parameterized by base URL covers them all.

pub mod openai;

use std::time::Duration;

use secrecy::ExposeSecret;

use crate::{
    agent::Agent,
    model::{ClassifierResolver, LeadClassifier},
};

pub use openai::OpenAiCompatClassifier;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Maps agent provider ids to live classifier clients.
pub struct ProviderResolver {
    timeout: Duration,
}

impl ProviderResolver {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ClassifierResolver for ProviderResolver {
    fn resolve(&self, agent: &Agent) -> anyhow::Result<Box<dyn LeadClassifier>> {
        let api_key = agent
            .api_key
            .clone()
            .filter(|k| !k.expose_secret().is_empty())
            .ok_or_else(|| anyhow::anyhow!("agent {} has no api key configured", agent.id))?;

        let (base_url, default_model) = match agent.provider.as_str() {
            "openai" => (OPENAI_BASE_URL, "gpt-4o-mini"),
            "groq" => (GROQ_BASE_URL, "llama-3.3-70b-versatile"),
            "gemini" => (GEMINI_BASE_URL, "gemini-2.0-flash"),
            other => anyhow::bail!("unsupported classifier provider: {other}"),
        };

        let model = agent
            .model
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| default_model.to_string());

        Ok(Box::new(OpenAiCompatClassifier::new(
            agent.provider.clone(),
            api_key,
            model,
            base_url.to_string(),
            self.timeout,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::Secret;

    use super::*;

    fn agent(provider: &str, key: Option<&str>) -> Agent {
        Agent {
            id: "a1".into(),
            tenant_id: "t1".into(),
            name: "Ana".into(),
            personality: "friendly".into(),
            provider: provider.into(),
            model: None,
            api_key: key.map(|k| Secret::new(k.to_string())),
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn resolves_known_providers() {
        let resolver = ProviderResolver::new(Duration::from_secs(5));
        for provider in ["openai", "groq", "gemini"] {
            let classifier = resolver.resolve(&agent(provider, Some("sk-x"))).unwrap();
            assert_eq!(classifier.provider(), provider);
        }
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let resolver = ProviderResolver::new(Duration::from_secs(5));
        assert!(resolver.resolve(&agent("fax-machine", Some("sk-x"))).is_err());
    }

    #[test]
    fn missing_or_empty_key_is_an_error() {
        let resolver = ProviderResolver::new(Duration::from_secs(5));
        assert!(resolver.resolve(&agent("openai", None)).is_err());
        assert!(resolver.resolve(&agent("openai", Some(""))).is_err());
    }
}
