pub mod cohere;
pub mod error;
pub mod pacer;

pub use cohere::CohereClient;
pub use error::{LlmError, LlmResult};
pub use pacer::pacing_delay;

use async_trait::async_trait;
use sentiment_core::ProviderConfig;
use std::str::FromStr;
use std::sync::Arc;

/// Generated text plus the token usage the provider billed for it.
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
}

impl Generation {
    pub fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}

/// Text-generation capability of a labeling provider.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> LlmResult<Generation>;
}

/// Enumerated provider tags. Dispatch happens here once at configuration
/// load, not per call on a provider-name string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Cohere,
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cohere" => Ok(ProviderKind::Cohere),
            other => Err(LlmError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Resolve an active provider row into a concrete text generator.
pub fn build_generator(provider: &ProviderConfig) -> LlmResult<Arc<dyn TextGenerator>> {
    match provider.name.parse::<ProviderKind>()? {
        ProviderKind::Cohere => Ok(Arc::new(CohereClient::new(provider)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(name: &str, api_key: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            id: 1,
            name: name.to_string(),
            model: "command-r".to_string(),
            api_key: api_key.map(|k| k.to_string()),
            api_url: None,
            tokens_per_minute: Some(100_000),
            calls_per_minute: Some(20),
            total_used_tokens: 0,
            is_active: true,
            created_at: 0,
        }
    }

    #[test]
    fn provider_kind_resolves_known_names() {
        assert_eq!("cohere".parse::<ProviderKind>().unwrap(), ProviderKind::Cohere);
        assert_eq!("Cohere".parse::<ProviderKind>().unwrap(), ProviderKind::Cohere);
        assert!("openai".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn build_generator_rejects_unknown_provider() {
        let result = build_generator(&provider("anthropic", Some("key")));
        assert!(matches!(result, Err(LlmError::UnsupportedProvider(_))));
    }

    #[test]
    fn build_generator_requires_api_key() {
        assert!(build_generator(&provider("cohere", None)).is_err());
        assert!(build_generator(&provider("cohere", Some("key"))).is_ok());
    }
}
