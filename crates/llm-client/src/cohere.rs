use crate::error::{LlmError, LlmResult};
use crate::{Generation, TextGenerator};
use async_trait::async_trait;
use sentiment_core::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.cohere.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<Vec<ContentBlock>>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    billed_units: Option<BilledUnits>,
}

#[derive(Debug, Deserialize)]
struct BilledUnits {
    input_tokens: Option<f64>,
    output_tokens: Option<f64>,
}

/// Client for the Cohere v2 chat API.
#[derive(Clone)]
pub struct CohereClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CohereClient {
    pub fn new(provider: &ProviderConfig) -> LlmResult<Self> {
        let api_key = provider
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                LlmError::InvalidResponse(format!("provider '{}' has no API key", provider.name))
            })?;

        let base_url = provider
            .api_url
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
            model: provider.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for CohereClient {
    async fn generate(&self, prompt: &str) -> LlmResult<Generation> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v2/chat", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LlmError::ServiceUnavailable(format!(
                "status: {}",
                response.status()
            )));
        }

        let body = response.json::<ChatResponse>().await?;

        let text = body
            .message
            .and_then(|m| m.content)
            .and_then(|blocks| {
                let joined: String = blocks
                    .into_iter()
                    .filter_map(|b| b.text)
                    .collect::<Vec<_>>()
                    .join("");
                if joined.is_empty() {
                    None
                } else {
                    Some(joined)
                }
            })
            .ok_or_else(|| LlmError::InvalidResponse("chat response carried no text".into()))?;

        let (input_tokens, output_tokens) = body
            .usage
            .and_then(|u| u.billed_units)
            .map(|b| {
                (
                    b.input_tokens.unwrap_or(0.0) as i64,
                    b.output_tokens.unwrap_or(0.0) as i64,
                )
            })
            .unwrap_or((0, 0));

        Ok(Generation {
            text,
            input_tokens,
            output_tokens,
        })
    }
}
