use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A discussion thread root fetched by ingestion. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionPost {
    pub post_id: String,
    pub title: String,
    pub subreddit: String,
    pub author: String,
    pub score: i64,
    pub num_comments: i64,
    pub created_utc: i64,
    pub selftext: Option<String>,
    pub url: String,
}

/// A comment under a post. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionComment {
    pub post_id: String,
    pub parent_id: Option<String>,
    pub comment_id: String,
    pub author: String,
    pub body: String,
    pub score: i64,
    pub created_utc: i64,
    pub depth: i64,
}

/// Raised when a categorical label value is outside its permitted set.
#[derive(Debug, Error)]
#[error("unrecognized label value: {0}")]
pub struct ParseLabelError(pub String);

/// Polarity label used for both crypto_sentiment and future_sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }
}

impl FromStr for Sentiment {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "negative" => Ok(Sentiment::Negative),
            "neutral" => Ok(Sentiment::Neutral),
            "positive" => Ok(Sentiment::Positive),
            other => Err(ParseLabelError(other.to_string())),
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dominant emotion expressed by a discussion item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happiness,
    Hope,
    Anger,
    Sadness,
    Fear,
    Neutral,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Happiness => "happiness",
            Emotion::Hope => "hope",
            Emotion::Anger => "anger",
            Emotion::Sadness => "sadness",
            Emotion::Fear => "fear",
            Emotion::Neutral => "neutral",
        }
    }
}

impl FromStr for Emotion {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "happiness" => Ok(Emotion::Happiness),
            "hope" => Ok(Emotion::Hope),
            "anger" => Ok(Emotion::Anger),
            "sadness" => Ok(Emotion::Sadness),
            "fear" => Ok(Emotion::Fear),
            "neutral" => Ok(Emotion::Neutral),
            other => Err(ParseLabelError(other.to_string())),
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the item states an opinion rather than fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subjective {
    Yes,
    No,
}

impl Subjective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Subjective::Yes => "yes",
            Subjective::No => "no",
        }
    }
}

impl FromStr for Subjective {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(Subjective::Yes),
            "no" => Ok(Subjective::No),
            other => Err(ParseLabelError(other.to_string())),
        }
    }
}

impl fmt::Display for Subjective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sentiment label per (post_id, comment_id) pair.
/// Duplicate inserts are no-ops at the store layer, never overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentLabel {
    pub post_id: String,
    pub comment_id: String,
    pub crypto_sentiment: Sentiment,
    pub future_sentiment: Sentiment,
    pub emotion: Emotion,
    pub subjective: Subjective,
}

/// A post ⋈ comment ⋈ label join row, the unit the fusion engine consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledItem {
    pub post_id: String,
    pub comment_id: String,
    /// Comment score at ingestion time.
    pub score: i64,
    pub depth: i64,
    /// Comment creation time (unix seconds); drives hourly bucketing.
    pub created_utc: i64,
    pub crypto_sentiment: Sentiment,
    pub future_sentiment: Sentiment,
    pub emotion: Emotion,
    pub subjective: Subjective,
}

/// One market observation per (asset, timestamp, source). Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub asset: String,
    pub price: f64,
    pub price_currency: String,
    pub timestamp: i64,
    pub source: String,
    pub market_cap: Option<f64>,
    pub total_volume: Option<f64>,
    pub total_supply: Option<f64>,
    pub ath: Option<f64>,
    /// All-time-high date as an RFC 3339 string, as delivered by the price source.
    pub ath_date: Option<String>,
}

/// Operator-managed model configuration; exactly one active row per lookup key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub id: i64,
    pub name: String,
    pub prediction_currency: Option<String>,
    pub description: Option<String>,
    pub provider: String,
    pub model: String,
    pub model_type: String,
    pub hyperparameters: serde_json::Value,
    pub numeric_features: Vec<String>,
    pub categorical_features: Vec<String>,
    pub target_variable: String,
    pub created_utc: i64,
    pub updated_utc: i64,
    pub is_active: bool,
}

/// Output of one per-asset prediction. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub asset: String,
    pub priced_in: String,
    pub currency_price: f64,
    pub model_provider: String,
    pub model: String,
    pub predicted_price: f64,
    pub prediction_timestamp: i64,
    pub created_utc: i64,
}

/// A labeling provider's identity, credentials and rate quota.
/// total_used_tokens only ever grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: i64,
    pub name: String,
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub tokens_per_minute: Option<i64>,
    pub calls_per_minute: Option<i64>,
    pub total_used_tokens: i64,
    pub is_active: bool,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_enums_round_trip_wire_spelling() {
        for value in ["negative", "neutral", "positive"] {
            assert_eq!(value.parse::<Sentiment>().unwrap().as_str(), value);
        }
        for value in ["happiness", "hope", "anger", "sadness", "fear", "neutral"] {
            assert_eq!(value.parse::<Emotion>().unwrap().as_str(), value);
        }
        for value in ["yes", "no"] {
            assert_eq!(value.parse::<Subjective>().unwrap().as_str(), value);
        }
    }

    #[test]
    fn label_enums_reject_unknown_values() {
        assert!("bullish".parse::<Sentiment>().is_err());
        assert!("joy".parse::<Emotion>().is_err());
        assert!("maybe".parse::<Subjective>().is_err());
    }
}
