use chrono::{DateTime, Utc};
use sentiment_core::{Emotion, Sentiment, Subjective};
use serde::{Deserialize, Serialize};

/// One fused feature row: a labeled discussion item expanded against one
/// tracked asset and joined with that asset's hourly price context. Both
/// fusion views (training and inference) share this shape; price-derived
/// fields are None when the bucket had no matching snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedRow {
    pub post_id: String,
    pub comment_id: String,
    pub asset: String,
    /// Hourly bucket key: comment creation time truncated to the hour
    /// (unix seconds).
    pub bucket: i64,
    pub score: i64,
    pub depth: i64,
    pub crypto_sentiment: Sentiment,
    pub future_sentiment: Sentiment,
    pub emotion: Emotion,
    pub subjective: Subjective,
    pub price_now: Option<f64>,
    pub market_cap_now: Option<f64>,
    pub total_volume_now: Option<f64>,
    pub total_supply_now: Option<f64>,
    pub ath_now: Option<f64>,
    pub ath_date_now: Option<DateTime<Utc>>,
    /// Price of the same asset H hours after this row's bucket.
    pub future_price: Option<f64>,
    /// (bucket − ath_date) in hours, 2 decimals; negative when the all-time
    /// high postdates the bucket.
    pub hours_since_ath: Option<f64>,
    /// Supervised target: (future − now) / now × 100, 2 decimals.
    pub price_diff_percentage: Option<f64>,
}

impl FusedRow {
    /// Look up a numeric feature by its configured column name.
    pub fn numeric_value(&self, name: &str) -> Option<f64> {
        match name {
            "score" => Some(self.score as f64),
            "depth" => Some(self.depth as f64),
            "price_now" => self.price_now,
            "market_cap_now" => self.market_cap_now,
            "total_volume_now" => self.total_volume_now,
            "total_supply_now" => self.total_supply_now,
            "ath_now" => self.ath_now,
            "hours_since_ath" => self.hours_since_ath,
            "price_diff_percentage" => self.price_diff_percentage,
            _ => None,
        }
    }

    /// Look up a categorical feature by its configured column name.
    pub fn categorical_value(&self, name: &str) -> Option<&'static str> {
        match name {
            "crypto_sentiment" => Some(self.crypto_sentiment.as_str()),
            "future_sentiment" => Some(self.future_sentiment.as_str()),
            "emotion" => Some(self.emotion.as_str()),
            "subjective" => Some(self.subjective.as_str()),
            _ => None,
        }
    }

    /// Column names `numeric_value` understands; used to validate model
    /// configs before extraction.
    pub fn numeric_columns() -> &'static [&'static str] {
        &[
            "score",
            "depth",
            "price_now",
            "market_cap_now",
            "total_volume_now",
            "total_supply_now",
            "ath_now",
            "hours_since_ath",
            "price_diff_percentage",
        ]
    }

    /// Column names `categorical_value` understands.
    pub fn categorical_columns() -> &'static [&'static str] {
        &["crypto_sentiment", "future_sentiment", "emotion", "subjective"]
    }

    /// Human-readable bucket key, e.g. "2025-01-01 14:00".
    pub fn bucket_label(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.bucket, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:00").to_string())
            .unwrap_or_else(|| self.bucket.to_string())
    }
}
