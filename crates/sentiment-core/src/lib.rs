pub mod config;
pub mod error;
pub mod types;

pub use config::{PipelineConfig, ResponseTolerance};
pub use error::{PipelineError, PipelineResult};
pub use types::{
    DiscussionComment, DiscussionPost, Emotion, LabeledItem, ModelConfig, ParseLabelError,
    PredictionRecord, PriceSnapshot, ProviderConfig, Sentiment, SentimentLabel, Subjective,
};
