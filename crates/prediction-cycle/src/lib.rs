//! Per-asset prediction cycle: select the active model config, extract the
//! asset's feature subset, preprocess, fit a transient model instance,
//! predict, and calibrate the result into a future-price estimate.

pub mod preprocess;
pub mod registry;

pub use preprocess::{OneHotEncoder, Preprocessor, StandardScaler};
pub use registry::{GbdtRegressor, ModelRegistry, Regressor};

use chrono::Utc;
use fusion_engine::{FusedRow, FusionFrame};
use sentiment_core::{
    ModelConfig, PipelineConfig, PipelineError, PipelineResult, PredictionRecord,
};
use sentiment_store::Store;

/// Feature matrices for one asset, split the way the preprocessor wants
/// them: numeric and categorical blocks for the training and inference
/// views, plus the supervised target column.
#[derive(Debug)]
struct ExtractedFeatures {
    train_numeric: Vec<Vec<f64>>,
    train_categorical: Vec<Vec<String>>,
    targets: Vec<f64>,
    infer_numeric: Vec<Vec<f64>>,
    infer_categorical: Vec<Vec<String>>,
}

fn validate_feature_names(config: &ModelConfig) -> PipelineResult<()> {
    for name in &config.numeric_features {
        if !FusedRow::numeric_columns().contains(&name.as_str()) {
            return Err(PipelineError::Configuration(format!(
                "model config '{}' names unknown numeric feature '{name}'",
                config.name
            )));
        }
    }
    for name in &config.categorical_features {
        if !FusedRow::categorical_columns().contains(&name.as_str()) {
            return Err(PipelineError::Configuration(format!(
                "model config '{}' names unknown categorical feature '{name}'",
                config.name
            )));
        }
    }
    if !FusedRow::numeric_columns().contains(&config.target_variable.as_str()) {
        return Err(PipelineError::Configuration(format!(
            "model config '{}' names unknown target '{}'",
            config.name, config.target_variable
        )));
    }
    Ok(())
}

/// Pull one row's configured features; None when any is missing, which
/// drops the row from the matrix.
fn row_features(row: &FusedRow, config: &ModelConfig) -> Option<(Vec<f64>, Vec<String>)> {
    let mut numeric = Vec::with_capacity(config.numeric_features.len());
    for name in &config.numeric_features {
        numeric.push(row.numeric_value(name)?);
    }
    let mut categorical = Vec::with_capacity(config.categorical_features.len());
    for name in &config.categorical_features {
        categorical.push(row.categorical_value(name)?.to_string());
    }
    Some((numeric, categorical))
}

/// Select exactly the configured feature columns for one asset from both
/// views, preserving row order. Either subset coming up empty is a data
/// gap: there must be data to fit on and data to predict on.
fn extract_features(
    frame: &FusionFrame,
    asset: &str,
    config: &ModelConfig,
) -> PipelineResult<ExtractedFeatures> {
    validate_feature_names(config)?;

    let mut train_numeric = Vec::new();
    let mut train_categorical = Vec::new();
    let mut targets = Vec::new();
    for row in frame.training.iter().filter(|r| r.asset == asset) {
        let (Some((numeric, categorical)), Some(target)) = (
            row_features(row, config),
            row.numeric_value(&config.target_variable),
        ) else {
            continue;
        };
        train_numeric.push(numeric);
        train_categorical.push(categorical);
        targets.push(target);
    }

    let mut infer_numeric = Vec::new();
    let mut infer_categorical = Vec::new();
    for row in frame.inference.iter().filter(|r| r.asset == asset) {
        let Some((numeric, categorical)) = row_features(row, config) else {
            continue;
        };
        infer_numeric.push(numeric);
        infer_categorical.push(categorical);
    }

    if train_numeric.is_empty() {
        return Err(PipelineError::DataGap(format!(
            "no training rows with complete features for asset '{asset}'"
        )));
    }
    if infer_numeric.is_empty() {
        return Err(PipelineError::DataGap(format!(
            "no inference rows with complete features for asset '{asset}'"
        )));
    }

    Ok(ExtractedFeatures {
        train_numeric,
        train_categorical,
        targets,
        infer_numeric,
        infer_categorical,
    })
}

/// Reduce row-level predictions to one scalar. Kept as the arithmetic mean;
/// isolated here so a weighted variant can replace it without touching the
/// cycle.
fn mean_prediction(predictions: &[f64]) -> Option<f64> {
    if predictions.is_empty() {
        return None;
    }
    Some(predictions.iter().sum::<f64>() / predictions.len() as f64)
}

pub struct PredictionCycle {
    store: Store,
    registry: ModelRegistry,
    config: PipelineConfig,
}

impl PredictionCycle {
    pub fn new(store: Store, registry: ModelRegistry, config: PipelineConfig) -> Self {
        Self {
            store,
            registry,
            config,
        }
    }

    /// Run one prediction per tracked asset against a fused frame. A single
    /// asset's failure is logged and skipped; zero successes fail the whole
    /// cycle. Successful records are persisted in one transaction and the
    /// success count returned.
    pub async fn run(&self, frame: &FusionFrame, horizon_hours: i64) -> PipelineResult<usize> {
        let now = Utc::now().timestamp();
        let mut records = Vec::new();

        for asset in &self.config.tracked_assets {
            match self.predict_asset(frame, asset, horizon_hours, now).await {
                Ok(record) => {
                    tracing::info!(
                        asset = %asset,
                        predicted_price = record.predicted_price,
                        "prediction made"
                    );
                    records.push(record);
                }
                Err(e) => {
                    tracing::warn!(asset = %asset, error = %e, "skipping asset");
                }
            }
        }

        if records.is_empty() {
            return Err(PipelineError::Validation(
                "no predictions were made for any tracked asset".into(),
            ));
        }

        self.store.insert_predictions(&records).await?;
        Ok(records.len())
    }

    async fn predict_asset(
        &self,
        frame: &FusionFrame,
        asset: &str,
        horizon_hours: i64,
        now: i64,
    ) -> PipelineResult<PredictionRecord> {
        let model_config = self.store.active_model_config(asset, None, None).await?;

        // Current price comes from the asset's first training row, not a
        // fresh quote; the estimate must be calibrated against the price
        // the model was trained relative to.
        let current_price = frame
            .training
            .iter()
            .find(|r| r.asset == asset)
            .and_then(|r| r.price_now)
            .ok_or_else(|| {
                PipelineError::DataGap(format!("no current price for asset '{asset}'"))
            })?;

        let features = extract_features(frame, asset, &model_config)?;

        let preprocessor = Preprocessor::fit(&features.train_numeric, &features.train_categorical);
        let x_train = preprocessor.transform(&features.train_numeric, &features.train_categorical)?;
        let x_infer = preprocessor.transform(&features.infer_numeric, &features.infer_categorical)?;

        let mut model = self.registry.build(
            &model_config.provider,
            &model_config.model,
            &model_config.hyperparameters,
        )?;
        model.fit(&x_train, &features.targets)?;
        let predictions = model.predict(&x_infer)?;

        // The model predicts a percentage price change, not a price.
        let mean_change = mean_prediction(&predictions).ok_or_else(|| {
            PipelineError::DataGap(format!("model produced no predictions for asset '{asset}'"))
        })?;
        let predicted_price = current_price * (1.0 + mean_change / 100.0);

        Ok(PredictionRecord {
            asset: asset.to_string(),
            priced_in: self.config.main_currency.clone(),
            currency_price: current_price,
            model_provider: model_config.provider,
            model: model_config.model,
            predicted_price,
            prediction_timestamp: now + horizon_hours * 3600,
            created_utc: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sentiment_core::{Emotion, LabeledItem, PriceSnapshot, Sentiment, Subjective};

    struct ConstantModel(f64);

    impl Regressor for ConstantModel {
        fn fit(&mut self, _x: &[Vec<f64>], _y: &[f64]) -> PipelineResult<()> {
            Ok(())
        }

        fn predict(&self, x: &[Vec<f64>]) -> PipelineResult<Vec<f64>> {
            Ok(vec![self.0; x.len()])
        }
    }

    fn mock_registry(constant: f64) -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry.register("mock", "Constant", move |_| Box::new(ConstantModel(constant)));
        registry
    }

    fn ts(h: u32) -> i64 {
        Utc.with_ymd_and_hms(2025, 1, 1, h, 0, 0).unwrap().timestamp()
    }

    fn item(comment_id: &str, created_utc: i64) -> LabeledItem {
        LabeledItem {
            post_id: "p1".to_string(),
            comment_id: comment_id.to_string(),
            score: 5,
            depth: 0,
            created_utc,
            crypto_sentiment: Sentiment::Positive,
            future_sentiment: Sentiment::Neutral,
            emotion: Emotion::Hope,
            subjective: Subjective::Yes,
        }
    }

    fn snapshot(asset: &str, timestamp: i64, price: f64) -> PriceSnapshot {
        PriceSnapshot {
            asset: asset.to_string(),
            price,
            price_currency: "usd".to_string(),
            timestamp,
            source: "coingecko".to_string(),
            market_cap: Some(1.0e12),
            total_volume: Some(3.0e10),
            total_supply: Some(2.1e7),
            ath: Some(200.0),
            ath_date: Some("2024-12-01T00:00:00Z".to_string()),
        }
    }

    fn mock_model_config(asset: &str) -> sentiment_core::ModelConfig {
        sentiment_core::ModelConfig {
            id: 0,
            name: format!("{asset}-mock"),
            prediction_currency: Some(asset.to_string()),
            description: None,
            provider: "mock".to_string(),
            model: "Constant".to_string(),
            model_type: "regression".to_string(),
            hyperparameters: serde_json::json!({}),
            numeric_features: vec!["score".to_string(), "hours_since_ath".to_string()],
            categorical_features: vec!["emotion".to_string(), "subjective".to_string()],
            target_variable: "price_diff_percentage".to_string(),
            created_utc: 0,
            updated_utc: 0,
            is_active: true,
        }
    }

    fn frame_for(assets: &[&str]) -> FusionFrame {
        let items = vec![item("c1", ts(0)), item("c2", ts(1))];
        let mut prices = Vec::new();
        for asset in assets {
            prices.push(snapshot(asset, ts(0), 100.0));
            prices.push(snapshot(asset, ts(1), 102.0));
            prices.push(snapshot(asset, ts(12), 110.0));
            prices.push(snapshot(asset, ts(13), 108.0));
        }
        let asset_names: Vec<String> = assets.iter().map(|s| s.to_string()).collect();
        fusion_engine::fuse(&items, &prices, &asset_names, 12).unwrap()
    }

    #[tokio::test]
    async fn constant_five_percent_yields_calibrated_price() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        store.insert_model_config(&mock_model_config("bitcoin")).await.unwrap();

        let config = PipelineConfig {
            tracked_assets: vec!["bitcoin".to_string()],
            ..PipelineConfig::default()
        };
        let cycle = PredictionCycle::new(store.clone(), mock_registry(5.0), config);

        let frame = frame_for(&["bitcoin"]);
        let before = Utc::now().timestamp();
        let count = cycle.run(&frame, 12).await.unwrap();
        let after = Utc::now().timestamp();
        assert_eq!(count, 1);

        let saved = store.fetch_predictions("bitcoin", 1).await.unwrap();
        assert_eq!(saved.len(), 1);
        // current price 100.0, constant +5% -> 105.0
        assert!((saved[0].predicted_price - 105.0).abs() < 1e-9);
        assert_eq!(saved[0].currency_price, 100.0);
        // prediction timestamp is run time + horizon, within a second.
        assert!(saved[0].prediction_timestamp >= before + 12 * 3600);
        assert!(saved[0].prediction_timestamp <= after + 12 * 3600);
    }

    #[tokio::test]
    async fn asset_without_active_config_is_skipped_not_fatal() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        store.insert_model_config(&mock_model_config("bitcoin")).await.unwrap();

        let config = PipelineConfig {
            tracked_assets: vec!["bitcoin".to_string(), "ethereum".to_string()],
            ..PipelineConfig::default()
        };
        let cycle = PredictionCycle::new(store.clone(), mock_registry(5.0), config);

        let frame = frame_for(&["bitcoin", "ethereum"]);
        let count = cycle.run(&frame, 12).await.unwrap();
        assert_eq!(count, 1);
        assert!(store.fetch_predictions("ethereum", 1).await.unwrap().is_empty());
        assert_eq!(store.fetch_predictions("bitcoin", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn zero_successful_assets_fail_the_cycle() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        let config = PipelineConfig {
            tracked_assets: vec!["dogecoin".to_string()],
            ..PipelineConfig::default()
        };
        let cycle = PredictionCycle::new(store.clone(), mock_registry(5.0), config);

        let frame = frame_for(&["dogecoin"]);
        let err = cycle.run(&frame, 12).await.unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_feature_name_is_a_configuration_error() {
        let frame = frame_for(&["bitcoin"]);
        let mut config = mock_model_config("bitcoin");
        config.numeric_features = vec!["rsi_14".to_string()];

        let err = extract_features(&frame, "bitcoin", &config).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn mean_reduction_over_inference_rows() {
        assert_eq!(mean_prediction(&[2.0, 4.0, 6.0]), Some(4.0));
        assert_eq!(mean_prediction(&[]), None);
    }
}
