//! Model instantiation: a registry mapping (provider, model) pairs to
//! factory functions, validated against the enumerated supported set at
//! construction. An unconfigured pair is a configuration error, not a
//! fallback.

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use sentiment_core::{PipelineError, PipelineResult};
use std::collections::HashMap;

/// A regression model fit transiently per prediction cycle.
pub trait Regressor: Send {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> PipelineResult<()>;
    fn predict(&self, x: &[Vec<f64>]) -> PipelineResult<Vec<f64>>;
}

fn param_usize(params: &serde_json::Value, keys: &[&str], default: usize) -> usize {
    keys.iter()
        .find_map(|k| params.get(k).and_then(|v| v.as_u64()))
        .map(|v| v as usize)
        .unwrap_or(default)
}

fn param_f64(params: &serde_json::Value, keys: &[&str], default: f64) -> f64 {
    keys.iter()
        .find_map(|k| params.get(k).and_then(|v| v.as_f64()))
        .unwrap_or(default)
}

/// Gradient-boosted regression trees with squared-error loss.
pub struct GbdtRegressor {
    iterations: usize,
    max_depth: u32,
    shrinkage: f64,
    data_sample_ratio: f64,
    feature_sample_ratio: f64,
    model: Option<GBDT>,
}

impl GbdtRegressor {
    /// Build from a ModelConfig hyperparameter map. Both the native names
    /// and the common boosting aliases are accepted.
    pub fn from_params(params: &serde_json::Value) -> Self {
        Self {
            iterations: param_usize(params, &["iterations", "n_estimators"], 100),
            max_depth: param_usize(params, &["max_depth"], 4) as u32,
            shrinkage: param_f64(params, &["shrinkage", "learning_rate"], 0.1),
            data_sample_ratio: param_f64(params, &["data_sample_ratio", "subsample"], 1.0),
            feature_sample_ratio: param_f64(
                params,
                &["feature_sample_ratio", "colsample_bytree"],
                1.0,
            ),
            model: None,
        }
    }
}

impl Regressor for GbdtRegressor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> PipelineResult<()> {
        if x.is_empty() || x.len() != y.len() {
            return Err(PipelineError::Validation(format!(
                "bad training shape: {} feature rows, {} targets",
                x.len(),
                y.len()
            )));
        }

        let mut config = Config::new();
        config.set_feature_size(x[0].len());
        config.set_max_depth(self.max_depth);
        config.set_iterations(self.iterations);
        config.set_shrinkage(self.shrinkage as f32);
        config.set_data_sample_ratio(self.data_sample_ratio);
        config.set_feature_sample_ratio(self.feature_sample_ratio);
        config.set_loss("SquaredError");
        config.set_debug(false);
        config.set_training_optimization_level(2);

        let mut training: DataVec = x
            .iter()
            .zip(y)
            .map(|(features, target)| {
                Data::new_training_data(
                    features.iter().map(|v| *v as f32).collect(),
                    1.0,
                    *target as f32,
                    None,
                )
            })
            .collect();

        let mut model = GBDT::new(&config);
        model.fit(&mut training);
        self.model = Some(model);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> PipelineResult<Vec<f64>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| PipelineError::Validation("predict called before fit".into()))?;

        let test: DataVec = x
            .iter()
            .map(|features| Data::new_test_data(features.iter().map(|v| *v as f32).collect(), None))
            .collect();

        Ok(model.predict(&test).into_iter().map(f64::from).collect())
    }
}

type Factory = Box<dyn Fn(&serde_json::Value) -> Box<dyn Regressor> + Send + Sync>;

/// Registry of supported (provider, model) pairs.
pub struct ModelRegistry {
    factories: HashMap<(String, String), Factory>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// The enumerated production set: a single gradient-boosted regressor.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("gbdt", "GBDTRegressor", |params| {
            Box::new(GbdtRegressor::from_params(params))
        });
        registry
    }

    pub fn register<F>(&mut self, provider: &str, model: &str, factory: F)
    where
        F: Fn(&serde_json::Value) -> Box<dyn Regressor> + Send + Sync + 'static,
    {
        self.factories
            .insert((provider.to_string(), model.to_string()), Box::new(factory));
    }

    pub fn supports(&self, provider: &str, model: &str) -> bool {
        self.factories
            .contains_key(&(provider.to_string(), model.to_string()))
    }

    /// Instantiate the model for a config, or fail with a configuration
    /// error when the pair is not in the supported set.
    pub fn build(
        &self,
        provider: &str,
        model: &str,
        params: &serde_json::Value,
    ) -> PipelineResult<Box<dyn Regressor>> {
        self.factories
            .get(&(provider.to_string(), model.to_string()))
            .map(|factory| factory(params))
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "unsupported model: provider '{provider}', model '{model}'"
                ))
            })
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
