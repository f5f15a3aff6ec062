use crate::Store;
use sentiment_core::{ModelConfig, PipelineError, PipelineResult};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
struct ModelConfigRow {
    id: i64,
    name: String,
    prediction_currency: Option<String>,
    description: Option<String>,
    provider: String,
    model: String,
    model_type: String,
    hyperparameters: Option<String>,
    numeric_features: Option<String>,
    categorical_features: Option<String>,
    target_variable: Option<String>,
    created_utc: i64,
    updated_utc: i64,
    is_active: bool,
}

impl ModelConfigRow {
    fn into_config(self) -> PipelineResult<ModelConfig> {
        let bad_json = |field: &str| {
            PipelineError::Configuration(format!(
                "model config '{}' has malformed {field}",
                self.name
            ))
        };

        let hyperparameters = match &self.hyperparameters {
            Some(raw) => serde_json::from_str(raw).map_err(|_| bad_json("hyperparameters"))?,
            None => serde_json::Value::Object(serde_json::Map::new()),
        };
        let numeric_features: Vec<String> = match &self.numeric_features {
            Some(raw) => serde_json::from_str(raw).map_err(|_| bad_json("numeric_features"))?,
            None => Vec::new(),
        };
        let categorical_features: Vec<String> = match &self.categorical_features {
            Some(raw) => serde_json::from_str(raw).map_err(|_| bad_json("categorical_features"))?,
            None => Vec::new(),
        };
        let target_variable = self.target_variable.clone().ok_or_else(|| {
            PipelineError::Configuration(format!("model config '{}' has no target variable", self.name))
        })?;

        Ok(ModelConfig {
            id: self.id,
            name: self.name,
            prediction_currency: self.prediction_currency,
            description: self.description,
            provider: self.provider,
            model: self.model,
            model_type: self.model_type,
            hyperparameters,
            numeric_features,
            categorical_features,
            target_variable,
            created_utc: self.created_utc,
            updated_utc: self.updated_utc,
            is_active: self.is_active,
        })
    }
}

impl Store {
    /// The unique active model config for an asset. Callers supply provider
    /// and model together only when disambiguation is needed; zero matches
    /// or more than one are both configuration errors, so the lookup stays
    /// deterministic.
    pub async fn active_model_config(
        &self,
        asset: &str,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> PipelineResult<ModelConfig> {
        let mut sql = String::from(
            "SELECT id, name, prediction_currency, description, provider, model, model_type,
                    hyperparameters, numeric_features, categorical_features, target_variable,
                    created_utc, updated_utc, is_active
             FROM model_configs
             WHERE is_active = 1 AND prediction_currency = ?",
        );
        if provider.is_some() {
            sql.push_str(" AND provider = ?");
        }
        if model.is_some() {
            sql.push_str(" AND model = ?");
        }

        let mut query = sqlx::query_as::<_, ModelConfigRow>(&sql).bind(asset);
        if let Some(p) = provider {
            query = query.bind(p);
        }
        if let Some(m) = model {
            query = query.bind(m);
        }

        let mut rows = query.fetch_all(self.pool()).await?;
        match rows.len() {
            0 => Err(PipelineError::Configuration(format!(
                "no active model config for asset '{asset}'"
            ))),
            1 => rows.remove(0).into_config(),
            n => Err(PipelineError::Configuration(format!(
                "{n} active model configs for asset '{asset}', expected exactly one"
            ))),
        }
    }

    /// Operator/admin flow: register a model config. The id on the input is
    /// ignored; the assigned row id is returned.
    pub async fn insert_model_config(&self, config: &ModelConfig) -> PipelineResult<i64> {
        let result = sqlx::query(
            "INSERT INTO model_configs
             (name, prediction_currency, description, provider, model, model_type,
              hyperparameters, numeric_features, categorical_features, target_variable,
              created_utc, updated_utc, is_active)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&config.name)
        .bind(&config.prediction_currency)
        .bind(&config.description)
        .bind(&config.provider)
        .bind(&config.model)
        .bind(&config.model_type)
        .bind(config.hyperparameters.to_string())
        .bind(serde_json::to_string(&config.numeric_features).unwrap_or_else(|_| "[]".into()))
        .bind(serde_json::to_string(&config.categorical_features).unwrap_or_else(|_| "[]".into()))
        .bind(&config.target_variable)
        .bind(config.created_utc)
        .bind(config.updated_utc)
        .bind(config.is_active)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }
}
