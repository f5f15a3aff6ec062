use crate::Store;
use sentiment_core::{PipelineError, PipelineResult, ProviderConfig};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
struct ProviderRow {
    id: i64,
    name: String,
    model: String,
    api_key: Option<String>,
    api_url: Option<String>,
    tokens_per_minute: Option<i64>,
    calls_per_minute: Option<i64>,
    total_used_tokens: i64,
    is_active: bool,
    created_at: i64,
}

impl From<ProviderRow> for ProviderConfig {
    fn from(row: ProviderRow) -> Self {
        ProviderConfig {
            id: row.id,
            name: row.name,
            model: row.model,
            api_key: row.api_key,
            api_url: row.api_url,
            tokens_per_minute: row.tokens_per_minute,
            calls_per_minute: row.calls_per_minute,
            total_used_tokens: row.total_used_tokens,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

impl Store {
    /// The active labeling provider, optionally pinned by name (names are
    /// unique, so a pinned lookup matches at most one row). No active match
    /// is a configuration error.
    pub async fn active_provider(&self, name: Option<&str>) -> PipelineResult<ProviderConfig> {
        let mut sql = String::from(
            "SELECT id, name, model, api_key, api_url, tokens_per_minute, calls_per_minute,
                    total_used_tokens, is_active, created_at
             FROM llm_providers
             WHERE is_active = 1",
        );
        if name.is_some() {
            sql.push_str(" AND name = ?");
        }
        sql.push_str(" ORDER BY id LIMIT 1");

        let mut query = sqlx::query_as::<_, ProviderRow>(&sql);
        if let Some(n) = name {
            query = query.bind(n);
        }

        query
            .fetch_optional(self.pool())
            .await?
            .map(ProviderConfig::from)
            .ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "no active llm provider{}",
                    name.map(|n| format!(" named '{n}'")).unwrap_or_default()
                ))
            })
    }

    /// Operator/admin flow: register a provider. The id on the input is
    /// ignored; the assigned row id is returned.
    pub async fn insert_provider(&self, provider: &ProviderConfig) -> PipelineResult<i64> {
        let result = sqlx::query(
            "INSERT INTO llm_providers
             (name, model, api_key, api_url, tokens_per_minute, calls_per_minute,
              total_used_tokens, is_active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&provider.name)
        .bind(&provider.model)
        .bind(&provider.api_key)
        .bind(&provider.api_url)
        .bind(provider.tokens_per_minute)
        .bind(provider.calls_per_minute)
        .bind(provider.total_used_tokens)
        .bind(provider.is_active)
        .bind(provider.created_at)
        .execute(self.pool())
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Monotonic quota accounting: add the tokens one generation call billed.
    pub async fn add_token_usage(&self, provider_id: i64, tokens: i64) -> PipelineResult<()> {
        sqlx::query(
            "UPDATE llm_providers SET total_used_tokens = total_used_tokens + ? WHERE id = ?",
        )
        .bind(tokens)
        .bind(provider_id)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Current cumulative token usage for a provider.
    pub async fn token_usage(&self, provider_id: i64) -> PipelineResult<i64> {
        let (tokens,): (i64,) =
            sqlx::query_as("SELECT total_used_tokens FROM llm_providers WHERE id = ?")
                .bind(provider_id)
                .fetch_one(self.pool())
                .await?;
        Ok(tokens)
    }
}
