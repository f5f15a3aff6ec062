use crate::Store;
use sentiment_core::{PipelineResult, PredictionRecord};

impl Store {
    /// Persist one prediction cycle's output in a single transaction.
    pub async fn insert_predictions(&self, records: &[PredictionRecord]) -> PipelineResult<u64> {
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;
        for record in records {
            let result = sqlx::query(
                "INSERT INTO predictions
                 (asset, priced_in, currency_price, model_provider, model,
                  predicted_price, prediction_timestamp, created_utc)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&record.asset)
            .bind(&record.priced_in)
            .bind(record.currency_price)
            .bind(&record.model_provider)
            .bind(&record.model)
            .bind(record.predicted_price)
            .bind(record.prediction_timestamp)
            .bind(record.created_utc)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Most recent predictions for an asset, newest first.
    pub async fn fetch_predictions(
        &self,
        asset: &str,
        limit: i64,
    ) -> PipelineResult<Vec<PredictionRecord>> {
        let rows: Vec<(String, String, f64, String, String, f64, i64, i64)> = sqlx::query_as(
            "SELECT asset, priced_in, currency_price, model_provider, model,
                    predicted_price, prediction_timestamp, created_utc
             FROM predictions
             WHERE asset = ?
             ORDER BY created_utc DESC
             LIMIT ?",
        )
        .bind(asset)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(asset, priced_in, currency_price, model_provider, model, predicted_price, prediction_timestamp, created_utc)| {
                    PredictionRecord {
                        asset,
                        priced_in,
                        currency_price,
                        model_provider,
                        model,
                        predicted_price,
                        prediction_timestamp,
                        created_utc,
                    }
                },
            )
            .collect())
    }
}
