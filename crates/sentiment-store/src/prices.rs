use crate::Store;
use sentiment_core::{PipelineResult, PriceSnapshot};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
struct PriceRow {
    asset: String,
    price: f64,
    price_currency: String,
    timestamp: i64,
    source: String,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    total_supply: Option<f64>,
    ath: Option<f64>,
    ath_date: Option<String>,
}

impl From<PriceRow> for PriceSnapshot {
    fn from(row: PriceRow) -> Self {
        PriceSnapshot {
            asset: row.asset,
            price: row.price,
            price_currency: row.price_currency,
            timestamp: row.timestamp,
            source: row.source,
            market_cap: row.market_cap,
            total_volume: row.total_volume,
            total_supply: row.total_supply,
            ath: row.ath,
            ath_date: row.ath_date,
        }
    }
}

impl Store {
    /// Ingestion-boundary insert; duplicates on (asset, timestamp, source)
    /// are ignored. Snapshots are never updated.
    pub async fn insert_price_snapshots(&self, snapshots: &[PriceSnapshot]) -> PipelineResult<u64> {
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;
        for snap in snapshots {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO price_snapshots
                 (asset, price, price_currency, timestamp, source,
                  market_cap, total_volume, total_supply, ath, ath_date)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&snap.asset)
            .bind(snap.price)
            .bind(&snap.price_currency)
            .bind(snap.timestamp)
            .bind(&snap.source)
            .bind(snap.market_cap)
            .bind(snap.total_volume)
            .bind(snap.total_supply)
            .bind(snap.ath)
            .bind(&snap.ath_date)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Snapshots with timestamp in [start, end), ordered by time.
    pub async fn fetch_prices_window(
        &self,
        start: i64,
        end: i64,
    ) -> PipelineResult<Vec<PriceSnapshot>> {
        let rows: Vec<PriceRow> = sqlx::query_as(
            "SELECT asset, price, price_currency, timestamp, source,
                    market_cap, total_volume, total_supply, ath, ath_date
             FROM price_snapshots
             WHERE timestamp >= ? AND timestamp < ?
             ORDER BY timestamp, asset",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(PriceSnapshot::from).collect())
    }
}
