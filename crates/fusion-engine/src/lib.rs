//! Time-bucketed fusion of labeled discussion items with asset price
//! context.
//!
//! Discussion items, sentiment labels and price snapshots arrive on their
//! own clocks; this crate aligns them on hourly buckets and produces the
//! supervised feature frame the prediction cycle consumes. Synchronous and
//! allocation-bound; no IO.

mod rows;

pub use rows::FusedRow;

use chrono::DateTime;
use sentiment_core::{LabeledItem, PipelineError, PipelineResult, PriceSnapshot};
use std::collections::HashMap;

/// The two output views of one fusion call. Training rows have both the
/// now-price and the look-ahead price observed; inference rows are every
/// row of the most recent bucket, before the null filter, so the caller
/// can apply its own feature requirements.
#[derive(Debug, Clone)]
pub struct FusionFrame {
    pub training: Vec<FusedRow>,
    pub inference: Vec<FusedRow>,
}

/// Truncate a unix timestamp to its hour bucket.
pub fn bucket_hour(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(3600)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// First snapshot per (asset, bucket), with the bucket key shifted backward
/// by `shift_hours`. With a zero shift this is the "now" view; shifted by
/// the horizon, a row joined at bucket T reads the snapshot that actually
/// originated at T + H, which is what makes the look-ahead label.
fn build_price_index(
    prices: &[PriceSnapshot],
    shift_hours: i64,
) -> HashMap<(String, i64), &PriceSnapshot> {
    let mut index: HashMap<(String, i64), &PriceSnapshot> = HashMap::new();
    for snap in prices {
        let key = (
            snap.asset.clone(),
            bucket_hour(snap.timestamp) - shift_hours * 3600,
        );
        index.entry(key).or_insert(snap);
    }
    index
}

fn parse_ath_date(raw: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp())
        .ok()
}

fn make_row(
    item: &LabeledItem,
    asset: &str,
    bucket: i64,
    now: Option<&&PriceSnapshot>,
    future: Option<&&PriceSnapshot>,
) -> FusedRow {
    let price_now = now.map(|s| s.price);
    let future_price = future.map(|s| s.price);

    let ath_date_now = now
        .and_then(|s| s.ath_date.as_deref())
        .and_then(parse_ath_date);

    let hours_since_ath = ath_date_now.map(|ath_ts| round2((bucket - ath_ts) as f64 / 3600.0));

    let price_diff_percentage = match (price_now, future_price) {
        (Some(now_p), Some(future_p)) => Some(round2((future_p - now_p) / now_p * 100.0)),
        _ => None,
    };

    FusedRow {
        post_id: item.post_id.clone(),
        comment_id: item.comment_id.clone(),
        asset: asset.to_string(),
        bucket,
        score: item.score,
        depth: item.depth,
        crypto_sentiment: item.crypto_sentiment,
        future_sentiment: item.future_sentiment,
        emotion: item.emotion,
        subjective: item.subjective,
        price_now,
        market_cap_now: now.and_then(|s| s.market_cap),
        total_volume_now: now.and_then(|s| s.total_volume),
        total_supply_now: now.and_then(|s| s.total_supply),
        ath_now: now.and_then(|s| s.ath),
        ath_date_now: ath_date_now.and_then(|ts| DateTime::from_timestamp(ts, 0)),
        future_price,
        hours_since_ath,
        price_diff_percentage,
    }
}

/// Fuse labeled discussion items with hourly price context for every
/// tracked asset.
///
/// Each item is bucketed on its comment creation hour, cross-expanded
/// against every tracked asset (a discussion row does not inherently know
/// which asset it discusses), and left-joined against the "now" and
/// horizon-shifted "future" price indexes. Training rows are the fully
/// observed subset sorted by bucket; inference rows are the most recent
/// bucket. An empty inference view fails the fusion: there is nothing to
/// predict from.
pub fn fuse(
    items: &[LabeledItem],
    prices: &[PriceSnapshot],
    assets: &[String],
    horizon_hours: i64,
) -> PipelineResult<FusionFrame> {
    if items.is_empty() {
        return Err(PipelineError::Validation(
            "no labeled discussion items to fuse".into(),
        ));
    }

    let now_index = build_price_index(prices, 0);
    let future_index = build_price_index(prices, horizon_hours);

    let mut rows = Vec::with_capacity(items.len() * assets.len());
    for item in items {
        let bucket = bucket_hour(item.created_utc);
        for asset in assets {
            let key = (asset.clone(), bucket);
            rows.push(make_row(
                item,
                asset,
                bucket,
                now_index.get(&key),
                future_index.get(&key),
            ));
        }
    }

    // Stable sort: rows within one bucket keep their input order.
    rows.sort_by_key(|r| r.bucket);

    let Some(max_bucket) = rows.last().map(|r| r.bucket) else {
        return Err(PipelineError::Validation(
            "no rows in the most recent bucket to predict from".into(),
        ));
    };

    let inference: Vec<FusedRow> = rows
        .iter()
        .filter(|r| r.bucket == max_bucket)
        .cloned()
        .collect();

    let training: Vec<FusedRow> = rows
        .into_iter()
        .filter(|r| r.price_now.is_some() && r.future_price.is_some())
        .collect();

    tracing::debug!(
        training_rows = training.len(),
        inference_rows = inference.len(),
        "fusion complete"
    );

    Ok(FusionFrame { training, inference })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sentiment_core::{Emotion, Sentiment, Subjective};

    fn ts(y: i32, mo: u32, d: u32, h: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, 0, 0).unwrap().timestamp()
    }

    fn item(comment_id: &str, created_utc: i64) -> LabeledItem {
        LabeledItem {
            post_id: "p1".to_string(),
            comment_id: comment_id.to_string(),
            score: 5,
            depth: 1,
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
            ath: Some(69_000.0),
            ath_date: Some("2021-11-10T00:00:00Z".to_string()),
        }
    }

    fn assets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn future_price_reads_snapshot_horizon_hours_later() {
        let t0 = ts(2025, 1, 1, 0);
        let items = vec![item("c1", t0)];
        let prices = vec![
            snapshot("btc", t0, 100.0),
            snapshot("btc", ts(2025, 1, 1, 12), 110.0),
        ];

        let frame = fuse(&items, &prices, &assets(&["btc"]), 12).unwrap();
        assert_eq!(frame.training.len(), 1);
        let row = &frame.training[0];
        assert_eq!(row.price_now, Some(100.0));
        assert_eq!(row.future_price, Some(110.0));
        assert_eq!(row.price_diff_percentage, Some(10.0));
    }

    #[test]
    fn training_rows_never_carry_null_prices() {
        let t0 = ts(2025, 1, 1, 0);
        let t1 = ts(2025, 1, 1, 1);
        let items = vec![item("c1", t0), item("c2", t1)];
        // Snapshot coverage only lets the t0 row resolve both prices.
        let prices = vec![
            snapshot("btc", t0, 100.0),
            snapshot("btc", ts(2025, 1, 1, 12), 110.0),
        ];

        let frame = fuse(&items, &prices, &assets(&["btc"]), 12).unwrap();
        assert_eq!(frame.training.len(), 1);
        assert!(frame
            .training
            .iter()
            .all(|r| r.price_now.is_some() && r.future_price.is_some()));
    }

    #[test]
    fn inference_view_is_max_bucket_before_null_filter() {
        let t0 = ts(2025, 1, 1, 0);
        let t1 = ts(2025, 1, 1, 5);
        let items = vec![item("c1", t0), item("c2", t1), item("c3", t1 + 600)];
        let prices = vec![
            snapshot("btc", t0, 100.0),
            snapshot("btc", ts(2025, 1, 1, 12), 110.0),
        ];

        let frame = fuse(&items, &prices, &assets(&["btc"]), 12).unwrap();
        // c2 and c3 share the 05:00 bucket, which has no price snapshot at
        // all, yet both appear in the inference view.
        assert_eq!(frame.inference.len(), 2);
        assert!(frame.inference.iter().all(|r| r.bucket == bucket_hour(t1)));
        assert!(frame.inference.iter().all(|r| r.price_now.is_none()));
    }

    #[test]
    fn hours_since_ath_is_exact_and_may_be_negative() {
        let t0 = ts(2025, 1, 1, 0);
        let items = vec![item("c1", t0)];

        let mut past_ath = snapshot("btc", t0, 100.0);
        past_ath.ath_date = Some("2024-12-31T00:00:00Z".to_string());
        let frame = fuse(&items, &[past_ath], &assets(&["btc"]), 12).unwrap();
        assert_eq!(frame.inference[0].hours_since_ath, Some(24.0));

        let mut future_ath = snapshot("btc", t0, 100.0);
        future_ath.ath_date = Some("2025-01-02T06:00:00Z".to_string());
        let frame = fuse(&items, &[future_ath], &assets(&["btc"]), 12).unwrap();
        assert_eq!(frame.inference[0].hours_since_ath, Some(-30.0));
    }

    #[test]
    fn cross_expansion_yields_one_row_per_tracked_asset() {
        let t0 = ts(2025, 1, 1, 0);
        let items = vec![item("c1", t0)];
        let prices = vec![snapshot("btc", t0, 100.0), snapshot("eth", t0, 10.0)];

        let frame = fuse(&items, &prices, &assets(&["btc", "eth"]), 12).unwrap();
        assert_eq!(frame.inference.len(), 2);
        let mut row_assets: Vec<&str> =
            frame.inference.iter().map(|r| r.asset.as_str()).collect();
        row_assets.sort();
        assert_eq!(row_assets, vec!["btc", "eth"]);
    }

    #[test]
    fn first_snapshot_per_bucket_wins() {
        let t0 = ts(2025, 1, 1, 0);
        let items = vec![item("c1", t0)];
        // Two snapshots in the same hour; the earlier-listed one is kept.
        let prices = vec![snapshot("btc", t0, 100.0), snapshot("btc", t0 + 60, 999.0)];

        let frame = fuse(&items, &prices, &assets(&["btc"]), 12).unwrap();
        assert_eq!(frame.inference[0].price_now, Some(100.0));
    }

    #[test]
    fn training_is_sorted_by_bucket_ascending() {
        let t0 = ts(2025, 1, 1, 0);
        let t1 = ts(2025, 1, 1, 1);
        let items = vec![item("c2", t1), item("c1", t0)];
        let prices = vec![
            snapshot("btc", t0, 100.0),
            snapshot("btc", t1, 101.0),
            snapshot("btc", ts(2025, 1, 1, 12), 110.0),
            snapshot("btc", ts(2025, 1, 1, 13), 111.0),
        ];

        let frame = fuse(&items, &prices, &assets(&["btc"]), 12).unwrap();
        assert_eq!(frame.training.len(), 2);
        assert!(frame.training[0].bucket < frame.training[1].bucket);
    }

    #[test]
    fn empty_items_fail_fusion() {
        let prices = vec![snapshot("btc", ts(2025, 1, 1, 0), 100.0)];
        let err = fuse(&[], &prices, &assets(&["btc"]), 12).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn bucket_hour_truncates_to_the_hour() {
        let t = ts(2025, 3, 5, 14);
        assert_eq!(bucket_hour(t), t);
        assert_eq!(bucket_hour(t + 59 * 60 + 59), t);
        assert_eq!(bucket_hour(t + 3600), t + 3600);
    }
}
