//! pipeline-runner: drive the sentiment pipeline end to end from the CLI.
//!
//! Usage:
//!   cargo run -p pipeline-runner -- label --start 1735689600 --end 1735776000 --batch-size 20
//!   cargo run -p pipeline-runner -- label --start ... --end ... --batch-size 20 --detach
//!   cargo run -p pipeline-runner -- label-recent --hours 24 --batch-size 20
//!   cargo run -p pipeline-runner -- predict --horizon-hours 12
//!
//! Env: DATABASE_URL, TRACKED_ASSETS, MAIN_CURRENCY, PREDICTION_HORIZON_HOURS,
//! LLM_PROVIDER (optional provider name pin).

use chrono::{TimeZone, Utc};
use llm_client::build_generator;
use prediction_cycle::{ModelRegistry, PredictionCycle};
use sentiment_core::PipelineConfig;
use sentiment_labeler::LabelingEngine;
use sentiment_store::Store;
use std::sync::Arc;

fn arg_value(args: &[String], name: &str) -> Option<String> {
    args.iter()
        .position(|a| a == name)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn parse_arg<T: std::str::FromStr>(args: &[String], name: &str) -> Option<T> {
    arg_value(args, name).and_then(|v| v.parse().ok())
}

fn usage() -> ! {
    eprintln!(
        "usage:\n  pipeline-runner label --start <unix> --end <unix> --batch-size <n> [--detach]\n  pipeline-runner label-recent --hours <n> --batch-size <n>\n  pipeline-runner predict [--horizon-hours <n>] [--start <unix>]"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pipeline_runner=info,sentiment_labeler=info,prediction_cycle=info,fusion_engine=info"
                    .into()
            }),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1).map(|s| s.as_str()) else {
        usage();
    };

    let config = PipelineConfig::from_env();
    let db_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:pipeline.db".to_string());
    let store = Store::connect(&db_url).await?;

    match command {
        "label" => {
            let (Some(start), Some(end), Some(batch_size)) = (
                parse_arg::<i64>(&args, "--start"),
                parse_arg::<i64>(&args, "--end"),
                parse_arg::<usize>(&args, "--batch-size"),
            ) else {
                usage();
            };
            let engine = labeling_engine(&store, &config).await?;

            if args.iter().any(|a| a == "--detach") {
                let handle = Arc::new(engine).spawn_window(start, end, batch_size);
                println!("labeling run started in background");
                // Keep the process alive until the detached run drains.
                let summary = handle.await??;
                tracing::info!(?summary, "background run finished");
            } else {
                let summary = engine.run_window(start, end, batch_size).await?;
                println!(
                    "labeled {} rows in {} batches ({} failed)",
                    summary.labels_inserted, summary.batches, summary.failed
                );
            }
        }
        "label-recent" => {
            let (Some(hours), Some(batch_size)) = (
                parse_arg::<i64>(&args, "--hours"),
                parse_arg::<usize>(&args, "--batch-size"),
            ) else {
                usage();
            };
            let engine = labeling_engine(&store, &config).await?;
            let summary = engine.run_recent_hours(batch_size, hours).await?;
            println!(
                "labeled {} rows in {} batches ({} failed)",
                summary.labels_inserted, summary.batches, summary.failed
            );
        }
        "predict" => {
            let horizon_hours =
                parse_arg::<i64>(&args, "--horizon-hours").unwrap_or(config.horizon_hours);
            let default_start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap().timestamp();
            let start = parse_arg::<i64>(&args, "--start").unwrap_or(default_start);
            let end = Utc::now().timestamp();

            let items = store.fetch_labeled_window(start, end).await?;
            let prices = store.fetch_prices_window(start, end).await?;
            tracing::info!(
                items = items.len(),
                prices = prices.len(),
                horizon_hours,
                "fusing window"
            );

            let frame = fusion_engine::fuse(&items, &prices, &config.tracked_assets, horizon_hours)?;
            let cycle = PredictionCycle::new(store, ModelRegistry::with_defaults(), config);
            let count = cycle.run(&frame, horizon_hours).await?;
            println!("predictions created for {count} assets");
        }
        _ => usage(),
    }

    Ok(())
}

async fn labeling_engine(store: &Store, config: &PipelineConfig) -> anyhow::Result<LabelingEngine> {
    let provider_name = std::env::var("LLM_PROVIDER").ok();
    let provider = store.active_provider(provider_name.as_deref()).await?;
    let generator = build_generator(&provider)?;
    Ok(LabelingEngine::new(
        store.clone(),
        generator,
        provider,
        config.tolerance,
    ))
}
