//! Batch sentiment labeling: collect unlabeled discussion rows for a time
//! window, send them to the active text-generation provider in fixed-size
//! batches, validate the structured output, and persist labels with
//! conflict-ignore semantics.
//!
//! Batches within one run execute strictly sequentially so the pacing delay
//! between provider calls is honored and batch order stays deterministic.
//! Each batch commits independently: a crashed or abandoned run leaves
//! previously committed batches intact and safely re-runnable.

pub mod parse;
pub mod prompt;

pub use parse::parse_response;
pub use prompt::build_prompt;

use chrono::Utc;
use llm_client::{pacing_delay, TextGenerator};
use sentiment_core::{PipelineError, PipelineResult, ProviderConfig, ResponseTolerance};
use sentiment_store::{Store, UnlabeledRow};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Terminal state of a labeling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    PartialFailure,
}

/// Outcome of one labeling run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub batches: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub labels_inserted: u64,
    pub tokens_used: i64,
    pub status: RunStatus,
}

impl RunSummary {
    fn empty() -> Self {
        Self {
            batches: 0,
            succeeded: 0,
            failed: 0,
            labels_inserted: 0,
            tokens_used: 0,
            status: RunStatus::Completed,
        }
    }
}

pub struct LabelingEngine {
    store: Store,
    generator: Arc<dyn TextGenerator>,
    provider: ProviderConfig,
    tolerance: ResponseTolerance,
}

impl LabelingEngine {
    pub fn new(
        store: Store,
        generator: Arc<dyn TextGenerator>,
        provider: ProviderConfig,
        tolerance: ResponseTolerance,
    ) -> Self {
        Self {
            store,
            generator,
            provider,
            tolerance,
        }
    }

    /// Label every unlabeled discussion row created in [start, end),
    /// awaited to completion.
    ///
    /// Fails fast, before any generation call, when the window has no posts
    /// or no comments. A window whose rows are all labeled already is a
    /// no-op success. Per-batch failures are logged and skipped; the run
    /// itself only fails when no batch succeeds at all.
    pub async fn run_window(
        &self,
        start: i64,
        end: i64,
        batch_size: usize,
    ) -> PipelineResult<RunSummary> {
        if batch_size == 0 {
            return Err(PipelineError::Validation("batch size must be positive".into()));
        }

        let window = self.store.fetch_unlabeled_window(start, end).await?;
        if window.rows.is_empty() {
            tracing::info!(
                posts = window.posts_in_window,
                comments = window.comments_in_window,
                "window already fully labeled, nothing to do"
            );
            return Ok(RunSummary::empty());
        }

        let delay = pacing_delay(self.provider.calls_per_minute);
        tracing::info!(
            rows = window.rows.len(),
            batch_size,
            pacing_secs = delay.as_secs_f64(),
            provider = %self.provider.name,
            "starting labeling run"
        );

        let mut summary = RunSummary::empty();
        for (index, batch) in window.rows.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(delay).await;
            }
            summary.batches += 1;

            match self.process_batch(batch).await {
                Ok((inserted, tokens)) => {
                    summary.succeeded += 1;
                    summary.labels_inserted += inserted;
                    summary.tokens_used += tokens;
                }
                Err(e) => {
                    summary.failed += 1;
                    // Identify the batch by its row-id range; batches commit
                    // independently, so the run continues.
                    let first = batch.first().map(|r| r.comment_id.as_str()).unwrap_or("?");
                    let last = batch.last().map(|r| r.comment_id.as_str()).unwrap_or("?");
                    tracing::warn!(
                        batch = index,
                        rows = batch.len(),
                        first_comment = first,
                        last_comment = last,
                        error = %e,
                        "batch failed, continuing with next batch"
                    );
                }
            }
        }

        if summary.succeeded == 0 {
            return Err(PipelineError::Validation(format!(
                "all {} labeling batches failed",
                summary.batches
            )));
        }

        summary.status = if summary.failed == 0 {
            RunStatus::Completed
        } else {
            RunStatus::PartialFailure
        };
        tracing::info!(
            batches = summary.batches,
            succeeded = summary.succeeded,
            failed = summary.failed,
            labels = summary.labels_inserted,
            tokens = summary.tokens_used,
            "labeling run finished"
        );
        Ok(summary)
    }

    /// Label the past `hours` hours.
    pub async fn run_recent_hours(
        &self,
        batch_size: usize,
        hours: i64,
    ) -> PipelineResult<RunSummary> {
        let end = Utc::now().timestamp();
        let start = end - hours * 3600;
        self.run_window(start, end, batch_size).await
    }

    /// Fire-and-forget launch: the caller gets a handle back immediately and
    /// may await it later or drop it. Batches already committed survive an
    /// abandoned run; labels are conflict-ignored on re-insert.
    pub fn spawn_window(
        self: Arc<Self>,
        start: i64,
        end: i64,
        batch_size: usize,
    ) -> JoinHandle<PipelineResult<RunSummary>> {
        tokio::spawn(async move {
            let result = self.run_window(start, end, batch_size).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "background labeling run failed");
            }
            result
        })
    }

    /// One batch: prompt → generate → account tokens → parse/validate →
    /// persist. Token usage is recorded for every successful generation
    /// call, even when the response later fails validation.
    async fn process_batch(&self, batch: &[UnlabeledRow]) -> PipelineResult<(u64, i64)> {
        let prompt = build_prompt(batch);

        let generation = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| PipelineError::Transient(e.to_string()))?;

        let tokens = generation.total_tokens();
        self.store.add_token_usage(self.provider.id, tokens).await?;

        let labels = parse_response(&generation.text, batch.len(), &self.tolerance)?;
        let inserted = self.store.insert_labels(&labels).await?;

        tracing::debug!(
            rows = batch.len(),
            parsed = labels.len(),
            inserted,
            tokens,
            "batch labeled"
        );
        Ok((inserted, tokens))
    }
}
