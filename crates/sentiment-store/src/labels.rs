use crate::Store;
use sentiment_core::{LabeledItem, PipelineError, PipelineResult, SentimentLabel};
use sqlx::FromRow;

#[derive(Debug, FromRow)]
struct LabeledItemRow {
    post_id: String,
    comment_id: String,
    score: i64,
    depth: i64,
    created_utc: i64,
    crypto_sentiment: String,
    future_sentiment: String,
    emotion: String,
    subjective: String,
}

impl LabeledItemRow {
    fn into_item(self) -> PipelineResult<LabeledItem> {
        let parse = |v: &str| {
            PipelineError::Validation(format!(
                "stored label for ({}, {}) has bad value '{v}'",
                self.post_id, self.comment_id
            ))
        };
        Ok(LabeledItem {
            crypto_sentiment: self.crypto_sentiment.parse().map_err(|_| parse(&self.crypto_sentiment))?,
            future_sentiment: self.future_sentiment.parse().map_err(|_| parse(&self.future_sentiment))?,
            emotion: self.emotion.parse().map_err(|_| parse(&self.emotion))?,
            subjective: self.subjective.parse().map_err(|_| parse(&self.subjective))?,
            post_id: self.post_id,
            comment_id: self.comment_id,
            score: self.score,
            depth: self.depth,
            created_utc: self.created_utc,
        })
    }
}

impl Store {
    /// Insert labels with conflict-ignore semantics on (post_id, comment_id),
    /// in one transaction. Returns how many rows were actually inserted;
    /// concurrent or repeated labeling of the same item neither errors nor
    /// duplicates.
    pub async fn insert_labels(&self, labels: &[SentimentLabel]) -> PipelineResult<u64> {
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;
        for label in labels {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO sentiment_labels
                 (post_id, comment_id, crypto_sentiment, future_sentiment, emotion, subjective)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(&label.post_id)
            .bind(&label.comment_id)
            .bind(label.crypto_sentiment.as_str())
            .bind(label.future_sentiment.as_str())
            .bind(label.emotion.as_str())
            .bind(label.subjective.as_str())
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Labeled post ⋈ comment ⋈ label rows with comment created_utc in
    /// [start, end), ordered by comment creation time. Unlabeled rows are
    /// dropped by the inner join; they are not yet ready for fusion.
    pub async fn fetch_labeled_window(
        &self,
        start: i64,
        end: i64,
    ) -> PipelineResult<Vec<LabeledItem>> {
        let rows: Vec<LabeledItemRow> = sqlx::query_as(
            "SELECT c.post_id, c.comment_id, c.score, c.depth, c.created_utc,
                    l.crypto_sentiment, l.future_sentiment, l.emotion, l.subjective
             FROM comments c
             JOIN sentiment_labels l
               ON l.post_id = c.post_id AND l.comment_id = c.comment_id
             JOIN posts p ON p.post_id = c.post_id
             WHERE c.created_utc >= ? AND c.created_utc < ?
             ORDER BY c.created_utc, c.comment_id",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(|r| r.into_item()).collect()
    }

    /// Number of stored labels for one (post_id, comment_id) pair.
    pub async fn count_labels_for(&self, post_id: &str, comment_id: &str) -> PipelineResult<i64> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sentiment_labels WHERE post_id = ? AND comment_id = ?",
        )
        .bind(post_id)
        .bind(comment_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }
}
