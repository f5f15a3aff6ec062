use crate::Store;
use sentiment_core::{DiscussionComment, DiscussionPost, PipelineError, PipelineResult};
use sqlx::FromRow;

/// One unlabeled post ⋈ comment row, in the order it will be batched.
#[derive(Debug, Clone, FromRow)]
pub struct UnlabeledRow {
    pub post_id: String,
    pub comment_id: String,
    pub title: String,
    pub body: String,
    pub score: i64,
}

/// Unlabeled join rows for a window, plus the per-side counts used for the
/// fail-fast check before any generation call is made.
#[derive(Debug)]
pub struct DiscussionWindow {
    pub posts_in_window: i64,
    pub comments_in_window: i64,
    pub rows: Vec<UnlabeledRow>,
}

impl Store {
    /// Ingestion-boundary insert; re-delivered posts are ignored on post_id.
    pub async fn insert_posts(&self, posts: &[DiscussionPost]) -> PipelineResult<u64> {
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;
        for post in posts {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO posts
                 (post_id, title, subreddit, author, score, num_comments, created_utc, selftext, url)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&post.post_id)
            .bind(&post.title)
            .bind(&post.subreddit)
            .bind(&post.author)
            .bind(post.score)
            .bind(post.num_comments)
            .bind(post.created_utc)
            .bind(&post.selftext)
            .bind(&post.url)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Ingestion-boundary insert; re-delivered comments are ignored on
    /// (post_id, comment_id).
    pub async fn insert_comments(&self, comments: &[DiscussionComment]) -> PipelineResult<u64> {
        let mut tx = self.pool().begin().await?;
        let mut inserted = 0;
        for comment in comments {
            let result = sqlx::query(
                "INSERT OR IGNORE INTO comments
                 (post_id, parent_id, comment_id, author, body, score, created_utc, depth)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&comment.post_id)
            .bind(&comment.parent_id)
            .bind(&comment.comment_id)
            .bind(&comment.author)
            .bind(&comment.body)
            .bind(comment.score)
            .bind(comment.created_utc)
            .bind(comment.depth)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;
        Ok(inserted)
    }

    /// Fetch the posts ⋈ comments rows created in [start, end) that have no
    /// sentiment label yet, in comment creation order. Fails with Validation
    /// when either side of the join is empty for the window, so callers
    /// never waste a generation call on a hollow window.
    pub async fn fetch_unlabeled_window(
        &self,
        start: i64,
        end: i64,
    ) -> PipelineResult<DiscussionWindow> {
        let (posts_in_window,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM posts WHERE created_utc >= ? AND created_utc < ?")
                .bind(start)
                .bind(end)
                .fetch_one(self.pool())
                .await?;

        let (comments_in_window,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM comments WHERE created_utc >= ? AND created_utc < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(self.pool())
        .await?;

        if posts_in_window == 0 {
            return Err(PipelineError::Validation(format!(
                "no posts in window [{start}, {end})"
            )));
        }
        if comments_in_window == 0 {
            return Err(PipelineError::Validation(format!(
                "no comments in window [{start}, {end})"
            )));
        }

        let rows: Vec<UnlabeledRow> = sqlx::query_as(
            "SELECT p.post_id, c.comment_id, p.title, c.body, c.score
             FROM posts p
             JOIN comments c ON c.post_id = p.post_id
             WHERE c.created_utc >= ? AND c.created_utc < ?
               AND NOT EXISTS (
                   SELECT 1 FROM sentiment_labels l
                   WHERE l.post_id = c.post_id AND l.comment_id = c.comment_id
               )
             ORDER BY c.created_utc, c.comment_id",
        )
        .bind(start)
        .bind(end)
        .fetch_all(self.pool())
        .await?;

        Ok(DiscussionWindow {
            posts_in_window,
            comments_in_window,
            rows,
        })
    }
}
