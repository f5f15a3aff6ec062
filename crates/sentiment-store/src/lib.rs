//! SQLite persistence for the sentiment pipeline entities.
//!
//! The pool is owned by the caller of the pipeline and passed down; every
//! write path commits (or rolls back) before returning, leaving the
//! connection in a known clean state for the next operation.

mod discussions;
mod labels;
mod models;
mod predictions;
mod prices;
mod providers;
mod schema;

pub use discussions::{DiscussionWindow, UnlabeledRow};

use sentiment_core::PipelineResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) the database at `url` and initialize the
    /// schema. `:memory:` databases get a single-connection pool, since each
    /// pooled connection would otherwise see its own empty database.
    pub async fn connect(url: &str) -> PipelineResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool. The schema is assumed to be initialized.
    pub fn with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
