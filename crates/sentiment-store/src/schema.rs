use crate::Store;
use sentiment_core::PipelineResult;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS posts (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        subreddit TEXT NOT NULL,
        author TEXT NOT NULL,
        score INTEGER NOT NULL,
        num_comments INTEGER NOT NULL,
        created_utc INTEGER NOT NULL,
        selftext TEXT,
        url TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_utc)",
    "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id TEXT NOT NULL,
        parent_id TEXT,
        comment_id TEXT NOT NULL,
        author TEXT NOT NULL,
        body TEXT NOT NULL,
        score INTEGER NOT NULL,
        created_utc INTEGER NOT NULL,
        depth INTEGER NOT NULL,
        UNIQUE(post_id, comment_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_comments_created ON comments(created_utc)",
    "CREATE TABLE IF NOT EXISTS sentiment_labels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id TEXT NOT NULL,
        comment_id TEXT NOT NULL,
        crypto_sentiment TEXT NOT NULL,
        future_sentiment TEXT NOT NULL,
        emotion TEXT NOT NULL,
        subjective TEXT NOT NULL,
        UNIQUE(post_id, comment_id)
    )",
    "CREATE TABLE IF NOT EXISTS price_snapshots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        asset TEXT NOT NULL,
        price REAL NOT NULL,
        price_currency TEXT NOT NULL,
        timestamp INTEGER NOT NULL,
        source TEXT NOT NULL,
        market_cap REAL,
        total_volume REAL,
        total_supply REAL,
        ath REAL,
        ath_date TEXT,
        UNIQUE(asset, timestamp, source)
    )",
    "CREATE INDEX IF NOT EXISTS idx_prices_asset_ts ON price_snapshots(asset, timestamp)",
    "CREATE TABLE IF NOT EXISTS model_configs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        prediction_currency TEXT,
        description TEXT,
        provider TEXT NOT NULL,
        model TEXT NOT NULL,
        model_type TEXT NOT NULL,
        hyperparameters TEXT,
        numeric_features TEXT,
        categorical_features TEXT,
        target_variable TEXT,
        created_utc INTEGER NOT NULL,
        updated_utc INTEGER NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        asset TEXT NOT NULL,
        priced_in TEXT NOT NULL,
        currency_price REAL NOT NULL,
        model_provider TEXT NOT NULL,
        model TEXT NOT NULL,
        predicted_price REAL NOT NULL,
        prediction_timestamp INTEGER NOT NULL,
        created_utc INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_predictions_asset ON predictions(asset, prediction_timestamp)",
    "CREATE TABLE IF NOT EXISTS llm_providers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        model TEXT NOT NULL,
        api_key TEXT,
        api_url TEXT,
        tokens_per_minute INTEGER,
        calls_per_minute INTEGER,
        total_used_tokens INTEGER NOT NULL DEFAULT 0,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at INTEGER NOT NULL
    )",
];

impl Store {
    pub(crate) async fn init_schema(&self) -> PipelineResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(self.pool()).await?;
        }
        Ok(())
    }
}
