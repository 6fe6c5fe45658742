//! Explicitly constructed application context.
//!
//! Owns the storage pool and both provider clients, and is passed to the
//! orchestrators instead of any module-level singleton. Lifecycle: build with
//! [`AppContext::init`] on startup, release with [`AppContext::close`] on
//! shutdown.

use sqlx::PgPool;

use crate::cache::AnswerCache;
use crate::config::Config;
use crate::db;
use crate::embedding::EmbeddingClient;
use crate::error::QaError;
use crate::llm::AnswerDrafter;
use crate::store::Store;

pub struct AppContext {
    pub config: Config,
    pub store: Store,
    pub cache: AnswerCache,
    pub embedder: EmbeddingClient,
    pub drafter: AnswerDrafter,
    pool: PgPool,
}

impl AppContext {
    /// Connect and wire all components, reading the provider credential from
    /// `OPENAI_API_KEY`. Without a credential the pipeline stays functional
    /// on its deterministic placeholder/composer paths.
    pub async fn init(config: Config) -> Result<Self, QaError> {
        let api_key = std::env::var("OPENAI_API_KEY").ok();
        Self::with_api_key(config, api_key).await
    }

    /// As [`AppContext::init`], but with an explicit credential (or none).
    /// Used by tests and embedding callers that manage credentials themselves.
    pub async fn with_api_key(config: Config, api_key: Option<String>) -> Result<Self, QaError> {
        let pool = db::connect(&config).await?;

        let embedder = EmbeddingClient::new(&config.embedding, api_key.clone())?;
        let drafter = AnswerDrafter::new(&config.completion, api_key)?;
        let store = Store::new(pool.clone(), config.embedding.dims);
        let cache = AnswerCache::new(pool.clone());

        Ok(Self {
            config,
            store,
            cache,
            embedder,
            drafter,
            pool,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
