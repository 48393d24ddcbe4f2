//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and the
//! HTTP server. The chat service is generic over its repository; AppState pins
//! it to the SQLite implementation. The connection registry is created here
//! and handed to everything that needs it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use storefront_core::chat::service::ChatService;
use storefront_core::realtime::{Broadcaster, ConnectionRegistry, ConnectionSettings};
use storefront_infra::config::{load_global_config, resolve_data_dir};
use storefront_infra::sqlite::chat::SqliteChatRepository;
use storefront_infra::sqlite::pool::{DatabasePool, database_url};
use storefront_infra::sqlite::token::SqliteTokenStore;
use storefront_types::config::GlobalConfig;

/// Chat service pinned to the SQLite repository.
pub type ConcreteChatService = ChatService<SqliteChatRepository>;

/// Shared application state holding all services.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub registry: Arc<ConnectionRegistry>,
    pub tokens: SqliteTokenStore,
    pub config: Arc<GlobalConfig>,
    pub settings: ConnectionSettings,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize from the resolved data directory and its `config.toml`.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_global_config(&data_dir).await;
        Self::open(&data_dir, config).await
    }

    /// Connect to `{data_dir}/storefront.db` and wire services with `config`.
    pub async fn open(data_dir: &Path, config: GlobalConfig) -> anyhow::Result<Self> {
        let db_pool = DatabasePool::new(&database_url(data_dir)).await?;

        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let chat_service = ChatService::new(SqliteChatRepository::new(db_pool.clone()), broadcaster);
        let settings = ConnectionSettings::from(&config.realtime);

        tracing::debug!(
            data_dir = %data_dir.display(),
            heartbeat_secs = settings.heartbeat_interval.as_secs(),
            global_timeout_secs = settings.global_idle_timeout.as_secs(),
            "application state ready"
        );

        Ok(Self {
            chat_service: Arc::new(chat_service),
            registry,
            tokens: SqliteTokenStore::new(db_pool),
            config: Arc::new(config),
            settings,
            data_dir: data_dir.to_path_buf(),
        })
    }
}
