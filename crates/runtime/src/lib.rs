use std::sync::Arc;

use anyhow::{Context, Result};
use parley_chats::repositories::{
    LocalAttachmentStore, SqliteConversationStore, SqliteIdentityStore, SqliteMessageStore,
};
use parley_chats::ChatService;
use parley_config::AppConfig;
use parley_database::initialize_database;
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::DEBUG)
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

/// Everything a front end needs to serve chat requests, wired from one
/// configuration.
#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub chat: ChatService,
    pub attachments: Arc<LocalAttachmentStore>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let attachments = Arc::new(LocalAttachmentStore::from_config(&config.attachments));

        let chat = ChatService::new(
            Arc::new(SqliteConversationStore::new(db_pool.clone())),
            Arc::new(SqliteMessageStore::new(db_pool.clone())),
            Arc::new(SqliteIdentityStore::new(db_pool.clone())),
            attachments.clone(),
        );

        info!(
            database = %config.database.url,
            uploads = %attachments.root().display(),
            "chat services ready"
        );

        Ok(Self {
            db_pool,
            chat,
            attachments,
        })
    }
}
