use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "parley.toml",
    "config/parley.toml",
    "crates/config/parley.toml",
    "../parley.toml",
    "../config/parley.toml",
    "../crates/config/parley.toml",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub attachments: AttachmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://parley.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Where uploaded attachment blobs are written and how they are addressed.
///
/// ```
/// use parley_config::AttachmentConfig;
///
/// let attachments = AttachmentConfig::default();
/// assert_eq!(attachments.storage_dir, "uploads");
/// assert_eq!(attachments.public_base_url, "/uploads");
/// assert_eq!(attachments.max_size_bytes, 10 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    #[serde(default = "AttachmentConfig::default_storage_dir")]
    pub storage_dir: String,
    #[serde(default = "AttachmentConfig::default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "AttachmentConfig::default_max_size")]
    pub max_size_bytes: u64,
}

impl AttachmentConfig {
    fn default_storage_dir() -> String {
        "uploads".to_string()
    }

    fn default_public_base_url() -> String {
        "/uploads".to_string()
    }

    const fn default_max_size() -> u64 {
        10 * 1024 * 1024
    }
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            storage_dir: Self::default_storage_dir(),
            public_base_url: Self::default_public_base_url(),
            max_size_bytes: Self::default_max_size(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use parley_config::load;
///
/// std::env::remove_var("PARLEY_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.database.url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let db_max = i64::from(defaults.database.max_connections);
    let max_size = i64::try_from(defaults.attachments.max_size_bytes).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder()
        .set_default("database.url", defaults.database.url.clone())?
        .set_default("database.max_connections", db_max)?
        .set_default("attachments.storage_dir", defaults.attachments.storage_dir.clone())?
        .set_default(
            "attachments.public_base_url",
            defaults.attachments.public_base_url.clone(),
        )?
        .set_default("attachments.max_size_bytes", max_size)?;

    let environment_overrides = config::Environment::with_prefix("PARLEY").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("PARLEY_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via PARLEY_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    validate(&config)?;

    debug!(?config, "loaded backend configuration");
    Ok(config)
}

fn validate(config: &AppConfig) -> anyhow::Result<()> {
    ensure!(
        config.database.max_connections > 0,
        "database.max_connections must be greater than zero"
    );
    ensure!(
        config.attachments.max_size_bytes > 0,
        "attachments.max_size_bytes must be greater than zero"
    );
    ensure!(
        !config.attachments.storage_dir.trim().is_empty(),
        "attachments.storage_dir must not be empty"
    );
    Ok(())
}
