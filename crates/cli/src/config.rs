use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use whoop_client::auth::{AuthSettings, DEFAULT_TOKEN_URL};
use whoop_client::client::{DEFAULT_API_BASE, DEFAULT_PAGE_SIZE};
use whoop_client::{ClientConfig, EnvFileStore, WhoopClient};

const CONFIG_FILE: &str = "whoop.toml";
const DEFAULT_ENV_FILE: &str = ".env";

/// Optional `whoop.toml`; every field falls back to the production defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dotenv file holding client credentials and tokens.
    pub env_file: Option<PathBuf>,
    pub api_base: String,
    pub token_url: String,
    pub timeout_secs: u64,
    pub page_size: usize,
    pub token_lifetime_mins: u64,
    pub refresh_margin_mins: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env_file: None,
            api_base: DEFAULT_API_BASE.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timeout_secs: 30,
            page_size: DEFAULT_PAGE_SIZE,
            token_lifetime_mins: 60,
            refresh_margin_mins: 5,
        }
    }
}

impl AppConfig {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("whoop")
            .join(CONFIG_FILE)
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))
    }

    /// `--env-file` wins over the config file, which wins over `./.env`.
    pub fn env_file(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.env_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE))
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_base: self.api_base.clone(),
            auth: AuthSettings {
                token_url: self.token_url.clone(),
                token_lifetime: minutes(self.token_lifetime_mins),
                refresh_margin: minutes(self.refresh_margin_mins),
            },
            timeout: Duration::from_secs(self.timeout_secs),
            page_size: self.page_size,
        }
    }

    pub async fn connect(&self, env_file: &Path) -> Result<WhoopClient> {
        let store = Arc::new(EnvFileStore::new(env_file));
        let client = WhoopClient::connect(store, self.client_config()).await?;
        Ok(client)
    }
}

fn minutes(mins: u64) -> Duration {
    Duration::from_secs(mins.saturating_mul(60))
}
