use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

pub const CLIENT_ID_KEY: &str = "WHOOP_CLIENT_ID";
pub const CLIENT_SECRET_KEY: &str = "WHOOP_CLIENT_SECRET";
pub const ACCESS_TOKEN_KEY: &str = "WHOOP_ACCESS_TOKEN";
pub const REFRESH_TOKEN_KEY: &str = "WHOOP_REFRESH_TOKEN";

/// Everything the client needs from durable storage at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Durable home of the token pair.
///
/// `save` runs after every successful refresh and must report write failures;
/// the caller treats them as a failed refresh.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<StoredCredentials>;
    async fn save(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()>;
}

/// Dotenv-style file store.
///
/// Process environment variables win for the client credentials. The token
/// pair is read from the file first, because `save` rewrites only the file and
/// an exported token would otherwise shadow the rotated one on the next start.
pub struct EnvFileStore {
    path: PathBuf,
}

impl EnvFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let iter = dotenvy::from_path_iter(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut vars = HashMap::new();
        for item in iter {
            let (key, value) =
                item.with_context(|| format!("failed to parse {}", self.path.display()))?;
            vars.insert(key, value);
        }
        Ok(vars)
    }

    /// Write arbitrary keys, keeping unrelated lines and comments intact.
    pub async fn write_keys(&self, pairs: &[(&str, &str)]) -> Result<()> {
        let mut content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", self.path.display()));
            }
        };
        for (key, value) in pairs {
            content = set_key(&content, key, value);
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, content)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        debug!(path = %self.path.display(), keys = pairs.len(), "env file updated");
        Ok(())
    }
}

#[async_trait]
impl TokenStore for EnvFileStore {
    async fn load(&self) -> Result<StoredCredentials> {
        let file = self.read_file()?;
        let from_env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        let from_file = |key: &str| file.get(key).cloned().filter(|v| !v.is_empty());
        let env_first = |key: &str| from_env(key).or_else(|| from_file(key));
        let file_first = |key: &str| from_file(key).or_else(|| from_env(key));
        Ok(StoredCredentials {
            client_id: env_first(CLIENT_ID_KEY).unwrap_or_default(),
            client_secret: env_first(CLIENT_SECRET_KEY).unwrap_or_default(),
            access_token: file_first(ACCESS_TOKEN_KEY),
            refresh_token: file_first(REFRESH_TOKEN_KEY),
        })
    }

    async fn save(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
        let mut pairs = vec![(ACCESS_TOKEN_KEY, access_token)];
        if let Some(refresh) = refresh_token {
            pairs.push((REFRESH_TOKEN_KEY, refresh));
        }
        self.write_keys(&pairs).await
    }
}

/// Replace `key`'s line in dotenv `content`, or append it.
fn set_key(content: &str, key: &str, value: &str) -> String {
    let line = format!("{key}={}", quote(value));
    let mut found = false;
    let mut lines: Vec<String> = content
        .lines()
        .map(|l| {
            let trimmed = l.trim_start();
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let matches = trimmed
                .strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='));
            if matches && !found {
                found = true;
                line.clone()
            } else {
                l.to_string()
            }
        })
        .collect();
    if !found {
        lines.push(line);
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn quote(value: &str) -> String {
    if value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\' | '$'))
    {
        if value.contains('\'') {
            let escaped = value
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('$', "\\$");
            format!("\"{escaped}\"")
        } else {
            format!("'{value}'")
        }
    } else {
        value.to_string()
    }
}

/// In-process store. Records every save in order.
#[derive(Default)]
pub struct MemoryStore {
    current: Mutex<StoredCredentials>,
    saves: Mutex<Vec<(String, Option<String>)>>,
}

impl MemoryStore {
    pub fn new(credentials: StoredCredentials) -> Self {
        Self {
            current: Mutex::new(credentials),
            saves: Mutex::new(Vec::new()),
        }
    }

    pub fn current(&self) -> StoredCredentials {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn saves(&self) -> Vec<(String, Option<String>)> {
        self.saves.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn load(&self) -> Result<StoredCredentials> {
        Ok(self.current())
    }

    async fn save(&self, access_token: &str, refresh_token: Option<&str>) -> Result<()> {
        {
            let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
            current.access_token = Some(access_token.to_string());
            if let Some(refresh) = refresh_token {
                current.refresh_token = Some(refresh.to_string());
            }
        }
        self.saves
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((access_token.to_string(), refresh_token.map(str::to_string)));
        Ok(())
    }
}
