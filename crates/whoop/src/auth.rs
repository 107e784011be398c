use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{Result, WhoopError};
use crate::store::TokenStore;

pub const DEFAULT_TOKEN_URL: &str = "https://api.prod.whoop.com/oauth/oauth2/token";
/// WHOOP access tokens live for one hour.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub token_url: String,
    pub token_lifetime: Duration,
    pub refresh_margin: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_url: DEFAULT_TOKEN_URL.to_string(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            refresh_margin: DEFAULT_REFRESH_MARGIN,
        }
    }
}

impl AuthSettings {
    /// Age at which a token counts as stale.
    fn refresh_after(&self) -> Result<Duration> {
        self.token_lifetime
            .checked_sub(self.refresh_margin)
            .filter(|d| !d.is_zero())
            .ok_or_else(|| {
                WhoopError::Config(format!(
                    "refresh margin ({:?}) must be shorter than the token lifetime ({:?})",
                    self.refresh_margin, self.token_lifetime
                ))
            })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Debug, Clone)]
struct TokenState {
    access_token: String,
    refresh_token: Option<String>,
    last_refreshed_at: Option<DateTime<Utc>>,
    /// Set between a refresh and the first successful `save` of its pair.
    unsaved: bool,
}

impl TokenState {
    /// Never refreshed this session, or older than `refresh_after`.
    fn is_stale_at(&self, now: DateTime<Utc>, refresh_after: Duration) -> bool {
        match self.last_refreshed_at {
            None => true,
            Some(at) => now
                .signed_duration_since(at)
                .to_std()
                .is_ok_and(|age| age >= refresh_after),
        }
    }
}

/// Owns the access/refresh token pair for one client.
///
/// Refreshes are single-flight: every refresh path takes `refresh_guard`
/// and re-checks the state once it holds it, so tasks that queue behind an
/// in-flight exchange reuse its result instead of starting their own.
#[derive(Clone)]
pub struct TokenManager {
    credentials: ClientCredentials,
    token_url: String,
    refresh_after: Duration,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    state: Arc<RwLock<TokenState>>,
    refresh_guard: Arc<Mutex<()>>,
}

impl TokenManager {
    pub fn new(
        credentials: ClientCredentials,
        access_token: String,
        refresh_token: Option<String>,
        settings: &AuthSettings,
        store: Arc<dyn TokenStore>,
        http: reqwest::Client,
    ) -> Result<Self> {
        if access_token.is_empty() {
            return Err(WhoopError::Auth(
                "no access token found; run `whoop init` first".into(),
            ));
        }
        Ok(Self {
            credentials,
            token_url: settings.token_url.clone(),
            refresh_after: settings.refresh_after()?,
            http,
            store,
            state: Arc::new(RwLock::new(TokenState {
                access_token,
                refresh_token: refresh_token.filter(|t| !t.is_empty()),
                last_refreshed_at: None,
                unsaved: false,
            })),
            refresh_guard: Arc::new(Mutex::new(())),
        })
    }

    pub(crate) async fn access_token(&self) -> String {
        self.state.read().await.access_token.clone()
    }

    pub async fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_refreshed_at
    }

    /// `(stale, unsaved)` for the current state.
    async fn status(&self) -> (bool, bool) {
        let state = self.state.read().await;
        (state.is_stale_at(Utc::now(), self.refresh_after), state.unsaved)
    }

    /// Refresh if the token is stale, or retry persisting a pair whose last
    /// `save` failed. Concurrent callers share one exchange.
    pub async fn ensure_fresh(&self) -> Result<()> {
        if self.status().await == (false, false) {
            return Ok(());
        }
        let _guard = self.refresh_guard.lock().await;
        match self.status().await {
            (true, _) => self.refresh_locked().await,
            (false, true) => {
                warn!("retrying persistence of refreshed tokens");
                self.persist_locked().await
            }
            (false, false) => {
                debug!("token already refreshed by a concurrent request");
                Ok(())
            }
        }
    }

    /// Unconditionally exchange the refresh token for a new pair.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_guard.lock().await;
        self.refresh_locked().await
    }

    /// Reactive refresh after upstream rejected `rejected`. Skips the exchange
    /// when another task already replaced that token.
    pub(crate) async fn refresh_after_rejection(&self, rejected: &str) -> Result<()> {
        let _guard = self.refresh_guard.lock().await;
        if self.state.read().await.access_token != rejected {
            debug!("rejected token already replaced by a concurrent refresh");
            return Ok(());
        }
        self.refresh_locked().await
    }

    /// Caller must hold `refresh_guard`.
    async fn refresh_locked(&self) -> Result<()> {
        let refresh_token = self.state.read().await.refresh_token.clone().ok_or_else(|| {
            WhoopError::Auth("no refresh token available; run `whoop init` again".into())
        })?;

        info!("Refreshing WHOOP access token");
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("scope", "offline"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, "token refresh rejected");
            return Err(WhoopError::Auth(format!(
                "token refresh failed ({status}): {body}"
            )));
        }

        let body = resp.text().await?;
        let tokens: TokenResponse = serde_json::from_str(&body)?;
        if tokens.access_token.is_empty() {
            return Err(WhoopError::Auth(
                "token refresh returned an empty access token".into(),
            ));
        }

        let rotated = tokens.refresh_token.as_deref().is_some_and(|t| !t.is_empty());
        {
            let mut state = self.state.write().await;
            state.access_token = tokens.access_token;
            if rotated {
                state.refresh_token = tokens.refresh_token;
            }
            state.last_refreshed_at = Some(Utc::now());
            state.unsaved = true;
        }
        debug!(rotated, "token state updated");

        self.persist_locked().await
    }

    /// Write the current pair to the store. Caller must hold `refresh_guard`.
    async fn persist_locked(&self) -> Result<()> {
        let (access, refresh) = {
            let state = self.state.read().await;
            (state.access_token.clone(), state.refresh_token.clone())
        };
        self.store
            .save(&access, refresh.as_deref())
            .await
            .map_err(WhoopError::Store)?;
        self.state.write().await.unsaved = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn state(last_refreshed_at: Option<DateTime<Utc>>) -> TokenState {
        TokenState {
            access_token: "a".into(),
            refresh_token: Some("r".into()),
            last_refreshed_at,
            unsaved: false,
        }
    }

    fn manager(access: &str, settings: &AuthSettings) -> Result<TokenManager> {
        TokenManager::new(
            ClientCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
            },
            access.to_string(),
            Some("r".into()),
            settings,
            Arc::new(MemoryStore::default()),
            reqwest::Client::new(),
        )
    }

    #[test]
    fn never_refreshed_is_stale() {
        assert!(state(None).is_stale_at(Utc::now(), DEFAULT_TOKEN_LIFETIME));
    }

    #[test]
    fn staleness_follows_margin() {
        let refresh_after = Duration::from_secs(55 * 60);
        let now = Utc::now();

        let recent = state(Some(now - chrono::Duration::minutes(10)));
        assert!(!recent.is_stale_at(now, refresh_after));

        let old = state(Some(now - chrono::Duration::minutes(56)));
        assert!(old.is_stale_at(now, refresh_after));
    }

    #[test]
    fn future_timestamp_is_not_stale() {
        let now = Utc::now();
        let skewed = state(Some(now + chrono::Duration::minutes(3)));
        assert!(!skewed.is_stale_at(now, Duration::from_secs(60)));
    }

    #[test]
    fn default_settings_refresh_at_55_minutes() {
        let after = AuthSettings::default().refresh_after().unwrap();
        assert_eq!(after, Duration::from_secs(55 * 60));
    }

    #[test]
    fn margin_must_be_shorter_than_lifetime() {
        let settings = AuthSettings {
            token_lifetime: Duration::from_secs(60),
            refresh_margin: Duration::from_secs(60),
            ..Default::default()
        };
        assert!(matches!(
            manager("a", &settings),
            Err(WhoopError::Config(_))
        ));
    }

    #[test]
    fn empty_access_token_is_rejected() {
        let err = manager("", &AuthSettings::default()).err().unwrap();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_is_auth_error() {
        let manager = TokenManager::new(
            ClientCredentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
            },
            "a".into(),
            None,
            &AuthSettings::default(),
            Arc::new(MemoryStore::default()),
            reqwest::Client::new(),
        )
        .unwrap();

        let err = manager.refresh().await.unwrap_err();
        assert!(err.is_auth());
        assert!(manager.last_refreshed_at().await.is_none());
    }
}
