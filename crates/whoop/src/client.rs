use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{AuthSettings, ClientCredentials, TokenManager};
use crate::error::{Result, WhoopError};
use crate::store::TokenStore;

pub const DEFAULT_API_BASE: &str = "https://api.prod.whoop.com/developer";
/// Largest page WHOOP serves for collection endpoints.
pub const DEFAULT_PAGE_SIZE: usize = 25;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Reactive refresh-and-retry attempts per logical request.
pub const MAX_AUTH_RETRIES: u32 = 1;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_base: String,
    pub auth: AuthSettings,
    pub timeout: Duration,
    pub page_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            auth: AuthSettings::default(),
            timeout: DEFAULT_TIMEOUT,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of a cursor-paginated collection.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    #[serde(alias = "nextToken")]
    pub next_token: Option<String>,
}

#[derive(Clone)]
pub struct WhoopClient {
    tokens: TokenManager,
    http: reqwest::Client,
    api_base: String,
    page_size: usize,
}

impl WhoopClient {
    /// Build a client from persisted credentials. Fails immediately when the
    /// store holds no access token.
    pub async fn connect(store: Arc<dyn TokenStore>, config: ClientConfig) -> Result<Self> {
        let stored = store.load().await.map_err(WhoopError::Store)?;
        let access_token = stored
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                WhoopError::Auth("no access token found; run `whoop init` first".into())
            })?;

        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let tokens = TokenManager::new(
            ClientCredentials {
                client_id: stored.client_id,
                client_secret: stored.client_secret,
            },
            access_token,
            stored.refresh_token,
            &config.auth,
            store,
            http.clone(),
        )?;

        Ok(Self {
            tokens,
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            page_size: config.page_size.max(1),
        })
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Refresh ahead of a burst of concurrent requests.
    pub async fn ensure_fresh(&self) -> Result<()> {
        self.tokens.ensure_fresh().await
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("https://") || path.starts_with("http://") {
            path.to_string()
        } else {
            format!("{}{path}", self.api_base)
        }
    }

    /// Perform one authenticated call and return the JSON body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value> {
        let url = self.url(path);
        self.tokens.ensure_fresh().await?;

        let mut auth_retries = 0;
        loop {
            let token = self.tokens.access_token().await;
            let resp = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&token)
                .query(query)
                .send()
                .await?;

            let status = resp.status();

            if status == StatusCode::UNAUTHORIZED {
                if auth_retries < MAX_AUTH_RETRIES {
                    auth_retries += 1;
                    warn!(url = %url, "access token rejected, refreshing");
                    self.tokens.refresh_after_rejection(&token).await?;
                    continue;
                }
                let body = resp.text().await.unwrap_or_default();
                return Err(WhoopError::Auth(format!(
                    "still unauthorized after token refresh: {body}"
                )));
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok());
                warn!(url = %url, ?retry_after, "rate limited");
                return Err(WhoopError::RateLimited { retry_after });
            }

            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                debug!(url = %url, %status, "request failed");
                return Err(WhoopError::Api {
                    status: status.as_u16(),
                    body,
                });
            }

            debug!(url = %url, %method, "OK");
            let body = resp.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let value = self.request(Method::GET, path, query).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Collect up to `limit` raw records from a cursor-paginated endpoint.
    pub async fn paginate(
        &self,
        path: &str,
        limit: usize,
        page_size_cap: usize,
    ) -> Result<Vec<Value>> {
        self.paginate_as(path, limit, page_size_cap).await
    }

    /// Collect up to `limit` records, asking for no more than the remaining
    /// need on each page. Stops early when upstream runs out of cursor or
    /// returns an empty page.
    pub async fn paginate_as<T: DeserializeOwned>(
        &self,
        path: &str,
        limit: usize,
        page_size_cap: usize,
    ) -> Result<Vec<T>> {
        let cap = page_size_cap.max(1);
        let mut records: Vec<T> = Vec::new();
        let mut cursor: Option<String> = None;

        while records.len() < limit {
            let page_limit = cap.min(limit - records.len());
            let mut query = vec![("limit", page_limit.to_string())];
            if let Some(next) = &cursor {
                query.push(("nextToken", next.clone()));
            }

            let page: Page<T> = self.get_json(path, &query).await?;
            let count = page.records.len();
            records.extend(page.records);
            debug!(path, count, total = records.len(), "fetched page");

            cursor = page.next_token.filter(|t| !t.is_empty());
            if count == 0 || cursor.is_none() {
                break;
            }
        }

        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_page_with_snake_case_cursor() {
        let json = r#"{"records":[{"id":1},{"id":2}],"next_token":"abc"}"#;
        let page: Page<Value> = serde_json::from_str(json).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.next_token.as_deref(), Some("abc"));
    }

    #[test]
    fn deserialize_page_with_camel_case_cursor() {
        let json = r#"{"records":[],"nextToken":"xyz"}"#;
        let page: Page<Value> = serde_json::from_str(json).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.next_token.as_deref(), Some("xyz"));
    }

    #[test]
    fn deserialize_page_without_records() {
        let page: Page<Value> = serde_json::from_str("{}").unwrap();
        assert!(page.records.is_empty());
        assert!(page.next_token.is_none());
    }

    #[test]
    fn default_config_targets_production() {
        let config = ClientConfig::default();
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
