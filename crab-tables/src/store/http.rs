//! HTTP table store client
//!
//! Talks JSON to a remote table store. Every response body is an
//! [`ApiResponse`] envelope; failures are classified by the numeric code in
//! the envelope, never by the message.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use std::time::Duration;

use shared::error::ApiResponse;
use shared::models::{
    ItemLine, ReplaceItemsRequest, SessionSnapshot, SessionStarted, StartSessionRequest,
    TableRecord,
};

use super::TableStore;
use crate::config::EngineConfig;
use crate::error::{TableError, TableResult};

/// HTTP client for a remote table store
#[derive(Debug, Clone)]
pub struct HttpTableStore {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpTableStore {
    /// Create a client for `base_url` (e.g. "http://localhost:3000")
    pub fn new(base_url: &str, timeout: Duration) -> TableResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TableError::Unavailable(format!("invalid store URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TableError::Unavailable(format!(
                "store URL cannot be a base: {base_url}"
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            token: None,
        })
    }

    /// Build from engine configuration
    pub fn from_config(config: &EngineConfig) -> TableResult<Self> {
        let store = Self::new(&config.store_url, config.store_timeout)?;
        Ok(match &config.store_token {
            Some(token) => store.with_token(token.clone()),
            None => store,
        })
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join path segments onto the base URL; segments are percent-encoded,
    /// so labels with spaces stay a single segment
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let request = self.client.request(method, self.url(segments));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send and decode the envelope, returning its (possibly absent) data
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> TableResult<Option<T>> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let envelope: ApiResponse<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(status = %status, error = %e, "Undecodable table store response");
                return Err(TableError::Unavailable(format!(
                    "HTTP {status}: undecodable response"
                )));
            }
        };

        if !status.is_success() || !envelope.is_success() {
            return Err(TableError::from(envelope.to_error()));
        }
        Ok(envelope.data)
    }

    async fn send_data<T: DeserializeOwned>(&self, request: RequestBuilder) -> TableResult<T> {
        self.send(request)
            .await?
            .ok_or_else(|| TableError::Unavailable("response is missing data".to_string()))
    }

    async fn send_unit(&self, request: RequestBuilder) -> TableResult<()> {
        self.send::<serde_json::Value>(request).await.map(|_| ())
    }
}

#[async_trait]
impl TableStore for HttpTableStore {
    async fn fetch_all(&self) -> TableResult<Vec<TableRecord>> {
        self.send_data(self.request(Method::GET, &["api", "tables"]))
            .await
    }

    async fn start_session(
        &self,
        label: &str,
        server_id: &str,
        server_name: &str,
    ) -> TableResult<SessionStarted> {
        let body = StartSessionRequest {
            server_id: server_id.to_string(),
            server_name: server_name.to_string(),
        };
        let request = self.request(Method::POST, &["api", "tables", label, "session"]);
        self.send_data(request.json(&body)).await
    }

    async fn stop_session(&self, label: &str) -> TableResult<SessionSnapshot> {
        self.send_data(self.request(Method::POST, &["api", "tables", label, "session", "stop"]))
            .await
    }

    async fn replace_items(&self, label: &str, items: &[ItemLine]) -> TableResult<()> {
        let body = ReplaceItemsRequest {
            items: items.to_vec(),
        };
        let request = self.request(Method::PUT, &["api", "tables", label, "items"]);
        self.send_unit(request.json(&body)).await
    }

    async fn fetch_items(&self, label: &str) -> TableResult<Vec<ItemLine>> {
        self.send_data(self.request(Method::GET, &["api", "tables", label, "items"]))
            .await
    }

    async fn force_free(&self, label: &str) -> TableResult<()> {
        self.send_unit(self.request(Method::POST, &["api", "tables", label, "force-free"]))
            .await
    }

    async fn rate_per_minute(&self) -> TableResult<Decimal> {
        self.send_data(self.request(Method::GET, &["api", "settings", "rate-per-minute"]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_label_as_one_segment() {
        let store = HttpTableStore::new("http://localhost:3000", Duration::from_secs(1)).unwrap();
        let url = store.url(&["api", "tables", "Billiard 3", "session"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/api/tables/Billiard%203/session"
        );
    }

    #[test]
    fn test_url_keeps_base_path_prefix() {
        let store =
            HttpTableStore::new("http://pos.local/store/", Duration::from_secs(1)).unwrap();
        let url = store.url(&["api", "tables"]);
        assert_eq!(url.as_str(), "http://pos.local/store/api/tables");
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        assert!(matches!(
            HttpTableStore::new("not a url", Duration::from_secs(1)),
            Err(TableError::Unavailable(_))
        ));
        assert!(HttpTableStore::new("mailto:ops@example.com", Duration::from_secs(1)).is_err());
    }
}
