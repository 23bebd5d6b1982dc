use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{EntityKind, SearchProvider};
use crate::error::{ArtistGraphError, Result};

/// Spotify Web API client
///
/// Authentication is out of scope: the client is handed a bearer token that
/// was issued elsewhere. Failures are reported as provider errors and never
/// retried; a 429 keeps the `Retry-After` hint in the message.
pub struct SpotifyClient {
    client: Client,
    base_url: Url,
    token: String,
    market: Option<String>,
}

impl SpotifyClient {
    /// Create a new client
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `https://api.spotify.com/v1`
    /// * `token` - Pre-issued bearer token
    /// * `timeout` - Per-request timeout; expiry surfaces as a provider error
    pub fn new(base_url: &str, token: String, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ArtistGraphError::Config(format!("invalid provider base URL {}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ArtistGraphError::Config(format!("provider base URL {} cannot be a base", base_url)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ArtistGraphError::Provider(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token,
            market: None,
        })
    }

    /// Restrict searches to a market (ISO 3166-1 alpha-2)
    pub fn with_market(mut self, market: Option<String>) -> Self {
        self.market = market;
        self
    }

    /// Append path segments to the base URL, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ArtistGraphError::Config(format!("provider base URL {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(&self, url: Url, what: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ArtistGraphError::Provider(format!("{}: request timed out", what))
                } else {
                    ArtistGraphError::Provider(format!("{}: network error: {}", what, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error(what, status, retry_after.as_deref(), &body));
        }

        response
            .json()
            .await
            .map_err(|e| ArtistGraphError::Provider(format!("{}: invalid JSON body: {}", what, e)))
    }
}

fn status_error(what: &str, status: StatusCode, retry_after: Option<&str>, body: &str) -> ArtistGraphError {
    let message = match status {
        StatusCode::TOO_MANY_REQUESTS => format!(
            "{}: rate limited (HTTP 429, retry after {}s)",
            what,
            retry_after.unwrap_or("?")
        ),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("{}: access token rejected (HTTP {}): {}", what, status.as_u16(), body)
        }
        _ => format!("{}: HTTP {}: {}", what, status, body),
    };
    ArtistGraphError::Provider(message)
}

#[async_trait]
impl SearchProvider for SpotifyClient {
    async fn search_entity(&self, query: &str, kind: EntityKind, limit: u32) -> Result<Value> {
        let mut url = self.endpoint(&["search"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("q", query)
                .append_pair("type", kind.as_str())
                .append_pair("limit", &limit.to_string());
            if let Some(market) = &self.market {
                pairs.append_pair("market", market);
            }
        }

        log::debug!("search {} {:?} (limit {})", kind.as_str(), query, limit);
        self.get_json(url, &format!("search {:?}", query)).await
    }

    async fn related_artists(&self, artist_id: &str) -> Result<Value> {
        let url = self.endpoint(&["artists", artist_id, "related-artists"])?;

        log::debug!("related artists of {}", artist_id);
        self.get_json(url, &format!("related artists of {}", artist_id)).await
    }
}
