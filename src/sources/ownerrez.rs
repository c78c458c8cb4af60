use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Booking, Property};
use crate::sources::traits::{BookingSource, PropertySource};
use crate::sources::types::{DateRange, Page, PropertyQuery};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("rental-desk/", env!("CARGO_PKG_VERSION"));

/// OwnerRez v2 API client
pub struct OwnerRezClient {
    client: Client,
    base_url: String,
    username: String,
    token: String,
}

impl OwnerRezClient {
    /// Create a client from validated configuration
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_timeout(
            &config.base_url,
            &config.username,
            &config.api_token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    pub fn with_timeout(
        base_url: &str,
        username: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self> {
        if username.is_empty() || token.is_empty() {
            return Err(Error::Config(
                "OwnerRez credentials are missing".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            token: token.to_string(),
        })
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Page<T>> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.token))
            .query(params)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body = response.text().await?;
        let page: Page<T> = serde_json::from_str(&body)?;
        Ok(page)
    }
}

/// Turn a non-success response into `Error::Upstream`
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = upstream_message(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    warn!("OwnerRez returned status {}: {}", status, message);

    Err(Error::Upstream {
        status: status.as_u16(),
        message,
    })
}

/// Pull a readable message out of an error body.
///
/// OwnerRez reports `{"messages": [...]}`; other gateways send `{"message": ...}`
/// or plain text.
fn upstream_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(messages) = value.get("messages").and_then(|m| m.as_array()) {
            let joined: Vec<&str> = messages.iter().filter_map(|m| m.as_str()).collect();
            if !joined.is_empty() {
                return Some(joined.join("; "));
            }
        }
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return Some(message.to_string());
        }
    }

    Some(body.chars().take(200).collect())
}

fn paging(offset: u32, limit: u32) -> [(String, String); 2] {
    [
        ("offset".to_string(), offset.to_string()),
        ("limit".to_string(), limit.to_string()),
    ]
}

#[async_trait]
impl BookingSource for OwnerRezClient {
    async fn fetch_bookings_page(
        &self,
        range: &DateRange,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Booking>> {
        let mut params = vec![
            ("from".to_string(), range.start.format("%Y-%m-%d").to_string()),
            ("to".to_string(), range.end.format("%Y-%m-%d").to_string()),
            ("include_charges".to_string(), "true".to_string()),
        ];
        params.extend(paging(offset, limit));
        self.get_page("/v2/bookings", &params).await
    }

    fn source_name(&self) -> &'static str {
        "OwnerRez"
    }
}

#[async_trait]
impl PropertySource for OwnerRezClient {
    async fn fetch_properties_page(
        &self,
        query: &PropertyQuery,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Property>> {
        let path = if query.params.is_empty() {
            "/v2/properties"
        } else {
            "/v2/propertysearch"
        };
        let mut params = query.params.clone();
        params.extend(paging(offset, limit));
        self.get_page(path, &params).await
    }
}
