//! Thin Discogs API client: builds the OAuth1 header per request and issues
//! the GET, nothing else. Pagination lives in `pagination.rs`.

use std::collections::BTreeMap;
use std::time::Duration;

use discogsography_core::error::{AppError, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;

pub const DISCOGS_API_BASE: &str = "https://api.discogs.com";

#[derive(Debug, Clone)]
pub struct DiscogsCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

#[derive(Clone)]
pub struct DiscogsClient {
    http: Client,
    user_agent: String,
    credentials: DiscogsCredentials,
}

/// Outcome of a single paginated request, distinguishing "keep going" from
/// the two early-exit conditions the sync loop handles itself.
pub enum PageOutcome {
    Ok(Value),
    RateLimited,
    Failed { status: u16 },
}

impl DiscogsClient {
    pub fn new(credentials: DiscogsCredentials, user_agent: String) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            http,
            user_agent,
            credentials,
        })
    }

    /// GET `{base_url}` with `query_params` signed into the OAuth1 set.
    pub async fn get(&self, base_url: &str, query_params: &BTreeMap<String, String>) -> Result<PageOutcome> {
        let authorization = crate::oauth::authorization_header(
            "GET",
            base_url,
            query_params,
            &self.credentials.consumer_key,
            &self.credentials.consumer_secret,
            &self.credentials.access_token,
            &self.credentials.access_token_secret,
        );

        let response = self
            .http
            .get(base_url)
            .query(&query_params.iter().collect::<Vec<_>>())
            .header("Authorization", authorization)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::DiscogsApiError {
                status: 0,
                message: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => {
                let body: Value = response.json().await.map_err(|e| AppError::DiscogsApiError {
                    status: 200,
                    message: format!("invalid JSON body: {e}"),
                })?;
                Ok(PageOutcome::Ok(body))
            }
            StatusCode::TOO_MANY_REQUESTS => Ok(PageOutcome::RateLimited),
            other => Ok(PageOutcome::Failed { status: other.as_u16() }),
        }
    }
}
