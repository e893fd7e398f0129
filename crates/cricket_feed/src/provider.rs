//! CricAPI score provider
//!
//! Endpoints (all GET, `apikey` query param):
//!   /currentMatches?offset=0   live + recent matches
//!   /matches?offset=0          full fixture list
//!   /match_info?id=<id>        one match
//!   /series?offset=0           series list
//!
//! Every response is wrapped in `{"status": "success" | "failure", "data": ...}`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use logger::{now_iso, ApiStatusEvent, EventLogger};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::model::{Match, Series};

pub const CRICAPI_BASE: &str = "https://api.cricapi.com/v1";

#[async_trait]
pub trait ScoreProvider: Send + Sync {
    async fn current_matches(&self) -> Result<Vec<Match>>;
    async fn all_matches(&self) -> Result<Vec<Match>>;
    /// `Ok(None)` when the provider does not know the id.
    async fn match_info(&self, id: &str) -> Result<Option<Match>>;
    async fn series(&self) -> Result<Vec<Series>>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    status: String,
    #[serde(default)]
    reason: Option<String>,
    data: Option<T>,
}

pub struct CricApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    logger: EventLogger,
}

impl CricApiClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cricket-live/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build CricAPI http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            logger: EventLogger::disabled(),
        })
    }

    pub fn with_event_log(mut self, logger: EventLogger) -> Self {
        self.logger = logger;
        self
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Option<T>> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut query: Vec<(&str, &str)> = vec![("apikey", self.api_key.as_str())];
        query.extend_from_slice(params);

        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .with_context(|| format!("CricAPI {endpoint} request failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("CricAPI {endpoint} failed {status}: {}", preview(&body, 100));
            self.log_api(endpoint, false, Some(status.as_u16()), &format!("http_{status}"), 0);
            anyhow::bail!("CricAPI {endpoint} HTTP {status}");
        }

        let raw = resp.text().await?;
        let envelope: Envelope<T> = serde_json::from_str(&raw)
            .with_context(|| format!("parse CricAPI {endpoint}: {}", preview(&raw, 200)))?;

        if envelope.status != "success" {
            let reason = envelope.reason.unwrap_or_else(|| envelope.status.clone());
            self.log_api(endpoint, false, Some(status.as_u16()), &reason, 0);
            anyhow::bail!("CricAPI {endpoint} returned {reason}");
        }

        debug!("CricAPI {endpoint} ok");
        Ok(envelope.data)
    }

    async fn get_list<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>> {
        let items: Vec<T> = self.get(endpoint, &[("offset", "0")]).await?.unwrap_or_default();
        self.log_api(endpoint, true, Some(200), "ok", items.len());
        Ok(items)
    }

    fn log_api(&self, endpoint: &str, ok: bool, status_code: Option<u16>, msg: &str, items: usize) {
        let _ = self.logger.log(&ApiStatusEvent {
            ts: now_iso(),
            event: "API_STATUS",
            source: "cricapi".to_string(),
            endpoint: endpoint.to_string(),
            ok,
            status_code,
            message: msg.to_string(),
            items,
        });
    }
}

fn preview(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

#[async_trait]
impl ScoreProvider for CricApiClient {
    async fn current_matches(&self) -> Result<Vec<Match>> {
        self.get_list("currentMatches").await
    }

    async fn all_matches(&self) -> Result<Vec<Match>> {
        self.get_list("matches").await
    }

    async fn match_info(&self, id: &str) -> Result<Option<Match>> {
        let found: Option<Match> = self.get("match_info", &[("id", id)]).await?;
        // CricAPI answers unknown ids with an empty object
        Ok(found.filter(|m| !m.id.is_empty()))
    }

    async fn series(&self) -> Result<Vec<Series>> {
        self.get_list("series").await
    }
}
