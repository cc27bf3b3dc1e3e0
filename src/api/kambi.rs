//! HTTP client for the bookmaker offering API.
//!
//! Two calls: a per-sport listing of live/upcoming matches and a per-match
//! detail fetch. Detail fetches go through a process-wide permit pool so
//! outbound concurrency stays bounded no matter how many pollers are running.

use std::sync::Arc;

use chrono::{Timelike, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::UpstreamConfig;
use crate::models::{EventListing, Mode, RawMatchPayload, SportMode};

/// Errors from one upstream call. Every variant except `NotFound` is
/// transient from the pipeline's point of view: the match is skipped this
/// cycle and naturally retried on the next one.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("match is no longer offered upstream")]
    NotFound,

    #[error("request timed out")]
    Timeout,

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(reqwest::Error),

    #[error("failed to decode response body: {0}")]
    Decode(reqwest::Error),

    #[error("fetch aborted by shutdown")]
    Cancelled,
}

pub struct KambiClient {
    http: reqwest::Client,
    cfg: UpstreamConfig,
    /// Process-wide admission control for detail fetches.
    permits: Arc<Semaphore>,
}

impl KambiClient {
    pub fn new(cfg: UpstreamConfig, permits: Arc<Semaphore>) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/javascript, */*; q=0.01"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("en-US;q=0.7,en;q=0.3"),
        );
        let origin = format!("https://www.unibet.{}", cfg.country_code);
        headers.insert(ORIGIN, HeaderValue::from_str(&origin)?);
        headers.insert(REFERER, HeaderValue::from_str(&format!("{}/", origin))?);

        // gzip-encoded bodies are decompressed by the client itself.
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .default_headers(headers)
            .gzip(true)
            .timeout(cfg.timeout())
            .build()?;

        Ok(Self { http, cfg, permits })
    }

    /// List live or upcoming matches for one sport.
    pub async fn list_matches(&self, sm: &SportMode) -> Result<EventListing, FetchError> {
        let path = match sm.mode {
            Mode::Live => &self.cfg.live_list_path,
            Mode::PreMatch => &self.cfg.list_path,
        };
        let url = format!(
            "{}{}",
            self.cfg.api_base,
            fill_template(path, "{sport}", &sm.sport.to_lowercase())
        );

        let mut params = self.base_params();
        params.push(("useCombined".to_string(), "true".to_string()));
        if sm.mode == Mode::Live {
            params.push(("useCombinedLive".to_string(), "true".to_string()));
        }

        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.json().await.map_err(FetchError::Decode)
    }

    /// Fetch the detail payload for one match.
    ///
    /// Takes one slot of the permit pool before issuing the request and
    /// releases it on return, success or failure. Waiting for a permit races
    /// the cancellation token so a shutdown unblocks queued fetches.
    pub async fn fetch_match(
        &self,
        match_id: i64,
        cancel: &CancellationToken,
    ) -> Result<RawMatchPayload, FetchError> {
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            permit = self.permits.acquire() => permit.map_err(|_| FetchError::Cancelled)?,
        };

        let url = format!(
            "{}{}",
            self.cfg.api_base,
            fill_template(&self.cfg.match_path, "{id}", &match_id.to_string())
        );

        let mut params = self.base_params();
        params.push(("includeParticipants".to_string(), "true".to_string()));

        let response = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.json().await.map_err(FetchError::Decode)
    }

    fn base_params(&self) -> Vec<(String, String)> {
        vec![
            ("lang".to_string(), self.cfg.lang.clone()),
            ("market".to_string(), self.cfg.market.clone()),
            ("client_id".to_string(), self.cfg.client_id.clone()),
            ("channel_id".to_string(), self.cfg.channel_id.clone()),
            (
                "ncid".to_string(),
                format!("{}", Utc::now().second() * 1000),
            ),
        ]
    }
}

fn classify_transport(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(e)
    }
}

fn fill_template(template: &str, key: &str, value: &str) -> String {
    template.replace(key, value)
}
