use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::db::models::{Event, EventOdds};
use crate::retry::{is_retryable, truncate_body, RetryPolicy};

use super::provider::OddsSource;

/// Retry schedule for the odds provider (seconds before each attempt)
const RETRY_DELAYS_SECS: [u64; 4] = [0, 2, 5, 10];

#[derive(Debug, Error)]
pub enum OddsApiError {
    #[error("missing ODDS_API_KEY")]
    MissingApiKey,

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: usize, last: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Client for The Odds API v4.
#[derive(Clone)]
pub struct OddsApiClient {
    http: Client,
    base_url: Url,
    api_key: Option<String>,
    region: String,
    retry: RetryPolicy,
}

impl OddsApiClient {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        region: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let base_url = Url::parse(base_url).with_context(|| format!("Bad odds API URL {}", base_url))?;
        Ok(OddsApiClient {
            http,
            base_url,
            api_key,
            region: region.to_string(),
            retry: RetryPolicy::from_secs(&RETRY_DELAYS_SECS),
        })
    }

    #[cfg(test)]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn api_key(&self) -> Result<&str, OddsApiError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(OddsApiError::MissingApiKey)
    }

    /// Base URL with `segments` appended as path components.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, OddsApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OddsApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        params: &[(&str, &str)],
    ) -> Result<T, OddsApiError> {
        let mut last = String::from("no attempts made");

        for attempt in 0..self.retry.attempts() {
            self.retry.wait(attempt).await;
            debug!("GET {} (attempt {})", url, attempt + 1);

            let resp = match self.http.get(url.clone()).query(params).send().await {
                Ok(r) => r,
                Err(e) => {
                    // the full URL carries the API key
                    last = e.without_url().to_string();
                    warn!("Odds API request error on {}: {}", url.path(), last);
                    continue;
                }
            };

            let status = resp.status();
            if let Some(remaining) = resp
                .headers()
                .get("x-requests-remaining")
                .and_then(|v| v.to_str().ok())
            {
                debug!("Odds API requests remaining: {}", remaining);
            }

            if is_retryable(status) {
                let body = resp.text().await.unwrap_or_default();
                last = format!("HTTP {}: {}", status, truncate_body(&body, 300));
                warn!("Odds API {} on {}, retrying", status, url.path());
                continue;
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(OddsApiError::Status {
                    status,
                    body: truncate_body(&body, 500),
                });
            }

            match resp.text().await {
                Ok(body) => return Ok(serde_json::from_str(&body)?),
                Err(e) => {
                    last = e.without_url().to_string();
                    continue;
                }
            }
        }

        Err(OddsApiError::RetriesExhausted {
            attempts: self.retry.attempts(),
            last,
        })
    }
}

#[async_trait]
impl OddsSource for OddsApiClient {
    fn name(&self) -> &str {
        "the-odds-api"
    }

    async fn events(&self, sport: &str) -> Result<Vec<Event>> {
        let key = self.api_key()?;
        let url = self.endpoint(&["sports", sport, "events"])?;
        let events = self.get_json(url, &[("apiKey", key)]).await?;
        Ok(events)
    }

    async fn event_odds(&self, sport: &str, event_id: &str, markets: &str) -> Result<EventOdds> {
        let key = self.api_key()?;
        let url = self.endpoint(&["sports", sport, "events", event_id, "odds"])?;
        let params = [
            ("apiKey", key),
            ("regions", self.region.as_str()),
            ("markets", markets),
            ("oddsFormat", "american"),
        ];
        let odds = self.get_json(url, &params).await?;
        Ok(odds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode as AxumStatus, routing::get, Json, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const EVENT_ODDS_JSON: &str = r#"{
        "id": "abc123",
        "sport_key": "basketball_nba",
        "sport_title": "NBA",
        "commence_time": "2026-10-19T23:30:00Z",
        "home_team": "Boston Celtics",
        "away_team": "New York Knicks",
        "bookmakers": [{
            "key": "draftkings",
            "title": "DraftKings",
            "last_update": "2026-10-19T18:00:00Z",
            "markets": [{
                "key": "player_points",
                "last_update": "2026-10-19T18:00:00Z",
                "outcomes": [
                    {"name": "Over", "description": "Jalen Brunson", "price": -115, "point": 27.5},
                    {"name": "Under", "description": "Jalen Brunson", "price": -105, "point": 27.5}
                ]
            }]
        }]
    }"#;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v4", addr)
    }

    fn client(base: &str, key: Option<&str>) -> OddsApiClient {
        OddsApiClient::new(base, key.map(str::to_string), "us", Duration::from_secs(5))
            .unwrap()
            .with_retry(RetryPolicy::immediate(3))
    }

    #[test]
    fn test_decode_event_odds() {
        let odds: EventOdds = serde_json::from_str(EVENT_ODDS_JSON).unwrap();
        assert_eq!(odds.bookmakers.len(), 1);
        let o = &odds.bookmakers[0].markets[0].outcomes[0];
        assert_eq!(o.american_price(), Some(-115));
        assert_eq!(o.point, Some(27.5));
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let c = client("https://api.the-odds-api.com/v4", Some("k"));
        let url = c.endpoint(&["sports", "basketball_nba", "events"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.the-odds-api.com/v4/sports/basketball_nba/events"
        );
        let c = client("https://api.the-odds-api.com/v4/", Some("k"));
        let url = c.endpoint(&["sports"]).unwrap();
        assert_eq!(url.as_str(), "https://api.the-odds-api.com/v4/sports");
    }

    #[tokio::test]
    async fn test_missing_key_is_error() {
        let c = client("http://127.0.0.1:9/v4", None);
        let err = c.events("basketball_nba").await.unwrap_err();
        assert!(err.to_string().contains("ODDS_API_KEY"));
    }

    #[tokio::test]
    async fn test_event_odds_retries_server_errors() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/v4/sports/:sport/events/:id/odds",
            get(move |Path((_sport, _id)): Path<(String, String)>| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err((AxumStatus::SERVICE_UNAVAILABLE, "busy"))
                    } else {
                        let v: serde_json::Value = serde_json::from_str(EVENT_ODDS_JSON).unwrap();
                        Ok(Json(v))
                    }
                }
            }),
        );
        let base = serve(app).await;
        let odds = client(&base, Some("k"))
            .event_odds("basketball_nba", "abc123", "player_points")
            .await
            .unwrap();
        assert_eq!(odds.id, "abc123");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/v4/sports/:sport/events",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (AxumStatus::UNAUTHORIZED, "bad key")
                }
            }),
        );
        let base = serve(app).await;
        let err = client(&base, Some("k")).events("basketball_nba").await.unwrap_err();
        assert!(err.to_string().contains("401"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_exhausted() {
        let app = Router::new().route(
            "/v4/sports/:sport/events",
            get(|| async { (AxumStatus::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = serve(app).await;
        let err = client(&base, Some("k")).events("basketball_nba").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("after 3 attempts"), "{}", msg);
        assert!(msg.contains("slow down"));
    }
}
