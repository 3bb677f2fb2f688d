//! Provider abstraction for the charting API.
//!
//! [`ChartingApi`] is the seam between the engine's orchestration (catalog
//! download, historical fetching) and the vendor-specific HTTP logic. The
//! engine only ever talks to the trait, which keeps the retry and merge
//! machinery testable without a network.

pub mod response;

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::models::candle::Candle;
use crate::models::segment::ExchangeSegment;
use crate::models::timeframe::Timeframe;
use crate::provider::response::{CandlePayload, HistoricalBody};
use crate::session::{SessionError, SessionManager};

/// Errors surfaced by a [`ChartingApi`] implementation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be completed (network failure, connection drop).
    #[error("request to provider failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The request exceeded its deadline. Retryable, unlike a rejection.
    #[error("request to provider timed out")]
    Timeout,

    /// The provider declined the session: an authentication-class status, or
    /// an HTML block page where data was expected.
    #[error("provider rejected the session")]
    SessionRejected,

    /// A non-success status outside the rejection class.
    #[error("provider returned HTTP {status}")]
    Http { status: u16 },

    /// The response decoded, but not into the expected shape.
    #[error("malformed provider response: {0}")]
    Parse(String),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// One provider-native candle request covering a single sub-range.
#[derive(Clone, Debug)]
pub struct CandleRequest {
    pub scrip_code: u32,
    pub segment: ExchangeSegment,
    /// Resolution to request. Must be provider-native.
    pub resolution: Timeframe,
    /// Sub-range start, inclusive.
    pub from: DateTime<Tz>,
    /// Sub-range end, inclusive. Adjacent sub-ranges share this edge, so the
    /// caller deduplicates the boundary bar.
    pub to: DateTime<Tz>,
}

/// Unified interface to the charting provider.
#[async_trait]
pub trait ChartingApi: Send + Sync {
    /// Raw master-list body for a segment.
    async fn fetch_master(&self, segment: ExchangeSegment) -> Result<String, ApiError>;

    /// Decoded candles for one sub-range, ascending by timestamp.
    async fn fetch_candles(&self, request: &CandleRequest) -> Result<Vec<Candle>, ApiError>;

    /// Drops the current provider session so the next request re-handshakes.
    async fn invalidate_session(&self);
}

/// The real charting API client: session-managed, rate-limited HTTP.
pub struct NseChartingApi {
    session: Arc<SessionManager>,
    limiter: DefaultDirectRateLimiter,
    base_url: String,
}

impl NseChartingApi {
    pub fn new(config: &EngineConfig) -> Result<Self, SessionError> {
        let per_minute =
            NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(nonzero!(60u32));
        Ok(Self {
            session: Arc::new(SessionManager::new(config)?),
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
            base_url: config.charting_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn master_url(&self, segment: ExchangeSegment) -> String {
        match segment {
            ExchangeSegment::Nse => format!("{}/Charts/GetEQMasters", self.base_url),
            ExchangeSegment::Nfo => format!("{}/Charts/GetFOMasters", self.base_url),
        }
    }

    fn historical_url(&self) -> String {
        format!("{}/Charts/symbolhistoricaldata/", self.base_url)
    }

    async fn prepare(&self) -> Result<(), ApiError> {
        self.session.ensure_session().await?;
        self.limiter.until_ready().await;
        Ok(())
    }
}

#[async_trait]
impl ChartingApi for NseChartingApi {
    async fn fetch_master(&self, segment: ExchangeSegment) -> Result<String, ApiError> {
        self.prepare().await?;
        debug!(%segment, "downloading master list");

        let response = self
            .session
            .client()
            .get(self.master_url(segment))
            .send()
            .await
            .map_err(classify_transport)?;
        let body = read_data_body(response).await?;
        Ok(body)
    }

    async fn fetch_candles(&self, request: &CandleRequest) -> Result<Vec<Candle>, ApiError> {
        let interval = request.resolution.provider_interval().ok_or_else(|| {
            ApiError::Parse(format!(
                "{} is not a provider-native resolution",
                request.resolution
            ))
        })?;
        self.prepare().await?;
        debug!(
            scrip = request.scrip_code,
            resolution = %request.resolution,
            from = %request.from,
            to = %request.to,
            "requesting candles"
        );

        let body = HistoricalBody::new(request, interval);
        let response = self
            .session
            .client()
            .post(self.historical_url())
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;
        let text = read_data_body(response).await?;

        let payload: CandlePayload =
            serde_json::from_str(&text).map_err(|err| ApiError::Parse(err.to_string()))?;
        payload.into_candles()
    }

    async fn invalidate_session(&self) {
        self.session.invalidate().await;
    }
}

/// Status-level rejection class: what the provider's anti-bot layer answers
/// with when it bothers setting a status at all.
fn is_rejection_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 401 | 403 | 429)
}

/// Payload-shape rejection: the provider also serves HTTP 200 with an HTML
/// interstitial instead of data, so status alone is not trusted.
pub(crate) fn looks_like_block_page(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(256).collect();
    head.starts_with('<') || head.to_ascii_lowercase().contains("access denied")
}

/// Applies the status- and shape-level rejection checks shared by every data
/// endpoint, returning the body text on success.
async fn read_data_body(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();
    if is_rejection_status(status) {
        warn!(status = status.as_u16(), "provider rejected request");
        return Err(ApiError::SessionRejected);
    }
    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
        });
    }

    let text = response.text().await.map_err(classify_transport)?;
    if looks_like_block_page(&text) {
        warn!("provider returned a block page in place of data");
        return Err(ApiError::SessionRejected);
    }
    Ok(text)
}

fn classify_transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Transport(err)
    }
}
