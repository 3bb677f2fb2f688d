//! Browser-like session management against the provider's anti-bot layer.
//!
//! The charting API refuses bare programmatic requests: clients must first
//! visit the exchange's public page so the anti-bot cookies land in the
//! cookie jar, and must keep presenting browser-shaped headers afterwards.
//! [`SessionManager`] owns the single process-wide HTTP client (and with it
//! the jar) and re-runs the handshake whenever the session ages out or a
//! caller reports a rejection.

use std::time::{Duration, Instant};

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::Client;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// The handshake request itself failed (network unreachable, timeout).
    #[error("handshake request failed: {0}")]
    Handshake(#[source] reqwest::Error),

    /// The provider answered the handshake with a non-success status.
    #[error("handshake rejected by provider (HTTP {status})")]
    Rejected { status: u16 },
}

/// Validity metadata for the cookies currently held by the client's jar.
///
/// The cookies themselves live inside the shared [`Client`]; this records
/// when they were acquired so they can be refreshed before the provider
/// starts rejecting them.
#[derive(Debug, Clone)]
pub struct Session {
    established_at: Instant,
}

impl Session {
    fn age(&self) -> Duration {
        self.established_at.elapsed()
    }
}

/// Owns the process-wide provider session.
///
/// All catalog and historical requests route through [`Self::client`].
/// Renewal is mutually exclusive: one handshake in flight at a time, and
/// callers that observe a stale session wait for that handshake instead of
/// triggering their own.
pub struct SessionManager {
    client: Client,
    bootstrap_url: String,
    max_age: Duration,
    state: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(config: &EngineConfig) -> Result<Self, SessionError> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(SessionError::ClientBuild)?;

        Ok(Self {
            client,
            bootstrap_url: config.bootstrap_url.clone(),
            max_age: Duration::from_secs(config.session_max_age_secs),
            state: Mutex::new(None),
        })
    }

    /// The shared HTTP client carrying the session cookies.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Returns once a valid session exists, handshaking if needed.
    ///
    /// Idempotent. If the handshake itself is rejected it is retried exactly
    /// once before the failure surfaces.
    pub async fn ensure_session(&self) -> Result<(), SessionError> {
        let mut state = self.state.lock().await;
        if let Some(session) = state.as_ref() {
            if session.age() < self.max_age {
                return Ok(());
            }
            debug!("session aged out, re-establishing");
        }
        *state = None;

        let session = match self.handshake().await {
            Ok(session) => session,
            Err(SessionError::Rejected { status }) => {
                warn!(status, "handshake rejected, retrying once");
                self.handshake().await?
            }
            Err(err) => return Err(err),
        };
        *state = Some(session);
        Ok(())
    }

    /// Drops the current session so the next [`Self::ensure_session`] call
    /// performs a fresh handshake. Called by consumers when the provider
    /// rejects a request mid-flight.
    pub async fn invalidate(&self) {
        *self.state.lock().await = None;
    }

    async fn handshake(&self) -> Result<Session, SessionError> {
        debug!(url = %self.bootstrap_url, "performing session handshake");
        let response = self
            .client
            .get(&self.bootstrap_url)
            .send()
            .await
            .map_err(SessionError::Handshake)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Rejected {
                status: status.as_u16(),
            });
        }

        // Drain the body so the connection can be reused; the content is a
        // human-facing page we have no use for.
        let _ = response.bytes().await;

        info!("provider session established");
        Ok(Session {
            established_at: Instant::now(),
        })
    }
}

/// The header set the provider expects from a browser. Cookies come from the
/// handshake; these stay constant for the client's lifetime.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    headers.insert("DNT", HeaderValue::from_static("1"));
    headers.insert(
        "Upgrade-Insecure-Requests",
        HeaderValue::from_static("1"),
    );
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers
}
