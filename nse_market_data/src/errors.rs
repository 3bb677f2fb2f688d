use chrono::NaiveDateTime;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::models::segment::ExchangeSegment;
use crate::models::timeframe::Timeframe;
use crate::provider::ApiError;
use crate::session::SessionError;

/// The unified error type for the `nse_market_data` crate.
///
/// Every failure surfaces as a distinct, inspectable kind; the engine never
/// substitutes partial or empty data for a failed operation.
#[derive(Debug, Error)]
pub enum Error {
    /// Establishing or renewing the provider session failed.
    #[error("session error: {0}")]
    Session(#[from] SessionError),

    /// Master catalog download, parse, or lookup failure.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The caller's query matched nothing in the catalog.
    #[error("no instrument matching '{query}' on {segment}")]
    SymbolNotFound {
        query: String,
        segment: ExchangeSegment,
    },

    /// The caller supplied a range whose start is not before its end.
    #[error("invalid range: start {start} is not before end {end}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    /// A historical fetch failed after the single allowed retry.
    #[error("historical fetch failed for scrip {scrip_code}: {source}")]
    HistoricalFetch {
        scrip_code: u32,
        #[source]
        source: ApiError,
    },

    /// The requested timeframe cannot be aggregated from the series' base
    /// resolution.
    #[error("cannot build {target} bars from a {base} series")]
    UnsupportedTimeframe { base: Timeframe, target: Timeframe },

    /// An error related to configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A generic I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// The on-disk catalog cache could not be decoded.
    #[error("catalog cache is malformed")]
    Cache(#[from] serde_json::Error),
}
