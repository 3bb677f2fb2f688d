//! Canonical in-memory representation of a price/volume bar.
//!
//! Every provider response is normalized into these structs before anything
//! downstream (resampling, presentation) sees it.

use chrono::DateTime;
use chrono_tz::Tz;

use crate::models::timeframe::Timeframe;

/// The exchange's local timezone. All candle timestamps carry it.
pub const EXCHANGE_TZ: Tz = chrono_tz::Asia::Kolkata;

/// One OHLCV bar.
///
/// `ts` is the bar-open instant in exchange-local time (IST); the provider
/// stamps bars at their open and the engine preserves that convention
/// throughout, including for resampled bars.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    /// Bar-open timestamp, exchange-local.
    pub ts: DateTime<Tz>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Traded volume. Zero for indices, which have no turnover of their own.
    pub volume: u64,
}

impl Candle {
    /// Whether the bar satisfies `low <= open,close <= high`.
    ///
    /// Provider data occasionally violates this; the engine reports what it
    /// received rather than silently repairing it, so this is a diagnostic
    /// helper, not an enforced invariant.
    pub fn is_coherent(&self) -> bool {
        self.low <= self.open.min(self.close) && self.high >= self.open.max(self.close)
    }
}

/// An ordered run of [`Candle`]s for one instrument at one resolution.
///
/// Timestamps are strictly increasing. Produced per request; never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSeries {
    pub symbol: String,
    pub scrip_code: u32,
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }
}
