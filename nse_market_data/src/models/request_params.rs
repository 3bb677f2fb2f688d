use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{segment::ExchangeSegment, timeframe::Timeframe};

/// Caller-level parameters for one historical data request.
///
/// `start` and `end` are exchange-local wall-clock times (IST); the engine
/// attaches the timezone itself so callers never deal in UTC conversions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryRequest {
    /// Symbol query, resolved against the master catalog before fetching.
    pub symbol: String,
    pub segment: ExchangeSegment,
    /// Start of the requested range (inclusive, exchange-local).
    pub start: NaiveDateTime,
    /// End of the requested range (inclusive, exchange-local).
    pub end: NaiveDateTime,
    pub timeframe: Timeframe,
}
