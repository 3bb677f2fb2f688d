//! Wire-format structs for the charting provider.
//!
//! Parsing is strict where it matters: unknown fields are ignored so
//! additive schema drift doesn't break the engine, but a missing required
//! field is a typed parse failure, never a defaulted zero.

use chrono::TimeZone;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::candle::{Candle, EXCHANGE_TZ};
use crate::models::segment::ExchangeSegment;
use crate::models::timeframe::ProviderInterval;
use crate::provider::{ApiError, CandleRequest};

/// Request body of the historical-data endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct HistoricalBody {
    exch: &'static str,
    #[serde(rename = "instrType")]
    instr_type: &'static str,
    #[serde(rename = "scripCode")]
    scrip_code: u32,
    #[serde(rename = "ulToken")]
    ul_token: u32,
    #[serde(rename = "fromDate")]
    from_date: i64,
    #[serde(rename = "toDate")]
    to_date: i64,
    #[serde(rename = "timeInterval")]
    time_interval: &'static str,
    #[serde(rename = "chartPeriod")]
    chart_period: &'static str,
    #[serde(rename = "chartStart")]
    chart_start: u32,
}

impl HistoricalBody {
    pub(crate) fn new(request: &CandleRequest, interval: ProviderInterval) -> Self {
        let (exch, instr_type) = match request.segment {
            ExchangeSegment::Nse => ("N", "C"),
            ExchangeSegment::Nfo => ("D", "D"),
        };
        Self {
            exch,
            instr_type,
            scrip_code: request.scrip_code,
            ul_token: request.scrip_code,
            from_date: request.from.timestamp(),
            to_date: request.to.timestamp(),
            time_interval: interval.time_interval,
            chart_period: interval.chart_period,
            chart_start: 0,
        }
    }
}

/// Column-oriented candle payload: parallel arrays keyed by single letters.
///
/// `v` is optional because indices trade no volume of their own; everything
/// else is required.
#[derive(Debug, Deserialize)]
pub(crate) struct CandlePayload {
    #[serde(rename = "s", default)]
    pub status: Option<String>,
    pub t: Vec<i64>,
    pub o: Vec<f64>,
    pub h: Vec<f64>,
    pub l: Vec<f64>,
    pub c: Vec<f64>,
    #[serde(default)]
    pub v: Vec<f64>,
}

impl CandlePayload {
    /// Converts the parallel arrays into [`Candle`]s stamped in
    /// exchange-local time, ascending.
    pub(crate) fn into_candles(self) -> Result<Vec<Candle>, ApiError> {
        // A holiday sub-range legitimately carries no bars. That is distinct
        // from a block page, which never parses this far.
        if self.status.as_deref() == Some("no_data") {
            return Ok(Vec::new());
        }

        let n = self.t.len();
        for (name, len) in [
            ("o", self.o.len()),
            ("h", self.h.len()),
            ("l", self.l.len()),
            ("c", self.c.len()),
        ] {
            if len != n {
                return Err(ApiError::Parse(format!(
                    "array '{name}' has {len} entries, expected {n}"
                )));
            }
        }
        if !self.v.is_empty() && self.v.len() != n {
            return Err(ApiError::Parse(format!(
                "array 'v' has {} entries, expected {n}",
                self.v.len()
            )));
        }

        let mut candles = Vec::with_capacity(n);
        for i in 0..n {
            let ts = Utc
                .timestamp_opt(self.t[i], 0)
                .single()
                .ok_or_else(|| {
                    ApiError::Parse(format!("timestamp {} is out of range", self.t[i]))
                })?
                .with_timezone(&EXCHANGE_TZ);
            candles.push(Candle {
                ts,
                open: self.o[i],
                high: self.h[i],
                low: self.l[i],
                close: self.c[i],
                volume: self.v.get(i).map(|v| v.round() as u64).unwrap_or(0),
            });
        }
        candles.sort_by_key(|c| c.ts);
        Ok(candles)
    }
}
