//! Shared fixtures: an in-memory [`ChartingApi`] whose candle output is a
//! deterministic function of the requested range, plus canned master lists.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Weekday};
use chrono_tz::Tz;

use nse_market_data::models::candle::{Candle, EXCHANGE_TZ};
use nse_market_data::provider::{ApiError, CandleRequest, ChartingApi};
use nse_market_data::{ExchangeSegment, InstrumentKind, InstrumentRecord};

pub fn nse_master_body() -> String {
    let mut lines = vec![
        "2885|RELIANCE|Reliance Industries Limited|EQ".to_string(),
        "11536|TCS|Tata Consultancy Services Limited|EQ".to_string(),
        "1594|INFY|Infosys Limited|EQ".to_string(),
        "26000|Nifty 50|Nifty 50 Index|IN".to_string(),
        "26009|Nifty Bank|Nifty Bank Index|IN".to_string(),
    ];
    for i in 0..10 {
        lines.push(format!("{}|STOCK{i}|Listed Company {i}|EQ", 4000 + i));
    }
    lines.join("\n")
}

pub fn nfo_master_body() -> String {
    let mut lines = vec![
        "35001|BANKNIFTY24OCTFUT|BANKNIFTY October 2024 Future|FUTIDX".to_string(),
        "35002|BANKNIFTY24NOVFUT|BANKNIFTY November 2024 Future|FUTIDX".to_string(),
        "35003|RELIANCE24OCTFUT|RELIANCE October 2024 Future|FUTSTK".to_string(),
        "35004|NIFTY24NOV24000CE|NIFTY Nov 24000 Call|OPTIDX".to_string(),
        "35005|NIFTY24NOV24000PE|NIFTY Nov 24000 Put|OPTIDX".to_string(),
        "35006|NIFTY24N2124800CE|NIFTY Weekly 24800 Call|OPTIDX".to_string(),
    ];
    for i in 0..10 {
        lines.push(format!(
            "{}|NIFTY24DEC{}CE|NIFTY Dec {} Call|OPTIDX",
            36000 + i,
            23000 + i * 100,
            23000 + i * 100
        ));
    }
    lines.join("\n")
}

pub fn instrument(symbol: &str, scrip_code: u32, segment: ExchangeSegment) -> InstrumentRecord {
    InstrumentRecord {
        scrip_code,
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        kind: InstrumentKind::Other,
        segment,
        expiry: None,
        strike: None,
        right: None,
    }
}

/// In-memory provider double.
///
/// Scripted failures are consumed FIFO by `fetch_candles`; once the queue is
/// empty every call succeeds with synthetic bars.
pub struct FakeApi {
    failures: Mutex<VecDeque<ApiError>>,
    pub candle_calls: AtomicUsize,
    pub invalidations: AtomicUsize,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::failing_with(Vec::new())
    }

    pub fn failing_with(failures: Vec<ApiError>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            candle_calls: AtomicUsize::new(0),
            invalidations: AtomicUsize::new(0),
        }
    }

    pub fn candle_calls(&self) -> usize {
        self.candle_calls.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChartingApi for FakeApi {
    async fn fetch_master(&self, segment: ExchangeSegment) -> Result<String, ApiError> {
        Ok(match segment {
            ExchangeSegment::Nse => nse_master_body(),
            ExchangeSegment::Nfo => nfo_master_body(),
        })
    }

    async fn fetch_candles(&self, request: &CandleRequest) -> Result<Vec<Candle>, ApiError> {
        self.candle_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(synth_candles(request))
    }

    async fn invalidate_session(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Deterministic bars for a sub-range: weekday sessions only, 09:15 open,
/// value a pure function of the timestamp so overlapping sub-ranges produce
/// identical boundary bars.
pub fn synth_candles(request: &CandleRequest) -> Vec<Candle> {
    let mut out = Vec::new();
    let mut date = request.from.date_naive();
    let end_date = request.to.date_naive();
    while date <= end_date {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            match request.resolution.minutes() {
                Some(step) => {
                    let mut minute = 9 * 60 + 15;
                    while minute < 15 * 60 + 30 {
                        push_in_range(&mut out, request, session_instant(date, minute));
                        minute += i64::from(step);
                    }
                }
                None => push_in_range(&mut out, request, session_instant(date, 9 * 60 + 15)),
            }
        }
        date = date.succ_opt().expect("date overflow in fixture");
    }
    out
}

fn push_in_range(out: &mut Vec<Candle>, request: &CandleRequest, ts: DateTime<Tz>) {
    if ts >= request.from && ts <= request.to {
        out.push(candle_at(ts));
    }
}

fn session_instant(date: NaiveDate, minute_of_day: i64) -> DateTime<Tz> {
    let naive = date.and_hms_opt(0, 0, 0).expect("midnight always exists")
        + chrono::Duration::minutes(minute_of_day);
    EXCHANGE_TZ
        .from_local_datetime(&naive)
        .earliest()
        .expect("IST local times are unambiguous")
}

fn candle_at(ts: DateTime<Tz>) -> Candle {
    let seed = (ts.timestamp() % 1000) as f64;
    let base = 100.0 + seed / 10.0;
    Candle {
        ts,
        open: base,
        high: base + 1.5,
        low: base - 1.5,
        close: base + 0.5,
        volume: (ts.timestamp() % 997) as u64,
    }
}
