mod common;

use std::sync::Arc;

use chrono::{NaiveDate, Timelike};
use chrono_tz::Tz;

use common::{instrument, FakeApi};
use nse_market_data::errors::Error;
use nse_market_data::history::HistoryFetcher;
use nse_market_data::models::candle::EXCHANGE_TZ;
use nse_market_data::provider::{ApiError, ChartingApi};
use nse_market_data::{EngineConfig, ExchangeSegment, Timeframe};

fn test_config(concurrency: usize) -> EngineConfig {
    EngineConfig {
        fetch_concurrency: concurrency,
        intraday_max_span_days: 15,
        daily_max_span_days: 365,
        ..EngineConfig::default()
    }
}

fn fetcher(api: Arc<FakeApi>, concurrency: usize) -> HistoryFetcher {
    HistoryFetcher::new(api as Arc<dyn ChartingApi>, &test_config(concurrency))
}

fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> chrono::DateTime<Tz> {
    use chrono::TimeZone;
    EXCHANGE_TZ.with_ymd_and_hms(y, m, d, hh, mm, 0).unwrap()
}

#[tokio::test]
async fn long_intraday_range_is_built_from_multiple_sub_fetches() {
    let api = Arc::new(FakeApi::new());
    let fetcher = fetcher(api.clone(), 1);
    let banknifty = instrument("BANKNIFTY24OCTFUT", 35001, ExchangeSegment::Nfo);

    let series = fetcher
        .fetch(
            &banknifty,
            at(2024, 9, 1, 0, 0),
            at(2024, 10, 1, 0, 0),
            Timeframe::Min15,
        )
        .await
        .unwrap();

    // A 30-day window at a 15-day intraday cap needs two provider calls.
    assert_eq!(api.candle_calls(), 2);
    assert_eq!(series.timeframe, Timeframe::Min15);
    assert!(!series.is_empty());

    // Gapless within each session: same-day neighbors are exactly 15 minutes
    // apart, and timestamps never repeat or go backwards.
    for pair in series.candles.windows(2) {
        assert!(pair[0].ts < pair[1].ts);
        if pair[0].ts.date_naive() == pair[1].ts.date_naive() {
            assert_eq!((pair[1].ts - pair[0].ts).num_minutes(), 15);
        }
    }

    // The full requested window is covered: 2024-09-01 is a Sunday, so the
    // first session is the 2nd and the last full session before the end is
    // the 30th.
    let first = series.candles.first().unwrap();
    let last = series.candles.last().unwrap();
    assert_eq!(first.ts.date_naive(), NaiveDate::from_ymd_opt(2024, 9, 2).unwrap());
    assert_eq!(first.ts.hour(), 9);
    assert_eq!(first.ts.minute(), 15);
    assert_eq!(last.ts.date_naive(), NaiveDate::from_ymd_opt(2024, 9, 30).unwrap());
}

#[tokio::test]
async fn every_timestamp_lies_inside_the_requested_window() {
    let api = Arc::new(FakeApi::new());
    let fetcher = fetcher(api, 4);
    let reliance = instrument("RELIANCE", 2885, ExchangeSegment::Nse);

    let start = at(2024, 6, 3, 9, 15);
    let end = at(2024, 6, 28, 15, 30);
    let series = fetcher
        .fetch(&reliance, start, end, Timeframe::Day1)
        .await
        .unwrap();

    assert!(!series.is_empty());
    for candle in &series.candles {
        assert!(candle.ts >= start && candle.ts <= end);
    }
    for pair in series.candles.windows(2) {
        assert!(pair[0].ts < pair[1].ts, "timestamps must strictly increase");
    }
}

#[tokio::test]
async fn shared_sub_range_boundaries_are_deduplicated() {
    let api = Arc::new(FakeApi::new());
    let fetcher = fetcher(api.clone(), 1);
    let banknifty = instrument("BANKNIFTY24OCTFUT", 35001, ExchangeSegment::Nfo);

    // Starting at 09:15 puts the 15-day partition edge exactly on a bar
    // instant, so both neighboring sub-ranges return that bar.
    let series = fetcher
        .fetch(
            &banknifty,
            at(2024, 9, 2, 9, 15),
            at(2024, 9, 20, 15, 30),
            Timeframe::Min15,
        )
        .await
        .unwrap();

    assert!(api.candle_calls() >= 2);
    let mut seen = std::collections::HashSet::new();
    for candle in &series.candles {
        assert!(seen.insert(candle.ts), "duplicate bar at {}", candle.ts);
    }
}

#[tokio::test]
async fn concurrent_and_sequential_fetches_assemble_identically() {
    let banknifty = instrument("BANKNIFTY24OCTFUT", 35001, ExchangeSegment::Nfo);
    let start = at(2024, 7, 1, 0, 0);
    let end = at(2024, 10, 1, 0, 0);

    let sequential = fetcher(Arc::new(FakeApi::new()), 1)
        .fetch(&banknifty, start, end, Timeframe::Min15)
        .await
        .unwrap();
    let concurrent = fetcher(Arc::new(FakeApi::new()), 8)
        .fetch(&banknifty, start, end, Timeframe::Min15)
        .await
        .unwrap();

    assert_eq!(sequential, concurrent);
}

#[tokio::test]
async fn rejection_triggers_exactly_one_renewal_and_retry() {
    let api = Arc::new(FakeApi::failing_with(vec![ApiError::SessionRejected]));
    let fetcher = fetcher(api.clone(), 1);
    let reliance = instrument("RELIANCE", 2885, ExchangeSegment::Nse);

    let series = fetcher
        .fetch(
            &reliance,
            at(2024, 6, 3, 0, 0),
            at(2024, 6, 28, 23, 59),
            Timeframe::Day1,
        )
        .await
        .unwrap();

    assert!(!series.is_empty());
    assert_eq!(api.invalidations(), 1);
    // One sub-range, one rejected attempt plus one successful retry.
    assert_eq!(api.candle_calls(), 2);
}

#[tokio::test]
async fn repeated_rejection_fails_the_whole_call_with_no_partial_series() {
    let api = Arc::new(FakeApi::failing_with(vec![
        ApiError::SessionRejected,
        ApiError::SessionRejected,
    ]));
    let fetcher = fetcher(api.clone(), 1);
    let banknifty = instrument("BANKNIFTY24OCTFUT", 35001, ExchangeSegment::Nfo);

    // Two sub-ranges; the first rejects twice, so nothing is returned even
    // though the second sub-range would have succeeded.
    let result = fetcher
        .fetch(
            &banknifty,
            at(2024, 9, 1, 0, 0),
            at(2024, 10, 1, 0, 0),
            Timeframe::Min15,
        )
        .await;

    assert!(matches!(result, Err(Error::HistoricalFetch { .. })));
    assert_eq!(api.invalidations(), 1, "renewal happens exactly once");
}

#[tokio::test]
async fn timeout_is_retried_once_without_renewal() {
    let api = Arc::new(FakeApi::failing_with(vec![ApiError::Timeout]));
    let fetcher = fetcher(api.clone(), 1);
    let reliance = instrument("RELIANCE", 2885, ExchangeSegment::Nse);

    let series = fetcher
        .fetch(
            &reliance,
            at(2024, 6, 3, 0, 0),
            at(2024, 6, 28, 23, 59),
            Timeframe::Day1,
        )
        .await
        .unwrap();

    assert!(!series.is_empty());
    assert_eq!(api.invalidations(), 0, "timeouts do not force a handshake");
    assert_eq!(api.candle_calls(), 2);
}

#[tokio::test]
async fn reversed_range_is_rejected_before_any_request() {
    let api = Arc::new(FakeApi::new());
    let fetcher = fetcher(api.clone(), 1);
    let reliance = instrument("RELIANCE", 2885, ExchangeSegment::Nse);

    let result = fetcher
        .fetch(
            &reliance,
            at(2024, 6, 28, 0, 0),
            at(2024, 6, 3, 0, 0),
            Timeframe::Day1,
        )
        .await;

    assert!(matches!(result, Err(Error::InvalidRange { .. })));
    assert_eq!(api.candle_calls(), 0);
}

#[tokio::test]
async fn derived_timeframes_fetch_the_base_resolution_and_resample() {
    let api = Arc::new(FakeApi::new());
    let fetcher = fetcher(api.clone(), 1);
    let reliance = instrument("RELIANCE", 2885, ExchangeSegment::Nse);

    let series = fetcher
        .fetch(
            &reliance,
            at(2024, 10, 1, 9, 15),
            at(2024, 10, 1, 15, 30),
            Timeframe::Min3,
        )
        .await
        .unwrap();

    assert_eq!(series.timeframe, Timeframe::Min3);
    // Buckets anchor to the session open.
    assert_eq!(series.candles[0].ts.minute(), 15);
    assert_eq!(series.candles[1].ts.minute(), 18);
    for candle in &series.candles {
        assert!(candle.low <= candle.open.min(candle.close));
        assert!(candle.high >= candle.open.max(candle.close));
    }
}
