//! Client-side aggregation of base-resolution candles into coarser bars.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;

use crate::errors::Error;
use crate::models::candle::{Candle, CandleSeries, EXCHANGE_TZ};
use crate::models::timeframe::Timeframe;

/// The exchange session opens at 09:15 local time; intraday buckets anchor
/// here rather than at midnight so a 3-minute series runs 09:15, 09:18, ...
const SESSION_OPEN_MINUTES: i64 = 9 * 60 + 15;

/// Aggregates `series` into fixed, non-overlapping `target` buckets.
///
/// Per bucket: open of the first bar, close of the last, max high, min low,
/// summed volume; the bucket's timestamp is its open instant, preserving the
/// bar-open convention. Buckets with no constituent bars (holidays, session
/// gaps) are omitted, never zero-filled. Resampling a series at its own
/// timeframe is the identity, which makes the operation idempotent.
///
/// Fails with [`Error::UnsupportedTimeframe`] when `target` is not an
/// integer multiple of the series' base resolution: a finer target, a
/// non-divisible minute count, or a calendar target (`1w`, `1M`) over
/// anything but daily bars.
pub fn resample(series: &CandleSeries, target: Timeframe) -> Result<CandleSeries, Error> {
    let base = series.timeframe;
    if !is_supported_pair(base, target) {
        return Err(Error::UnsupportedTimeframe { base, target });
    }

    let mut candles: Vec<Candle> = Vec::new();
    for candle in &series.candles {
        let bucket_ts = bucket_open(candle.ts, target);
        match candles.last_mut() {
            Some(current) if current.ts == bucket_ts => {
                current.high = current.high.max(candle.high);
                current.low = current.low.min(candle.low);
                current.close = candle.close;
                current.volume += candle.volume;
            }
            _ => candles.push(Candle {
                ts: bucket_ts,
                open: candle.open,
                high: candle.high,
                low: candle.low,
                close: candle.close,
                volume: candle.volume,
            }),
        }
    }

    Ok(CandleSeries {
        symbol: series.symbol.clone(),
        scrip_code: series.scrip_code,
        timeframe: target,
        candles,
    })
}

fn is_supported_pair(base: Timeframe, target: Timeframe) -> bool {
    match (base.minutes(), target.minutes()) {
        // Intraday to intraday: bucket must be a whole number of base bars.
        (Some(b), Some(t)) => t >= b && t % b == 0,
        // Intraday bars can roll up into calendar days.
        (Some(_), None) => target == Timeframe::Day1,
        // Calendar targets only aggregate daily bars (or themselves).
        (None, None) => base == target || base == Timeframe::Day1,
        // Never downsample.
        (None, Some(_)) => false,
    }
}

/// The open instant of the `target` bucket containing `ts`.
fn bucket_open(ts: DateTime<Tz>, target: Timeframe) -> DateTime<Tz> {
    let date = ts.date_naive();
    let naive = match target.minutes() {
        Some(bucket_minutes) => {
            let into_day = i64::from(ts.hour()) * 60 + i64::from(ts.minute());
            let buckets = (into_day - SESSION_OPEN_MINUTES).div_euclid(i64::from(bucket_minutes));
            let open = SESSION_OPEN_MINUTES + buckets * i64::from(bucket_minutes);
            date.and_hms_opt(0, 0, 0).map(|midnight| midnight + Duration::minutes(open))
        }
        None => match target {
            Timeframe::Week1 => {
                let monday = date - Duration::days(i64::from(date.weekday().num_days_from_monday()));
                monday.and_hms_opt(0, 0, 0)
            }
            Timeframe::Month1 => date.with_day(1).and_then(|d| d.and_hms_opt(0, 0, 0)),
            _ => date.and_hms_opt(0, 0, 0),
        },
    };
    match naive {
        Some(naive) => exchange_local(naive),
        // Unreachable: and_hms_opt(0,0,0) and day-1 always exist.
        None => ts,
    }
}

/// Interprets a naive wall-clock time as exchange-local. IST has kept a
/// fixed offset for the provider's entire data history, so local times are
/// never ambiguous.
pub(crate) fn exchange_local(naive: NaiveDateTime) -> DateTime<Tz> {
    EXCHANGE_TZ
        .from_local_datetime(&naive)
        .earliest()
        .unwrap_or_else(|| EXCHANGE_TZ.from_utc_datetime(&naive))
}
