//! Historical data fetching: range partitioning, bounded-concurrency
//! sub-range requests, and deterministic reassembly.

mod range;
pub use range::partition;

use std::sync::Arc;

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::errors::Error;
use crate::models::candle::{Candle, CandleSeries};
use crate::models::instrument::InstrumentRecord;
use crate::models::timeframe::Timeframe;
use crate::provider::{ApiError, CandleRequest, ChartingApi};
use crate::resample::resample;

/// Fetches and assembles candle series across arbitrary date ranges.
///
/// The provider caps how much history one request may span (far tighter for
/// intraday resolutions than for daily), so a single caller range becomes a
/// sequence of sub-range requests that are issued with bounded concurrency
/// and reassembled in chronological order regardless of completion order.
pub struct HistoryFetcher {
    api: Arc<dyn ChartingApi>,
    concurrency: usize,
    intraday_max_span: Duration,
    daily_max_span: Duration,
}

impl HistoryFetcher {
    pub fn new(api: Arc<dyn ChartingApi>, config: &EngineConfig) -> Self {
        Self {
            api,
            concurrency: config.fetch_concurrency.max(1),
            intraday_max_span: Duration::days(config.intraday_max_span_days.max(1)),
            daily_max_span: Duration::days(config.daily_max_span_days.max(1)),
        }
    }

    /// Fetches `[start, end]` (both inclusive, exchange-local) at the
    /// requested timeframe.
    ///
    /// The result covers exactly the requested window: no candle outside it,
    /// timestamps strictly increasing, boundary bars shared by adjacent
    /// sub-ranges deduplicated. Partial results are never returned; any
    /// sub-range failure (after its single allowed retry) fails the call.
    pub async fn fetch(
        &self,
        instrument: &InstrumentRecord,
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        timeframe: Timeframe,
    ) -> Result<CandleSeries, Error> {
        if start >= end {
            return Err(Error::InvalidRange {
                start: start.naive_local(),
                end: end.naive_local(),
            });
        }

        let base = timeframe.base();
        let max_span = if base.is_intraday() {
            self.intraday_max_span
        } else {
            self.daily_max_span
        };

        let requests: Vec<CandleRequest> = partition(start, end, max_span)
            .into_iter()
            .map(|(from, to)| CandleRequest {
                scrip_code: instrument.scrip_code,
                segment: instrument.segment,
                resolution: base,
                from,
                to,
            })
            .collect();
        debug!(
            symbol = %instrument.symbol,
            scrip = instrument.scrip_code,
            %timeframe,
            %base,
            sub_ranges = requests.len(),
            "fetching history"
        );

        // `buffered` runs up to `concurrency` sub-range requests at once but
        // yields results in submission order, which keeps reassembly
        // deterministic. The first error drops the stream, cancelling
        // whatever is still in flight.
        let mut chunks: Vec<Vec<Candle>> = Vec::with_capacity(requests.len());
        {
            let mut sub_fetches = stream::iter(
                requests.iter().map(|request| self.fetch_sub_range(request)),
            )
            .buffered(self.concurrency);
            while let Some(chunk) = sub_fetches.next().await {
                chunks.push(chunk?);
            }
        }

        let mut candles: Vec<Candle> = chunks.into_iter().flatten().collect();
        candles.sort_by_key(|c| c.ts);
        candles.dedup_by_key(|c| c.ts);
        candles.retain(|c| c.ts >= start && c.ts <= end);

        let series = CandleSeries {
            symbol: instrument.symbol.clone(),
            scrip_code: instrument.scrip_code,
            timeframe: base,
            candles,
        };
        if timeframe.is_native() {
            Ok(series)
        } else {
            resample(&series, timeframe)
        }
    }

    /// One sub-range request with the single allowed retry.
    ///
    /// A session rejection forces a renewal before the retry; a timeout just
    /// retries. A second failure of either kind, or any other error, fails
    /// the whole fetch.
    async fn fetch_sub_range(&self, request: &CandleRequest) -> Result<Vec<Candle>, Error> {
        let fetch_failed = |source: ApiError| Error::HistoricalFetch {
            scrip_code: request.scrip_code,
            source,
        };

        match self.api.fetch_candles(request).await {
            Ok(candles) => Ok(candles),
            Err(ApiError::SessionRejected) => {
                warn!(
                    scrip = request.scrip_code,
                    from = %request.from,
                    "provider rejected session mid-fetch, renewing and retrying once"
                );
                self.api.invalidate_session().await;
                self.api.fetch_candles(request).await.map_err(fetch_failed)
            }
            Err(ApiError::Timeout) => {
                warn!(
                    scrip = request.scrip_code,
                    from = %request.from,
                    "sub-range request timed out, retrying once"
                );
                self.api.fetch_candles(request).await.map_err(fetch_failed)
            }
            Err(source) => Err(fetch_failed(source)),
        }
    }
}
