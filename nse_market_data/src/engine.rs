//! The caller-facing facade wiring session, catalog, and fetcher together.

use std::path::Path;
use std::sync::Arc;

use crate::catalog::MasterCatalog;
use crate::config::EngineConfig;
use crate::errors::Error;
use crate::history::HistoryFetcher;
use crate::io::catalog_cache::{load_snapshot, save_snapshot};
use crate::models::candle::CandleSeries;
use crate::models::instrument::InstrumentRecord;
use crate::models::request_params::HistoryRequest;
use crate::models::segment::ExchangeSegment;
use crate::models::timeframe::Timeframe;
use crate::provider::{ChartingApi, NseChartingApi};
use crate::resample::exchange_local;

/// One retrieval engine: a single provider session shared by catalog
/// downloads and historical fetches.
pub struct MarketDataEngine {
    api: Arc<NseChartingApi>,
    catalog: MasterCatalog,
    fetcher: HistoryFetcher,
}

impl MarketDataEngine {
    pub fn new(config: EngineConfig) -> Result<Self, Error> {
        let api = Arc::new(NseChartingApi::new(&config)?);
        let fetcher = HistoryFetcher::new(api.clone() as Arc<dyn ChartingApi>, &config);
        Ok(Self {
            api,
            catalog: MasterCatalog::new(),
            fetcher,
        })
    }

    /// Downloads and indexes the master lists for both segments.
    pub async fn download(&self) -> Result<(), Error> {
        self.catalog.download(self.api.as_ref()).await?;
        Ok(())
    }

    /// Searches the catalog. See [`MasterCatalog::search`] for semantics.
    pub async fn search(
        &self,
        query: &str,
        segment: ExchangeSegment,
        exact: bool,
    ) -> Result<Vec<InstrumentRecord>, Error> {
        Ok(self.catalog.search(segment, query, exact).await?)
    }

    /// Resolves a symbol query to the first matching record in catalog
    /// order.
    pub async fn resolve(
        &self,
        symbol: &str,
        segment: ExchangeSegment,
    ) -> Result<InstrumentRecord, Error> {
        self.catalog
            .resolve(segment, symbol)
            .await?
            .ok_or_else(|| Error::SymbolNotFound {
                query: symbol.to_string(),
                segment,
            })
    }

    /// Fetches a historical candle series for a symbol query.
    ///
    /// Resolution happens against the catalog, so [`Self::download`] (or
    /// [`Self::load_catalog`]) must have succeeded first.
    pub async fn historical(&self, request: &HistoryRequest) -> Result<CandleSeries, Error> {
        if request.start >= request.end {
            return Err(Error::InvalidRange {
                start: request.start,
                end: request.end,
            });
        }
        let instrument = self.resolve(&request.symbol, request.segment).await?;
        self.fetcher
            .fetch(
                &instrument,
                exchange_local(request.start),
                exchange_local(request.end),
                request.timeframe,
            )
            .await
    }

    /// The supported timeframe set.
    pub fn timeframes(&self) -> [Timeframe; 10] {
        Timeframe::all()
    }

    /// Writes the current catalog to `path` as JSON.
    pub async fn save_catalog(&self, path: &Path) -> Result<(), Error> {
        let snapshot = self.catalog.snapshot().await?;
        save_snapshot(path, &snapshot)
    }

    /// Replaces the catalog with a previously saved snapshot.
    pub async fn load_catalog(&self, path: &Path) -> Result<(), Error> {
        let snapshot = load_snapshot(path)?;
        self.catalog.install(snapshot).await;
        Ok(())
    }
}
