//! Historical and reference market data retrieval for NSE's cash and
//! derivatives segments, via the exchange's charting HTTP provider.
//!
//! The provider is built for browsers, not programs: it hands out anti-bot
//! cookies on a bootstrap page, serves master lists as pipe-delimited text,
//! and silently caps how much history one request may span. This crate wraps
//! all of that behind a typed API:
//!
//! - [`session::SessionManager`] acquires and transparently renews the
//!   browser-like session,
//! - [`catalog::MasterCatalog`] downloads and indexes the instrument masters,
//! - [`history::HistoryFetcher`] assembles candle series across arbitrary
//!   ranges from capped sub-range requests,
//! - [`resample`] derives timeframes the provider has no native resolution
//!   for,
//! - [`MarketDataEngine`] ties them together for callers.

pub mod catalog;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
mod engine;
pub mod errors;
pub mod history;
pub mod io;
pub mod models;
pub mod provider;
pub mod resample;
pub mod session;

pub use config::EngineConfig;
pub use engine::MarketDataEngine;
pub use errors::Error;
pub use models::candle::{Candle, CandleSeries};
pub use models::instrument::{InstrumentKind, InstrumentRecord, OptionRight};
pub use models::request_params::HistoryRequest;
pub use models::segment::ExchangeSegment;
pub use models::timeframe::Timeframe;
