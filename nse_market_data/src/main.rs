use std::error::Error;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nse_market_data::cli::{Cli, Commands};
use nse_market_data::{EngineConfig, HistoryRequest, MarketDataEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env()?,
    };
    let engine = MarketDataEngine::new(config)?;

    match cli.command {
        Commands::Download { cache } => {
            engine.download().await?;
            let nse = engine
                .search("", "NSE".parse()?, false)
                .await?
                .len();
            let nfo = engine
                .search("", "NFO".parse()?, false)
                .await?
                .len();
            eprintln!("downloaded masters: {nse} NSE, {nfo} NFO instruments");
            if let Some(path) = cache {
                engine.save_catalog(&path).await?;
                println!("{}", path.display());
            }
        }

        Commands::Search {
            query,
            segment,
            exact,
            cache,
        } => {
            load_catalog(&engine, cache.as_deref()).await?;
            let records = engine.search(&query, segment.parse()?, exact).await?;
            if records.is_empty() {
                eprintln!("no match for '{query}'");
            }
            for record in records {
                println!(
                    "{}|{}|{}|{:?}",
                    record.scrip_code, record.symbol, record.name, record.kind
                );
            }
        }

        Commands::History {
            symbol,
            segment,
            start,
            end,
            interval,
            cache,
        } => {
            load_catalog(&engine, cache.as_deref()).await?;
            let request = HistoryRequest {
                symbol,
                segment: segment.parse()?,
                start: parse_local(&start, false)?,
                end: parse_local(&end, true)?,
                timeframe: interval.parse()?,
            };
            let series = engine.historical(&request).await?;
            eprintln!(
                "{} candles for {} ({})",
                series.len(),
                series.symbol,
                series.timeframe
            );
            println!("timestamp,open,high,low,close,volume");
            for candle in &series.candles {
                println!(
                    "{},{},{},{},{},{}",
                    candle.ts.format("%Y-%m-%dT%H:%M:%S"),
                    candle.open,
                    candle.high,
                    candle.low,
                    candle.close,
                    candle.volume
                );
            }
        }

        Commands::Timeframes => {
            for tf in engine.timeframes() {
                println!("{tf}");
            }
        }
    }
    Ok(())
}

/// Uses a cached catalog when given one, downloads otherwise.
async fn load_catalog(
    engine: &MarketDataEngine,
    cache: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    match cache {
        Some(path) if path.exists() => engine.load_catalog(path).await?,
        Some(path) => {
            engine.download().await?;
            engine.save_catalog(path).await?;
        }
        None => engine.download().await?,
    }
    Ok(())
}

/// Accepts a bare date or a full datetime; a bare end date extends to the
/// end of that day so `--start 2024-09-01 --end 2024-09-01` covers the whole
/// session.
fn parse_local(input: &str, is_end: bool) -> Result<NaiveDateTime, Box<dyn Error>> {
    if let Ok(dt) = input.parse::<NaiveDateTime>() {
        return Ok(dt);
    }
    let date: NaiveDate = input.parse()?;
    let time = if is_end {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.ok_or_else(|| format!("cannot interpret '{input}' as a datetime").into())
}
