use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a TOML config file; defaults come from NSE_DATA_CONFIG or
    /// built-in values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the instrument master lists for both segments
    Download {
        /// Also write the catalog to this JSON file for later runs
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Search the catalog for a symbol
    Search {
        /// Symbol or name fragment to look for
        query: String,

        /// Exchange segment: NSE or NFO
        #[arg(long, default_value = "NSE")]
        segment: String,

        /// Match the symbol exactly instead of by substring
        #[arg(long)]
        exact: bool,

        /// Read the catalog from this JSON file instead of downloading
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Fetch a historical candle series
    History {
        /// Symbol query, e.g. "RELIANCE" or "BANKNIFTY24OCTFUT"
        symbol: String,

        /// Exchange segment: NSE or NFO
        #[arg(long, default_value = "NSE")]
        segment: String,

        /// Range start, "YYYY-MM-DD" or "YYYY-MM-DDTHH:MM:SS" (exchange-local)
        #[arg(long)]
        start: String,

        /// Range end, same formats as --start
        #[arg(short, long)]
        end: String,

        /// Bar interval: 1m 3m 5m 10m 15m 30m 1h 1d 1w 1M
        #[arg(long, default_value = "1d")]
        interval: String,

        /// Read the catalog from this JSON file instead of downloading
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// List the supported bar intervals
    Timeframes,
}
