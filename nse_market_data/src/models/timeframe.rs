use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A bar interval supported by the engine.
///
/// Each timeframe is either served natively by the charting provider or
/// derived client-side by aggregating the nearest smaller native resolution:
/// `3m` is built from `1m`, and `1w`/`1M` are built from daily bars.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Min1,
    Min3,
    Min5,
    Min10,
    Min15,
    Min30,
    Hour1,
    Day1,
    Week1,
    Month1,
}

/// Wire parameters the charting provider expects for a native resolution.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ProviderInterval {
    pub time_interval: &'static str,
    pub chart_period: &'static str,
}

impl Timeframe {
    pub const fn all() -> [Timeframe; 10] {
        [
            Timeframe::Min1,
            Timeframe::Min3,
            Timeframe::Min5,
            Timeframe::Min10,
            Timeframe::Min15,
            Timeframe::Min30,
            Timeframe::Hour1,
            Timeframe::Day1,
            Timeframe::Week1,
            Timeframe::Month1,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Timeframe::Min1 => "1m",
            Timeframe::Min3 => "3m",
            Timeframe::Min5 => "5m",
            Timeframe::Min10 => "10m",
            Timeframe::Min15 => "15m",
            Timeframe::Min30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Day1 => "1d",
            Timeframe::Week1 => "1w",
            Timeframe::Month1 => "1M",
        }
    }

    /// Bar length in minutes for intraday timeframes, `None` for `1d`+.
    pub const fn minutes(self) -> Option<u32> {
        match self {
            Timeframe::Min1 => Some(1),
            Timeframe::Min3 => Some(3),
            Timeframe::Min5 => Some(5),
            Timeframe::Min10 => Some(10),
            Timeframe::Min15 => Some(15),
            Timeframe::Min30 => Some(30),
            Timeframe::Hour1 => Some(60),
            _ => None,
        }
    }

    pub const fn is_intraday(self) -> bool {
        self.minutes().is_some()
    }

    /// Whether the provider serves this resolution directly.
    pub const fn is_native(self) -> bool {
        !matches!(self, Timeframe::Min3 | Timeframe::Week1 | Timeframe::Month1)
    }

    /// The native resolution requests are issued at. Identity for native
    /// timeframes, the nearest smaller native resolution for derived ones.
    pub const fn base(self) -> Timeframe {
        match self {
            Timeframe::Min3 => Timeframe::Min1,
            Timeframe::Week1 | Timeframe::Month1 => Timeframe::Day1,
            tf => tf,
        }
    }

    pub(crate) const fn provider_interval(self) -> Option<ProviderInterval> {
        let (time_interval, chart_period) = match self {
            Timeframe::Min1 => ("1", "I"),
            Timeframe::Min5 => ("5", "I"),
            Timeframe::Min10 => ("10", "I"),
            Timeframe::Min15 => ("15", "I"),
            Timeframe::Min30 => ("30", "I"),
            Timeframe::Hour1 => ("60", "I"),
            Timeframe::Day1 => ("1", "D"),
            Timeframe::Min3 | Timeframe::Week1 | Timeframe::Month1 => return None,
        };
        Some(ProviderInterval {
            time_interval,
            chart_period,
        })
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown timeframe '{0}'")]
pub struct TimeframeParseError(pub String);

impl FromStr for Timeframe {
    type Err = TimeframeParseError;

    /// Parses the canonical interval token. `1m` and `1M` are distinct
    /// (minute vs month), so matching is case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::all()
            .into_iter()
            .find(|tf| tf.as_str() == s.trim())
            .ok_or_else(|| TimeframeParseError(s.to_string()))
    }
}
