use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A market segment with its own instrument master list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangeSegment {
    /// Cash market: equities and indices.
    Nse,
    /// Futures & options segment.
    Nfo,
}

impl ExchangeSegment {
    pub const fn all() -> [ExchangeSegment; 2] {
        [ExchangeSegment::Nse, ExchangeSegment::Nfo]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ExchangeSegment::Nse => "NSE",
            ExchangeSegment::Nfo => "NFO",
        }
    }
}

impl fmt::Display for ExchangeSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown exchange segment '{0}', expected NSE or NFO")]
pub struct SegmentParseError(pub String);

impl FromStr for ExchangeSegment {
    type Err = SegmentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NSE" => Ok(ExchangeSegment::Nse),
            "NFO" => Ok(ExchangeSegment::Nfo),
            other => Err(SegmentParseError(other.to_string())),
        }
    }
}
