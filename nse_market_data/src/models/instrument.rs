use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::segment::ExchangeSegment;

/// Broad instrument classification derived from the master list's type
/// column, refined by contract-token decomposition for derivatives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstrumentKind {
    Equity,
    Index,
    IndexFuture,
    StockFuture,
    OptionCall,
    OptionPut,
    /// A type code the engine does not recognize. Kept searchable rather
    /// than dropped, since the master list grows codes over time.
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

/// One row of master data.
///
/// `scrip_code` is unique within a segment; `symbol` is not, since every
/// expiry and strike of a derivative repeats the underlying's ticker inside
/// its contract token.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    pub scrip_code: u32,
    pub symbol: String,
    pub name: String,
    pub kind: InstrumentKind,
    pub segment: ExchangeSegment,
    /// Expiry date, for derivatives whose contract token decomposed cleanly.
    pub expiry: Option<NaiveDate>,
    /// Strike price, for options.
    pub strike: Option<f64>,
    /// Call/put, for options.
    pub right: Option<OptionRight>,
}
