//! Master data catalog: download, parse, and indexed lookup of the
//! instrument reference lists for both segments.

pub mod contract;

use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::catalog::contract::parse_contract_token;
use crate::io::catalog_cache::CatalogSnapshot;
use crate::models::instrument::{InstrumentKind, InstrumentRecord, OptionRight};
use crate::models::segment::ExchangeSegment;
use crate::provider::{ApiError, ChartingApi};

/// Fewer lines than this and the payload is assumed to be a disguised error
/// page rather than a real master list; the smallest real list (the cash
/// segment) carries a couple of thousand rows.
const MIN_MASTER_ROWS: usize = 10;

#[derive(Debug, Error)]
pub enum CatalogError {
    /// The master download failed at the HTTP layer.
    #[error("master download failed for {segment}: {source}")]
    Fetch {
        segment: ExchangeSegment,
        #[source]
        source: ApiError,
    },

    /// The payload arrived but is not a plausible master list. Treated as a
    /// failure rather than an empty catalog so provider blocks are never
    /// masked as "no instruments".
    #[error("master payload for {segment} is malformed: {reason}")]
    Parse {
        segment: ExchangeSegment,
        reason: String,
    },

    /// A lookup was attempted before any successful download.
    #[error("catalog not loaded; call download() first")]
    NotLoaded,
}

/// One segment's parsed records plus its search indexes, built once per
/// download.
struct SegmentTable {
    records: Vec<InstrumentRecord>,
    /// Uppercased symbol -> positions, for exact lookups.
    by_symbol: HashMap<String, Vec<usize>>,
    /// Uppercased (symbol, name) per record, for substring scans.
    keys: Vec<(String, String)>,
}

impl SegmentTable {
    fn build(records: Vec<InstrumentRecord>) -> Self {
        let mut by_symbol: HashMap<String, Vec<usize>> = HashMap::new();
        let mut keys = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let symbol = record.symbol.to_ascii_uppercase();
            let name = record.name.to_ascii_uppercase();
            by_symbol.entry(symbol.clone()).or_default().push(i);
            keys.push((symbol, name));
        }
        Self {
            records,
            by_symbol,
            keys,
        }
    }
}

/// In-memory catalog keyed by segment, in the provider's own listing order.
///
/// Empty at construction; populated by [`Self::download`] (or
/// [`Self::install`] from a disk snapshot); considered stale only by
/// explicit re-download. A download in progress never exposes a partially
/// populated index: tables are built off-lock and swapped in whole.
pub struct MasterCatalog {
    inner: RwLock<Option<IndexMap<ExchangeSegment, SegmentTable>>>,
}

impl Default for MasterCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterCatalog {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.is_some()
    }

    /// Downloads and indexes the master lists for every segment.
    ///
    /// A session rejection on a segment forces one renewal and one retry of
    /// that segment before the whole download fails.
    pub async fn download(&self, api: &dyn ChartingApi) -> Result<(), CatalogError> {
        let mut segments = IndexMap::new();
        for segment in ExchangeSegment::all() {
            let body = match api.fetch_master(segment).await {
                Err(ApiError::SessionRejected) => {
                    warn!(%segment, "master download rejected, renewing session and retrying once");
                    api.invalidate_session().await;
                    api.fetch_master(segment).await
                }
                other => other,
            }
            .map_err(|source| CatalogError::Fetch { segment, source })?;

            let records = parse_master(segment, &body)?;
            info!(%segment, count = records.len(), "master list parsed");
            segments.insert(segment, SegmentTable::build(records));
        }

        *self.inner.write().await = Some(segments);
        Ok(())
    }

    /// Looks up instruments in one segment.
    ///
    /// With `exact`, returns records whose symbol equals `query`
    /// case-insensitively (several for a derivative's expiries/strikes).
    /// Otherwise returns every record whose symbol or name contains `query`
    /// case-insensitively, in catalog order.
    pub async fn search(
        &self,
        segment: ExchangeSegment,
        query: &str,
        exact: bool,
    ) -> Result<Vec<InstrumentRecord>, CatalogError> {
        let guard = self.inner.read().await;
        let segments = guard.as_ref().ok_or(CatalogError::NotLoaded)?;
        let table = segments.get(&segment).ok_or(CatalogError::NotLoaded)?;
        let needle = query.trim().to_ascii_uppercase();

        if exact {
            let hits = table
                .by_symbol
                .get(&needle)
                .map(|positions| positions.iter().map(|&i| table.records[i].clone()).collect())
                .unwrap_or_default();
            return Ok(hits);
        }

        Ok(table
            .records
            .iter()
            .zip(&table.keys)
            .filter(|(_, (symbol, name))| symbol.contains(&needle) || name.contains(&needle))
            .map(|(record, _)| record.clone())
            .collect())
    }

    /// First substring match in catalog order, if any.
    ///
    /// Deliberately simplistic: an ambiguous query (a cash symbol that also
    /// prefixes many contract tokens) resolves to whichever record the
    /// provider lists first. Callers wanting one specific contract supply
    /// the fully-qualified token.
    pub async fn resolve(
        &self,
        segment: ExchangeSegment,
        symbol: &str,
    ) -> Result<Option<InstrumentRecord>, CatalogError> {
        Ok(self.search(segment, symbol, false).await?.into_iter().next())
    }

    /// Copies the catalog out for the disk cache.
    pub async fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        let guard = self.inner.read().await;
        let segments = guard.as_ref().ok_or(CatalogError::NotLoaded)?;
        Ok(CatalogSnapshot {
            segments: segments
                .iter()
                .map(|(&segment, table)| (segment, table.records.clone()))
                .collect(),
        })
    }

    /// Installs a previously saved snapshot, rebuilding the indexes.
    pub async fn install(&self, snapshot: CatalogSnapshot) {
        let segments = snapshot
            .segments
            .into_iter()
            .map(|(segment, records)| (segment, SegmentTable::build(records)))
            .collect();
        *self.inner.write().await = Some(segments);
    }
}

/// Parses one segment's master payload.
///
/// Rows are pipe-delimited `ScripCode|Symbol|Name|Type`. An optional header
/// row is honored for column order, so reordered columns keep parsing; extra
/// trailing columns are ignored. Anything structurally off (an HTML body,
/// an implausibly small list, a short row, a non-numeric scrip code) fails
/// the whole download.
fn parse_master(
    segment: ExchangeSegment,
    body: &str,
) -> Result<Vec<InstrumentRecord>, CatalogError> {
    let parse_err = |reason: String| CatalogError::Parse { segment, reason };

    if body.trim_start().starts_with('<') {
        return Err(parse_err("payload is an HTML page, not a master list".into()));
    }

    let mut lines = body.lines().filter(|l| !l.trim().is_empty()).peekable();
    let columns = match lines.peek() {
        Some(first) if looks_like_header(first) => {
            let cols = header_columns(first)
                .ok_or_else(|| parse_err(format!("unrecognized header row: '{first}'")))?;
            lines.next();
            cols
        }
        _ => ColumnOrder::default(),
    };

    let mut records = Vec::new();
    for (line_no, line) in lines.enumerate() {
        let fields: Vec<&str> = line.split('|').map(str::trim).collect();
        let width = columns.max_index() + 1;
        if fields.len() < width {
            return Err(parse_err(format!(
                "row {} has {} fields, expected at least {}",
                line_no + 1,
                fields.len(),
                width
            )));
        }

        let scrip_raw = fields[columns.scrip_code];
        let scrip_code: u32 = scrip_raw.parse().map_err(|_| {
            parse_err(format!(
                "row {}: scrip code '{}' is not numeric",
                line_no + 1,
                scrip_raw
            ))
        })?;

        let symbol = fields[columns.symbol].to_string();
        let name = fields[columns.name].to_string();
        let type_code = fields[columns.type_code];

        let mut record = InstrumentRecord {
            scrip_code,
            symbol,
            name,
            kind: kind_from_type_code(type_code),
            segment,
            expiry: None,
            strike: None,
            right: None,
        };

        if segment == ExchangeSegment::Nfo {
            match parse_contract_token(&record.symbol) {
                Ok(token) => {
                    record.expiry = Some(token.expiry);
                    record.strike = token.strike;
                    record.right = token.right;
                    record.kind = refine_kind(record.kind, token.right);
                }
                Err(err) => {
                    // The record stays searchable; only the decomposed
                    // fields are missing.
                    debug!(symbol = %record.symbol, %err, "contract token did not decompose");
                }
            }
        }

        records.push(record);
    }

    if records.len() < MIN_MASTER_ROWS {
        return Err(parse_err(format!(
            "only {} rows; payload is implausibly small for a master list",
            records.len()
        )));
    }
    Ok(records)
}

/// Column positions within a master row.
#[derive(Clone, Copy, Debug)]
struct ColumnOrder {
    scrip_code: usize,
    symbol: usize,
    name: usize,
    type_code: usize,
}

impl Default for ColumnOrder {
    fn default() -> Self {
        Self {
            scrip_code: 0,
            symbol: 1,
            name: 2,
            type_code: 3,
        }
    }
}

impl ColumnOrder {
    fn max_index(&self) -> usize {
        self.scrip_code
            .max(self.symbol)
            .max(self.name)
            .max(self.type_code)
    }
}

fn looks_like_header(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    lower.contains("scripcode") || lower.contains("scrip_code")
}

fn header_columns(line: &str) -> Option<ColumnOrder> {
    let mut order = ColumnOrder::default();
    let mut seen = 0u8;
    for (i, field) in line.split('|').enumerate() {
        match field.trim().to_ascii_lowercase().replace('_', "").as_str() {
            "scripcode" => {
                order.scrip_code = i;
                seen |= 1;
            }
            "symbol" => {
                order.symbol = i;
                seen |= 2;
            }
            "name" => {
                order.name = i;
                seen |= 4;
            }
            "type" | "instrumenttype" => {
                order.type_code = i;
                seen |= 8;
            }
            _ => {}
        }
    }
    (seen == 0b1111).then_some(order)
}

fn kind_from_type_code(code: &str) -> InstrumentKind {
    match code.to_ascii_uppercase().as_str() {
        "EQ" | "EQUITY" => InstrumentKind::Equity,
        "IN" | "IDX" | "INDEX" => InstrumentKind::Index,
        "FUTIDX" => InstrumentKind::IndexFuture,
        "FUTSTK" => InstrumentKind::StockFuture,
        "OPTIDX" | "OPTSTK" => InstrumentKind::Other, // refined by the right
        _ => InstrumentKind::Other,
    }
}

fn refine_kind(kind: InstrumentKind, right: Option<OptionRight>) -> InstrumentKind {
    match right {
        Some(OptionRight::Call) => InstrumentKind::OptionCall,
        Some(OptionRight::Put) => InstrumentKind::OptionPut,
        None => kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq_master_body() -> String {
        let mut lines = vec![
            "2885|RELIANCE|Reliance Industries Limited|EQ".to_string(),
            "11536|TCS|Tata Consultancy Services|EQ".to_string(),
            "26000|Nifty 50|Nifty 50 Index|IN".to_string(),
        ];
        for i in 0..12 {
            lines.push(format!("{}|STOCK{}|Listed Company {}|EQ", 1000 + i, i, i));
        }
        lines.join("\n")
    }

    #[test]
    fn parses_a_plain_master_list() {
        let records = parse_master(ExchangeSegment::Nse, &eq_master_body()).unwrap();
        assert_eq!(records[0].scrip_code, 2885);
        assert_eq!(records[0].symbol, "RELIANCE");
        assert_eq!(records[0].kind, InstrumentKind::Equity);
        assert_eq!(records[2].kind, InstrumentKind::Index);
    }

    #[test]
    fn honors_a_header_row_with_reordered_columns() {
        let mut body = String::from("Symbol|ScripCode|Type|Name\n");
        for i in 0..12 {
            body.push_str(&format!("STOCK{i}|{}|EQ|Listed Company {i}\n", 1000 + i));
        }
        let records = parse_master(ExchangeSegment::Nse, &body).unwrap();
        assert_eq!(records[0].symbol, "STOCK0");
        assert_eq!(records[0].scrip_code, 1000);
        assert_eq!(records[0].name, "Listed Company 0");
    }

    #[test]
    fn extra_trailing_columns_are_ignored() {
        let mut body = String::new();
        for i in 0..12 {
            body.push_str(&format!(
                "{}|STOCK{i}|Listed Company {i}|EQ|extra|fields\n",
                1000 + i
            ));
        }
        assert!(parse_master(ExchangeSegment::Nse, &body).is_ok());
    }

    #[test]
    fn html_payload_is_a_parse_failure() {
        let err = parse_master(ExchangeSegment::Nse, "<html>blocked</html>").unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn small_payload_is_a_parse_failure_not_an_empty_catalog() {
        let err =
            parse_master(ExchangeSegment::Nse, "2885|RELIANCE|Reliance|EQ").unwrap_err();
        assert!(matches!(err, CatalogError::Parse { .. }));
    }

    #[test]
    fn non_numeric_scrip_code_fails() {
        let mut body = eq_master_body();
        body.push_str("\nnotanumber|BAD|Bad Row|EQ");
        assert!(parse_master(ExchangeSegment::Nse, &body).is_err());
    }

    #[test]
    fn nfo_rows_gain_decomposed_contract_fields() {
        let mut lines = vec![
            "35001|BANKNIFTY24OCTFUT|BANKNIFTY October Future|FUTIDX".to_string(),
            "35002|NIFTY24NOV24000CE|NIFTY November Call|OPTIDX".to_string(),
            "35003|NIFTY24N2124800PE|NIFTY Weekly Put|OPTIDX".to_string(),
        ];
        for i in 0..12 {
            lines.push(format!(
                "{}|NIFTY24NOV{}CE|NIFTY November Call|OPTIDX",
                36000 + i,
                20000 + i * 100
            ));
        }
        let body = lines.join("\n");
        let records = parse_master(ExchangeSegment::Nfo, &body).unwrap();

        assert_eq!(records[0].kind, InstrumentKind::IndexFuture);
        assert!(records[0].expiry.is_some());
        assert_eq!(records[0].strike, None);

        assert_eq!(records[1].kind, InstrumentKind::OptionCall);
        assert_eq!(records[1].strike, Some(24000.0));

        assert_eq!(records[2].kind, InstrumentKind::OptionPut);
        assert_eq!(
            records[2].expiry,
            chrono::NaiveDate::from_ymd_opt(2024, 11, 21)
        );
    }
}
