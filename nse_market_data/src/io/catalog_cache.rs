//! Optional on-disk snapshot of the master catalog.
//!
//! Purely a performance collaborator: the engine never reads the cache on
//! its own, callers opt in to skip a re-download across process runs.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::models::instrument::InstrumentRecord;
use crate::models::segment::ExchangeSegment;

/// Serializable catalog contents, one record list per segment in listing
/// order.
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub segments: IndexMap<ExchangeSegment, Vec<InstrumentRecord>>,
}

pub fn save_snapshot(path: &Path, snapshot: &CatalogSnapshot) -> Result<(), Error> {
    let file = File::create(path)?;
    serde_json::to_writer(BufWriter::new(file), snapshot)?;
    Ok(())
}

pub fn load_snapshot(path: &Path) -> Result<CatalogSnapshot, Error> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}
