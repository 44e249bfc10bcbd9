use std::path::PathBuf;

use serde::Serialize;

use crate::error::{Error, Result};

/// One row of a report pack listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportPackSummary {
    pub id: u64,
    pub name: String,
}

impl ReportPackSummary {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Identity the server assigned to an uploaded report pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredReportPack {
    pub id: u64,
    pub name: String,
}

/// Outcome of downloading a report pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedReportPack {
    pub id: u64,
    pub name: String,
    pub archive: PathBuf,
    pub unpacked: Option<PathBuf>,
}

/// Parse a server-assigned id, reporting `operation` on failure.
pub(crate) fn parse_id(raw: &str, operation: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::protocol(operation, format!("report pack id `{raw}` is not numeric")))
}

pub(crate) fn sort_by_id(packs: &mut [ReportPackSummary]) {
    packs.sort_by_key(|pack| pack.id);
}
