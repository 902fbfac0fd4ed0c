//! Optional CSV dataset the scenario simulator samples rows from.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

/// One product/site line of a supply-chain dataset. Unknown columns are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SupplyRow {
    pub sku: String,
    pub location: String,
    pub stock_levels: i64,
    pub availability: i64,
    pub defect_rates: f64,
    pub lead_times: i64,
    #[serde(default)]
    pub manufacturing_lead_time: Option<i64>,
}

pub fn load(path: &Path) -> anyhow::Result<Vec<SupplyRow>> {
    let file = File::open(path).with_context(|| format!("failed to open dataset {}", path.display()))?;
    from_reader(file).with_context(|| format!("failed to read dataset {}", path.display()))
}

/// Parse CSV with headers like `Stock levels` normalized to `stock_levels`.
pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Vec<SupplyRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: csv::StringRecord = rdr.headers()?.iter().map(normalize_header).collect();
    rdr.set_headers(headers);

    let mut rows = Vec::new();
    for (i, record) in rdr.deserialize().enumerate() {
        // +2: one for the header line, one for 1-based numbering
        let row: SupplyRow = record.with_context(|| format!("line {}", i + 2))?;
        rows.push(row);
    }

    if rows.is_empty() {
        bail!("dataset has no rows");
    }
    Ok(rows)
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}
