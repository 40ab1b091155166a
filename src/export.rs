use std::collections::HashMap;

use tracing::{info, warn};

use crate::error::Result;
use crate::models::{Tahsil, Village};
use crate::store::{self, DataDir, TAHSILS_FILE, VILLAGES_CSV_FILE, VILLAGES_FILE};

// population, km2 and census_code are not on the listing pages and stay empty
const HEADER: [&str; 7] = [
    "name",
    "population",
    "km2",
    "village_code",
    "census_code",
    "tahsil",
    "district",
];

/// Join `villages.json` with `tahsil.json` by tahsil name and write
/// `villages.csv`. Returns the number of village rows written.
pub fn export_villages_csv(data: &DataDir) -> Result<usize> {
    let villages: Vec<Village> = store::load_records(&data.path(VILLAGES_FILE))?;
    let tahsils: Vec<Tahsil> = store::load_records(&data.path(TAHSILS_FILE))?;

    let csv = villages_to_csv(&villages, &tahsils);
    let path = data.path(VILLAGES_CSV_FILE);
    store::write_atomic(&path, csv.as_bytes())?;

    info!("CSV written to {}", path.display());
    Ok(villages.len())
}

pub fn villages_to_csv(villages: &[Village], tahsils: &[Tahsil]) -> String {
    // first tahsil wins when names collide
    let mut district_of: HashMap<&str, &str> = HashMap::new();
    for t in tahsils {
        district_of
            .entry(t.tahsil_name.as_str())
            .or_insert(t.district_name.as_str());
    }

    let mut lines = Vec::with_capacity(villages.len() + 1);
    lines.push(csv_row(&HEADER));

    let mut orphans = 0usize;
    for v in villages {
        let district = district_of.get(v.tahsil_name.as_str()).copied().unwrap_or_else(|| {
            orphans += 1;
            ""
        });
        lines.push(csv_row(&[
            v.village_name.as_str(),
            "",
            "",
            v.village_code.as_str(),
            "",
            v.tahsil_name.as_str(),
            district,
        ]));
    }

    if orphans > 0 {
        warn!("{} villages have no matching tahsil", orphans);
    }

    lines.join("\n")
}

/// Every cell quoted, embedded quotes doubled.
fn csv_row(cells: &[&str]) -> String {
    cells
        .iter()
        .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}
