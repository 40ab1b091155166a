use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::{CrawlError, Result};

pub const DISTRICTS_FILE: &str = "districts.json";
pub const TAHSILS_FILE: &str = "tahsil.json";
pub const VILLAGES_FILE: &str = "villages.json";
pub const VILLAGES_CSV_FILE: &str = "villages.csv";

/// The directory every stage reads from and writes to.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Read a JSON array of records. A missing or unparsable file is fatal for
/// the stage that needs it.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = fs::read_to_string(path).map_err(|e| CrawlError::MalformedInput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&raw).map_err(|e| CrawlError::MalformedInput {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write records as a 2-space indented JSON array, replacing the target in
/// one rename so readers never see a half-written file.
pub fn save_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    write_atomic(path, json.as_bytes())?;
    info!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut tmp_path = path.as_os_str().to_owned();
    tmp_path.push(".tmp");
    let tmp_path = PathBuf::from(tmp_path);
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Record count and last write time of one data file.
#[derive(Debug, Clone)]
pub struct FileStats {
    pub file: &'static str,
    pub records: Option<usize>,
    pub modified: Option<DateTime<Local>>,
}

/// Stats for every stage output, in pipeline order. Missing or unreadable
/// files report `None`.
pub fn file_stats(data: &DataDir) -> Vec<FileStats> {
    [DISTRICTS_FILE, TAHSILS_FILE, VILLAGES_FILE]
        .into_iter()
        .map(|file| {
            let path = data.path(file);
            let records = load_records::<serde_json::Value>(&path).ok().map(|r| r.len());
            let modified = fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Local>::from);
            FileStats {
                file,
                records,
                modified,
            }
        })
        .collect()
}
