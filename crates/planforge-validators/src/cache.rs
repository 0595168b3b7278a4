//! Filesystem report cache: one JSON file per validator name, mapping
//! payload hashes to reports.
//!
//! Updates are read-modify-write through a temp file with an atomic rename;
//! two invocations sharing a cache root may race, and the last writer wins
//! for a given `(name, hash)`. Identical payloads produce identical reports,
//! so the race is semantically safe.

use std::collections::BTreeMap;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use planforge_model::ValidatorReport;

const WRITE_PREFIX: &str = ".validator-cache-write-";

#[derive(Debug)]
pub(crate) struct CacheStore {
    dir: Utf8PathBuf,
}

impl CacheStore {
    pub(crate) fn open(dir: &Utf8Path) -> io::Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_owned(),
        })
    }

    fn cache_path(&self, name: &str) -> Utf8PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Look up a cached report. Missing or unreadable cache files are misses,
    /// never errors.
    pub(crate) fn load(&self, name: &str, key: &str) -> Option<ValidatorReport> {
        let raw = std::fs::read(self.cache_path(name)).ok()?;
        let entries: BTreeMap<String, ValidatorReport> = serde_json::from_slice(&raw).ok()?;
        let hit = entries.get(key).cloned();
        debug!(name, key, hit = hit.is_some(), "validator cache lookup");
        hit
    }

    /// Insert a report under `(name, key)` via read-modify-write and an
    /// atomic rename.
    pub(crate) fn store(&self, name: &str, key: &str, report: &ValidatorReport) -> io::Result<()> {
        let path = self.cache_path(name);
        let mut entries: BTreeMap<String, ValidatorReport> = std::fs::read(&path)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok())
            .unwrap_or_default();
        entries.insert(key.to_string(), report.clone());

        let encoded = serde_json::to_vec_pretty(&entries)?;
        let mut temp = tempfile::Builder::new()
            .prefix(WRITE_PREFIX)
            .tempfile_in(&self.dir)?;
        temp.write_all(&encoded)?;
        temp.as_file().sync_all()?;
        temp.persist(path.as_std_path()).map_err(|e| e.error)?;
        Ok(())
    }
}
