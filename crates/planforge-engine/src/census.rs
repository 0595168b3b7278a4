//! Thin repository file census attached to `tasks.meta.codebase_analysis`.
//!
//! Deliberately shallow: the real analysis surface is an external
//! collaborator; the pipeline only records headline counts.

use std::io;

use camino::Utf8Path;
use serde::Serialize;

/// Headline counts for the repository under plan.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CensusCounts {
    pub files: usize,
    pub rust_files: usize,
}

/// Seam for repository analysis.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, repo: &Utf8Path) -> io::Result<CensusCounts>;
}

/// Walks the repository counting files; hidden directories are skipped.
#[derive(Debug, Default)]
pub struct CensusAnalyzer;

impl Analyzer for CensusAnalyzer {
    fn analyze(&self, repo: &Utf8Path) -> io::Result<CensusCounts> {
        let mut counts = CensusCounts::default();
        walk(repo.as_std_path(), &mut counts)?;
        Ok(counts)
    }
}

fn walk(dir: &std::path::Path, counts: &mut CensusCounts) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = entry.file_name();
        if file_type.is_dir() {
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            walk(&entry.path(), counts)?;
        } else if file_type.is_file() {
            counts.files += 1;
            if entry.path().extension().is_some_and(|ext| ext == "rs") {
                counts.rust_files += 1;
            }
        }
    }
    Ok(())
}
