//! Atomic byte writes: temp file in the target directory, fsync, rename.

use std::io::{self, Write};

use camino::Utf8Path;
use tempfile::NamedTempFile;

/// Write `bytes` to `path` atomically. The temp file lives in the target's
/// parent directory so the final rename never crosses filesystems.
pub fn write_bytes_atomic(path: &Utf8Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path.as_std_path()).map_err(|e| e.error)?;
    Ok(())
}
