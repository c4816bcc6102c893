//! Crash-safe replacement of a blueprint file.
//!
//! Bytes land in a sibling `.tmp` file, are flushed, and only then renamed
//! over the destination. An interrupted write leaves the old blueprint
//! readable plus a stray `.tmp` for [`crate::tmp_cleanup`] to sweep.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sibling temp file used while `path` is being replaced.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Replace `path` with `data`, creating missing parent directories.
/// Readers see either the previous contents or all of `data`.
pub fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)?,
        _ => {}
    }

    let staging = tmp_path_for(path);
    {
        let mut out = File::create(&staging)?;
        out.write_all(data)?;
        out.sync_all()?;
    }
    fs::rename(&staging, path)
}
