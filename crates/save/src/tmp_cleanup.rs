//! Sweeping up interrupted blueprint writes.
//!
//! `<id>.<ext>.tmp` next to a blueprint is the staging half of an
//! [`crate::atomic_write::atomic_write`] that never reached its rename. The
//! real file is untouched, so the staging file is simply deleted before the
//! directory is scanned. Other `.tmp` files are not ours and stay.

use std::path::{Path, PathBuf};

use bevy::prelude::*;
use walkdir::WalkDir;

/// True for `<name>.<ext>.tmp` where `<ext>` is a blueprint extension.
fn is_staging_file(path: &Path, extensions: &[String]) -> bool {
    if !path.extension().is_some_and(|ext| ext == "tmp") {
        return false;
    }
    let Some(inner) = path.file_stem().map(Path::new) else {
        return false;
    };
    inner.file_stem().is_some_and(|stem| !stem.is_empty())
        && inner
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Deletes staging files under `dir` (recursively) and returns how many went.
fn sweep_dir(dir: &Path, extensions: &[String]) -> usize {
    let mut removed = 0;
    for entry in WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file() && is_staging_file(e.path(), extensions))
    {
        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                info!("Removed interrupted blueprint write {}", entry.path().display());
                removed += 1;
            }
            Err(e) => warn!("Could not remove {}: {}", entry.path().display(), e),
        }
    }
    removed
}

/// Removes stale blueprint staging files under every existing directory in
/// `dirs`. Only `.tmp` files wrapping one of `extensions` are touched.
pub fn clean_stale_writes(dirs: &[PathBuf], extensions: &[String]) -> usize {
    dirs.iter()
        .filter(|d| d.is_dir())
        .map(|d| sweep_dir(d, extensions))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("bp_sweep_{label}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn exts() -> Vec<String> {
        vec!["blueprint".to_string(), "vbuild".to_string()]
    }

    #[test]
    fn staging_files_go_and_blueprints_stay() {
        let dir = scratch("mixed");
        fs::create_dir_all(dir.join("village")).unwrap();
        fs::write(dir.join("hut.blueprint"), b"hut").unwrap();
        fs::write(dir.join("hut.blueprint.tmp"), b"torn").unwrap();
        fs::write(dir.join("village").join("well.vbuild"), b"well").unwrap();
        fs::write(dir.join("village").join("well.vbuild.tmp"), b"torn").unwrap();

        assert_eq!(clean_stale_writes(&[dir.clone()], &exts()), 2);
        assert!(dir.join("hut.blueprint").exists());
        assert!(dir.join("village").join("well.vbuild").exists());
        assert!(!dir.join("hut.blueprint.tmp").exists());
        assert!(!dir.join("village").join("well.vbuild.tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unrelated_tmp_files_are_left_alone() {
        let dir = scratch("foreign");
        fs::write(dir.join("notes.tmp"), b"mine").unwrap();
        fs::write(dir.join("editor_autosave.tmp"), b"mine").unwrap();
        fs::write(dir.join("config.json.tmp"), b"mine").unwrap();
        fs::write(dir.join(".blueprint.tmp"), b"mine").unwrap();
        fs::write(dir.join("gate.blueprint.tmp"), b"torn").unwrap();

        assert_eq!(clean_stale_writes(&[dir.clone()], &exts()), 1);
        assert!(dir.join("notes.tmp").exists());
        assert!(dir.join("editor_autosave.tmp").exists());
        assert!(dir.join("config.json.tmp").exists());
        assert!(dir.join(".blueprint.tmp").exists());
        assert!(!dir.join("gate.blueprint.tmp").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn extension_match_ignores_case() {
        let dir = scratch("case");
        fs::write(dir.join("gate.VBUILD.tmp"), b"torn").unwrap();

        assert_eq!(clean_stale_writes(&[dir.clone()], &exts()), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directories_are_ignored() {
        let dir = scratch("missing");
        fs::write(dir.join("gate.blueprint.tmp"), b"torn").unwrap();

        let gone = dir.join("never_created");
        assert_eq!(clean_stale_writes(&[gone, dir.clone()], &exts()), 1);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn clean_directory_sweeps_nothing() {
        let dir = scratch("clean");
        fs::write(dir.join("gate.blueprint"), b"gate").unwrap();

        assert_eq!(clean_stale_writes(&[dir.clone()], &exts()), 0);

        let _ = fs::remove_dir_all(&dir);
    }
}
