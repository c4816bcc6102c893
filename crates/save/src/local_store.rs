// ---------------------------------------------------------------------------
// local_store – In-memory blueprint collection backed by a directory
// ---------------------------------------------------------------------------

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use walkdir::WalkDir;

use blueprints::{
    is_valid_id, Blueprint, BlueprintConfig, BlueprintError, BlueprintRegistrar,
    CANONICAL_EXTENSION,
};

use crate::atomic_write::atomic_write;
use crate::blueprint_codec::{decode_blueprint_file, encode_blueprint, id_from_path};
use crate::tmp_cleanup::clean_stale_writes;

/// A file skipped because its ID was already loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadCollision {
    pub id: String,
    pub path: PathBuf,
}

/// Outcome of [`BlueprintStore::load`]. Problems are reported here, never
/// raised.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<String>,
    /// Files that lost to another file in this same scan.
    pub collisions: Vec<LoadCollision>,
    /// Files whose ID was already in the store before this scan. Expected on
    /// every rescan, so only logged at debug level.
    pub already_loaded: Vec<LoadCollision>,
    pub failures: Vec<(PathBuf, BlueprintError)>,
    pub tmp_cleaned: usize,
}

/// Blueprints keyed by ID, one file per blueprint in `save_dir`.
///
/// One store per peer role: the client's local blueprints, or the
/// authority's canonical collection.
#[derive(Resource, Debug, Clone)]
pub struct BlueprintStore {
    blueprints: BTreeMap<String, Blueprint>,
    save_dir: PathBuf,
    extension: String,
}

impl Default for BlueprintStore {
    fn default() -> Self {
        Self::new("blueprints", CANONICAL_EXTENSION)
    }
}

impl BlueprintStore {
    pub fn new(save_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            blueprints: BTreeMap::new(),
            save_dir: save_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn from_config(config: &BlueprintConfig) -> Self {
        Self::new(config.save_directory.clone(), config.write_extension())
    }

    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    /// Where `save`/`persist` write the blueprint with this ID.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.save_dir.join(format!("{}.{}", id, self.extension))
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Scan `dirs` recursively for files with one of `extensions` and insert
    /// each decoded blueprint under its file stem.
    ///
    /// Files are visited in sorted path order. The first file to claim an ID
    /// wins; later ones are recorded as collisions. IDs already in the store
    /// are never replaced, so calling `load` again only picks up new files;
    /// the files it passes over are listed in `already_loaded`.
    /// Staging files of interrupted writes are removed first.
    pub fn load(&mut self, dirs: &[PathBuf], extensions: &[String]) -> LoadReport {
        let mut report = LoadReport::default();
        let mut loaded_now = HashSet::new();

        let mut cleanup_dirs = dirs.to_vec();
        if !cleanup_dirs.contains(&self.save_dir) {
            cleanup_dirs.push(self.save_dir.clone());
        }
        let mut staged_extensions = extensions.to_vec();
        if !staged_extensions.contains(&self.extension) {
            staged_extensions.push(self.extension.clone());
        }
        report.tmp_cleaned = clean_stale_writes(&cleanup_dirs, &staged_extensions);

        for dir in dirs {
            if !dir.is_dir() {
                debug!("Blueprint directory {} does not exist", dir.display());
                continue;
            }
            for entry in WalkDir::new(dir).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!("Could not scan {}: {}", dir.display(), e);
                        continue;
                    }
                };
                let path = entry.path();
                if !entry.file_type().is_file() || !has_extension(path, extensions) {
                    continue;
                }
                self.load_file(path, &mut loaded_now, &mut report);
            }
        }

        info!(
            "Loaded {} blueprints ({} collisions, {} failures)",
            report.loaded.len(),
            report.collisions.len(),
            report.failures.len()
        );
        report
    }

    fn load_file(
        &mut self,
        path: &Path,
        loaded_now: &mut HashSet<String>,
        report: &mut LoadReport,
    ) {
        let Some(id) = id_from_path(path) else {
            return;
        };
        if self.blueprints.contains_key(&id) {
            if !loaded_now.contains(&id) {
                debug!("Blueprint {} already in the store, leaving {}", id, path.display());
                report.already_loaded.push(LoadCollision {
                    id,
                    path: path.to_path_buf(),
                });
                return;
            }
            warn!(
                "Blueprint ID {} from {} already loaded, skipping",
                id,
                path.display()
            );
            report.collisions.push(LoadCollision {
                id,
                path: path.to_path_buf(),
            });
            return;
        }

        let result = std::fs::read(path)
            .map_err(BlueprintError::from)
            .and_then(|bytes| decode_blueprint_file(path, &bytes));
        match result {
            Ok(blueprint) => {
                debug!("Loaded blueprint {} from {}", id, path.display());
                self.blueprints.insert(id.clone(), blueprint);
                loaded_now.insert(id.clone());
                report.loaded.push(id);
            }
            Err(e) => {
                warn!("Could not load blueprint {}: {}", path.display(), e);
                report.failures.push((path.to_path_buf(), e));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Write the stored blueprint `id` to disk.
    ///
    /// # Errors
    ///
    /// `UnknownId` if the store has no such blueprint, `PersistFailure` if
    /// the write fails. A failed write leaves any previous file untouched.
    pub fn save(&self, id: &str) -> Result<PathBuf, BlueprintError> {
        let blueprint = self
            .blueprints
            .get(id)
            .ok_or_else(|| BlueprintError::UnknownId(id.to_string()))?;
        self.persist(blueprint)
    }

    /// Write `blueprint` to disk without touching the in-memory map.
    pub fn persist(&self, blueprint: &Blueprint) -> Result<PathBuf, BlueprintError> {
        if !is_valid_id(&blueprint.id) {
            return Err(BlueprintError::PersistFailure(format!(
                "invalid blueprint ID '{}'",
                blueprint.id
            )));
        }
        let path = self.path_for(&blueprint.id);
        atomic_write(&path, &encode_blueprint(blueprint))
            .map_err(|e| BlueprintError::PersistFailure(format!("{}: {}", path.display(), e)))?;
        debug!("Saved blueprint {} to {}", blueprint.id, path.display());
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // Collection
    // -----------------------------------------------------------------------

    /// Insert a new blueprint. An existing ID is never overwritten.
    pub fn insert(&mut self, blueprint: Blueprint) -> Result<(), BlueprintError> {
        if self.blueprints.contains_key(&blueprint.id) {
            return Err(BlueprintError::DuplicateId(blueprint.id));
        }
        self.blueprints.insert(blueprint.id.clone(), blueprint);
        Ok(())
    }

    /// Drop the in-memory entry. The caller must release the blueprint's host
    /// representation first; see [`Self::release_and_remove`].
    pub fn remove(&mut self, id: &str) -> Option<Blueprint> {
        self.blueprints.remove(id)
    }

    /// Release the host representation of `id`, then remove it.
    pub fn release_and_remove<R: BlueprintRegistrar + ?Sized>(
        &mut self,
        id: &str,
        registrar: &mut R,
    ) -> Option<Blueprint> {
        if !self.blueprints.contains_key(id) {
            return None;
        }
        registrar.release(id);
        self.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Blueprint> {
        self.blueprints.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blueprints.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.blueprints.keys().map(String::as_str)
    }

    /// Blueprints in ID order.
    pub fn iter(&self) -> impl Iterator<Item = &Blueprint> {
        self.blueprints.values()
    }

    /// First free `blueprintNNN` ID, starting from the current count + 1.
    pub fn next_default_id(&self) -> String {
        let mut n = self.blueprints.len() + 1;
        loop {
            let id = format!("blueprint{n:03}");
            if !self.blueprints.contains_key(&id) {
                return id;
            }
            n += 1;
        }
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
