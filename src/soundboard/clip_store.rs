//! Ordered clip list and its persisted profile.
//!
//! List position is the positional identifier the UI works with; every entry also gets a
//! [`ClipId`] so callers can re-resolve positions after a mutation shifted them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use log::{info, warn};

use crate::soundboard::clip::{ClipEntry, ClipId, ClipPatch, next_clip_id};
use crate::soundboard::errors::{ClipField, StorageError, StoreError, ValidationError};
use crate::soundboard::grid::GridSize;

/// Where the clip list lives between runs.
pub trait ClipStorage {
    /// Reads the stored list. A store that was never written reads as empty.
    fn read(&self) -> Result<Vec<ClipEntry>, StorageError>;

    /// Replaces the stored list. Must leave the previous contents intact on failure.
    fn write(&self, entries: &[ClipEntry]) -> Result<(), StorageError>;
}

/// Pretty-printed JSON array in a single file.
#[derive(Clone, Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ClipStorage for JsonFileStorage {
    fn read(&self) -> Result<Vec<ClipEntry>, StorageError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&data)?)
    }

    fn write(&self, entries: &[ClipEntry]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(entries)?;
        let temp = self.temp_path();
        fs::write(&temp, json)?;
        if let Err(err) = fs::rename(&temp, &self.path) {
            let _ = fs::remove_file(&temp);
            return Err(err.into());
        }
        Ok(())
    }
}

/// In-process storage. Clones share contents, so a test can keep one to inspect what was written.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    json: Arc<Mutex<Option<String>>>,
    reject_writes: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-loaded with raw profile text, which need not be valid.
    pub fn with_contents(json: impl Into<String>) -> Self {
        let storage = Self::default();
        *storage.lock() = Some(json.into());
        storage
    }

    /// The last successfully written profile text.
    pub fn contents(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Makes subsequent writes fail with an I/O error.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::Relaxed);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.json.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClipStorage for MemoryStorage {
    fn read(&self) -> Result<Vec<ClipEntry>, StorageError> {
        match self.lock().as_deref() {
            Some(json) => Ok(serde_json::from_str(json)?),
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, entries: &[ClipEntry]) -> Result<(), StorageError> {
        if self.reject_writes.load(Ordering::Relaxed) {
            return Err(io::Error::other("storage rejected the write").into());
        }
        let json = serde_json::to_string_pretty(entries)?;
        *self.lock() = Some(json);
        Ok(())
    }
}

pub struct ClipStore<S> {
    storage: S,
    entries: Vec<ClipEntry>,
    ids: Vec<ClipId>,
    grid: GridSize,
}

impl<S: ClipStorage> ClipStore<S> {
    /// Loads the stored clips. Never fails: unreadable or malformed storage gives an empty store.
    pub fn load(storage: S, grid: GridSize) -> Self {
        let entries = match storage.read() {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Could not load clip profile, starting empty: {err}");
                Vec::new()
            }
        };

        for entry in &entries {
            if let Err(err) = entry.validate() {
                warn!("Stored clip \"{}\" is invalid: {err}", entry.display_name);
            }
        }

        info!("Loaded {} clips", entries.len());
        let ids = entries.iter().map(|_| next_clip_id()).collect();
        Self {
            storage,
            entries,
            ids,
            grid,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ClipEntry] {
        &self.entries
    }

    pub fn ids(&self) -> &[ClipId] {
        &self.ids
    }

    pub fn get(&self, index: usize) -> Result<&ClipEntry, StoreError> {
        self.entries.get(index).ok_or(StoreError::NotFound {
            index,
            len: self.entries.len(),
        })
    }

    pub fn id_at(&self, index: usize) -> Option<ClipId> {
        self.ids.get(index).copied()
    }

    /// Current position of the entry with `id`.
    pub fn index_of(&self, id: ClipId) -> Option<usize> {
        self.ids.iter().position(|&other| other == id)
    }

    /// Appends `entry` and persists. Returns its index and id.
    pub fn add(&mut self, entry: ClipEntry) -> Result<(usize, ClipId), StoreError> {
        self.check(&entry, None)?;

        let id = next_clip_id();
        self.entries.push(entry);
        self.ids.push(id);

        if let Err(err) = self.persist() {
            self.entries.pop();
            self.ids.pop();
            return Err(err.into());
        }

        let index = self.entries.len() - 1;
        info!("Added clip \"{}\" at index {index}", self.entries[index].display_name);
        Ok((index, id))
    }

    /// Applies `patch` to the entry at `index` and persists.
    ///
    /// Placement is only checked when the patch moves the entry, so an entry loaded onto a
    /// contested cell can still be renamed or retuned.
    pub fn edit(&mut self, index: usize, patch: &ClipPatch) -> Result<&ClipEntry, StoreError> {
        let current = self.get(index)?;
        let updated = patch.applied_to(current);
        let moved = (updated.row, updated.col) != (current.row, current.col);

        updated.validate()?;
        if moved {
            self.check_placement(&updated, Some(index))?;
        }

        let previous = std::mem::replace(&mut self.entries[index], updated);
        if let Err(err) = self.persist() {
            self.entries[index] = previous;
            return Err(err.into());
        }

        info!("Edited clip \"{}\" at index {index}", self.entries[index].display_name);
        Ok(&self.entries[index])
    }

    /// Removes the entry at `index` and persists. Later entries shift down by one.
    pub fn delete(&mut self, index: usize) -> Result<ClipEntry, StoreError> {
        self.get(index)?;

        let removed = self.entries.remove(index);
        let id = self.ids.remove(index);

        if let Err(err) = self.persist() {
            self.entries.insert(index, removed);
            self.ids.insert(index, id);
            return Err(err.into());
        }

        info!("Deleted clip \"{}\" from index {index}", removed.display_name);
        Ok(removed)
    }

    pub fn persist(&self) -> Result<(), StorageError> {
        self.storage.write(&self.entries)
    }

    fn check(&self, entry: &ClipEntry, skip: Option<usize>) -> Result<(), ValidationError> {
        entry.validate()?;
        self.check_placement(entry, skip)
    }

    /// Grid bounds and cell uniqueness. `skip` is the entry being replaced.
    fn check_placement(
        &self,
        entry: &ClipEntry,
        skip: Option<usize>,
    ) -> Result<(), ValidationError> {
        if !entry.is_placed() {
            return Ok(());
        }

        if !self.grid.contains(entry.row, entry.col) {
            return Err(ValidationError::new(
                ClipField::Placement,
                format!(
                    "({}, {}) is outside the {}x{} grid",
                    entry.row, entry.col, self.grid.rows, self.grid.cols
                ),
            ));
        }

        let taken = self.entries.iter().enumerate().find(|(i, other)| {
            Some(*i) != skip && other.row == entry.row && other.col == entry.col
        });
        if let Some((_, other)) = taken {
            return Err(ValidationError::new(
                ClipField::Placement,
                format!(
                    "({}, {}) is already taken by \"{}\"",
                    entry.row, entry.col, other.display_name
                ),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn air_horn() -> ClipEntry {
        ClipEntry::new("sounds/a.mp3", "Air Horn")
            .with_volume(0.5)
            .with_trim(0.0, 2.0)
            .placed_at(0, 0)
    }

    fn clip(name: &str, row: i32, col: i32) -> ClipEntry {
        ClipEntry::new(format!("sounds/{name}.wav"), name).placed_at(row, col)
    }

    fn store_with(entries: &[ClipEntry]) -> ClipStore<MemoryStorage> {
        let mut store = ClipStore::load(MemoryStorage::new(), GridSize::default());
        for entry in entries {
            store.add(entry.clone()).unwrap();
        }
        store
    }

    #[test]
    fn test_add_persist_load_round_trips_every_field() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.json");

        let entry = air_horn().with_trim(0.25, 1.75).with_volume(0.8);
        let mut store = ClipStore::load(JsonFileStorage::new(&path), GridSize::default());
        let (index, _) = store.add(entry.clone()).unwrap();
        assert_eq!(index, 0);

        let reloaded = ClipStore::load(JsonFileStorage::new(&path), GridSize::default());
        assert_eq!(reloaded.entries(), &[entry]);
        assert!(!path.with_file_name("profile.json.tmp").exists());
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = ClipStore::load(
            JsonFileStorage::new(dir.path().join("absent.json")),
            GridSize::default(),
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profile.json");
        fs::write(&path, "[{\"sound\": ").unwrap();

        let store = ClipStore::load(JsonFileStorage::new(&path), GridSize::default());
        assert!(store.is_empty());
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("profile.json");

        let mut store = ClipStore::load(JsonFileStorage::new(&path), GridSize::default());
        store.add(air_horn()).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn test_delete_shifts_later_entries_down() {
        let a = clip("a", 0, 0);
        let b = clip("b", 0, 1);
        let c = clip("c", 0, 2);
        let mut store = store_with(&[a.clone(), b.clone(), c.clone()]);
        let c_id = store.id_at(2).unwrap();

        let removed = store.delete(1).unwrap();

        assert_eq!(removed, b);
        assert_eq!(store.entries(), &[a, c]);
        assert_eq!(store.index_of(c_id), Some(1));
    }

    #[test]
    fn test_stale_index_is_not_found() {
        let mut store = store_with(&[clip("a", 0, 0)]);

        assert!(matches!(
            store.delete(1),
            Err(StoreError::NotFound { index: 1, len: 1 })
        ));
        assert!(matches!(
            store.edit(5, &ClipPatch::default()),
            Err(StoreError::NotFound { index: 5, len: 1 })
        ));
    }

    #[test]
    fn test_edit_changes_only_given_fields() {
        let storage = MemoryStorage::new();
        let mut store = ClipStore::load(storage.clone(), GridSize::default());
        store.add(air_horn()).unwrap();

        let patch = ClipPatch {
            volume: Some(0.3),
            ..ClipPatch::default()
        };
        let edited = store.edit(0, &patch).unwrap().clone();

        assert_eq!(edited, air_horn().with_volume(0.3));

        let persisted: Vec<ClipEntry> =
            serde_json::from_str(&storage.contents().unwrap()).unwrap();
        assert_eq!(persisted, vec![edited]);
    }

    #[test]
    fn test_add_rejects_taken_or_outside_cells() {
        let mut store = store_with(&[clip("a", 1, 1)]);

        let err = store.add(clip("b", 1, 1)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError {
                field: ClipField::Placement,
                ..
            })
        ));

        let err = store.add(clip("c", 4, 0)).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_edit_may_keep_its_own_cell() {
        let mut store = store_with(&[clip("a", 1, 1)]);

        let patch = ClipPatch {
            display_name: Some("renamed".to_string()),
            ..ClipPatch::default()
        };
        assert!(store.edit(0, &patch).is_ok());
    }

    #[test]
    fn test_edit_in_place_on_shared_cell() {
        let storage = MemoryStorage::with_contents(
            r#"[{"sound": "sounds/a.wav", "text": "a", "row": 1, "col": 1},
                {"sound": "sounds/b.wav", "text": "b", "row": 1, "col": 1}]"#,
        );
        let mut store = ClipStore::load(storage, GridSize::default());

        let rename = ClipPatch {
            display_name: Some("renamed".to_string()),
            ..ClipPatch::default()
        };
        assert_eq!(store.edit(1, &rename).unwrap().display_name, "renamed");

        let onto_other = ClipPatch {
            row: Some(1),
            col: Some(1),
            ..ClipPatch::default()
        };
        let away = ClipPatch {
            row: Some(2),
            ..ClipPatch::default()
        };
        store.edit(1, &away).unwrap();
        assert!(matches!(
            store.edit(1, &onto_other),
            Err(StoreError::Validation(ValidationError {
                field: ClipField::Placement,
                ..
            }))
        ));
    }

    #[test]
    fn test_invalid_edit_leaves_entry_untouched() {
        let mut store = store_with(&[air_horn()]);

        let patch = ClipPatch {
            start_offset: Some(3.0),
            ..ClipPatch::default()
        };
        let err = store.edit(0, &patch).unwrap_err();

        assert!(matches!(
            err,
            StoreError::Validation(ValidationError {
                field: ClipField::EndOffset,
                ..
            })
        ));
        assert_eq!(store.entries(), &[air_horn()]);
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let storage = MemoryStorage::new();
        let mut store = ClipStore::load(storage.clone(), GridSize::default());
        store.add(clip("a", 0, 0)).unwrap();
        store.add(clip("b", 0, 1)).unwrap();
        let before = storage.contents();

        storage.reject_writes(true);

        assert!(matches!(
            store.add(clip("c", 0, 2)),
            Err(StoreError::Storage(_))
        ));
        assert!(store.delete(0).is_err());
        let patch = ClipPatch {
            volume: Some(1.0),
            ..ClipPatch::default()
        };
        assert!(store.edit(1, &patch).is_err());

        assert_eq!(store.entries(), &[clip("a", 0, 0), clip("b", 0, 1)]);
        assert_eq!(store.ids().len(), 2);
        assert_eq!(storage.contents(), before);
    }

    #[test]
    fn test_invalid_stored_entries_are_kept() {
        let storage = MemoryStorage::with_contents(
            r#"[{"sound": "", "text": "broken", "volume": 2.0, "row": 0, "col": 0}]"#,
        );
        let store = ClipStore::load(storage, GridSize::default());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(0).unwrap().display_name, "broken");
    }
}
