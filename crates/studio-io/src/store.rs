//! Snapshot table persisted as a JSON array of rows.
//!
//! Each commit rewrites the whole table to a sibling temp file and renames it
//! over the original, so a crash mid-write leaves the previous table intact.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use studio_core::history::{LogChange, SnapshotRow, SnapshotStore, StoreError};
use studio_core::Snapshot;

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    rows: Vec<SnapshotRow>,
}

impl JsonFileStore {
    /// Open the table at `path`. A missing or empty file is an empty table.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let rows: Vec<SnapshotRow> = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Vec::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        if let Some(pair) = rows.windows(2).find(|w| w[0].id >= w[1].id) {
            return Err(StoreError::Corrupt {
                id: pair[1].id,
                reason: format!("row follows row {} out of sequence order", pair[0].id),
            });
        }
        log::debug!("Opened snapshot table {} ({} rows)", path.display(), rows.len());
        Ok(Self { path, rows })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Decode every row back into a snapshot.
    pub fn snapshots(&self) -> Result<Vec<Snapshot>, StoreError> {
        self.rows.iter().map(SnapshotRow::decode).collect()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("snapshots"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist(&self, rows: &[SnapshotRow]) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(rows)?;
        let temp = self.temp_path();
        if let Err(e) = fs::write(&temp, json).and_then(|()| fs::rename(&temp, &self.path)) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl SnapshotStore for JsonFileStore {
    fn commit(&mut self, change: &LogChange) -> Result<(), StoreError> {
        let mut next = self.rows.clone();
        change.apply_to(&mut next);
        self.persist(&next)?;
        self.rows = next;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.persist(&[])?;
        self.rows.clear();
        Ok(())
    }

    fn rows(&self) -> Result<Vec<SnapshotRow>, StoreError> {
        Ok(self.rows.clone())
    }
}
