//! # Filesystem Chunk Store
//!
//! On-disk snapshot layout, one directory per height:
//!
//! ```text
//! <root>/
//! ├── 200/
//! │   ├── manifest.json
//! │   ├── chunk_0000.bin
//! │   └── chunk_0001.bin
//! └── 400/
//!     └── ...
//! ```
//!
//! Manifests are JSON with hex-encoded hashes so operators can inspect them.
//! All files are written via temp-file + rename; a crash mid-write leaves at
//! worst a `.tmp` leftover, never a truncated artifact. The manifest is
//! deleted first on pruning, so a snapshot disappears from discovery before
//! its chunks do.

use crate::domain::entities::SnapshotManifest;
use crate::domain::errors::StoreError;
use crate::ports::outbound::ChunkStore;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File-backed snapshot artifact store.
pub struct FileChunkStore {
    root: PathBuf,
}

impl FileChunkStore {
    /// Open (creating if needed) a chunk store rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(io_err)?;
        Ok(Self { root })
    }

    fn snapshot_dir(&self, height: u64) -> PathBuf {
        self.root.join(height.to_string())
    }

    fn manifest_path(&self, height: u64) -> PathBuf {
        self.snapshot_dir(height).join("manifest.json")
    }

    fn chunk_path(&self, height: u64, index: u32) -> PathBuf {
        self.snapshot_dir(height).join(format!("chunk_{index:04}.bin"))
    }

    /// Write atomically via temp file + rename.
    fn write_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).map_err(io_err)?;
        file.write_all(bytes).map_err(io_err)?;
        file.sync_all().map_err(io_err)?;
        fs::rename(&temp_path, path).map_err(io_err)?;
        Ok(())
    }

    fn read_file(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err(e)),
        }
    }
}

fn io_err(e: std::io::Error) -> StoreError {
    StoreError::Io(e.to_string())
}

impl ChunkStore for FileChunkStore {
    fn put_manifest(&mut self, manifest: &SnapshotManifest) -> Result<(), StoreError> {
        fs::create_dir_all(self.snapshot_dir(manifest.height)).map_err(io_err)?;
        let json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| StoreError::Corruption(e.to_string()))?;
        Self::write_file(&self.manifest_path(manifest.height), &json)
    }

    fn get_manifest(&self, height: u64) -> Result<Option<SnapshotManifest>, StoreError> {
        let Some(bytes) = Self::read_file(&self.manifest_path(height))? else {
            return Ok(None);
        };
        let manifest = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corruption(format!("manifest for height {height}: {e}")))?;
        Ok(Some(manifest))
    }

    fn list_manifests(&self) -> Result<Vec<SnapshotManifest>, StoreError> {
        let mut manifests = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            if !entry.path().is_dir() {
                continue;
            }
            // Skip directories that aren't height-named or lack a manifest
            // (a snapshot whose chunks landed but whose manifest didn't).
            let Some(height) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<u64>().ok())
            else {
                continue;
            };
            if let Some(manifest) = self.get_manifest(height)? {
                manifests.push(manifest);
            }
        }
        Ok(manifests)
    }

    fn put_chunk(&mut self, height: u64, index: u32, payload: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(self.snapshot_dir(height)).map_err(io_err)?;
        Self::write_file(&self.chunk_path(height, index), payload)
    }

    fn get_chunk(&self, height: u64, index: u32) -> Result<Option<Vec<u8>>, StoreError> {
        Self::read_file(&self.chunk_path(height, index))
    }

    fn delete_snapshot(&mut self, height: u64) -> Result<(), StoreError> {
        // Manifest first: discovery stops listing the snapshot before any
        // chunk goes away.
        match fs::remove_file(self.manifest_path(height)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_err(e)),
        }
        match fs::remove_dir_all(self.snapshot_dir(height)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::SNAPSHOT_FORMAT;

    fn manifest(height: u64) -> SnapshotManifest {
        SnapshotManifest {
            height,
            format: SNAPSHOT_FORMAT,
            block_time: 1_700_000_000,
            app_hash: [0xAB; 32],
            chunk_hashes: vec![[0x01; 32], [0x02; 32]],
            aggregate_hash: [0xCD; 32],
        }
    }

    #[test]
    fn test_manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileChunkStore::new(dir.path()).unwrap();

        store.put_manifest(&manifest(200)).unwrap();

        let loaded = store.get_manifest(200).unwrap().unwrap();
        assert_eq!(loaded, manifest(200));
        assert!(store.get_manifest(400).unwrap().is_none());
    }

    #[test]
    fn test_chunk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileChunkStore::new(dir.path()).unwrap();

        store.put_chunk(200, 0, b"chunk zero").unwrap();
        store.put_chunk(200, 1, b"chunk one").unwrap();

        assert_eq!(store.get_chunk(200, 0).unwrap(), Some(b"chunk zero".to_vec()));
        assert_eq!(store.get_chunk(200, 1).unwrap(), Some(b"chunk one".to_vec()));
        assert_eq!(store.get_chunk(200, 2).unwrap(), None);
    }

    #[test]
    fn test_list_skips_partial_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileChunkStore::new(dir.path()).unwrap();

        store.put_manifest(&manifest(200)).unwrap();
        // Chunks without a manifest: a create interrupted before commit.
        store.put_chunk(400, 0, b"orphan").unwrap();

        let listed = store.list_manifests().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].height, 200);
    }

    #[test]
    fn test_delete_removes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileChunkStore::new(dir.path()).unwrap();

        store.put_chunk(200, 0, b"payload").unwrap();
        store.put_manifest(&manifest(200)).unwrap();

        store.delete_snapshot(200).unwrap();

        assert!(store.get_manifest(200).unwrap().is_none());
        assert!(store.get_chunk(200, 0).unwrap().is_none());
        // Deleting an absent snapshot is a no-op.
        store.delete_snapshot(200).unwrap();
    }

    #[test]
    fn test_manifest_corruption_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileChunkStore::new(dir.path()).unwrap();
        store.put_manifest(&manifest(200)).unwrap();

        std::fs::write(dir.path().join("200").join("manifest.json"), b"{broken").unwrap();

        assert!(matches!(
            store.get_manifest(200),
            Err(StoreError::Corruption(_))
        ));
    }
}
