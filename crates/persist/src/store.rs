//! File-backed world persistence.
//!
//! Layout inside the store directory:
//! ```text
//! world.meta.json               - metadata and schema versions
//! snapshots/
//!   000001.snapshot.json.zst    - zstd compressed JSON snapshots
//! events/
//!   000001.log.json.zst         - zstd compressed JSON event segments
//! integrity/
//!   manifest.json               - hash chain manifest
//! ```

use crate::snapshot::Snapshot;
use lightcone_kernel::{Event, World, WorldError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Current schema versions.
const WORLD_SCHEMA_VERSION: u32 = 1;
const EVENT_SCHEMA_VERSION: u32 = 1;

/// Errors from persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("world error: {0}")]
    World(#[from] WorldError),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("no snapshots found")]
    NoSnapshots,
    #[error("no snapshot at index {0}")]
    UnknownSnapshot(usize),
}

/// Metadata stored in world.meta.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldMeta {
    pub world_schema_version: u32,
    pub event_schema_version: u32,
    pub snapshot_count: u32,
    pub event_segment_count: u32,
    /// Total events written across all segments.
    #[serde(default)]
    pub event_count: usize,
}

/// A single entry in the integrity manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub sha256: String,
    pub prev_hash: Option<String>,
}

/// Integrity manifest tracking all segment hashes in a chain.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub entries: Vec<ManifestEntry>,
}

/// File-backed world store with schema versioning and integrity checking.
pub struct WorldStore {
    root: PathBuf,
    meta: WorldMeta,
    manifest: IntegrityManifest,
}

impl WorldStore {
    /// Open or create a world store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join("snapshots"))?;
        std::fs::create_dir_all(root.join("events"))?;
        std::fs::create_dir_all(root.join("integrity"))?;

        let meta_path = root.join("world.meta.json");
        let manifest_path = root.join("integrity").join("manifest.json");

        let (meta, manifest) = if meta_path.exists() {
            let meta: WorldMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            for (file_version, expected_version) in [
                (meta.world_schema_version, WORLD_SCHEMA_VERSION),
                (meta.event_schema_version, EVENT_SCHEMA_VERSION),
            ] {
                if file_version != expected_version {
                    return Err(StoreError::SchemaMismatch {
                        file_version,
                        expected_version,
                    });
                }
            }
            let manifest: IntegrityManifest = if manifest_path.exists() {
                serde_json::from_reader(std::fs::File::open(&manifest_path)?)?
            } else {
                IntegrityManifest::default()
            };
            (meta, manifest)
        } else {
            let meta = WorldMeta {
                world_schema_version: WORLD_SCHEMA_VERSION,
                event_schema_version: EVENT_SCHEMA_VERSION,
                snapshot_count: 0,
                event_segment_count: 0,
                event_count: 0,
            };
            let manifest = IntegrityManifest::default();
            serde_json::to_writer_pretty(std::fs::File::create(&meta_path)?, &meta)?;
            serde_json::to_writer_pretty(std::fs::File::create(&manifest_path)?, &manifest)?;
            (meta, manifest)
        };

        debug!(root = %root.display(), snapshots = meta.snapshot_count, "world store opened");
        Ok(Self {
            root,
            meta,
            manifest,
        })
    }

    /// Load the latest snapshot and replay the events logged after it.
    pub fn load_latest(&self) -> Result<World, StoreError> {
        if self.meta.snapshot_count == 0 {
            return Err(StoreError::NoSnapshots);
        }
        let snap = self.load_snapshot(self.meta.snapshot_count)?;
        if !snap.verify() {
            return Err(StoreError::IntegrityMismatch {
                expected: format!("{:#x}", snap.hash),
                actual: "snapshot content hash mismatch".into(),
            });
        }

        let mut world = snap.restore()?;
        let mut seen = 0usize;
        for seg_idx in 1..=self.meta.event_segment_count {
            for event in self.load_event_segment(seg_idx)? {
                seen += 1;
                if seen <= snap.log_position {
                    continue;
                }
                world.handle_event(&event)?;
            }
        }
        info!(
            now = snap.now(),
            replayed = seen.saturating_sub(snap.log_position),
            "world loaded"
        );
        Ok(world)
    }

    /// Append events to the store as a new segment.
    pub fn append_events(&mut self, events: &[Event]) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }
        let seg_idx = self.meta.event_segment_count + 1;
        let filename = format!("{:06}.log.json.zst", seg_idx);
        self.write_entry("events", filename, events)?;
        self.meta.event_segment_count = seg_idx;
        self.meta.event_count += events.len();

        self.save_meta()?;
        self.save_manifest()?;
        Ok(())
    }

    /// Snapshot the world, marking every event written so far as included.
    pub fn take_snapshot(&mut self, world: &World) -> Result<(), StoreError> {
        let snap = Snapshot::capture(world, self.meta.event_count);
        let snap_idx = self.meta.snapshot_count + 1;
        let filename = format!("{:06}.snapshot.json.zst", snap_idx);
        self.write_entry("snapshots", filename, &snap)?;
        self.meta.snapshot_count = snap_idx;

        self.save_meta()?;
        self.save_manifest()?;
        Ok(())
    }

    /// Verify all integrity hashes in the manifest.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        let mut prev_hash: Option<String> = None;
        for entry in &self.manifest.entries {
            if entry.prev_hash != prev_hash {
                return Err(StoreError::IntegrityMismatch {
                    expected: prev_hash.unwrap_or_else(|| "None".into()),
                    actual: entry.prev_hash.clone().unwrap_or_else(|| "None".into()),
                });
            }

            let data = std::fs::read(self.entry_path(&entry.filename))?;
            let actual_hash = sha256_hex(&data);
            if actual_hash != entry.sha256 {
                return Err(StoreError::IntegrityMismatch {
                    expected: entry.sha256.clone(),
                    actual: actual_hash,
                });
            }

            prev_hash = Some(entry.sha256.clone());
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn meta(&self) -> &WorldMeta {
        &self.meta
    }

    fn entry_path(&self, filename: &str) -> PathBuf {
        let dir = if filename.contains("snapshot") {
            "snapshots"
        } else {
            "events"
        };
        self.root.join(dir).join(filename)
    }

    fn write_entry<T: Serialize + ?Sized>(
        &mut self,
        dir: &str,
        filename: String,
        value: &T,
    ) -> Result<(), StoreError> {
        let compressed = zstd_compress(&serde_json::to_vec(value)?)?;
        let sha256 = sha256_hex(&compressed);
        let prev_hash = self.manifest.entries.last().map(|e| e.sha256.clone());

        std::fs::write(self.root.join(dir).join(&filename), &compressed)?;
        debug!(%filename, bytes = compressed.len(), "store entry written");

        self.manifest.entries.push(ManifestEntry {
            filename,
            sha256,
            prev_hash,
        });
        Ok(())
    }

    fn read_entry<T: for<'de> Deserialize<'de>>(&self, filename: &str) -> Result<T, StoreError> {
        let compressed = std::fs::read(self.entry_path(filename))?;
        self.verify_file_hash(filename, &compressed)?;
        Ok(serde_json::from_slice(&zstd_decompress(&compressed)?)?)
    }

    fn load_snapshot(&self, index: u32) -> Result<Snapshot, StoreError> {
        self.read_entry(&format!("{:06}.snapshot.json.zst", index))
    }

    fn load_event_segment(&self, index: u32) -> Result<Vec<Event>, StoreError> {
        self.read_entry(&format!("{:06}.log.json.zst", index))
    }

    fn verify_file_hash(&self, filename: &str, data: &[u8]) -> Result<(), StoreError> {
        let actual = sha256_hex(data);
        match self.manifest.entries.iter().find(|e| e.filename == filename) {
            Some(entry) if entry.sha256 != actual => Err(StoreError::IntegrityMismatch {
                expected: entry.sha256.clone(),
                actual,
            }),
            _ => Ok(()),
        }
    }

    fn save_meta(&self) -> Result<(), StoreError> {
        let path = self.root.join("world.meta.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.meta)?;
        Ok(())
    }

    fn save_manifest(&self) -> Result<(), StoreError> {
        let path = self.root.join("integrity").join("manifest.json");
        serde_json::to_writer_pretty(std::fs::File::create(path)?, &self.manifest)?;
        Ok(())
    }
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;
    use lightcone_common::{EntityId, Team};
    use lightcone_kernel::{ManualClock, WorldConfig};
    use std::sync::Arc;

    fn world() -> World {
        World::new(&WorldConfig::default(), Arc::new(ManualClock::new(0.0))).unwrap()
    }

    fn join(id: &str, t: f64, x: DVec2) -> Event {
        Event::Join {
            id: EntityId::from(id),
            t,
            x,
            team: Team::Red,
        }
    }

    fn apply_all(world: &mut World, events: &[Event]) {
        for event in events {
            world.handle_event(event).unwrap();
        }
    }

    #[test]
    fn store_open_creates_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let store = WorldStore::open(tmp.path().join("world_data")).unwrap();
        assert_eq!(store.meta().snapshot_count, 0);
        assert_eq!(store.meta().event_segment_count, 0);
        assert!(store.root().join("snapshots").is_dir());
        assert!(store.root().join("events").is_dir());
        assert!(store.root().join("integrity").is_dir());
    }

    #[test]
    fn store_snapshot_then_events_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let mut store = WorldStore::open(&path).unwrap();

        let mut w = world();
        let before = [join("a", 0.0, DVec2::ZERO)];
        apply_all(&mut w, &before);
        store.append_events(&before).unwrap();
        store.take_snapshot(&w).unwrap();

        let after = [
            Event::Move {
                id: EntityId::from("a"),
                t: 1.0,
                x: DVec2::ZERO,
                v: DVec2::new(2.0, 0.0),
            },
            join("b", 2.0, DVec2::new(4.0, 4.0)),
        ];
        apply_all(&mut w, &after);
        store.append_events(&after).unwrap();

        let reopened = WorldStore::open(&path).unwrap();
        let loaded = reopened.load_latest().unwrap();
        assert_eq!(loaded.entity_count(), 2);
        let a = EntityId::from("a");
        assert_eq!(
            loaded.get(&a).unwrap().trajectory().position_at(3.0),
            Some(DVec2::new(4.0, 0.0))
        );
    }

    #[test]
    fn load_without_snapshot_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = WorldStore::open(tmp.path().join("world_data")).unwrap();
        assert!(matches!(store.load_latest(), Err(StoreError::NoSnapshots)));
    }

    #[test]
    fn store_integrity_verification() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = WorldStore::open(tmp.path().join("world_data")).unwrap();

        let mut w = world();
        let events = [join("a", 0.0, DVec2::ZERO)];
        apply_all(&mut w, &events);
        store.append_events(&events).unwrap();
        store.take_snapshot(&w).unwrap();
        store.verify_integrity().unwrap();
        assert_eq!(store.manifest.entries.len(), 2);
        assert_eq!(
            store.manifest.entries[1].prev_hash.as_deref(),
            Some(store.manifest.entries[0].sha256.as_str())
        );
    }

    #[test]
    fn store_integrity_fail_closed_on_corruption() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let mut store = WorldStore::open(&path).unwrap();

        let mut w = world();
        apply_all(&mut w, &[join("a", 0.0, DVec2::ZERO)]);
        store.take_snapshot(&w).unwrap();

        let snap_path = path.join("snapshots").join("000001.snapshot.json.zst");
        let mut data = std::fs::read(&snap_path).unwrap();
        if let Some(byte) = data.last_mut() {
            *byte ^= 0xff;
        }
        std::fs::write(&snap_path, &data).unwrap();

        let reopened = WorldStore::open(&path).unwrap();
        assert!(reopened.verify_integrity().is_err());
        assert!(matches!(
            reopened.load_latest(),
            Err(StoreError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn store_reopen_preserves_counts() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        {
            let mut store = WorldStore::open(&path).unwrap();
            let mut w = world();
            let events = [join("a", 0.0, DVec2::ZERO), join("b", 0.0, DVec2::ONE)];
            apply_all(&mut w, &events);
            store.append_events(&events).unwrap();
            store.take_snapshot(&w).unwrap();
        }
        let reopened = WorldStore::open(&path).unwrap();
        assert_eq!(reopened.meta().snapshot_count, 1);
        assert_eq!(reopened.meta().event_count, 2);
        assert_eq!(reopened.load_latest().unwrap().entity_count(), 2);
    }

    #[test]
    fn failed_write_leaves_counts_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let mut store = WorldStore::open(&path).unwrap();

        let mut w = world();
        let first = [join("a", 0.0, DVec2::ZERO)];
        apply_all(&mut w, &first);
        store.append_events(&first).unwrap();

        // A file where the segment directory should be makes the next write fail.
        std::fs::remove_dir_all(path.join("events")).unwrap();
        std::fs::write(path.join("events"), b"").unwrap();
        let second = [join("b", 1.0, DVec2::ONE)];
        assert!(matches!(store.append_events(&second), Err(StoreError::Io(_))));
        assert_eq!(store.meta().event_segment_count, 1);
        assert_eq!(store.meta().event_count, 1);
        assert_eq!(store.manifest.entries.len(), 1);

        std::fs::remove_file(path.join("events")).unwrap();
        std::fs::create_dir(path.join("events")).unwrap();
        store.append_events(&second).unwrap();
        assert_eq!(store.meta().event_segment_count, 2);
        assert!(path.join("events").join("000002.log.json.zst").is_file());
    }

    #[test]
    fn schema_mismatch_fail_closed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("world_data");
        let _store = WorldStore::open(&path).unwrap();

        let meta_path = path.join("world.meta.json");
        let mut meta: WorldMeta =
            serde_json::from_reader(std::fs::File::open(&meta_path).unwrap()).unwrap();
        meta.world_schema_version = 999;
        serde_json::to_writer_pretty(std::fs::File::create(&meta_path).unwrap(), &meta).unwrap();

        match WorldStore::open(&path) {
            Err(StoreError::SchemaMismatch {
                file_version,
                expected_version,
            }) => {
                assert_eq!(file_version, 999);
                assert_eq!(expected_version, WORLD_SCHEMA_VERSION);
            }
            Err(e) => panic!("expected SchemaMismatch, got: {e}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }
}
