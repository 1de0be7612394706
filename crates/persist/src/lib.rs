//! Persistence: JSON codec, snapshots + event log, file-backed store.
//!
//! # Invariants
//! - The event log is append-only.
//! - Snapshots carry a content hash and are verified before use.
//! - Restoring a snapshot and replaying the log after it reproduces the
//!   same trajectory queries as the live world.

pub mod codec;
pub mod snapshot;
pub mod store;

pub use codec::{decode_events, decode_world, encode_events, encode_world};
pub use snapshot::{EventLog, Snapshot, SnapshotStore};
pub use store::{StoreError, WorldMeta, WorldStore};
