use lightcone_kernel::{Event, World, WorldError, WorldRecord};
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// A content-addressed capture of the world at one clock reading.
///
/// `log_position` is the number of logged events already reflected in the
/// capture; replay resumes from there.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub log_position: usize,
    pub world: WorldRecord,
    /// FNV-1a over the serialized content of the capture.
    pub hash: u64,
}

impl Snapshot {
    pub fn capture(world: &World, log_position: usize) -> Self {
        let record = world.to_record();
        let hash = content_hash(log_position, &record);
        Self {
            log_position,
            world: record,
            hash,
        }
    }

    /// Clock reading at capture time.
    pub fn now(&self) -> f64 {
        self.world.now
    }

    pub fn verify(&self) -> bool {
        self.hash == content_hash(self.log_position, &self.world)
    }

    /// Rebuild the captured world; its clock restarts at the capture time.
    pub fn restore(&self) -> Result<World, WorldError> {
        World::from_record(self.world.clone())
    }
}

/// Append-only log of applied events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn append(&mut self, events: &[Event]) {
        self.events.extend_from_slice(events);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Restore `snapshot` and re-apply every event logged after it.
    pub fn replay_from(&self, snapshot: &Snapshot) -> Result<World, WorldError> {
        let mut world = snapshot.restore()?;
        let tail = self.events.get(snapshot.log_position..).unwrap_or_default();
        for event in tail {
            world.handle_event(event)?;
        }
        Ok(world)
    }
}

/// In-memory snapshots plus the event log they index into.
///
/// Events submitted through [`SnapshotStore::submit`] are logged only once
/// they have been applied.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    snapshots: Vec<Snapshot>,
    log: EventLog,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `event` to `world` and log it when it took effect.
    pub fn submit(&mut self, world: &mut World, event: Event) -> Result<(), WorldError> {
        world.handle_event(&event)?;
        self.log.push(event);
        Ok(())
    }

    pub fn take_snapshot(&mut self, world: &World) -> usize {
        self.snapshots.push(Snapshot::capture(world, self.log.len()));
        self.snapshots.len() - 1
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn get_snapshot(&self, index: usize) -> Option<&Snapshot> {
        self.snapshots.get(index)
    }

    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// The world as it was when snapshot `index` was taken.
    pub fn rollback(&self, index: usize) -> Result<World, StoreError> {
        let snap = self
            .snapshots
            .get(index)
            .ok_or(StoreError::UnknownSnapshot(index))?;
        Ok(snap.restore()?)
    }

    /// Latest snapshot with the rest of the log replayed on top.
    pub fn replay_latest(&self) -> Result<World, StoreError> {
        let snap = self.snapshots.last().ok_or(StoreError::NoSnapshots)?;
        Ok(self.log.replay_from(snap)?)
    }
}

/// Covers everything that survives serialization; `debug_trace` does not.
fn content_hash(log_position: usize, record: &WorldRecord) -> u64 {
    fnv1a_hash(&format!(
        "{log_position}|{}|{}|{}|{}|{}|{:?}",
        record.speed_of_light,
        record.max_rtt,
        record.player_speed,
        record.bullet_speed,
        record.now,
        record.entities
    ))
}

fn fnv1a_hash(data: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in data.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}
