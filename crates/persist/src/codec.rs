//! JSON encoding of worlds and event streams.
//!
//! The world shape is `{ speedOfLight, maxRTT, playerSpeed, bulletSpeed, now,
//! entities }`; each entity carries its full trajectory, so a decoded world
//! answers every position and state query exactly like the encoded one.

use lightcone_kernel::{Event, World, WorldRecord};

use crate::store::StoreError;

pub fn encode_world(world: &World) -> Result<String, StoreError> {
    Ok(serde_json::to_string(&world.to_record())?)
}

/// Decode a world; the clock restarts at the recorded `now`.
pub fn decode_world(json: &str) -> Result<World, StoreError> {
    let record: WorldRecord = serde_json::from_str(json)?;
    Ok(World::from_record(record)?)
}

pub fn encode_events(events: &[Event]) -> Result<String, StoreError> {
    Ok(serde_json::to_string(events)?)
}

pub fn decode_events(json: &str) -> Result<Vec<Event>, StoreError> {
    Ok(serde_json::from_str(json)?)
}
