use glam::DVec2;
use lightcone_common::{EntityId, Team};
use serde::{Deserialize, Serialize};

/// An event submitted to the world by the transport layer.
///
/// Each variant carries only the fields its kind needs; matching on this enum
/// is exhaustive in both validation and application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    /// A player enters the world at `(x, t)`; `x` defaults to the origin.
    Join {
        id: EntityId,
        t: f64,
        #[serde(default)]
        x: DVec2,
        #[serde(default)]
        team: Team,
    },
    /// A player at `x` changes velocity to `v` at time `t`.
    Move {
        id: EntityId,
        t: f64,
        x: DVec2,
        v: DVec2,
    },
    /// A player at `x` fires a projectile with velocity `v` at time `t`.
    Shoot {
        id: EntityId,
        t: f64,
        x: DVec2,
        v: DVec2,
    },
    /// A player leaves the world at time `t`.
    Leave { id: EntityId, t: f64 },
}

impl Event {
    pub fn id(&self) -> &EntityId {
        match self {
            Event::Join { id, .. }
            | Event::Move { id, .. }
            | Event::Shoot { id, .. }
            | Event::Leave { id, .. } => id,
        }
    }

    pub fn t(&self) -> f64 {
        match self {
            Event::Join { t, .. }
            | Event::Move { t, .. }
            | Event::Shoot { t, .. }
            | Event::Leave { t, .. } => *t,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Join { .. } => "join",
            Event::Move { .. } => "move",
            Event::Shoot { .. } => "shoot",
            Event::Leave { .. } => "leave",
        }
    }
}

/// Why [`crate::World::check_event`] refused an event. Rejection never
/// mutates the world.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventRejection {
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
    #[error("entity {0} is not a player")]
    NotPlayer(EntityId),
    #[error("entity {id} does not exist at t={t}")]
    NotExisting { id: EntityId, t: f64 },
    #[error("event of {id} at t={t} is outside its future light cone (interval² = {interval2})")]
    CausalityViolation {
        id: EntityId,
        t: f64,
        interval2: f64,
    },
    #[error("speed {speed} exceeds player cap {cap}")]
    SpeedCapExceeded { speed: f64, cap: f64 },
    #[error("projectile speed {speed} differs from {expected}")]
    BulletSpeedMismatch { speed: f64, expected: f64 },
    #[error("{0} events are not admitted by validation")]
    NotAdmissible(&'static str),
    #[error("event of {0} carries a non-finite time, position or velocity")]
    NonFinite(EntityId),
}
