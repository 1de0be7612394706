use glam::DVec2;
use lightcone_common::{EntityId, EntityKind, Team};
use serde::{Deserialize, Serialize};

use crate::trajectory::{Trajectory, TrajectoryError};

/// An entity and the trajectory it exclusively owns.
///
/// Inactive entities stay in the world so their history can still be queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    id: EntityId,
    created_at: f64,
    #[serde(rename = "type")]
    kind: EntityKind,
    team: Team,
    radius: f64,
    #[serde(default)]
    data: serde_json::Value,
    active: bool,
    last_update: f64,
    trajectory: Trajectory,
}

/// Parameters for [`crate::World::create_entity`]. Unset fields take the
/// registry defaults: the clock's current time, a positional id, the origin
/// at rest, and an inactive entity.
#[derive(Debug, Clone, Default)]
pub struct EntitySpec {
    pub id: Option<EntityId>,
    pub t: Option<f64>,
    pub x: DVec2,
    pub v: DVec2,
    pub kind: EntityKind,
    pub team: Team,
    pub radius: f64,
    pub data: serde_json::Value,
    pub active: bool,
}

impl Entity {
    pub(crate) fn new(id: EntityId, t: f64, spec: EntitySpec) -> Self {
        Self {
            id,
            created_at: t,
            kind: spec.kind,
            team: spec.team,
            radius: spec.radius,
            data: spec.data,
            active: spec.active,
            last_update: t,
            trajectory: Trajectory::new(t, spec.x, spec.v, None),
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Opaque payload attached by the caller.
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Time of the last committed update issued by this entity.
    pub fn last_update(&self) -> f64 {
        self.last_update
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// Live entities still have an open trajectory after their last update.
    pub fn is_live(&self) -> bool {
        self.active && self.trajectory.destroy_time() > self.last_update
    }

    pub(crate) fn set_velocity(&mut self, t: f64, v: DVec2) -> Result<(), TrajectoryError> {
        self.trajectory.set_velocity(t, v)?;
        self.last_update = t;
        Ok(())
    }

    pub(crate) fn touch(&mut self, t: f64) {
        self.last_update = self.last_update.max(t);
    }

    pub(crate) fn deactivate(&mut self, t: f64) -> Result<(), TrajectoryError> {
        self.trajectory.destroy(t)?;
        self.active = false;
        self.last_update = t;
        Ok(())
    }

    pub(crate) fn trajectory_mut(&mut self) -> &mut Trajectory {
        &mut self.trajectory
    }
}
