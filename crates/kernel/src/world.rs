use glam::DVec2;
use indexmap::IndexMap;
use indexmap::map::Entry;
use lightcone_common::{EntityId, EntityKind, SPEED_TOLERANCE, SpacetimePoint, Tag, Team};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clock::{Clock, ManualClock};
use crate::config::WorldConfig;
use crate::entity::{Entity, EntitySpec};
use crate::event::{Event, EventRejection};
use crate::horizon::Horizon;
use crate::trajectory::TrajectoryError;

/// Errors from world mutations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),
    #[error("entity {0} already exists")]
    DuplicateEntity(EntityId),
    #[error("entity {id} does not exist at t={t}")]
    NotExisting { id: EntityId, t: f64 },
    #[error("trajectory of {id}: {source}")]
    Trajectory {
        id: EntityId,
        source: TrajectoryError,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Hook run after every applied event with the horizon before and after it.
///
/// This is where state that moved across the horizon gets reconciled. While
/// the hook runs, the world's own slot holds [`NoReconcile`], so events applied
/// from inside the hook are not reconciled again.
pub trait Reconciler: Send {
    fn reconcile(&mut self, world: &mut World, old: &Horizon, new: &Horizon);
}

/// Default hook: leaves the world untouched.
#[derive(Debug, Default)]
pub struct NoReconcile;

impl Reconciler for NoReconcile {
    fn reconcile(&mut self, _world: &mut World, _old: &Horizon, _new: &Horizon) {}
}

/// Serializable form of a world: constants, clock reading and all entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldRecord {
    pub speed_of_light: f64,
    #[serde(rename = "maxRTT")]
    pub max_rtt: f64,
    pub player_speed: f64,
    pub bullet_speed: f64,
    #[serde(default, skip_serializing)]
    pub debug_trace: bool,
    pub now: f64,
    pub entities: Vec<Entity>,
}

/// The authoritative causal world.
///
/// Owns every entity in a single insertion-ordered map, validates events
/// against the issuing entity's light cone and applies them to trajectories.
/// Entities are deactivated, never removed, so history stays queryable.
pub struct World {
    speed_of_light: f64,
    max_rtt: f64,
    player_speed: f64,
    bullet_speed: f64,
    debug_trace: bool,
    entities: IndexMap<EntityId, Entity>,
    clock: Arc<dyn Clock>,
    reconciler: Box<dyn Reconciler>,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("speed_of_light", &self.speed_of_light)
            .field("max_rtt", &self.max_rtt)
            .field("player_speed", &self.player_speed)
            .field("bullet_speed", &self.bullet_speed)
            .field("now", &self.clock.now())
            .field("entities", &self.entities.len())
            .finish_non_exhaustive()
    }
}

impl World {
    /// Create an empty world reading time from `clock`.
    pub fn new(config: &WorldConfig, clock: Arc<dyn Clock>) -> Result<Self, WorldError> {
        config.validate()?;
        Ok(Self {
            speed_of_light: config.speed_of_light,
            max_rtt: config.max_rtt,
            player_speed: config.player_speed(),
            bullet_speed: config.bullet_speed(),
            debug_trace: config.debug_trace,
            entities: IndexMap::new(),
            clock,
            reconciler: Box::new(NoReconcile),
        })
    }

    /// Rebuild a world from its record with a manual clock set to `record.now`.
    pub fn from_record(record: WorldRecord) -> Result<Self, WorldError> {
        let clock = Arc::new(ManualClock::new(record.now));
        Self::from_record_with_clock(record, clock)
    }

    pub fn from_record_with_clock(
        record: WorldRecord,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, WorldError> {
        let config = WorldConfig {
            speed_of_light: record.speed_of_light,
            max_rtt: record.max_rtt,
            player_speed: Some(record.player_speed),
            bullet_speed: Some(record.bullet_speed),
            debug_trace: record.debug_trace,
        };
        let mut world = Self::new(&config, clock)?;
        for entity in record.entities {
            match world.entities.entry(entity.id().clone()) {
                Entry::Occupied(o) => return Err(WorldError::DuplicateEntity(o.key().clone())),
                Entry::Vacant(v) => {
                    v.insert(entity);
                }
            }
        }
        Ok(world)
    }

    pub fn to_record(&self) -> WorldRecord {
        WorldRecord {
            speed_of_light: self.speed_of_light,
            max_rtt: self.max_rtt,
            player_speed: self.player_speed,
            bullet_speed: self.bullet_speed,
            debug_trace: self.debug_trace,
            now: self.clock.now(),
            entities: self.entities.values().cloned().collect(),
        }
    }

    /// Replace the reconciliation hook run by [`World::handle_event`].
    pub fn set_reconciler(&mut self, reconciler: Box<dyn Reconciler>) {
        self.reconciler = reconciler;
    }

    pub fn speed_of_light(&self) -> f64 {
        self.speed_of_light
    }

    pub fn max_rtt(&self) -> f64 {
        self.max_rtt
    }

    pub fn player_speed(&self) -> f64 {
        self.player_speed
    }

    pub fn bullet_speed(&self) -> f64 {
        self.bullet_speed
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn active_count(&self) -> usize {
        self.entities.values().filter(|e| e.is_active()).count()
    }

    /// Entities in insertion order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Register a new entity. Unset spec fields fall back to the clock's
    /// current time and a positional id.
    pub fn create_entity(&mut self, spec: EntitySpec) -> Result<&Entity, WorldError> {
        let t = spec.t.unwrap_or_else(|| self.clock.now());
        let id = spec
            .id
            .clone()
            .unwrap_or_else(|| EntityId::new(self.entities.len().to_string()));
        match self.entities.entry(id) {
            Entry::Occupied(o) => Err(WorldError::DuplicateEntity(o.key().clone())),
            Entry::Vacant(v) => {
                let entity = Entity::new(v.key().clone(), t, spec);
                debug!(id = %entity.id(), t, kind = ?entity.kind(), "entity created");
                Ok(&*v.insert(entity))
            }
        }
    }

    /// Spawn an active player one round trip in the future, on a team drawn
    /// from `rng`.
    pub fn create_player<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<&Entity, WorldError> {
        let team = if rng.random_bool(0.5) {
            Team::Red
        } else {
            Team::Blue
        };
        self.create_entity(EntitySpec {
            t: Some(self.clock.now() + self.max_rtt),
            kind: EntityKind::Player,
            team,
            active: true,
            ..EntitySpec::default()
        })
    }

    /// Deactivate `id` at `t`. Returns false, without mutation, when the
    /// entity is unknown or does not exist at `t`.
    pub fn destroy_entity(&mut self, t: f64, id: &EntityId) -> bool {
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        match entity.deactivate(t) {
            Ok(()) => {
                debug!(%id, t, "entity destroyed");
                true
            }
            Err(_) => false,
        }
    }

    /// Retroactively stamp `tag` onto the trajectory of `id` from `t` on.
    pub fn tag_entity(&mut self, id: &EntityId, t: f64, tag: Tag) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or_else(|| WorldError::UnknownEntity(id.clone()))?;
        entity
            .trajectory_mut()
            .set_state(t, tag)
            .map_err(|source| WorldError::Trajectory {
                id: id.clone(),
                source,
            })
    }

    /// Out-of-band resynchronisation: append an explicit segment to `id`.
    pub fn resync_entity(
        &mut self,
        id: &EntityId,
        t: f64,
        x: DVec2,
        v: DVec2,
        tag: Option<Tag>,
    ) -> Result<(), WorldError> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or_else(|| WorldError::UnknownEntity(id.clone()))?;
        entity
            .trajectory_mut()
            .set_full(t, x, v, tag)
            .map_err(|source| WorldError::Trajectory {
                id: id.clone(),
                source,
            })
    }

    /// Decide whether a player-issued event is physically admissible.
    pub fn check_event(&self, event: &Event) -> Result<(), EventRejection> {
        let (id, t, x, v) = match event {
            Event::Move { id, t, x, v } | Event::Shoot { id, t, x, v } => (id, *t, *x, *v),
            Event::Join { .. } | Event::Leave { .. } => {
                return Err(EventRejection::NotAdmissible(event.kind()));
            }
        };
        if !(t.is_finite() && x.is_finite() && v.is_finite()) {
            return Err(EventRejection::NonFinite(id.clone()));
        }

        let entity = self
            .entities
            .get(id)
            .ok_or_else(|| EventRejection::UnknownEntity(id.clone()))?;
        if *entity.kind() != EntityKind::Player {
            return Err(EventRejection::NotPlayer(id.clone()));
        }
        if !entity.trajectory().exists(t) {
            return Err(EventRejection::NotExisting { id: id.clone(), t });
        }

        let t0 = entity.last_update();
        if t0 < t {
            let x0 = entity
                .trajectory()
                .position_at(t0)
                .ok_or_else(|| EventRejection::NotExisting { id: id.clone(), t: t0 })?;
            let interval2 =
                SpacetimePoint::new(x0, t0).interval2(&SpacetimePoint::new(x, t), self.speed_of_light);
            if interval2.is_nan() || interval2 > 0.0 {
                return Err(EventRejection::CausalityViolation {
                    id: id.clone(),
                    t,
                    interval2,
                });
            }
        }

        let speed = v.length();
        match event {
            Event::Move { .. } if speed > self.player_speed + SPEED_TOLERANCE => {
                Err(EventRejection::SpeedCapExceeded {
                    speed,
                    cap: self.player_speed,
                })
            }
            Event::Shoot { .. } if (speed - self.bullet_speed).abs() > SPEED_TOLERANCE => {
                Err(EventRejection::BulletSpeedMismatch {
                    speed,
                    expected: self.bullet_speed,
                })
            }
            _ => Ok(()),
        }
    }

    /// [`World::check_event`] as a predicate; rejections are logged.
    pub fn validate_event(&self, event: &Event) -> bool {
        match self.check_event(event) {
            Ok(()) => true,
            Err(reason) => {
                if self.debug_trace {
                    info!(%reason, ?event, "event rejected");
                } else {
                    debug!(%reason, id = %event.id(), "event rejected");
                }
                false
            }
        }
    }

    /// Apply an event the caller has already validated, then hand the
    /// horizon before and after to the reconciliation hook.
    ///
    /// Admission is not re-checked here.
    pub fn handle_event(&mut self, event: &Event) -> Result<(), WorldError> {
        if self.debug_trace {
            info!(?event, "event");
        }

        let old_horizon = self.horizon();
        if let Err(e) = self.apply(event) {
            warn!(error = %e, kind = event.kind(), id = %event.id(), "event not applied");
            return Err(e);
        }
        let new_horizon = self.horizon();

        let mut reconciler = std::mem::replace(&mut self.reconciler, Box::new(NoReconcile));
        reconciler.reconcile(self, &old_horizon, &new_horizon);
        self.reconciler = reconciler;
        Ok(())
    }

    fn apply(&mut self, event: &Event) -> Result<(), WorldError> {
        match event {
            Event::Join { id, t, x, team } => {
                self.create_entity(EntitySpec {
                    id: Some(id.clone()),
                    t: Some(*t),
                    x: *x,
                    kind: EntityKind::Player,
                    team: team.clone(),
                    active: true,
                    ..EntitySpec::default()
                })?;
            }
            Event::Move { id, t, v, .. } => {
                let entity = self
                    .entities
                    .get_mut(id)
                    .ok_or_else(|| WorldError::UnknownEntity(id.clone()))?;
                entity
                    .set_velocity(*t, *v)
                    .map_err(|source| WorldError::Trajectory {
                        id: id.clone(),
                        source,
                    })?;
            }
            Event::Shoot { id, t, x, v } => {
                let team = self
                    .entities
                    .get(id)
                    .ok_or_else(|| WorldError::UnknownEntity(id.clone()))?
                    .team()
                    .clone();
                let bullet_id = EntityId::new(format!("{id}/{}", self.entities.len()));
                self.create_entity(EntitySpec {
                    id: Some(bullet_id),
                    t: Some(*t),
                    x: *x,
                    v: *v,
                    kind: EntityKind::Bullet,
                    team,
                    data: serde_json::json!({ "owner": id.as_str() }),
                    active: true,
                    ..EntitySpec::default()
                })?;
                if let Some(shooter) = self.entities.get_mut(id) {
                    shooter.touch(*t);
                }
            }
            Event::Leave { id, t } => {
                let entity = self
                    .entities
                    .get(id)
                    .ok_or_else(|| WorldError::UnknownEntity(id.clone()))?;
                if !entity.trajectory().exists(*t) {
                    return Err(WorldError::NotExisting { id: id.clone(), t: *t });
                }
                self.destroy_entity(*t, id);
            }
        }
        Ok(())
    }

    /// Horizon built from the last committed update of every live entity.
    pub fn horizon(&self) -> Horizon {
        let sources = self
            .entities
            .values()
            .filter(|e| e.is_live())
            .filter_map(|e| {
                let t = e.last_update();
                e.trajectory()
                    .position_at(t)
                    .map(|x| SpacetimePoint::new(x, t))
            })
            .collect();
        Horizon::new(sources, self.speed_of_light)
    }
}
