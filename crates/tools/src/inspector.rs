use glam::DVec2;
use lightcone_common::{EntityId, EntityKind, Team};
use lightcone_kernel::World;
use std::fmt;

/// World inspector for developer tooling.
///
/// Provides read-only queries against the world state for debugging and
/// command-line output.
pub struct WorldInspector;

impl WorldInspector {
    /// Produce a summary of the world state.
    pub fn summary(world: &World) -> WorldSummary {
        WorldSummary {
            now: world.now(),
            speed_of_light: world.speed_of_light(),
            entity_count: world.entity_count(),
            active_count: world.active_count(),
            player_count: world
                .entities()
                .filter(|e| *e.kind() == EntityKind::Player)
                .count(),
        }
    }

    /// Sample one entity's trajectory at `t`.
    pub fn inspect_entity(world: &World, id: &EntityId, t: f64) -> Option<EntityInfo> {
        world.get(id).map(|e| {
            let traj = e.trajectory();
            EntityInfo {
                id: id.clone(),
                kind: e.kind().clone(),
                team: e.team().clone(),
                active: e.is_active(),
                t,
                exists: traj.exists(t),
                position: traj.position_at(t),
                velocity: traj.velocity_at(t),
                label: traj.state_at(t).map(|tag| tag.to_string()),
                segments: traj.states().len(),
            }
        })
    }

    /// List all entity ids in insertion order.
    pub fn list_entities(world: &World) -> Vec<EntityId> {
        world.entities().map(|e| e.id().clone()).collect()
    }

    /// Sample the horizon on a `steps × steps` lattice spanning `[min, max]`.
    pub fn horizon_grid(world: &World, min: DVec2, max: DVec2, steps: usize) -> HorizonGrid {
        let steps = steps.max(2);
        let horizon = world.horizon();
        let span = (max - min) / (steps - 1) as f64;
        let values = (0..steps)
            .flat_map(|row| (0..steps).map(move |col| (row, col)))
            .map(|(row, col)| horizon.at(min + DVec2::new(col as f64, row as f64) * span))
            .collect();
        HorizonGrid {
            min,
            max,
            steps,
            values,
        }
    }
}

/// Summary of world state for the inspector.
#[derive(Debug, Clone)]
pub struct WorldSummary {
    pub now: f64,
    pub speed_of_light: f64,
    pub entity_count: usize,
    pub active_count: usize,
    pub player_count: usize,
}

impl fmt::Display for WorldSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "World: now={:.3} c={} entities={} active={} players={}",
            self.now, self.speed_of_light, self.entity_count, self.active_count, self.player_count
        )
    }
}

/// One entity sampled at a single time.
#[derive(Debug, Clone)]
pub struct EntityInfo {
    pub id: EntityId,
    pub kind: EntityKind,
    pub team: Team,
    pub active: bool,
    pub t: f64,
    pub exists: bool,
    pub position: Option<DVec2>,
    pub velocity: Option<DVec2>,
    pub label: Option<String>,
    pub segments: usize,
}

impl fmt::Display for EntityInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity [{}] team={} t={:.3}", self.id, self.team, self.t)?;
        match (self.position, self.velocity) {
            (Some(p), Some(v)) => write!(
                f,
                " pos=({:.2}, {:.2}) vel=({:.2}, {:.2})",
                p.x, p.y, v.x, v.y
            )?,
            _ => f.write_str(" (not present)")?,
        }
        if let Some(label) = &self.label {
            write!(f, " state={label}")?;
        }
        write!(
            f,
            " segments={}{}",
            self.segments,
            if self.active { "" } else { " inactive" }
        )
    }
}

/// Horizon values sampled row-major over a square lattice.
#[derive(Debug, Clone)]
pub struct HorizonGrid {
    pub min: DVec2,
    pub max: DVec2,
    pub steps: usize,
    pub values: Vec<f64>,
}

impl HorizonGrid {
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        (row < self.steps && col < self.steps).then(|| self.values[row * self.steps + col])
    }

    /// Earliest horizon value on the lattice.
    pub fn earliest(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }
}

impl fmt::Display for HorizonGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.values.chunks(self.steps).rev() {
            let line: Vec<String> = row
                .iter()
                .map(|h| {
                    if h.is_finite() {
                        format!("{h:6.2}")
                    } else {
                        format!("{:>6}", "inf")
                    }
                })
                .collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}
