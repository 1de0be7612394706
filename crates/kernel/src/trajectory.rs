//! Piecewise-linear motion history of a single entity.
//!
//! A trajectory is an ordered list of [`State`] segments. Each segment is valid
//! from its start time until the next one begins, and the position inside it is
//! extrapolated linearly, so any time in the trajectory's lifetime can be
//! queried analytically without per-tick snapshots.

use glam::DVec2;
use lightcone_common::{MOTION_EPSILON, Tag, l1_distance};
use serde::{Deserialize, Serialize};

/// Errors from trajectory mutations. A failed mutation leaves the trajectory
/// unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrajectoryError {
    #[error("time {t} is outside the trajectory lifetime [{create_time}, {destroy_time}]")]
    OutOfRange {
        t: f64,
        create_time: f64,
        destroy_time: f64,
    },
    #[error("time {t} precedes the trailing segment at {last}")]
    NonMonotonic { t: f64, last: f64 },
    #[error("trajectory has no segments")]
    Empty,
    #[error("segment {index} starts before its predecessor")]
    Unordered { index: usize },
}

/// A linear motion segment starting at `t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub t: f64,
    pub x: DVec2,
    pub v: DVec2,
    #[serde(rename = "s", default, with = "label")]
    pub label: Option<Tag>,
}

impl State {
    /// An empty label is stored as no label, which is how it reads back.
    pub fn new(t: f64, x: DVec2, v: DVec2, label: Option<Tag>) -> Self {
        let label = label.filter(|l| !l.is_empty());
        Self { t, x, v, label }
    }

    /// Position reached at `t` when following this segment's velocity.
    pub fn position_at(&self, t: f64) -> DVec2 {
        self.x + (t - self.t) * self.v
    }

    /// A segment is redundant when continuing `prev` would reproduce it.
    fn is_redundant_after(&self, prev: &State) -> bool {
        l1_distance(self.v, prev.v) <= MOTION_EPSILON
            && self.label == prev.label
            && l1_distance(prev.position_at(self.t), self.x) <= MOTION_EPSILON
    }
}

/// The "no label" case is written as an empty string.
mod label {
    use lightcone_common::Tag;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(label: &Option<Tag>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(label.as_ref().map_or("", Tag::as_str))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Tag>, D::Error> {
        let raw = Option::<String>::deserialize(d)?;
        Ok(raw.filter(|s| !s.is_empty()).map(Tag))
    }
}

/// Ordered motion history with a creation and (optional) destruction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTrajectory")]
pub struct Trajectory {
    states: Vec<State>,
    create_time: f64,
    #[serde(skip_serializing_if = "is_unbounded")]
    destroy_time: f64,
}

fn is_unbounded(t: &f64) -> bool {
    t.is_infinite()
}

/// Wire form accepted on input. A missing, `null` or zero `destroyTime`
/// means the trajectory was never destroyed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTrajectory {
    states: Vec<State>,
    create_time: f64,
    #[serde(default)]
    destroy_time: Option<f64>,
}

impl TryFrom<RawTrajectory> for Trajectory {
    type Error = TrajectoryError;

    fn try_from(raw: RawTrajectory) -> Result<Self, Self::Error> {
        if raw.states.is_empty() {
            return Err(TrajectoryError::Empty);
        }
        if let Some(index) = raw.states.windows(2).position(|w| w[1].t < w[0].t) {
            return Err(TrajectoryError::Unordered { index: index + 1 });
        }
        let destroy_time = match raw.destroy_time {
            Some(t) if t != 0.0 => t,
            _ => f64::INFINITY,
        };
        Ok(Self {
            states: raw.states,
            create_time: raw.create_time,
            destroy_time,
        })
    }
}

impl Trajectory {
    /// Start a trajectory at `t` with a single segment.
    pub fn new(t: f64, x: DVec2, v: DVec2, label: Option<Tag>) -> Self {
        Self {
            states: vec![State::new(t, x, v, label)],
            create_time: t,
            destroy_time: f64::INFINITY,
        }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn create_time(&self) -> f64 {
        self.create_time
    }

    /// `+∞` until [`Trajectory::destroy`] is called.
    pub fn destroy_time(&self) -> f64 {
        self.destroy_time
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroy_time.is_finite()
    }

    pub fn exists(&self, t: f64) -> bool {
        t >= self.create_time && t <= self.destroy_time
    }

    /// Segment in effect at `t`: the last one starting at or before `t`.
    fn segment_at(&self, t: f64) -> Option<&State> {
        if !self.exists(t) {
            return None;
        }
        let idx = self.states.partition_point(|s| s.t <= t);
        idx.checked_sub(1).map(|i| &self.states[i])
    }

    pub fn state_at(&self, t: f64) -> Option<&Tag> {
        self.segment_at(t)?.label.as_ref()
    }

    pub fn position_at(&self, t: f64) -> Option<DVec2> {
        self.segment_at(t).map(|s| s.position_at(t))
    }

    pub fn velocity_at(&self, t: f64) -> Option<DVec2> {
        self.segment_at(t).map(|s| s.v)
    }

    fn out_of_range(&self, t: f64) -> TrajectoryError {
        TrajectoryError::OutOfRange {
            t,
            create_time: self.create_time,
            destroy_time: self.destroy_time,
        }
    }

    /// Trailing segment, provided an append at `t` keeps the order intact.
    fn trailing_before(&self, t: f64) -> Result<&State, TrajectoryError> {
        if !self.exists(t) {
            return Err(self.out_of_range(t));
        }
        let last = self.states.last().ok_or(TrajectoryError::Empty)?;
        if t < last.t {
            return Err(TrajectoryError::NonMonotonic { t, last: last.t });
        }
        Ok(last)
    }

    /// Change velocity at `t`, continuing from the extrapolated position.
    pub fn set_velocity(&mut self, t: f64, v: DVec2) -> Result<(), TrajectoryError> {
        let last = self.trailing_before(t)?;
        let next = State::new(t, last.position_at(t), v, last.label.clone());
        self.states.push(next);
        compress_states(&mut self.states);
        Ok(())
    }

    /// Stamp `label` onto every segment from `t` onwards, splitting the
    /// segment in effect at `t` when no segment starts exactly there. An
    /// empty label clears the label instead.
    pub fn set_state(&mut self, t: f64, label: Tag) -> Result<(), TrajectoryError> {
        let Some(active) = self.segment_at(t).cloned() else {
            return Err(self.out_of_range(t));
        };
        let label = Some(label).filter(|l| !l.is_empty());
        let idx = self.states.partition_point(|s| s.t < t);
        for state in &mut self.states[idx..] {
            state.label = label.clone();
        }
        if self.states.get(idx).is_none_or(|s| s.t != t) {
            let split = State::new(t, active.position_at(t), active.v, label);
            self.states.insert(idx, split);
        }
        compress_states(&mut self.states);
        Ok(())
    }

    /// Append an explicit segment with no continuity requirement.
    pub fn set_full(
        &mut self,
        t: f64,
        x: DVec2,
        v: DVec2,
        label: Option<Tag>,
    ) -> Result<(), TrajectoryError> {
        self.trailing_before(t)?;
        self.states.push(State::new(t, x, v, label));
        compress_states(&mut self.states);
        Ok(())
    }

    /// Close the trajectory at `t`: later segments are dropped and the entity
    /// rests at its position at `t` with the label in effect there.
    pub fn destroy(&mut self, t: f64) -> Result<(), TrajectoryError> {
        let Some(active) = self.segment_at(t) else {
            return Err(self.out_of_range(t));
        };
        let x = active.position_at(t);
        let label = active.label.clone();

        let keep = self.states.partition_point(|s| s.t < t);
        self.states.truncate(keep);
        compress_states(&mut self.states);
        self.states.push(State::new(t, x, DVec2::ZERO, label));
        compress_states(&mut self.states);
        self.destroy_time = t;
        Ok(())
    }
}

/// Drop trailing segments that merely continue their predecessor.
fn compress_states(states: &mut Vec<State>) {
    while let [.., prev, last] = states.as_slice() {
        if !last.is_redundant_after(prev) {
            break;
        }
        states.pop();
    }
}
