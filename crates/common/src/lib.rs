//! Shared types and spacetime math for the lightcone world core.
//!
//! # Invariants
//! - Distances are Euclidean in the plane; the spacetime interval uses a
//!   single signal speed `c` supplied by the caller.

pub mod spacetime;
pub mod types;

pub use glam::DVec2;
pub use spacetime::{MOTION_EPSILON, SPEED_TOLERANCE, SpacetimePoint, l1_distance};
pub use types::{EntityId, EntityKind, Tag, Team};
