//! World Kernel: authoritative causal world state.
//!
//! Entities move along analytically-evaluable [`Trajectory`]s. The [`World`]
//! admits an event only when it lies inside the issuing player's future light
//! cone and respects the speed caps, applies it to the trajectory, and exposes
//! the causal [`Horizon`] separating settled state from state still open to
//! revision.
//!
//! # Invariants
//! - All state mutations flow through explicit operations.
//! - Trajectory segments stay ordered by start time.
//! - No registered entity is ever removed; departure only deactivates it.
//! - Validation never mutates the world.

pub mod clock;
pub mod config;
pub mod entity;
pub mod event;
pub mod horizon;
pub mod trajectory;
pub mod world;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::WorldConfig;
pub use entity::{Entity, EntitySpec};
pub use event::{Event, EventRejection};
pub use horizon::Horizon;
pub use trajectory::{State, Trajectory, TrajectoryError};
pub use world::{NoReconcile, Reconciler, World, WorldError, WorldRecord};
