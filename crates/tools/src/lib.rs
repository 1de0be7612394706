//! Developer Tooling: read-only inspection of the causal world.
//!
//! # Invariants
//! - Tools never mutate the world they inspect.

mod inspector;

pub use inspector::{EntityInfo, HorizonGrid, WorldInspector, WorldSummary};
