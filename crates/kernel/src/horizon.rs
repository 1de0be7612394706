use glam::DVec2;
use lightcone_common::SpacetimePoint;

/// Earliest arrival time of any committed update at a point in the plane.
///
/// Built from the last committed update of every live entity. `at(p)` is the
/// minimum over those sources of `t + |p - x| / c`, or `+∞` with no sources.
/// The value is a min-reduction and does not depend on source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Horizon {
    sources: Vec<SpacetimePoint>,
    speed_of_light: f64,
}

impl Horizon {
    pub fn new(sources: Vec<SpacetimePoint>, speed_of_light: f64) -> Self {
        Self {
            sources,
            speed_of_light,
        }
    }

    pub fn sources(&self) -> &[SpacetimePoint] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn at(&self, p: DVec2) -> f64 {
        self.sources
            .iter()
            .map(|s| s.arrival_time(p, self.speed_of_light))
            .fold(f64::INFINITY, f64::min)
    }
}
