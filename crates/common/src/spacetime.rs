use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Tolerance used when deciding whether two motion segments are redundant.
pub const MOTION_EPSILON: f64 = 1e-6;

/// Tolerance applied to speed-cap comparisons during event validation.
pub const SPEED_TOLERANCE: f64 = 1e-4;

/// Manhattan distance between two points.
pub fn l1_distance(a: DVec2, b: DVec2) -> f64 {
    (a - b).abs().element_sum()
}

/// An event location in 2+1 dimensional spacetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpacetimePoint {
    pub x: DVec2,
    pub t: f64,
}

impl SpacetimePoint {
    pub fn new(x: DVec2, t: f64) -> Self {
        Self { x, t }
    }

    /// Squared Minkowski separation `|Δx|² − c²Δt²` between two events.
    ///
    /// Non-positive values mean `other` lies inside or on the light cone of
    /// `self`; positive values are spacelike separations.
    pub fn interval2(&self, other: &SpacetimePoint, c: f64) -> f64 {
        let dt = other.t - self.t;
        self.x.distance_squared(other.x) - c * c * dt * dt
    }

    /// Whether `other` is in the future light cone of `self` (boundary included).
    pub fn reaches(&self, other: &SpacetimePoint, c: f64) -> bool {
        other.t >= self.t && self.interval2(other, c) <= 0.0
    }

    /// Earliest time a signal leaving this event can arrive at `p`.
    pub fn arrival_time(&self, p: DVec2, c: f64) -> f64 {
        self.t + self.x.distance(p) / c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn interval_is_symmetric_in_time_direction() {
        let a = SpacetimePoint::new(DVec2::ZERO, 0.0);
        let b = SpacetimePoint::new(DVec2::new(3.0, 4.0), 2.0);
        assert_relative_eq!(a.interval2(&b, 1.0), 25.0 - 4.0);
        assert_relative_eq!(b.interval2(&a, 1.0), 25.0 - 4.0);
    }

    #[test]
    fn light_cone_boundary_is_reachable() {
        let a = SpacetimePoint::new(DVec2::ZERO, 0.0);
        let edge = SpacetimePoint::new(DVec2::new(2.0, 0.0), 1.0);
        assert!(a.reaches(&edge, 2.0));
        assert!(!a.reaches(&edge, 1.0));
    }

    #[test]
    fn past_events_are_not_reachable() {
        let a = SpacetimePoint::new(DVec2::ZERO, 5.0);
        let b = SpacetimePoint::new(DVec2::ZERO, 1.0);
        assert!(!a.reaches(&b, 1.0));
    }

    #[test]
    fn arrival_time_scales_with_signal_speed() {
        let a = SpacetimePoint::new(DVec2::new(1.0, 1.0), 10.0);
        assert_relative_eq!(a.arrival_time(DVec2::new(4.0, 5.0), 2.5), 12.0);
    }

    #[test]
    fn l1_distance_sums_axes() {
        assert_relative_eq!(l1_distance(DVec2::new(1.0, -1.0), DVec2::new(-1.0, 2.0)), 5.0);
    }
}
