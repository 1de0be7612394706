use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Process-wide monotonic time source consumed by the world.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Clock advanced explicitly by its owner. Never moves backwards.
///
/// Stores the `f64` bit pattern in an atomic so it can be shared between the
/// world and whatever drives time forward.
#[derive(Debug)]
pub struct ManualClock {
    bits: AtomicU64,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            bits: AtomicU64::new(start.to_bits()),
        }
    }

    /// Move the clock to `t`. Earlier times are ignored.
    pub fn set(&self, t: f64) {
        let _ = self
            .bits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (t > f64::from_bits(cur)).then_some(t.to_bits())
            });
    }

    pub fn advance(&self, dt: f64) {
        if dt > 0.0 {
            self.set(self.now() + dt);
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

/// Wall-clock seconds elapsed since construction, offset by `origin`.
#[derive(Debug)]
pub struct MonotonicClock {
    start: Instant,
    origin: f64,
}

impl MonotonicClock {
    pub fn new(origin: f64) -> Self {
        Self {
            start: Instant::now(),
            origin,
        }
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> f64 {
        self.origin + self.start.elapsed().as_secs_f64()
    }
}
