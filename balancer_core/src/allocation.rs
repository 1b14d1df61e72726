//! Power allocation: fitting a desired (active, reactive) pair into the
//! storage device's charge/discharge envelope.

/// Per-tick capability of the storage device.
///
/// `max_charge` is in charge direction (<= 0), `max_discharge` in discharge
/// direction (>= 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub max_charge: i64,
    pub max_discharge: i64,
}

impl Bounds {
    pub fn new(max_charge: i64, max_discharge: i64) -> Self {
        Self {
            max_charge,
            max_discharge,
        }
    }
}

/// Strategy converting desired powers into admissible setpoints.
///
/// Implementations must be deterministic, free of side effects and total for
/// any finite input (no panics, no division by zero).
pub trait PowerAllocator {
    fn allocate_active(&self, active: i64, reactive: i64, bounds: Bounds) -> i64;
    fn allocate_reactive(&self, active: i64, reactive: i64, bounds: Bounds) -> i64;
}

impl<A: PowerAllocator + ?Sized> PowerAllocator for &A {
    fn allocate_active(&self, active: i64, reactive: i64, bounds: Bounds) -> i64 {
        (**self).allocate_active(active, reactive, bounds)
    }
    fn allocate_reactive(&self, active: i64, reactive: i64, bounds: Bounds) -> i64 {
        (**self).allocate_reactive(active, reactive, bounds)
    }
}

impl<A: PowerAllocator + ?Sized> PowerAllocator for Box<A> {
    fn allocate_active(&self, active: i64, reactive: i64, bounds: Bounds) -> i64 {
        (**self).allocate_active(active, reactive, bounds)
    }
    fn allocate_reactive(&self, active: i64, reactive: i64, bounds: Bounds) -> i64 {
        (**self).allocate_reactive(active, reactive, bounds)
    }
}

/// Clips the apparent power `sqrt(p² + q²)` to the limit of the direction the
/// active power flows in, keeping the power factor.
///
/// - active > 0 (discharge): limit is `max_discharge`
/// - active < 0 (charge): limit is `|max_charge|`
/// - active == 0: the smaller of the two
///
/// Within the limit both components pass through unchanged. Scaled results are
/// truncated toward zero. Bounds pointing the wrong way count as a zero limit.
#[derive(Debug, Default, Clone, Copy)]
pub struct ApparentPowerLimiter;

impl ApparentPowerLimiter {
    fn limit(active: i64, bounds: Bounds) -> i64 {
        let charge = bounds.max_charge.saturating_neg().max(0);
        let discharge = bounds.max_discharge.max(0);
        match active.cmp(&0) {
            std::cmp::Ordering::Greater => discharge,
            std::cmp::Ordering::Less => charge,
            std::cmp::Ordering::Equal => charge.min(discharge),
        }
    }

    /// Both clipped components at once.
    pub fn clip(active: i64, reactive: i64, bounds: Bounds) -> (i64, i64) {
        let limit = Self::limit(active, bounds) as f64;
        let apparent = (active as f64).hypot(reactive as f64);
        if apparent <= limit {
            return (active, reactive);
        }
        // apparent > limit >= 0 here, so the ratio is finite and in [0, 1)
        let k = limit / apparent;
        ((active as f64 * k) as i64, (reactive as f64 * k) as i64)
    }
}

impl PowerAllocator for ApparentPowerLimiter {
    fn allocate_active(&self, active: i64, reactive: i64, bounds: Bounds) -> i64 {
        Self::clip(active, reactive, bounds).0
    }

    fn allocate_reactive(&self, active: i64, reactive: i64, bounds: Bounds) -> i64 {
        Self::clip(active, reactive, bounds).1
    }
}
