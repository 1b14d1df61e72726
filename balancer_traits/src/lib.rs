//! Collaborator traits for the balancing controller.
//!
//! Power quantities are signed integers in W (active) or var (reactive).
//! Sign convention: positive = grid import on the meter, discharge on the storage,
//! so the two readings can be added to obtain the site's net demand.
pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// Error type crossing the collaborator boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// One of the two independently controlled power dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Active,
    Reactive,
}

impl Axis {
    pub fn name(self) -> &'static str {
        match self {
            Axis::Active => "active",
            Axis::Reactive => "reactive",
        }
    }
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Grid connection point meter.
pub trait Meter {
    fn active_power(&mut self) -> Result<i64, BoxError>;
    fn reactive_power(&mut self) -> Result<i64, BoxError>;
}

/// Setpoint side of a storage device.
///
/// Writes may be rejected (e.g. out of range). `write_min`/`write_max` expose
/// externally imposed bounds on the active setpoint, when any are in force.
pub trait DispatchSink {
    fn set_active_power(&mut self, watts: i64) -> Result<(), BoxError>;
    fn set_reactive_power(&mut self, var: i64) -> Result<(), BoxError>;
    fn write_min(&mut self) -> Result<Option<i64>, BoxError>;
    fn write_max(&mut self) -> Result<Option<i64>, BoxError>;
    /// Last setpoint accepted on `axis`, if any.
    fn last_setpoint(&self, axis: Axis) -> Option<i64>;

    /// Route a setpoint to the method for `axis`.
    fn set_power(&mut self, axis: Axis, value: i64) -> Result<(), BoxError> {
        match axis {
            Axis::Active => self.set_active_power(value),
            Axis::Reactive => self.set_reactive_power(value),
        }
    }
}

/// Energy storage system: measurements, capability and setpoint sink.
pub trait Storage: DispatchSink {
    fn id(&self) -> &str;
    fn active_power(&mut self) -> Result<i64, BoxError>;
    fn reactive_power(&mut self) -> Result<i64, BoxError>;
    /// Charge power the device can currently absorb (W, non-negative).
    fn allowed_charge(&mut self) -> Result<u64, BoxError>;
    /// Discharge power the device can currently deliver (W, non-negative).
    fn allowed_discharge(&mut self) -> Result<u64, BoxError>;
}

impl<M: Meter + ?Sized> Meter for Box<M> {
    fn active_power(&mut self) -> Result<i64, BoxError> {
        (**self).active_power()
    }
    fn reactive_power(&mut self) -> Result<i64, BoxError> {
        (**self).reactive_power()
    }
}

impl<S: DispatchSink + ?Sized> DispatchSink for Box<S> {
    fn set_active_power(&mut self, watts: i64) -> Result<(), BoxError> {
        (**self).set_active_power(watts)
    }
    fn set_reactive_power(&mut self, var: i64) -> Result<(), BoxError> {
        (**self).set_reactive_power(var)
    }
    fn write_min(&mut self) -> Result<Option<i64>, BoxError> {
        (**self).write_min()
    }
    fn write_max(&mut self) -> Result<Option<i64>, BoxError> {
        (**self).write_max()
    }
    fn last_setpoint(&self, axis: Axis) -> Option<i64> {
        (**self).last_setpoint(axis)
    }
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn id(&self) -> &str {
        (**self).id()
    }
    fn active_power(&mut self) -> Result<i64, BoxError> {
        (**self).active_power()
    }
    fn reactive_power(&mut self) -> Result<i64, BoxError> {
        (**self).reactive_power()
    }
    fn allowed_charge(&mut self) -> Result<u64, BoxError> {
        (**self).allowed_charge()
    }
    fn allowed_discharge(&mut self) -> Result<u64, BoxError> {
        (**self).allowed_discharge()
    }
}
