//! Test and helper mocks for balancer_core

use balancer_traits::{Axis, BoxError, DispatchSink, Meter, Storage};

use crate::error::BalanceError;

/// Meter returning fixed readings; `offline` makes every read fail.
#[derive(Debug, Default, Clone)]
pub struct FixedMeter {
    pub active: i64,
    pub reactive: i64,
    pub offline: bool,
}

impl FixedMeter {
    pub fn new(active: i64, reactive: i64) -> Self {
        Self {
            active,
            reactive,
            offline: false,
        }
    }
}

impl Meter for FixedMeter {
    fn active_power(&mut self) -> Result<i64, BoxError> {
        if self.offline {
            return Err(Box::new(BalanceError::Unavailable("meter active power".into())));
        }
        Ok(self.active)
    }

    fn reactive_power(&mut self) -> Result<i64, BoxError> {
        if self.offline {
            return Err(Box::new(BalanceError::Unavailable(
                "meter reactive power".into(),
            )));
        }
        Ok(self.reactive)
    }
}

/// Storage with fixed readings that records every setpoint it receives.
///
/// `fail_read` names a reading ("active", "reactive", "allowed_charge",
/// "allowed_discharge", "write_min", "write_max") that fails; `reject_writes`
/// refuses all setpoints.
#[derive(Debug, Clone)]
pub struct RecordingStorage {
    pub id: String,
    pub active: i64,
    pub reactive: i64,
    pub allowed_charge: u64,
    pub allowed_discharge: u64,
    pub write_min: Option<i64>,
    pub write_max: Option<i64>,
    pub fail_read: Option<&'static str>,
    pub reject_writes: bool,
    /// Accepted setpoints in call order.
    pub writes: Vec<(Axis, i64)>,
}

impl Default for RecordingStorage {
    fn default() -> Self {
        Self {
            id: "ess0".to_string(),
            active: 0,
            reactive: 0,
            allowed_charge: 10_000,
            allowed_discharge: 10_000,
            write_min: None,
            write_max: None,
            fail_read: None,
            reject_writes: false,
            writes: Vec::new(),
        }
    }
}

impl RecordingStorage {
    fn read<T>(&self, name: &'static str, value: T) -> Result<T, BoxError> {
        if self.fail_read == Some(name) {
            return Err(Box::new(BalanceError::Unavailable(format!("storage {name}"))));
        }
        Ok(value)
    }

    fn write(&mut self, axis: Axis, value: i64) -> Result<(), BoxError> {
        if self.reject_writes {
            return Err(Box::new(BalanceError::WriteRejected {
                axis,
                value,
                reason: "rejected by mock".into(),
            }));
        }
        self.writes.push((axis, value));
        Ok(())
    }

    /// Accepted setpoints for one axis, in call order.
    pub fn writes_for(&self, axis: Axis) -> Vec<i64> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == axis)
            .map(|(_, v)| *v)
            .collect()
    }
}

impl DispatchSink for RecordingStorage {
    fn set_active_power(&mut self, watts: i64) -> Result<(), BoxError> {
        self.write(Axis::Active, watts)
    }

    fn set_reactive_power(&mut self, var: i64) -> Result<(), BoxError> {
        self.write(Axis::Reactive, var)
    }

    fn write_min(&mut self) -> Result<Option<i64>, BoxError> {
        self.read("write_min", self.write_min)
    }

    fn write_max(&mut self) -> Result<Option<i64>, BoxError> {
        self.read("write_max", self.write_max)
    }

    fn last_setpoint(&self, axis: Axis) -> Option<i64> {
        self.writes
            .iter()
            .rev()
            .find(|(a, _)| *a == axis)
            .map(|(_, v)| *v)
    }
}

impl Storage for RecordingStorage {
    fn id(&self) -> &str {
        &self.id
    }

    fn active_power(&mut self) -> Result<i64, BoxError> {
        self.read("active", self.active)
    }

    fn reactive_power(&mut self) -> Result<i64, BoxError> {
        self.read("reactive", self.reactive)
    }

    fn allowed_charge(&mut self) -> Result<u64, BoxError> {
        self.read("allowed_charge", self.allowed_charge)
    }

    fn allowed_discharge(&mut self) -> Result<u64, BoxError> {
        self.read("allowed_discharge", self.allowed_discharge)
    }
}
