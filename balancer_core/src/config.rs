//! Configuration types for the balancing controller.
//!
//! These are the runtime configuration structs used by `BalancingController`.
//! They are separate from the TOML-deserialized config in `balancer_config`.

use std::time::Duration;

use balancer_traits::Axis;

/// Offsets and per-axis activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerCfg {
    /// Grid exchange the active axis steers toward (W).
    pub active_power_offset: i64,
    /// Grid exchange the reactive axis steers toward (var).
    pub reactive_power_offset: i64,
    pub active_power_activated: bool,
    pub reactive_power_activated: bool,
}

impl Default for ControllerCfg {
    fn default() -> Self {
        Self {
            active_power_offset: 0,
            reactive_power_offset: 0,
            active_power_activated: true,
            reactive_power_activated: true,
        }
    }
}

impl ControllerCfg {
    pub fn activated(&self, axis: Axis) -> bool {
        match axis {
            Axis::Active => self.active_power_activated,
            Axis::Reactive => self.reactive_power_activated,
        }
    }
}

/// A single configuration value changing at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigChange {
    ActivePowerOffset(i64),
    ReactivePowerOffset(i64),
    ActivePowerActivated(bool),
    ReactivePowerActivated(bool),
}

impl ConfigChange {
    /// Changes needed to go from `old` to `new`, in field order.
    pub fn diff(old: &ControllerCfg, new: &ControllerCfg) -> Vec<ConfigChange> {
        let mut out = Vec::new();
        if old.active_power_offset != new.active_power_offset {
            out.push(ConfigChange::ActivePowerOffset(new.active_power_offset));
        }
        if old.reactive_power_offset != new.reactive_power_offset {
            out.push(ConfigChange::ReactivePowerOffset(new.reactive_power_offset));
        }
        if old.active_power_activated != new.active_power_activated {
            out.push(ConfigChange::ActivePowerActivated(new.active_power_activated));
        }
        if old.reactive_power_activated != new.reactive_power_activated {
            out.push(ConfigChange::ReactivePowerActivated(
                new.reactive_power_activated,
            ));
        }
        out
    }
}

/// Scheduling parameters for `runner::run`.
#[derive(Debug, Clone)]
pub struct RunParams {
    /// Tick cadence.
    pub period: Duration,
    /// Stop after this many ticks (None = until shutdown).
    pub max_ticks: Option<u64>,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(1000),
            max_ticks: None,
        }
    }
}
