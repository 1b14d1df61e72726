//! Per-axis enable flag with an edge-triggered zero command.

use balancer_traits::{Axis, DispatchSink};

use crate::error::Result;
use crate::hw_error::map_write_error;

/// Outcome of `AxisGate::set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    Unchanged,
    Enabled,
    /// The axis went from enabled to disabled and a zero setpoint was sent.
    Disabled,
}

/// Enable flag for one power axis. Starts enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisGate {
    axis: Axis,
    enabled: bool,
}

impl AxisGate {
    pub fn new(axis: Axis) -> Self {
        Self {
            axis,
            enabled: true,
        }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn get(&self) -> bool {
        self.enabled
    }

    /// Update the flag. On an enabled → disabled edge, command zero power on
    /// this axis through `sink`.
    ///
    /// The new state is kept even when the zero command fails; the error is
    /// returned for reporting.
    pub fn set<D: DispatchSink + ?Sized>(
        &mut self,
        enabled: bool,
        sink: &mut D,
    ) -> Result<GateTransition> {
        let previous = std::mem::replace(&mut self.enabled, enabled);
        match (previous, enabled) {
            (true, false) => {
                tracing::info!(axis = %self.axis, "axis disabled, commanding zero power");
                sink.set_power(self.axis, 0)
                    .map_err(|e| eyre::Report::new(map_write_error(self.axis, 0, &*e)))?;
                Ok(GateTransition::Disabled)
            }
            (false, true) => {
                tracing::info!(axis = %self.axis, "axis enabled");
                Ok(GateTransition::Enabled)
            }
            _ => Ok(GateTransition::Unchanged),
        }
    }
}
