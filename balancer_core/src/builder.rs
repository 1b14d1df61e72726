//! Type-state builder for `BalancingController`.
//!
//! `build()` is only available once a meter and a storage have been provided;
//! the allocator defaults to `ApparentPowerLimiter`.

use balancer_traits::{Axis, Meter, Storage};

use crate::allocation::{ApparentPowerLimiter, PowerAllocator};
use crate::config::ControllerCfg;
use crate::controller::BalancingController;
use crate::error::{BuildError, Result};
use crate::gate::AxisGate;
use crate::window::{SampleWindow, WINDOW_CAPACITY};

/// Placeholder for a collaborator that has not been provided yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct Missing;

#[derive(Debug)]
pub struct ControllerBuilder<M, S, A> {
    meter: M,
    storage: S,
    allocator: A,
    config: ControllerCfg,
    window_capacity: usize,
}

impl Default for ControllerBuilder<Missing, Missing, ApparentPowerLimiter> {
    fn default() -> Self {
        Self {
            meter: Missing,
            storage: Missing,
            allocator: ApparentPowerLimiter,
            config: ControllerCfg::default(),
            window_capacity: WINDOW_CAPACITY,
        }
    }
}

impl<M, S, A> ControllerBuilder<M, S, A> {
    pub fn with_meter<M2: Meter>(self, meter: M2) -> ControllerBuilder<M2, S, A> {
        ControllerBuilder {
            meter,
            storage: self.storage,
            allocator: self.allocator,
            config: self.config,
            window_capacity: self.window_capacity,
        }
    }

    pub fn with_storage<S2: Storage>(self, storage: S2) -> ControllerBuilder<M, S2, A> {
        ControllerBuilder {
            meter: self.meter,
            storage,
            allocator: self.allocator,
            config: self.config,
            window_capacity: self.window_capacity,
        }
    }

    /// Replace the default `ApparentPowerLimiter`.
    pub fn with_allocator<A2: PowerAllocator>(self, allocator: A2) -> ControllerBuilder<M, S, A2> {
        ControllerBuilder {
            meter: self.meter,
            storage: self.storage,
            allocator,
            config: self.config,
            window_capacity: self.window_capacity,
        }
    }

    pub fn with_config(mut self, config: ControllerCfg) -> Self {
        self.config = config;
        self
    }

    /// Smoothing window length per axis (default 5).
    pub fn with_window_capacity(mut self, capacity: usize) -> Self {
        self.window_capacity = capacity;
        self
    }
}

impl<M: Meter, S: Storage, A: PowerAllocator> ControllerBuilder<M, S, A> {
    /// Validate and build the controller.
    ///
    /// Both gates start enabled and are then set from the configuration, so an
    /// axis configured as deactivated receives its zero command here. A failed
    /// zero command is logged; the axis still starts disabled.
    pub fn build(self) -> Result<BalancingController<M, S, A>> {
        if self.window_capacity == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "window capacity must be >= 1",
            )));
        }

        let mut controller = BalancingController {
            meter: self.meter,
            storage: self.storage,
            allocator: self.allocator,
            active_offset: self.config.active_power_offset,
            reactive_offset: self.config.reactive_power_offset,
            active_window: SampleWindow::with_capacity(self.window_capacity),
            reactive_window: SampleWindow::with_capacity(self.window_capacity),
            active_gate: AxisGate::new(Axis::Active),
            reactive_gate: AxisGate::new(Axis::Reactive),
            ticks: 0,
        };

        for axis in [Axis::Active, Axis::Reactive] {
            if let Err(e) = controller.set_axis_enabled(axis, self.config.activated(axis)) {
                tracing::warn!(%axis, error = %e, "zero command failed while applying initial config");
            }
        }

        tracing::info!(
            storage = controller.storage.id(),
            active_offset = controller.active_offset,
            reactive_offset = controller.reactive_offset,
            active_enabled = controller.active_gate.get(),
            reactive_enabled = controller.reactive_gate.get(),
            "controller ready"
        );
        Ok(controller)
    }
}
