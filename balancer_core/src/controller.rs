//! The balancing-offset control tick (`BalancingController`).
//!
//! Each tick sums grid and storage power, subtracts the configured offsets,
//! smooths the result over a short window and asks the allocator for setpoints
//! that fit the storage device's current charge/discharge capability. The
//! storage then covers the site's demand so the grid exchange converges on
//! the offset.

use balancer_traits::{Axis, BoxError, Meter, Storage};

use crate::allocation::{ApparentPowerLimiter, Bounds, PowerAllocator};
use crate::builder::{ControllerBuilder, Missing};
use crate::config::{ConfigChange, ControllerCfg};
use crate::error::Result;
use crate::gate::{AxisGate, GateTransition};
use crate::hw_error::{map_read_error, map_write_error};
use crate::report::TickReport;
use crate::window::SampleWindow;

pub struct BalancingController<M, S, A = ApparentPowerLimiter> {
    pub(crate) meter: M,
    pub(crate) storage: S,
    pub(crate) allocator: A,
    pub(crate) active_offset: i64,
    pub(crate) reactive_offset: i64,
    pub(crate) active_window: SampleWindow,
    pub(crate) reactive_window: SampleWindow,
    pub(crate) active_gate: AxisGate,
    pub(crate) reactive_gate: AxisGate,
    pub(crate) ticks: u64,
}

impl<M, S: Storage, A> core::fmt::Debug for BalancingController<M, S, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BalancingController")
            .field("storage", &self.storage.id())
            .field("active_offset", &self.active_offset)
            .field("reactive_offset", &self.reactive_offset)
            .field("active_enabled", &self.active_gate.get())
            .field("reactive_enabled", &self.reactive_gate.get())
            .field("ticks", &self.ticks)
            .finish()
    }
}

impl BalancingController<Missing, Missing> {
    /// Start building a controller.
    pub fn builder() -> ControllerBuilder<Missing, Missing, ApparentPowerLimiter> {
        ControllerBuilder::default()
    }
}

#[inline]
fn read<T>(what: &str, r: std::result::Result<T, BoxError>) -> Result<T> {
    r.map_err(|e| eyre::Report::new(map_read_error(what, &*e)))
}

impl<M: Meter, S: Storage, A: PowerAllocator> BalancingController<M, S, A> {
    /// Run one control cycle.
    ///
    /// All readings are taken before any state changes, so a failed read leaves
    /// the windows untouched. A failed dispatch aborts the remaining steps; the
    /// active setpoint may already have been sent when the reactive one fails.
    pub fn tick(&mut self) -> Result<TickReport> {
        let meter_active = read("meter active power", self.meter.active_power())?;
        let storage_active = read("storage active power", self.storage.active_power())?;
        let meter_reactive = read("meter reactive power", self.meter.reactive_power())?;
        let storage_reactive = read("storage reactive power", self.storage.reactive_power())?;
        let bounds = self.read_bounds()?;

        let raw_active = meter_active
            .saturating_add(storage_active)
            .saturating_sub(self.active_offset);
        let raw_reactive = meter_reactive
            .saturating_add(storage_reactive)
            .saturating_sub(self.reactive_offset);

        self.active_window.push(raw_active);
        self.reactive_window.push(raw_reactive);

        let smoothed_active = self.active_window.average()?;
        let smoothed_reactive = self.reactive_window.average()?;

        // The active allocation sees a reactive-zeroed input, the reactive
        // allocation additionally an active-zeroed one. Order matters.
        let mut active_in = smoothed_active;
        let mut reactive_in = smoothed_reactive;
        if !self.reactive_gate.get() {
            reactive_in = 0;
        }
        let allocated_active = self
            .allocator
            .allocate_active(active_in, reactive_in, bounds);
        if !self.active_gate.get() {
            active_in = 0;
        }
        let allocated_reactive = self
            .allocator
            .allocate_reactive(active_in, reactive_in, bounds);

        let tick = self.ticks;
        self.ticks = self.ticks.wrapping_add(1);

        let dispatched_active = if self.active_gate.get() {
            self.dispatch(Axis::Active, allocated_active)?;
            Some(allocated_active)
        } else {
            None
        };
        let dispatched_reactive = if self.reactive_gate.get() {
            self.dispatch(Axis::Reactive, allocated_reactive)?;
            Some(allocated_reactive)
        } else {
            None
        };

        tracing::debug!(
            tick,
            meter_active,
            storage_active,
            meter_reactive,
            storage_reactive,
            smoothed_active,
            smoothed_reactive,
            max_charge = bounds.max_charge,
            max_discharge = bounds.max_discharge,
            "tick inputs"
        );
        tracing::info!(
            tick,
            storage = self.storage.id(),
            active = ?dispatched_active,
            reactive = ?dispatched_reactive,
            "setpoints dispatched"
        );

        Ok(TickReport {
            tick,
            storage_id: self.storage.id().to_string(),
            raw_active,
            raw_reactive,
            smoothed_active,
            smoothed_reactive,
            bounds,
            allocated_active,
            allocated_reactive,
            dispatched_active,
            dispatched_reactive,
        })
    }

    /// Current capability: write-limit overrides win over the device's
    /// allowed charge/discharge.
    ///
    /// Allowed charge/discharge is read every time, override or not, so an
    /// unreadable capability always fails the tick.
    pub fn read_bounds(&mut self) -> Result<Bounds> {
        let write_min = read("storage write min", self.storage.write_min())?;
        let allowed_charge = read("storage allowed charge", self.storage.allowed_charge())?;
        let write_max = read("storage write max", self.storage.write_max())?;
        let allowed_discharge =
            read("storage allowed discharge", self.storage.allowed_discharge())?;

        let max_charge = write_min
            .unwrap_or_else(|| i64::try_from(allowed_charge).unwrap_or(i64::MAX).saturating_neg());
        let max_discharge =
            write_max.unwrap_or_else(|| i64::try_from(allowed_discharge).unwrap_or(i64::MAX));
        Ok(Bounds::new(max_charge, max_discharge))
    }

    fn dispatch(&mut self, axis: Axis, value: i64) -> Result<()> {
        self.storage
            .set_power(axis, value)
            .map_err(|e| eyre::Report::new(map_write_error(axis, value, &*e)))
    }

    /// Enable or disable an axis. Disabling an enabled axis commands zero power
    /// on it immediately.
    pub fn set_axis_enabled(&mut self, axis: Axis, enabled: bool) -> Result<GateTransition> {
        let gate = match axis {
            Axis::Active => &mut self.active_gate,
            Axis::Reactive => &mut self.reactive_gate,
        };
        gate.set(enabled, &mut self.storage)
    }

    /// Apply one runtime configuration change. Offsets take effect on the next tick.
    pub fn apply_change(&mut self, change: ConfigChange) -> Result<()> {
        tracing::info!(?change, "config change");
        match change {
            ConfigChange::ActivePowerOffset(v) => self.active_offset = v,
            ConfigChange::ReactivePowerOffset(v) => self.reactive_offset = v,
            ConfigChange::ActivePowerActivated(b) => {
                self.set_axis_enabled(Axis::Active, b)?;
            }
            ConfigChange::ReactivePowerActivated(b) => {
                self.set_axis_enabled(Axis::Reactive, b)?;
            }
        }
        Ok(())
    }

    /// Apply every difference between the current settings and `cfg`.
    ///
    /// All changes are attempted; the first failure is returned.
    pub fn reconfigure(&mut self, cfg: &ControllerCfg) -> Result<()> {
        let mut first_err = None;
        for change in ConfigChange::diff(&self.config(), cfg) {
            if let Err(e) = self.apply_change(change)
                && first_err.is_none()
            {
                first_err = Some(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl<M, S, A> BalancingController<M, S, A> {
    pub fn is_enabled(&self, axis: Axis) -> bool {
        match axis {
            Axis::Active => self.active_gate.get(),
            Axis::Reactive => self.reactive_gate.get(),
        }
    }

    pub fn offset(&self, axis: Axis) -> i64 {
        match axis {
            Axis::Active => self.active_offset,
            Axis::Reactive => self.reactive_offset,
        }
    }

    /// Snapshot of the settings currently in force.
    pub fn config(&self) -> ControllerCfg {
        ControllerCfg {
            active_power_offset: self.active_offset,
            reactive_power_offset: self.reactive_offset,
            active_power_activated: self.active_gate.get(),
            reactive_power_activated: self.reactive_gate.get(),
        }
    }

    pub fn window(&self, axis: Axis) -> &SampleWindow {
        match axis {
            Axis::Active => &self.active_window,
            Axis::Reactive => &self.reactive_window,
        }
    }

    /// Number of ticks that got past the smoothing stage.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn meter(&self) -> &M {
        &self.meter
    }

    pub fn meter_mut(&mut self) -> &mut M {
        &mut self.meter
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }
}
