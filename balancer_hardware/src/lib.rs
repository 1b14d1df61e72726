//! Simulated site: a grid meter and a storage device sharing one plant model.
//!
//! The meter sees `load - storage` so that, with the shared sign convention
//! (positive = import / discharge), `meter + storage` always equals the load.
//! Each active-power read of the meter advances the load profile by one row.
pub mod error;

use balancer_traits::{Axis, BoxError, DispatchSink, Meter, Storage};
use std::sync::{Arc, Mutex, MutexGuard};

pub use error::HwError;

/// Static parameters of the simulated site.
#[derive(Debug, Clone)]
pub struct SiteParams {
    pub id: String,
    pub capacity_wh: f64,
    pub soc: f64,
    pub allowed_charge_w: u64,
    pub allowed_discharge_w: u64,
    pub write_min_w: Option<i64>,
    pub write_max_w: Option<i64>,
    pub hard_limit_w: i64,
    pub dt_hours: f64,
}

impl Default for SiteParams {
    fn default() -> Self {
        Self {
            id: "ess0".to_string(),
            capacity_wh: 10_000.0,
            soc: 0.5,
            allowed_charge_w: 5_000,
            allowed_discharge_w: 5_000,
            write_min_w: None,
            write_max_w: None,
            hard_limit_w: 10_000,
            dt_hours: 1.0 / 3600.0,
        }
    }
}

#[derive(Debug)]
struct Plant {
    params: SiteParams,
    profile: Vec<(i64, i64)>,
    cursor: usize,
    load: Option<(i64, i64)>,
    soc: f64,
    storage_active: i64,
    storage_reactive: i64,
    last_active: Option<i64>,
    last_reactive: Option<i64>,
    meter_online: bool,
}

impl Plant {
    fn next_load(&mut self) -> (i64, i64) {
        let row = self.profile[self.cursor % self.profile.len()];
        self.cursor = self.cursor.wrapping_add(1);
        self.load = Some(row);
        row
    }

    fn allowed_charge(&self) -> u64 {
        if self.soc >= 1.0 {
            0
        } else {
            self.params.allowed_charge_w
        }
    }

    fn allowed_discharge(&self) -> u64 {
        if self.soc <= 0.0 {
            0
        } else {
            self.params.allowed_discharge_w
        }
    }

    fn check_hard_limit(&self, value: i64) -> error::Result<()> {
        let max = self.params.hard_limit_w;
        if value > max || value < -max {
            return Err(HwError::OutOfRange {
                value,
                min: -max,
                max,
            });
        }
        Ok(())
    }

    /// Apply an active setpoint: clamp to the device capability, limit by stored
    /// energy, and integrate the state of charge over one step.
    fn apply_active(&mut self, cmd_w: i64) {
        let charge = i64::try_from(self.allowed_charge()).unwrap_or(i64::MAX);
        let discharge = i64::try_from(self.allowed_discharge()).unwrap_or(i64::MAX);
        let clamped = cmd_w.clamp(-charge, discharge);

        let cap = self.params.capacity_wh;
        let dt = self.params.dt_hours;
        let actual = if clamped > 0 {
            let max_w_soc = (self.soc * cap / dt).max(0.0);
            (clamped as f64).min(max_w_soc) as i64
        } else if clamped < 0 {
            let max_w_soc = ((1.0 - self.soc) * cap / dt).max(0.0);
            -((-clamped) as f64).min(max_w_soc) as i64
        } else {
            0
        };

        self.soc = (self.soc - (actual as f64) * dt / cap).clamp(0.0, 1.0);
        self.storage_active = actual;
    }
}

/// Handle to the shared plant; hands out the meter and storage views.
#[derive(Debug, Clone)]
pub struct SimulatedSite {
    plant: Arc<Mutex<Plant>>,
}

impl SimulatedSite {
    /// Site with a constant load.
    pub fn new(params: SiteParams, load_active_w: i64, load_reactive_var: i64) -> Self {
        Self::with_profile(params, vec![(load_active_w, load_reactive_var)])
    }

    /// Site replaying `profile` (active, reactive) one row per meter read, wrapping at the end.
    /// An empty profile is treated as zero load.
    pub fn with_profile(params: SiteParams, mut profile: Vec<(i64, i64)>) -> Self {
        if profile.is_empty() {
            profile.push((0, 0));
        }
        let soc = params.soc.clamp(0.0, 1.0);
        Self {
            plant: Arc::new(Mutex::new(Plant {
                params,
                profile,
                cursor: 0,
                load: None,
                soc,
                storage_active: 0,
                storage_reactive: 0,
                last_active: None,
                last_reactive: None,
                meter_online: true,
            })),
        }
    }

    pub fn meter(&self) -> SimulatedMeter {
        SimulatedMeter {
            plant: self.plant.clone(),
        }
    }

    pub fn storage(&self) -> SimulatedStorage {
        let id = self
            .lock()
            .map(|p| p.params.id.clone())
            .unwrap_or_default();
        SimulatedStorage {
            id,
            plant: self.plant.clone(),
        }
    }

    /// Current state of charge (0.0..=1.0).
    pub fn soc(&self) -> f64 {
        self.lock().map(|p| p.soc).unwrap_or(0.0)
    }

    /// Take the meter offline (reads fail with `Unavailable`) or back online.
    pub fn set_meter_online(&self, online: bool) {
        if let Ok(mut p) = self.lock() {
            p.meter_online = online;
        }
    }

    fn lock(&self) -> error::Result<MutexGuard<'_, Plant>> {
        self.plant.lock().map_err(|_| HwError::Poisoned)
    }
}

fn lock(plant: &Mutex<Plant>) -> error::Result<MutexGuard<'_, Plant>> {
    plant.lock().map_err(|_| HwError::Poisoned)
}

/// Grid meter view of the simulated site.
#[derive(Debug, Clone)]
pub struct SimulatedMeter {
    plant: Arc<Mutex<Plant>>,
}

impl Meter for SimulatedMeter {
    fn active_power(&mut self) -> Result<i64, BoxError> {
        let mut p = lock(&self.plant)?;
        if !p.meter_online {
            return Err(Box::new(HwError::Unavailable("meter active power")));
        }
        let (load, _) = p.next_load();
        let grid = load - p.storage_active;
        tracing::trace!(load, grid, "sim meter active");
        Ok(grid)
    }

    fn reactive_power(&mut self) -> Result<i64, BoxError> {
        let mut p = lock(&self.plant)?;
        if !p.meter_online {
            return Err(Box::new(HwError::Unavailable("meter reactive power")));
        }
        let current = p.load;
        let (_, load) = match current {
            Some(l) => l,
            None => p.next_load(),
        };
        Ok(load - p.storage_reactive)
    }
}

/// Storage device view of the simulated site.
#[derive(Debug, Clone)]
pub struct SimulatedStorage {
    id: String,
    plant: Arc<Mutex<Plant>>,
}

impl DispatchSink for SimulatedStorage {
    fn set_active_power(&mut self, watts: i64) -> Result<(), BoxError> {
        let mut p = lock(&self.plant)?;
        p.check_hard_limit(watts)?;
        p.apply_active(watts);
        p.last_active = Some(watts);
        tracing::debug!(
            id = %self.id,
            commanded = watts,
            actual = p.storage_active,
            soc = p.soc,
            "sim storage active setpoint"
        );
        Ok(())
    }

    fn set_reactive_power(&mut self, var: i64) -> Result<(), BoxError> {
        let mut p = lock(&self.plant)?;
        p.check_hard_limit(var)?;
        p.storage_reactive = var;
        p.last_reactive = Some(var);
        tracing::debug!(id = %self.id, commanded = var, "sim storage reactive setpoint");
        Ok(())
    }

    fn write_min(&mut self) -> Result<Option<i64>, BoxError> {
        Ok(lock(&self.plant)?.params.write_min_w)
    }

    fn write_max(&mut self) -> Result<Option<i64>, BoxError> {
        Ok(lock(&self.plant)?.params.write_max_w)
    }

    fn last_setpoint(&self, axis: Axis) -> Option<i64> {
        let p = lock(&self.plant).ok()?;
        match axis {
            Axis::Active => p.last_active,
            Axis::Reactive => p.last_reactive,
        }
    }
}

impl Storage for SimulatedStorage {
    fn id(&self) -> &str {
        &self.id
    }

    fn active_power(&mut self) -> Result<i64, BoxError> {
        Ok(lock(&self.plant)?.storage_active)
    }

    fn reactive_power(&mut self) -> Result<i64, BoxError> {
        Ok(lock(&self.plant)?.storage_reactive)
    }

    fn allowed_charge(&mut self) -> Result<u64, BoxError> {
        Ok(lock(&self.plant)?.allowed_charge())
    }

    fn allowed_discharge(&mut self) -> Result<u64, BoxError> {
        Ok(lock(&self.plant)?.allowed_discharge())
    }
}
