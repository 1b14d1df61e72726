#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and load-profile parsing for the balancing controller.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - The load-profile CSV loader enforces headers and rejects empty profiles.
use serde::Deserialize;

/// One row of a site load profile.
///
/// Expected headers:
/// active,reactive
///
/// Example:
/// active,reactive
/// 1500,200
/// -800,150
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ProfileRow {
    pub active: i64,
    pub reactive: i64,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ControllerCfg {
    /// Target grid exchange for the active axis (W)
    pub active_power_offset: i64,
    /// Target grid exchange for the reactive axis (var)
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

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RunnerCfg {
    /// Tick cadence in milliseconds
    pub period_ms: u64,
    /// How often the config file is checked for changes (ms)
    pub reload_poll_ms: u64,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            period_ms: 1000,
            reload_poll_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimCfg {
    /// Storage device identifier used in logs and reports
    pub id: String,
    pub capacity_wh: f64,
    /// Initial state of charge (0.0..=1.0)
    pub soc: f64,
    pub allowed_charge_w: u64,
    pub allowed_discharge_w: u64,
    /// Optional override on the lowest accepted active setpoint (<= 0)
    pub write_min_w: Option<i64>,
    /// Optional override on the highest accepted active setpoint (>= 0)
    pub write_max_w: Option<i64>,
    /// Setpoints with magnitude above this are rejected by the device
    pub hard_limit_w: i64,
    pub load_active_w: i64,
    pub load_reactive_var: i64,
    /// Optional CSV profile replayed one row per tick; wraps around at the end
    pub profile_csv: Option<String>,
    /// Simulated time per dispatched setpoint (ms), used for SOC integration
    pub dt_ms: u64,
}

impl Default for SimCfg {
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
            load_active_w: 1_500,
            load_reactive_var: 0,
            profile_csv: None,
            dt_ms: 1_000,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub controller: ControllerCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sim: SimCfg,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &std::path::Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn load_profile_csv(path: &std::path::Path) -> eyre::Result<Vec<ProfileRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open load profile CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["active", "reactive"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "load profile CSV must have headers 'active,reactive', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<ProfileRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }
    if rows.is_empty() {
        eyre::bail!("load profile CSV {:?} has no rows", path);
    }
    Ok(rows)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Runner
        if self.runner.period_ms == 0 {
            eyre::bail!("runner.period_ms must be >= 1");
        }
        if self.runner.period_ms > 60 * 60 * 1000 {
            eyre::bail!("runner.period_ms is unreasonably large (>1h)");
        }
        if self.runner.reload_poll_ms == 0 {
            eyre::bail!("runner.reload_poll_ms must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        // Sim
        let sim = &self.sim;
        if sim.id.trim().is_empty() {
            eyre::bail!("sim.id must not be empty");
        }
        if !(sim.capacity_wh.is_finite() && sim.capacity_wh > 0.0) {
            eyre::bail!("sim.capacity_wh must be > 0");
        }
        if !(0.0..=1.0).contains(&sim.soc) {
            eyre::bail!("sim.soc must be in [0.0, 1.0]");
        }
        if sim.hard_limit_w < 0 {
            eyre::bail!("sim.hard_limit_w must be >= 0");
        }
        if let Some(min) = sim.write_min_w
            && min > 0
        {
            eyre::bail!("sim.write_min_w must be <= 0");
        }
        if let Some(max) = sim.write_max_w
            && max < 0
        {
            eyre::bail!("sim.write_max_w must be >= 0");
        }
        if sim.dt_ms == 0 {
            eyre::bail!("sim.dt_ms must be >= 1");
        }

        Ok(())
    }
}
