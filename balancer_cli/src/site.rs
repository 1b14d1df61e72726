//! Assembles the simulated site from `[sim]`.

use std::path::{Path, PathBuf};

use balancer_config::{Config, SimCfg};
use balancer_hardware::{SimulatedSite, SiteParams};

pub fn site_params(sim: &SimCfg) -> SiteParams {
    SiteParams {
        id: sim.id.clone(),
        capacity_wh: sim.capacity_wh,
        soc: sim.soc,
        allowed_charge_w: sim.allowed_charge_w,
        allowed_discharge_w: sim.allowed_discharge_w,
        write_min_w: sim.write_min_w,
        write_max_w: sim.write_max_w,
        hard_limit_w: sim.hard_limit_w,
        dt_hours: sim.dt_ms as f64 / 3_600_000.0,
    }
}

/// Profile path to use, if any. `--profile` is taken as given; a
/// `sim.profile_csv` path is relative to the config file.
pub fn profile_path(cfg: &Config, config_path: &Path, cli: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = cli {
        return Some(p.to_path_buf());
    }
    let rel = Path::new(cfg.sim.profile_csv.as_deref()?);
    if rel.is_absolute() {
        return Some(rel.to_path_buf());
    }
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    Some(base.join(rel))
}

pub fn build_site(
    cfg: &Config,
    config_path: &Path,
    profile_override: Option<&Path>,
) -> eyre::Result<SimulatedSite> {
    let params = site_params(&cfg.sim);
    match profile_path(cfg, config_path, profile_override) {
        Some(path) => {
            let rows = balancer_config::load_profile_csv(&path)?;
            tracing::info!(path = %path.display(), rows = rows.len(), "load profile");
            let profile = rows.iter().map(|r| (r.active, r.reactive)).collect();
            Ok(SimulatedSite::with_profile(params, profile))
        }
        None => Ok(SimulatedSite::new(
            params,
            cfg.sim.load_active_w,
            cfg.sim.load_reactive_var,
        )),
    }
}
