//! `run` and `self-check` commands: site assembly, controller build and output.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use balancer_config::Config;
use balancer_core::hw_error::map_read_error;
use balancer_core::runner::{self, RunSummary};
use balancer_core::{BalancingController, ControllerCfg, RunParams, TickReport};
use balancer_hardware::SimulatedSite;
use balancer_traits::clock::MonotonicClock;
use balancer_traits::{BoxError, Meter, Storage};
use crossbeam_channel as xch;
use serde_json::json;

use crate::reload::ConfigWatcher;
use crate::site::build_site;

fn fmt_setpoint(v: Option<i64>) -> String {
    v.map_or_else(|| "off".to_string(), |v| v.to_string())
}

pub fn report_json(r: &TickReport, soc: f64) -> serde_json::Value {
    json!({
        "tick": r.tick,
        "storage": r.storage_id,
        "raw_active": r.raw_active,
        "raw_reactive": r.raw_reactive,
        "smoothed_active": r.smoothed_active,
        "smoothed_reactive": r.smoothed_reactive,
        "max_charge": r.bounds.max_charge,
        "max_discharge": r.bounds.max_discharge,
        "allocated_active": r.allocated_active,
        "allocated_reactive": r.allocated_reactive,
        "dispatched_active": r.dispatched_active,
        "dispatched_reactive": r.dispatched_reactive,
        "soc": soc,
    })
}

fn print_report(r: &TickReport, site: &SimulatedSite, json: bool) {
    if json {
        println!("{}", report_json(r, site.soc()));
    } else {
        println!(
            "tick {}: active {} W, reactive {} var (smoothed {} / {}, soc {:.3})",
            r.tick,
            fmt_setpoint(r.dispatched_active),
            fmt_setpoint(r.dispatched_reactive),
            r.smoothed_active,
            r.smoothed_reactive,
            site.soc()
        );
    }
}

pub fn run_balancer(
    cfg: &Config,
    config_path: &Path,
    profile: Option<&Path>,
    ticks: Option<u64>,
    period_ms: Option<u64>,
    json: bool,
    shutdown: Arc<AtomicBool>,
) -> eyre::Result<RunSummary> {
    let site = build_site(cfg, config_path, profile)?;

    let controller_cfg: ControllerCfg = (&cfg.controller).into();
    let mut params: RunParams = (&cfg.runner).into();
    if let Some(ms) = period_ms {
        if ms == 0 {
            eyre::bail!("--period-ms must be >= 1");
        }
        params.period = Duration::from_millis(ms);
    }
    params.max_ticks = ticks;

    let mut controller = BalancingController::builder()
        .with_meter(site.meter())
        .with_storage(site.storage())
        .with_config(controller_cfg)
        .build()?;

    let (tx, rx) = xch::unbounded();
    let watcher = ConfigWatcher::spawn(
        config_path.to_path_buf(),
        Duration::from_millis(cfg.runner.reload_poll_ms),
        controller_cfg,
        tx,
    );

    let summary = runner::run(
        &mut controller,
        &params,
        Some(&rx),
        &shutdown,
        &MonotonicClock::new(),
        |r| print_report(r, &site, json),
    );
    drop(watcher);

    if json {
        println!(
            "{}",
            json!({
                "summary": {
                    "ticks": summary.ticks,
                    "failed_ticks": summary.failed_ticks,
                    "overruns": summary.overruns,
                    "soc": site.soc(),
                }
            })
        );
    } else {
        println!(
            "run complete: {} ticks, {} failed, {} overruns",
            summary.ticks, summary.failed_ticks, summary.overruns
        );
    }

    if summary.all_failed()
        && let Some(e) = summary.last_error.clone()
    {
        tracing::error!(ticks = summary.ticks, error = %e, "every tick failed");
        return Err(e.into());
    }
    Ok(summary)
}

/// One reading of every measurement and bound, without dispatching anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readings {
    pub meter_active: i64,
    pub meter_reactive: i64,
    pub storage_active: i64,
    pub storage_reactive: i64,
    pub max_charge: i64,
    pub max_discharge: i64,
}

fn read(what: &str, r: Result<i64, BoxError>) -> eyre::Result<i64> {
    r.map_err(|e| eyre::Report::new(map_read_error(what, &*e)))
}

pub fn self_check(cfg: &Config, config_path: &Path, profile: Option<&Path>) -> eyre::Result<Readings> {
    let site = build_site(cfg, config_path, profile)?;
    // Default config: both axes enabled, so building sends nothing
    let mut controller = BalancingController::builder()
        .with_meter(site.meter())
        .with_storage(site.storage())
        .build()?;

    let meter_active = read("meter active power", controller.meter_mut().active_power())?;
    let meter_reactive = read("meter reactive power", controller.meter_mut().reactive_power())?;
    let storage_active = read("storage active power", Storage::active_power(controller.storage_mut()))?;
    let storage_reactive = read(
        "storage reactive power",
        Storage::reactive_power(controller.storage_mut()),
    )?;
    let bounds = controller.read_bounds()?;

    tracing::info!(storage = controller.storage().id(), "self-check readings complete");
    Ok(Readings {
        meter_active,
        meter_reactive,
        storage_active,
        storage_reactive,
        max_charge: bounds.max_charge,
        max_discharge: bounds.max_discharge,
    })
}

pub fn print_readings(r: &Readings, json: bool) {
    if json {
        println!(
            "{}",
            json!({
                "self_check": "ok",
                "meter_active": r.meter_active,
                "meter_reactive": r.meter_reactive,
                "storage_active": r.storage_active,
                "storage_reactive": r.storage_reactive,
                "max_charge": r.max_charge,
                "max_discharge": r.max_discharge,
            })
        );
    } else {
        println!("self-check ok");
        println!("  meter:   {} W, {} var", r.meter_active, r.meter_reactive);
        println!("  storage: {} W, {} var", r.storage_active, r.storage_reactive);
        println!("  bounds:  charge {} W, discharge {} W", r.max_charge, r.max_discharge);
    }
}
