//! `From` implementations bridging `balancer_config` types to `balancer_core` types.

use std::time::Duration;

use crate::config::{ControllerCfg, RunParams};

// ── ControllerCfg ────────────────────────────────────────────────────────────

impl From<&balancer_config::ControllerCfg> for ControllerCfg {
    fn from(c: &balancer_config::ControllerCfg) -> Self {
        Self {
            active_power_offset: c.active_power_offset,
            reactive_power_offset: c.reactive_power_offset,
            active_power_activated: c.active_power_activated,
            reactive_power_activated: c.reactive_power_activated,
        }
    }
}

// ── RunParams ────────────────────────────────────────────────────────────────

impl From<&balancer_config::RunnerCfg> for RunParams {
    fn from(c: &balancer_config::RunnerCfg) -> Self {
        Self {
            period: Duration::from_millis(c.period_ms.max(1)),
            max_ticks: None,
        }
    }
}
