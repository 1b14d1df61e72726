//! Fixed-period scheduler driving `BalancingController::tick`.
//!
//! One tick runs at a time, to completion. Configuration changes queued on the
//! channel are applied between ticks. A failed tick is logged and counted; the
//! next tick retries from a clean state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use balancer_traits::clock::Clock;
use balancer_traits::{Meter, Storage};
use crossbeam_channel as xch;

use crate::allocation::PowerAllocator;
use crate::config::{ConfigChange, RunParams};
use crate::controller::BalancingController;
use crate::error::BalanceError;
use crate::report::TickReport;

/// Longest single sleep, so a shutdown request is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// What a run did before it stopped.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub ticks: u64,
    pub failed_ticks: u64,
    pub overruns: u64,
    pub last_report: Option<TickReport>,
    pub last_error: Option<BalanceError>,
}

impl RunSummary {
    /// True when ticks ran and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        self.ticks > 0 && self.failed_ticks == self.ticks
    }
}

/// Drain every pending change, logging failures.
pub fn apply_pending<M, S, A>(
    controller: &mut BalancingController<M, S, A>,
    changes: &xch::Receiver<ConfigChange>,
) -> usize
where
    M: Meter,
    S: Storage,
    A: PowerAllocator,
{
    let mut applied = 0;
    for change in changes.try_iter() {
        if let Err(e) = controller.apply_change(change) {
            tracing::warn!(?change, error = %e, "config change failed");
        }
        applied += 1;
    }
    applied
}

/// Tick `controller` every `params.period` until `shutdown` is set or
/// `params.max_ticks` ticks have run. `on_report` sees every successful tick.
pub fn run<M, S, A, C>(
    controller: &mut BalancingController<M, S, A>,
    params: &RunParams,
    changes: Option<&xch::Receiver<ConfigChange>>,
    shutdown: &AtomicBool,
    clock: &C,
    mut on_report: impl FnMut(&TickReport),
) -> RunSummary
where
    M: Meter,
    S: Storage,
    A: PowerAllocator,
    C: Clock + ?Sized,
{
    let mut summary = RunSummary::default();
    let epoch = clock.now();
    let mut next_due = Duration::ZERO;

    tracing::info!(period_ms = params.period.as_millis() as u64, max_ticks = ?params.max_ticks, "runner start");

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            break;
        }
        if params.max_ticks.is_some_and(|max| summary.ticks >= max) {
            break;
        }

        if let Some(rx) = changes {
            apply_pending(controller, rx);
        }

        match controller.tick() {
            Ok(report) => {
                on_report(&report);
                summary.last_report = Some(report);
            }
            Err(e) => {
                summary.failed_ticks += 1;
                tracing::warn!(tick = summary.ticks, error = %e, "tick failed");
                summary.last_error = e.downcast_ref::<BalanceError>().cloned();
            }
        }
        summary.ticks += 1;

        if params.max_ticks.is_some_and(|max| summary.ticks >= max) {
            break;
        }

        next_due = next_due.saturating_add(params.period);
        let elapsed = clock.now().saturating_duration_since(epoch);
        if elapsed >= next_due {
            summary.overruns += 1;
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                due_ms = next_due.as_millis() as u64,
                "tick overran its period"
            );
            next_due = elapsed;
            continue;
        }
        sleep_until(clock, epoch, next_due, shutdown);
    }

    tracing::info!(
        ticks = summary.ticks,
        failed = summary.failed_ticks,
        overruns = summary.overruns,
        "runner stopped"
    );
    summary
}

fn sleep_until<C: Clock + ?Sized>(
    clock: &C,
    epoch: std::time::Instant,
    due: Duration,
    shutdown: &AtomicBool,
) {
    loop {
        let elapsed = clock.now().saturating_duration_since(epoch);
        if elapsed >= due || shutdown.load(Ordering::Relaxed) {
            return;
        }
        clock.sleep((due - elapsed).min(SLEEP_SLICE));
    }
}
