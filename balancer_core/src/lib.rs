#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Balancing-offset control core (hardware-agnostic).
//!
//! Drives a storage device so the grid exchange measured at the meter settles
//! on a configured offset. All device interaction goes through
//! `balancer_traits::Meter` and `balancer_traits::Storage`.
//!
//! ## Architecture
//!
//! - **Window**: fixed-length moving average per axis (`window` module)
//! - **Gate**: per-axis enable flag with zero-on-disable (`gate` module)
//! - **Allocation**: fitting setpoints into the charge/discharge envelope
//! - **Controller**: the per-tick pipeline (`BalancingController::tick`)
//! - **Runner**: fixed-period scheduling and runtime config changes
//!
//! Powers are signed integers (W / var); positive means grid import at the
//! meter and discharge at the storage.

pub mod allocation;
pub mod builder;
pub mod config;
pub mod controller;
pub mod conversions;
pub mod error;
pub mod gate;
pub mod hw_error;
pub mod mocks;
pub mod report;
pub mod runner;
pub mod window;

pub use allocation::{ApparentPowerLimiter, Bounds, PowerAllocator};
pub use builder::{ControllerBuilder, Missing};
pub use config::{ConfigChange, ControllerCfg, RunParams};
pub use controller::BalancingController;
pub use error::{BalanceError, BuildError, Result};
pub use gate::{AxisGate, GateTransition};
pub use report::TickReport;
pub use runner::RunSummary;
pub use window::{SampleWindow, WINDOW_CAPACITY};

pub use balancer_traits::Axis;
