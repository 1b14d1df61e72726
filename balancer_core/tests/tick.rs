use std::cell::RefCell;

use balancer_core::mocks::{FixedMeter, RecordingStorage};
use balancer_core::{
    Axis, BalanceError, BalancingController, Bounds, ControllerCfg, PowerAllocator,
};
use rstest::rstest;

/// Passes its inputs through unchanged and records every call.
#[derive(Default)]
struct SpyAllocator {
    active_calls: RefCell<Vec<(i64, i64, Bounds)>>,
    reactive_calls: RefCell<Vec<(i64, i64, Bounds)>>,
}

impl PowerAllocator for SpyAllocator {
    fn allocate_active(&self, active: i64, reactive: i64, bounds: Bounds) -> i64 {
        self.active_calls.borrow_mut().push((active, reactive, bounds));
        active
    }
    fn allocate_reactive(&self, active: i64, reactive: i64, bounds: Bounds) -> i64 {
        self.reactive_calls.borrow_mut().push((active, reactive, bounds));
        reactive
    }
}

fn storage_with_bounds(charge: u64, discharge: u64) -> RecordingStorage {
    RecordingStorage {
        allowed_charge: charge,
        allowed_discharge: discharge,
        ..RecordingStorage::default()
    }
}

#[test]
fn offset_adjusted_sum_is_smoothed_and_dispatched() {
    let storage = RecordingStorage {
        active: 50,
        reactive: -20,
        ..storage_with_bounds(500, 500)
    };
    let cfg = ControllerCfg {
        active_power_offset: 30,
        reactive_power_offset: 10,
        ..ControllerCfg::default()
    };
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(100, 70))
        .with_storage(storage)
        .with_config(cfg)
        .build()
        .unwrap();

    let report = c.tick().unwrap();
    assert_eq!(c.window(Axis::Active).len(), 1);
    assert_eq!(c.window(Axis::Active).average(), Ok(120));
    assert_eq!(report.smoothed_active, 120);
    assert_eq!(report.smoothed_reactive, 40);
    assert_eq!(report.bounds, Bounds::new(-500, 500));
    assert_eq!(
        c.storage().writes,
        vec![(Axis::Active, 120), (Axis::Reactive, 40)]
    );
}

#[test]
fn setpoints_follow_the_moving_average() {
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(0, 0))
        .with_storage(storage_with_bounds(500, 500))
        .build()
        .unwrap();

    // Storage readings stay at 0, so raw == meter reading
    for reading in [100, 200, 300, 400, 500, 600] {
        c.meter_mut().active = reading;
        c.tick().unwrap();
    }
    // Last five: 200..=600 → 400
    assert_eq!(
        c.window(Axis::Active).iter().collect::<Vec<_>>(),
        vec![200, 300, 400, 500, 600]
    );
    assert_eq!(
        c.storage().writes_for(Axis::Active),
        vec![100, 150, 200, 250, 300, 400]
    );
}

#[test]
fn disabled_reactive_feeds_zero_into_active_allocation() {
    let spy = SpyAllocator::default();
    let cfg = ControllerCfg {
        reactive_power_activated: false,
        ..ControllerCfg::default()
    };
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(300, 80))
        .with_storage(storage_with_bounds(1000, 1000))
        .with_allocator(&spy)
        .with_config(cfg)
        .build()
        .unwrap();

    let report = c.tick().unwrap();
    let b = Bounds::new(-1000, 1000);
    assert_eq!(*spy.active_calls.borrow(), vec![(300, 0, b)]);
    assert_eq!(*spy.reactive_calls.borrow(), vec![(300, 0, b)]);
    // Window still holds the real reactive sample
    assert_eq!(report.smoothed_reactive, 80);
    assert_eq!(report.dispatched_reactive, None);
    // Only the zero from disabling, then the active setpoint
    assert_eq!(
        c.storage().writes,
        vec![(Axis::Reactive, 0), (Axis::Active, 300)]
    );
}

#[test]
fn disabled_active_zeroes_only_the_reactive_allocation_input() {
    let spy = SpyAllocator::default();
    let cfg = ControllerCfg {
        active_power_activated: false,
        ..ControllerCfg::default()
    };
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(300, 80))
        .with_storage(storage_with_bounds(1000, 1000))
        .with_allocator(&spy)
        .with_config(cfg)
        .build()
        .unwrap();

    let report = c.tick().unwrap();
    let b = Bounds::new(-1000, 1000);
    // The active allocation still runs on the unzeroed active value
    assert_eq!(*spy.active_calls.borrow(), vec![(300, 80, b)]);
    assert_eq!(*spy.reactive_calls.borrow(), vec![(0, 80, b)]);
    assert_eq!(report.allocated_active, 300);
    assert_eq!(report.dispatched_active, None);
    assert_eq!(
        c.storage().writes,
        vec![(Axis::Active, 0), (Axis::Reactive, 80)]
    );
}

#[test]
fn both_axes_disabled_dispatches_nothing_during_ticks() {
    let cfg = ControllerCfg {
        active_power_activated: false,
        reactive_power_activated: false,
        ..ControllerCfg::default()
    };
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(300, 80))
        .with_storage(RecordingStorage::default())
        .with_config(cfg)
        .build()
        .unwrap();
    for _ in 0..3 {
        c.tick().unwrap();
    }
    assert_eq!(
        c.storage().writes,
        vec![(Axis::Active, 0), (Axis::Reactive, 0)]
    );
    assert_eq!(c.window(Axis::Active).len(), 3);
}

#[rstest]
#[case("active")]
#[case("reactive")]
#[case("write_min")]
#[case("write_max")]
#[case("allowed_charge")]
#[case("allowed_discharge")]
fn storage_read_failure_aborts_before_any_dispatch(#[case] reading: &'static str) {
    let storage = RecordingStorage {
        fail_read: Some(reading),
        ..RecordingStorage::default()
    };
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(100, 100))
        .with_storage(storage)
        .build()
        .unwrap();

    let err = c.tick().unwrap_err();
    assert!(
        matches!(
            err.downcast_ref::<BalanceError>(),
            Some(BalanceError::Unavailable(_))
        ),
        "unexpected error: {err}"
    );
    assert!(c.storage().writes.is_empty());
    assert!(c.window(Axis::Active).is_empty());
    assert!(c.window(Axis::Reactive).is_empty());
}

#[rstest]
#[case("allowed_charge")]
#[case("allowed_discharge")]
fn unreadable_capacity_aborts_tick_despite_write_limits(#[case] reading: &'static str) {
    let storage = RecordingStorage {
        write_min: Some(-1000),
        write_max: Some(1000),
        fail_read: Some(reading),
        ..RecordingStorage::default()
    };
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(300, 0))
        .with_storage(storage)
        .build()
        .unwrap();

    let err = c.tick().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BalanceError>(),
        Some(BalanceError::Unavailable(_))
    ));
    assert!(c.storage().writes.is_empty());
    assert!(c.window(Axis::Active).is_empty());

    c.storage_mut().fail_read = None;
    let report = c.tick().unwrap();
    assert_eq!(report.bounds, Bounds::new(-1000, 1000));
    assert_eq!(report.dispatched_active, Some(300));
}

#[test]
fn meter_failure_aborts_tick_and_next_tick_recovers() {
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter {
            offline: true,
            ..FixedMeter::new(100, 0)
        })
        .with_storage(RecordingStorage::default())
        .build()
        .unwrap();

    assert!(c.tick().is_err());
    assert!(c.storage().writes.is_empty());

    c.meter_mut().offline = false;
    let report = c.tick().unwrap();
    assert_eq!(report.dispatched_active, Some(100));
}

#[test]
fn rejected_write_is_reported_as_write_rejected() {
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(100, 0))
        .with_storage(RecordingStorage::default())
        .build()
        .unwrap();
    c.storage_mut().reject_writes = true;

    let err = c.tick().unwrap_err();
    assert!(matches!(
        err.downcast_ref::<BalanceError>(),
        Some(BalanceError::WriteRejected {
            axis: Axis::Active,
            value: 100,
            ..
        })
    ));
    // The windows were already updated when the write failed
    assert_eq!(c.window(Axis::Active).len(), 1);
}

#[test]
fn default_allocator_clips_to_write_limits() {
    let storage = RecordingStorage {
        write_max: Some(2500),
        write_min: Some(-2500),
        ..RecordingStorage::default()
    };
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(3000, 4000))
        .with_storage(storage)
        .build()
        .unwrap();

    let report = c.tick().unwrap();
    assert_eq!(report.dispatched_active, Some(1500));
    assert_eq!(report.dispatched_reactive, Some(2000));
}

#[test]
fn charging_uses_negated_allowed_charge() {
    let storage = RecordingStorage {
        active: -200,
        ..storage_with_bounds(1000, 4000)
    };
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(-1800, 0))
        .with_storage(storage)
        .build()
        .unwrap();

    let report = c.tick().unwrap();
    assert_eq!(report.bounds, Bounds::new(-1000, 4000));
    assert_eq!(report.raw_active, -2000);
    assert_eq!(report.dispatched_active, Some(-1000));
}
