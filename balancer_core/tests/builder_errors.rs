use balancer_core::error::BuildError;
use balancer_core::mocks::{FixedMeter, RecordingStorage};
use balancer_core::{Axis, BalancingController, ControllerCfg, WINDOW_CAPACITY};
use rstest::rstest;

#[rstest]
fn zero_window_capacity_yields_typed_build_error() {
    let err = BalancingController::builder()
        .with_meter(FixedMeter::default())
        .with_storage(RecordingStorage::default())
        .with_window_capacity(0)
        .build()
        .expect_err("should fail with InvalidConfig");

    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains("window")),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

#[rstest]
fn defaults_use_five_sample_window_and_enabled_axes() {
    let c = BalancingController::builder()
        .with_meter(FixedMeter::default())
        .with_storage(RecordingStorage::default())
        .build()
        .unwrap();
    assert_eq!(c.window(Axis::Active).capacity(), WINDOW_CAPACITY);
    assert_eq!(c.window(Axis::Reactive).capacity(), WINDOW_CAPACITY);
    assert!(c.is_enabled(Axis::Active));
    assert!(c.is_enabled(Axis::Reactive));
    assert_eq!(c.config(), ControllerCfg::default());
    assert!(c.storage().writes.is_empty());
}

#[rstest]
#[case(false, true, vec![(Axis::Active, 0)])]
#[case(true, false, vec![(Axis::Reactive, 0)])]
#[case(false, false, vec![(Axis::Active, 0), (Axis::Reactive, 0)])]
#[case(true, true, vec![])]
fn initially_deactivated_axes_receive_one_zero_command(
    #[case] active: bool,
    #[case] reactive: bool,
    #[case] expected: Vec<(Axis, i64)>,
) {
    let cfg = ControllerCfg {
        active_power_activated: active,
        reactive_power_activated: reactive,
        ..ControllerCfg::default()
    };
    let c = BalancingController::builder()
        .with_meter(FixedMeter::default())
        .with_storage(RecordingStorage::default())
        .with_config(cfg)
        .build()
        .unwrap();
    assert_eq!(c.storage().writes, expected);
    assert_eq!(c.is_enabled(Axis::Active), active);
    assert_eq!(c.is_enabled(Axis::Reactive), reactive);
}

#[rstest]
fn rejected_initial_zero_command_still_builds_disabled() {
    let storage = RecordingStorage {
        reject_writes: true,
        ..RecordingStorage::default()
    };
    let c = BalancingController::builder()
        .with_meter(FixedMeter::default())
        .with_storage(storage)
        .with_config(ControllerCfg {
            active_power_activated: false,
            ..ControllerCfg::default()
        })
        .build()
        .expect("build logs the failed zero command");
    assert!(!c.is_enabled(Axis::Active));
    assert!(c.storage().writes.is_empty());
}

#[rstest]
fn custom_window_capacity_is_used() {
    let mut c = BalancingController::builder()
        .with_meter(FixedMeter::new(10, 0))
        .with_storage(RecordingStorage::default())
        .with_window_capacity(2)
        .build()
        .unwrap();
    for _ in 0..4 {
        c.tick().unwrap();
    }
    assert_eq!(c.window(Axis::Active).len(), 2);
}
