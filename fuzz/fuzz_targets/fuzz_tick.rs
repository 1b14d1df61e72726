#![no_main]
use balancer_core::mocks::{FixedMeter, RecordingStorage};
use balancer_core::{Axis, BalancingController};
use libfuzzer_sys::arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Step {
    meter_active: i64,
    meter_reactive: i64,
    storage_active: i64,
    storage_reactive: i64,
    allowed_charge: u64,
    allowed_discharge: u64,
    active_on: bool,
    reactive_on: bool,
}

fuzz_target!(|steps: Vec<Step>| {
    let Ok(mut c) = BalancingController::builder()
        .with_meter(FixedMeter::default())
        .with_storage(RecordingStorage::default())
        .build()
    else {
        return;
    };

    for s in steps.iter().take(64) {
        c.meter_mut().active = s.meter_active;
        c.meter_mut().reactive = s.meter_reactive;
        c.storage_mut().active = s.storage_active;
        c.storage_mut().reactive = s.storage_reactive;
        c.storage_mut().allowed_charge = s.allowed_charge;
        c.storage_mut().allowed_discharge = s.allowed_discharge;
        let _ = c.set_axis_enabled(Axis::Active, s.active_on);
        let _ = c.set_axis_enabled(Axis::Reactive, s.reactive_on);

        // Extreme readings must saturate, never panic
        if let Ok(r) = c.tick() {
            assert_eq!(r.dispatched_active.is_some(), s.active_on);
            assert_eq!(r.dispatched_reactive.is_some(), s.reactive_on);
        }
        c.storage_mut().writes.clear();
    }
});
