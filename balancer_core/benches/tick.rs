use balancer_core::allocation::{ApparentPowerLimiter, Bounds, PowerAllocator};
use balancer_core::mocks::FixedMeter;
use balancer_core::{BalancingController, SampleWindow};
use balancer_traits::{BoxError, DispatchSink, Storage};
use criterion::{Criterion, black_box, criterion_group, criterion_main};

// Storage that accepts every setpoint and keeps only the last one
#[derive(Default)]
struct NullStorage {
    last: (Option<i64>, Option<i64>),
}

impl DispatchSink for NullStorage {
    fn set_active_power(&mut self, watts: i64) -> Result<(), BoxError> {
        self.last.0 = Some(watts);
        Ok(())
    }
    fn set_reactive_power(&mut self, var: i64) -> Result<(), BoxError> {
        self.last.1 = Some(var);
        Ok(())
    }
    fn write_min(&mut self) -> Result<Option<i64>, BoxError> {
        Ok(None)
    }
    fn write_max(&mut self) -> Result<Option<i64>, BoxError> {
        Ok(None)
    }
    fn last_setpoint(&self, axis: balancer_traits::Axis) -> Option<i64> {
        match axis {
            balancer_traits::Axis::Active => self.last.0,
            balancer_traits::Axis::Reactive => self.last.1,
        }
    }
}

impl Storage for NullStorage {
    fn id(&self) -> &str {
        "bench"
    }
    fn active_power(&mut self) -> Result<i64, BoxError> {
        Ok(self.last.0.unwrap_or(0))
    }
    fn reactive_power(&mut self) -> Result<i64, BoxError> {
        Ok(self.last.1.unwrap_or(0))
    }
    fn allowed_charge(&mut self) -> Result<u64, BoxError> {
        Ok(5_000)
    }
    fn allowed_discharge(&mut self) -> Result<u64, BoxError> {
        Ok(5_000)
    }
}

fn sample_size(g: &mut criterion::BenchmarkGroup<'_, criterion::measurement::WallTime>) {
    //   BENCH_SAMPLE_SIZE=10 cargo bench -p balancer_core --bench tick
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE")
        && let Ok(n) = ss.parse::<usize>()
    {
        g.sample_size(n.max(10));
    }
}

pub fn bench_tick(c: &mut Criterion) {
    let mut g = c.benchmark_group("tick");
    sample_size(&mut g);

    let mut ctrl = BalancingController::builder()
        .with_meter(FixedMeter::new(3_200, 900))
        .with_storage(NullStorage::default())
        .build()
        .expect("build controller");
    g.bench_function("full_cycle", |b| {
        b.iter(|| {
            let report = ctrl.tick().expect("tick");
            black_box(report.allocated_active);
        })
    });

    let mut w = SampleWindow::new();
    let mut x = 0i64;
    g.bench_function("window_push_average", |b| {
        b.iter(|| {
            x = x.wrapping_add(7_919);
            w.push(black_box(x % 10_000));
            black_box(w.average().ok());
        })
    });

    let bounds = Bounds::new(-2_500, 2_500);
    g.bench_function("apparent_power_limiter", |b| {
        b.iter(|| {
            let a = ApparentPowerLimiter;
            black_box(a.allocate_active(black_box(3_000), black_box(4_000), bounds));
        })
    });
    g.finish();
}

criterion_group!(tick, bench_tick);
criterion_main!(tick);
