use capmap::aggregate::{CellField, aggregate, derive_range};
use capmap::allocation::{Experiment, allocate_experiment};
use capmap::config::ViewParams;
use capmap::grid::GridResolution;
use capmap::layers::{LayerInputs, LayerKind, LayerVisibility, compose};
use capmap::{AllocationSample, DemandSample, SupplySample};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

fn demand_samples(count: usize) -> Vec<DemandSample> {
    (0..count)
        .map(|i| {
            let lat = 25.0 + (i % 200) as f64 * 0.12;
            let lon = -125.0 + (i / 200 % 300) as f64 * 0.19;
            DemandSample::new(
                format!("entity:{}", i % 5000),
                lat,
                lon,
                format!("{}", i % 8),
                10.0 + (i % 97) as f64,
                (i % 24) as u32,
                "base_forecast",
            )
        })
        .collect()
}

fn supply_samples() -> Vec<SupplySample> {
    (0..8)
        .map(|area| SupplySample::new("baseline", "NA-SAT", format!("{}", area), 20_000.0))
        .collect()
}

fn benchmark_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregation");

    for count in [1_000, 10_000, 100_000] {
        let samples = demand_samples(count);
        group.bench_with_input(BenchmarkId::new("demand_res4", count), &samples, |b, s| {
            b.iter(|| aggregate(black_box(s), GridResolution::new(4).unwrap()))
        });
    }

    let samples = demand_samples(10_000);
    for res in GridResolution::SUPPORTED {
        let resolution = GridResolution::new(res).unwrap();
        group.bench_with_input(BenchmarkId::new("demand_10k", res), &samples, |b, s| {
            b.iter(|| aggregate(black_box(s), resolution))
        });
    }

    let result = aggregate(&samples, GridResolution::new(5).unwrap());
    group.bench_function("derive_range", |b| {
        b.iter(|| derive_range(black_box(result.cells.values()), CellField::SumDemand))
    });

    group.finish();
}

fn benchmark_allocation(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation");

    let demand = demand_samples(50_000);
    let supply = supply_samples();
    let experiment = Experiment::resolve("base_forecast", "baseline").unwrap();

    group.bench_function("allocate_50k", |b| {
        b.iter(|| allocate_experiment(black_box(&demand), black_box(&supply), &experiment))
    });

    let allocations: Vec<AllocationSample> = allocate_experiment(&demand, &supply, &experiment);
    group.bench_function("aggregate_allocations_50k", |b| {
        b.iter(|| aggregate(black_box(&allocations), GridResolution::new(4).unwrap()))
    });

    group.finish();
}

fn benchmark_composition(c: &mut Criterion) {
    let mut group = c.benchmark_group("composition");

    let demand = aggregate(&demand_samples(50_000), GridResolution::new(6).unwrap());
    let allocation = FxHashMap::default();
    let totals = FxHashMap::default();
    let selected = BTreeSet::new();

    for kind in [LayerKind::Demand, LayerKind::Allocation] {
        let inputs = LayerInputs {
            visibility: LayerVisibility::default().with(kind, true),
            view: ViewParams::default(),
            demand_cells: &demand.cells,
            allocation_cells: &allocation,
            coverage: &[],
            service_areas: &[],
            supply_by_area: &totals,
            demand_by_area: &totals,
            selected_satellites: &selected,
        };
        group.bench_function(format!("compose_{:?}", kind), |b| {
            b.iter(|| compose(black_box(&inputs)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_aggregation,
    benchmark_allocation,
    benchmark_composition
);
criterion_main!(benches);
