//! Proportional capacity allocation and per-area allocation summaries.
//!
//! Allocation runs independently for every (service area, epoch) group:
//! entities are served largest demand first, each receiving its proportional
//! share of the area's supply, capped by its own demand and by what is left.

use crate::compute::validation::non_negative_mbps;
use crate::error::{CapmapError, Result};
use capmap_types::sample::{AllocationSample, DemandSample, SupplySample};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::collections::BTreeMap;

/// Label for allocation samples that carry no experiment.
pub const UNLABELED_EXPERIMENT: &str = "unlabeled";

/// A (forecast, projection) pairing and the name its results are stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Experiment {
    pub name: String,
    pub forecast_id: String,
    pub projection_id: String,
}

impl Experiment {
    /// Experiments with dedicated names, as (name, forecast, projection).
    pub const NAMED: [(&'static str, &'static str, &'static str); 4] = [
        ("baseline", "base_forecast", "baseline"),
        ("optimized", "base_forecast", "optimized"),
        ("peak_demand", "peak_forecast", "baseline"),
        ("peak_optimized", "peak_forecast", "optimized"),
    ];

    /// Names the pairing. Unlisted pairings are named `{forecast}_{projection}`.
    pub fn resolve(forecast_id: &str, projection_id: &str) -> Result<Self> {
        if forecast_id.is_empty() || projection_id.is_empty() {
            return Err(CapmapError::UnknownExperiment {
                forecast_id: forecast_id.to_string(),
                projection_id: projection_id.to_string(),
            });
        }

        let name = Self::NAMED
            .iter()
            .find(|(_, f, p)| *f == forecast_id && *p == projection_id)
            .map(|(name, _, _)| name.to_string())
            .unwrap_or_else(|| format!("{}_{}", forecast_id, projection_id));

        Ok(Self {
            name,
            forecast_id: forecast_id.to_string(),
            projection_id: projection_id.to_string(),
        })
    }

    /// The four named experiments.
    pub fn named() -> Vec<Self> {
        Self::NAMED
            .iter()
            .map(|(name, forecast, projection)| Self {
                name: name.to_string(),
                forecast_id: forecast.to_string(),
                projection_id: projection.to_string(),
            })
            .collect()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn satisfaction_pct(allocated: f64, demand: f64) -> f64 {
    if demand > 0.0 {
        round_to(allocated / demand * 100.0, 1)
    } else {
        100.0
    }
}

/// Allocates each area's supply to the demand samples of `forecast_id`.
///
/// Output is grouped by (service area, epoch) in ascending order, largest
/// demand first within a group. `allocated_mbps` is rounded to 2 decimals and
/// `satisfaction_pct` to 1; zero-demand entities are 100% satisfied.
pub fn allocate_capacity(
    demand: &[DemandSample],
    supply_by_area: &FxHashMap<String, f64>,
    forecast_id: &str,
) -> Vec<AllocationSample> {
    let mut groups: BTreeMap<(&str, u32), Vec<(&DemandSample, f64)>> = BTreeMap::new();
    for sample in demand.iter().filter(|s| s.forecast_id == forecast_id) {
        let (mbps, _) = non_negative_mbps(sample.demand_mbps);
        groups
            .entry((sample.service_area.as_str(), sample.epoch))
            .or_default()
            .push((sample, mbps));
    }

    let mut allocations = Vec::with_capacity(demand.len());

    for ((service_area, epoch), mut entities) in groups {
        let total_supply = supply_by_area.get(service_area).copied().unwrap_or(0.0);
        let total_demand: f64 = entities.iter().map(|(_, mbps)| mbps).sum();
        let mut remaining = total_supply;

        entities.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (sample, mbps) in entities {
            let fair_share = if total_demand > 0.0 {
                mbps.min(mbps / total_demand * total_supply)
            } else {
                0.0
            };
            let allocated = fair_share.min(remaining);
            remaining -= allocated;

            allocations.push(AllocationSample {
                entity_id: sample.entity_id.clone(),
                lat: sample.lat,
                lon: sample.lon,
                service_area: sample.service_area.clone(),
                demand_mbps: sample.demand_mbps,
                allocated_mbps: round_to(allocated, 2),
                epoch,
                satellite_id: None,
                forecast_id: Some(sample.forecast_id.clone()),
                satisfaction_pct: Some(satisfaction_pct(allocated, mbps)),
                experiment: None,
            });
        }

        log::trace!(
            "Allocated {:.2} of {:.2} Mbps in {} epoch {}",
            total_supply - remaining,
            total_supply,
            service_area,
            epoch
        );
    }

    allocations
}

/// Runs [`allocate_capacity`] for one experiment.
///
/// Supply is restricted to the experiment's projection. Samples are labeled
/// with the experiment name and, where a single satellite supplies the area,
/// with that satellite.
pub fn allocate_experiment(
    demand: &[DemandSample],
    supply: &[SupplySample],
    experiment: &Experiment,
) -> Vec<AllocationSample> {
    let mut totals: FxHashMap<String, f64> = FxHashMap::default();
    let mut satellites: FxHashMap<&str, FxHashSet<&str>> = FxHashMap::default();
    for sample in supply
        .iter()
        .filter(|s| s.projection_id == experiment.projection_id)
    {
        let (mbps, _) = non_negative_mbps(sample.supply_mbps);
        *totals.entry(sample.service_area.clone()).or_default() += mbps;
        satellites
            .entry(sample.service_area.as_str())
            .or_default()
            .insert(sample.satellite_id.as_str());
    }

    let allocations: Vec<AllocationSample> =
        allocate_capacity(demand, &totals, &experiment.forecast_id)
            .into_iter()
            .map(|mut allocation| {
                allocation.experiment = Some(experiment.name.clone());
                let sole = satellites
                    .get(allocation.service_area.as_str())
                    .filter(|sats| sats.len() == 1)
                    .and_then(|sats| sats.iter().next().copied());
                match sole {
                    Some(satellite_id) => allocation.with_satellite(satellite_id),
                    None => allocation,
                }
            })
            .collect();

    log::debug!(
        "Experiment {}: {} allocations over {} supplied areas",
        experiment.name,
        allocations.len(),
        totals.len()
    );

    allocations
}

/// Allocation outcome of one service area within one experiment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaSummary {
    /// Distinct entities, regardless of how many epochs they appear in.
    pub entity_count: usize,
    pub total_demand_mbps: f64,
    pub total_allocated_mbps: f64,
    pub allocation_pct: f64,
    pub avg_satisfaction_pct: f64,
}

/// Summaries keyed by experiment, then service area.
pub type AllocationSummary = BTreeMap<String, BTreeMap<String, AreaSummary>>;

/// Summarizes allocations per experiment and service area.
///
/// Samples without an experiment are grouped under [`UNLABELED_EXPERIMENT`];
/// samples without a stored satisfaction have it derived from their values.
pub fn summarize_allocations(allocations: &[AllocationSample]) -> AllocationSummary {
    #[derive(Default)]
    struct Totals<'a> {
        entities: FxHashSet<&'a str>,
        demand: f64,
        allocated: f64,
        satisfaction: f64,
        samples: usize,
    }

    let mut grouped: BTreeMap<&str, BTreeMap<&str, Totals<'_>>> = BTreeMap::new();
    for sample in allocations {
        let experiment = sample.experiment.as_deref().unwrap_or(UNLABELED_EXPERIMENT);
        let totals = grouped
            .entry(experiment)
            .or_default()
            .entry(sample.service_area.as_str())
            .or_default();

        totals.entities.insert(sample.entity_id.as_str());
        totals.demand += sample.demand_mbps;
        totals.allocated += sample.allocated_mbps;
        totals.satisfaction += sample
            .satisfaction_pct
            .unwrap_or_else(|| satisfaction_pct(sample.allocated_mbps, sample.demand_mbps));
        totals.samples += 1;
    }

    grouped
        .into_iter()
        .map(|(experiment, areas)| {
            let areas = areas
                .into_iter()
                .map(|(area, t)| {
                    let summary = AreaSummary {
                        entity_count: t.entities.len(),
                        total_demand_mbps: round_to(t.demand, 2),
                        total_allocated_mbps: round_to(t.allocated, 2),
                        allocation_pct: if t.demand > 0.0 {
                            round_to(t.allocated / t.demand * 100.0, 1)
                        } else {
                            100.0
                        },
                        avg_satisfaction_pct: round_to(t.satisfaction / t.samples as f64, 1),
                    };
                    (area.to_string(), summary)
                })
                .collect();
            (experiment.to_string(), areas)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand(id: &str, area: &str, mbps: f64, epoch: u32) -> DemandSample {
        DemandSample::new(id, 10.0, 10.0, area, mbps, epoch, "base_forecast")
    }

    fn supply_map(entries: &[(&str, f64)]) -> FxHashMap<String, f64> {
        entries.iter().map(|(a, s)| (a.to_string(), *s)).collect()
    }

    #[test]
    fn test_experiment_names() {
        let name = |f, p| Experiment::resolve(f, p).unwrap().name;
        assert_eq!(name("base_forecast", "baseline"), "baseline");
        assert_eq!(name("base_forecast", "optimized"), "optimized");
        assert_eq!(name("peak_forecast", "baseline"), "peak_demand");
        assert_eq!(name("peak_forecast", "optimized"), "peak_optimized");
        assert_eq!(name("storm_forecast", "baseline"), "storm_forecast_baseline");
        assert!(Experiment::resolve("", "baseline").is_err());
        assert_eq!(Experiment::named().len(), 4);
    }

    #[test]
    fn test_supply_exceeds_demand() {
        let samples = vec![demand("a", "1", 30.0, 0), demand("b", "1", 10.0, 0)];
        let result = allocate_capacity(&samples, &supply_map(&[("1", 100.0)]), "base_forecast");

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].entity_id, "a");
        assert_eq!(result[0].allocated_mbps, 30.0);
        assert_eq!(result[1].allocated_mbps, 10.0);
        assert!(result.iter().all(|a| a.satisfaction_pct == Some(100.0)));
    }

    #[test]
    fn test_proportional_shortfall() {
        let samples = vec![
            demand("small", "1", 20.0, 0),
            demand("large", "1", 60.0, 0),
        ];
        let result = allocate_capacity(&samples, &supply_map(&[("1", 40.0)]), "base_forecast");

        assert_eq!(result[0].entity_id, "large");
        assert_eq!(result[0].allocated_mbps, 30.0);
        assert_eq!(result[0].satisfaction_pct, Some(50.0));
        assert_eq!(result[1].allocated_mbps, 10.0);
    }

    #[test]
    fn test_groups_by_area_and_epoch() {
        let samples = vec![
            demand("a", "1", 50.0, 0),
            demand("a", "1", 50.0, 1),
            demand("b", "2", 50.0, 0),
            DemandSample::new("c", 10.0, 10.0, "1", 50.0, 0, "peak_forecast"),
        ];
        let result = allocate_capacity(
            &samples,
            &supply_map(&[("1", 25.0), ("2", 5.0)]),
            "base_forecast",
        );

        assert_eq!(result.len(), 3);
        let keys: Vec<(&str, u32, f64)> = result
            .iter()
            .map(|a| (a.service_area.as_str(), a.epoch, a.allocated_mbps))
            .collect();
        assert_eq!(keys, vec![("1", 0, 25.0), ("1", 1, 25.0), ("2", 0, 5.0)]);
    }

    #[test]
    fn test_unsupplied_area_and_zero_demand() {
        let samples = vec![demand("a", "9", 10.0, 0), demand("z", "1", 0.0, 0)];
        let result = allocate_capacity(&samples, &supply_map(&[("1", 10.0)]), "base_forecast");

        let unsupplied = result.iter().find(|a| a.entity_id == "a").unwrap();
        assert_eq!(unsupplied.allocated_mbps, 0.0);
        assert_eq!(unsupplied.satisfaction_pct, Some(0.0));

        let idle = result.iter().find(|a| a.entity_id == "z").unwrap();
        assert_eq!(idle.allocated_mbps, 0.0);
        assert_eq!(idle.satisfaction_pct, Some(100.0));
    }

    #[test]
    fn test_never_exceeds_supply_or_demand() {
        let samples: Vec<DemandSample> = (0..40)
            .map(|i| demand(&format!("e{}", i), "1", 1.0 + (i * 7 % 13) as f64, i % 3))
            .collect();
        let supply = supply_map(&[("1", 57.3)]);
        let result = allocate_capacity(&samples, &supply, "base_forecast");

        for epoch in 0..3 {
            let total: f64 = result
                .iter()
                .filter(|a| a.epoch == epoch)
                .map(|a| a.allocated_mbps)
                .sum();
            assert!(total <= 57.3 + 0.01 * 40.0, "epoch {} got {}", epoch, total);
        }
        assert!(result.iter().all(|a| a.allocated_mbps <= a.demand_mbps + 0.005));
    }

    #[test]
    fn test_allocate_experiment_labels() {
        let samples = vec![demand("a", "1", 10.0, 0), demand("b", "2", 10.0, 0)];
        let supply = vec![
            SupplySample::new("baseline", "EU-SAT", "1", 5.0),
            SupplySample::new("baseline", "EU-SAT", "2", 3.0),
            SupplySample::new("baseline", "NA-SAT", "2", 3.0),
            SupplySample::new("optimized", "EU-SAT", "1", 500.0),
        ];
        let experiment = Experiment::resolve("base_forecast", "baseline").unwrap();
        let result = allocate_experiment(&samples, &supply, &experiment);

        assert_eq!(result[0].allocated_mbps, 5.0);
        assert_eq!(result[0].satellite_id.as_deref(), Some("EU-SAT"));
        assert_eq!(result[1].allocated_mbps, 6.0);
        assert_eq!(result[1].satellite_id, None);
        assert!(result.iter().all(|a| a.experiment.as_deref() == Some("baseline")));
    }

    #[test]
    fn test_summarize_allocations() {
        let samples = vec![demand("a", "1", 30.0, 0), demand("a", "1", 10.0, 1)];
        let experiment = Experiment::resolve("base_forecast", "baseline").unwrap();
        let supply = vec![SupplySample::new("baseline", "EU-SAT", "1", 15.0)];
        let allocations = allocate_experiment(&samples, &supply, &experiment);

        let summary = summarize_allocations(&allocations);
        let area = &summary["baseline"]["1"];
        assert_eq!(area.entity_count, 1);
        assert_eq!(area.total_demand_mbps, 40.0);
        assert_eq!(area.total_allocated_mbps, 25.0);
        assert_eq!(area.allocation_pct, 62.5);
        assert_eq!(area.avg_satisfaction_pct, 75.0);
    }

    #[test]
    fn test_summarize_unlabeled() {
        let samples = vec![AllocationSample::new("a", 0.0, 0.0, "1", 0.0, 0.0, 0)];
        let summary = summarize_allocations(&samples);
        let area = &summary[UNLABELED_EXPERIMENT]["1"];
        assert_eq!(area.allocation_pct, 100.0);
        assert_eq!(area.avg_satisfaction_pct, 100.0);
    }
}
