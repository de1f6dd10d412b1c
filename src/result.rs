use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use good_lp::Solution as GoodLpSolution;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::model::VariableSet;
use crate::optimizer::FleetSnapshot;

/// Raw per-variable values pulled out of a solved model, before they are
/// reshaped into the public per-battery / site / aggregated tables.
pub(crate) struct RawSolution {
    pub objective_value: f64,
    pub battery_ids: Vec<u32>,
    pub chg: Vec<Vec<f64>>,
    pub dis: Vec<Vec<f64>>,
    pub energy: Vec<Vec<f64>>,
    pub flex_pos: Vec<Vec<Option<f64>>>,
    pub flex_neg: Vec<Vec<Option<f64>>>,
    pub p_site: Vec<f64>,
    pub p_imp: Vec<f64>,
    pub p_exp: Vec<f64>,
    pub peak_imp: f64,
    pub peak_exp: f64,
    pub curt: Vec<f64>,
}

impl RawSolution {
    pub(crate) fn extract(solution: &impl GoodLpSolution, vars: &VariableSet, snapshot: &FleetSnapshot) -> Self {
        let steps = snapshot.horizon.steps;
        let n_batteries = snapshot.batteries.len();

        let chg = (0..n_batteries)
            .map(|b| (0..steps).map(|t| solution.value(vars.chg[b][t])).collect())
            .collect();
        let dis = (0..n_batteries)
            .map(|b| (0..steps).map(|t| solution.value(vars.dis[b][t])).collect())
            .collect();
        let energy = (0..n_batteries)
            .map(|b| (0..=steps).map(|t| solution.value(vars.e[b][t])).collect())
            .collect();
        let flex_pos = (0..n_batteries)
            .map(|b| (0..steps).map(|t| vars.flex_pos[b][t].map(|v| solution.value(v))).collect())
            .collect();
        let flex_neg = (0..n_batteries)
            .map(|b| (0..steps).map(|t| vars.flex_neg[b][t].map(|v| solution.value(v))).collect())
            .collect();

        let p_site = (0..steps).map(|t| solution.value(vars.p_site[t])).collect();
        let p_imp = (0..steps).map(|t| solution.value(vars.p_imp[t])).collect();
        let p_exp = (0..steps).map(|t| solution.value(vars.p_exp[t])).collect();
        let curt = (0..steps)
            .map(|t| vars.curt[t].map(|v| solution.value(v)).unwrap_or(0.0))
            .collect();

        Self {
            objective_value: f64::NAN,
            battery_ids: snapshot.batteries.iter().map(|b| b.id).collect(),
            chg,
            dis,
            energy,
            flex_pos,
            flex_neg,
            p_site,
            p_imp,
            p_exp,
            peak_imp: solution.value(vars.peak_imp),
            peak_exp: solution.value(vars.peak_exp),
            curt,
        }
    }
}

/// Per-battery dispatch for a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatteryRow {
    pub battery_id: u32,
    pub step: usize,
    pub power_kw: f64,
    pub charge_kw: f64,
    pub discharge_kw: f64,
    pub energy_content_kwh: f64,
    pub flex_pos: Option<f64>,
    pub flex_neg: Option<f64>,
    pub connected: bool,
}

/// Site-wide dispatch for a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRow {
    pub step: usize,
    pub power_kw: f64,
    pub site_load: f64,
    pub grid_import_kw: f64,
    pub grid_export_kw: f64,
    pub curtailment_kw: f64,
    pub flex_pos: f64,
    pub flex_neg: f64,
}

/// Time-indexed aggregate across all batteries in one fleet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub step: usize,
    pub power_kw_site: f64,
    pub energy_content_kwh: f64,
}

/// Horizon-wide grid totals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GridTotals {
    pub imported_kwh: f64,
    pub exported_kwh: f64,
    pub peak_import_kw: f64,
    pub peak_export_kw: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Feasible,
}

/// The full result of a single fleet's `optimize()` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FleetResult {
    pub status: SolveStatus,
    pub objective_value: f64,
    /// `baseline_cost - objective_value` from the `calculate_savings`
    /// feasibility pass; `None` unless that flag was set.
    pub savings_sek: Option<f64>,
    pub datetime_index: Option<Vec<DateTime<Utc>>>,
    pub battery_rows: Vec<BatteryRow>,
    pub site_rows: Vec<SiteRow>,
    pub aggregated_rows: Vec<AggregatedRow>,
    pub grid_totals: GridTotals,
}

impl FleetResult {
    pub(crate) fn project(raw: RawSolution, snapshot: &FleetSnapshot, savings_sek: Option<f64>) -> Self {
        let objective_value = raw.objective_value;
        let steps = snapshot.horizon.steps;
        let dt = snapshot.horizon.dt;

        let mut battery_rows = Vec::with_capacity(raw.battery_ids.len() * steps);
        for (b, &battery_id) in raw.battery_ids.iter().enumerate() {
            for t in 0..steps {
                battery_rows.push(BatteryRow {
                    battery_id,
                    step: t,
                    power_kw: raw.chg[b][t] - raw.dis[b][t],
                    charge_kw: raw.chg[b][t],
                    discharge_kw: raw.dis[b][t],
                    energy_content_kwh: raw.energy[b][t],
                    flex_pos: raw.flex_pos[b][t],
                    flex_neg: raw.flex_neg[b][t],
                    connected: snapshot.batteries[b].connected.get(t).copied().unwrap_or(false),
                });
            }
        }

        let site_rows: Vec<SiteRow> = (0..steps)
            .map(|t| {
                let flex_pos: f64 = raw.flex_pos.iter().filter_map(|row| row[t]).sum();
                let flex_neg: f64 = raw.flex_neg.iter().filter_map(|row| row[t]).sum();
                SiteRow {
                    step: t,
                    power_kw: raw.p_site[t],
                    site_load: snapshot.site_load.as_ref().map(|series| series[t]).unwrap_or(0.0),
                    grid_import_kw: raw.p_imp[t],
                    grid_export_kw: raw.p_exp[t],
                    curtailment_kw: raw.curt[t],
                    flex_pos,
                    flex_neg,
                }
            })
            .collect();

        let aggregated_rows: Vec<AggregatedRow> = (0..steps)
            .map(|t| AggregatedRow {
                step: t,
                power_kw_site: raw.p_site[t],
                energy_content_kwh: raw.energy.iter().map(|row| row[t]).sum(),
            })
            .collect();

        let grid_totals = GridTotals {
            imported_kwh: raw.p_imp.iter().sum::<f64>() * dt,
            exported_kwh: raw.p_exp.iter().sum::<f64>() * dt,
            peak_import_kw: raw.peak_imp,
            peak_export_kw: raw.peak_exp,
        };

        Self {
            status: SolveStatus::Optimal,
            objective_value,
            savings_sek,
            datetime_index: snapshot.horizon.datetime_index.clone(),
            battery_rows,
            site_rows,
            aggregated_rows,
            grid_totals,
        }
    }
}

/// A portfolio view composing several sites' `FleetResult`s by `site_id`.
/// Site-level results must share the same datetime axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolResult {
    pub battery_rows: Vec<BatteryRow>,
    pub site_rows: Vec<SiteRow>,
    pub grid_totals: GridTotals,
}

impl PoolResult {
    pub fn from_sites(results: &BTreeMap<i64, FleetResult>) -> Self {
        let mut battery_rows = Vec::new();
        let mut site_rows_by_step: BTreeMap<usize, SiteRow> = BTreeMap::new();
        let mut grid_totals = GridTotals {
            imported_kwh: 0.0,
            exported_kwh: 0.0,
            peak_import_kw: 0.0,
            peak_export_kw: 0.0,
        };

        for result in results.values() {
            battery_rows.extend(result.battery_rows.iter().cloned());
            grid_totals.imported_kwh += result.grid_totals.imported_kwh;
            grid_totals.exported_kwh += result.grid_totals.exported_kwh;
            grid_totals.peak_import_kw = grid_totals.peak_import_kw.max(result.grid_totals.peak_import_kw);
            grid_totals.peak_export_kw = grid_totals.peak_export_kw.max(result.grid_totals.peak_export_kw);

            for row in &result.site_rows {
                let entry = site_rows_by_step.entry(row.step).or_insert_with(|| SiteRow {
                    step: row.step,
                    power_kw: 0.0,
                    site_load: 0.0,
                    grid_import_kw: 0.0,
                    grid_export_kw: 0.0,
                    curtailment_kw: 0.0,
                    flex_pos: 0.0,
                    flex_neg: 0.0,
                });
                entry.power_kw += row.power_kw;
                entry.site_load += row.site_load;
                entry.grid_import_kw += row.grid_import_kw;
                entry.grid_export_kw += row.grid_export_kw;
                entry.curtailment_kw += row.curtailment_kw;
                entry.flex_pos += row.flex_pos;
                entry.flex_neg += row.flex_neg;
            }
        }

        let battery_rows = battery_rows
            .into_iter()
            .sorted_by_key(|row| (row.battery_id, row.step))
            .collect();

        Self {
            battery_rows,
            site_rows: site_rows_by_step.into_values().collect(),
            grid_totals,
        }
    }
}
