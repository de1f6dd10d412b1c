use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::config::FleetConfig;
use crate::domain::{Battery, ChargingPoint, Grid};
use crate::error::{ConfigError, FleetError, ValidationError};
use crate::horizon::Horizon;
use crate::result::FleetResult;
use crate::solver;

/// Immutable, frozen state an `optimize()` call builds the MILP from. A
/// `FleetOptimizer` snapshots itself into one of these each time it is
/// invoked; the snapshot never changes underneath a running solve.
pub struct FleetSnapshot {
    pub horizon: Horizon,
    pub batteries: Vec<Battery>,
    pub charging_points: Vec<ChargingPoint>,
    pub grid: Option<Grid>,
    pub price_import: Vec<f64>,
    pub price_export: Vec<f64>,
    pub capacity_tariff_imp: f64,
    pub capacity_tariff_exp: f64,
    pub triad_imp: Option<Vec<f64>>,
    pub triad_exp: Option<Vec<f64>>,
    pub site_load: Option<Vec<f64>>,
    pub site_cap_chg: Option<f64>,
    pub site_cap_dis: Option<f64>,
    pub marketed_volume: Option<Vec<Option<f64>>>,
    pub price_flex_pos: Option<Vec<f64>>,
    pub price_flex_neg: Option<Vec<f64>>,
    pub marketed_flex_pos: Option<Vec<f64>>,
    pub marketed_flex_neg: Option<Vec<f64>>,
    pub config: FleetConfig,
}

/// Builder that accumulates asset registrations, market series, and feature
/// flags; `optimize()` freezes this state into a `FleetSnapshot`, builds the
/// MILP, and solves it. Every `add_*` call mutates builder state and must
/// precede `optimize()`; re-optimizing after further registrations replaces
/// the previous model entirely.
#[derive(Default)]
pub struct FleetOptimizer {
    batteries: Vec<Battery>,
    charging_points: Vec<ChargingPoint>,
    grid: Option<Grid>,
    price_import: Option<Vec<f64>>,
    price_export: Option<Vec<f64>>,
    capacity_tariff_imp: f64,
    capacity_tariff_exp: f64,
    triad_imp: Option<Vec<f64>>,
    triad_exp: Option<Vec<f64>>,
    site_load: Option<Vec<f64>>,
    site_cap_chg: Option<f64>,
    site_cap_dis: Option<f64>,
    limit_as_penalty: bool,
    date_range: Option<Vec<DateTime<Utc>>>,
    marketed_volume: Option<Vec<Option<f64>>>,
    price_flex_pos: Option<Vec<f64>>,
    price_flex_neg: Option<Vec<f64>>,
    symmetrical_flex: bool,
    marketed_flex_pos: Option<Vec<f64>>,
    marketed_flex_neg: Option<Vec<f64>>,
    dt: f64,
    config: FleetConfig,
}

impl FleetOptimizer {
    pub fn new(dt: f64) -> Self {
        Self {
            dt,
            ..Self::default()
        }
    }

    pub fn with_config(mut self, config: FleetConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add_battery(mut self, battery: Battery) -> Self {
        self.batteries.push(battery);
        self
    }

    pub fn add_charging_point(mut self, cp: ChargingPoint) -> Self {
        self.charging_points.push(cp);
        self
    }

    pub fn add_grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_prices(
        mut self,
        import: Vec<f64>,
        export: Option<Vec<f64>>,
        capacity_imp: Option<f64>,
        capacity_exp: Option<f64>,
        triad_imp: Option<Vec<f64>>,
        triad_exp: Option<Vec<f64>>,
    ) -> Self {
        self.price_export = export.or_else(|| Some(import.clone()));
        self.price_import = Some(import);
        self.capacity_tariff_imp = capacity_imp.unwrap_or(0.0);
        self.capacity_tariff_exp = capacity_exp.unwrap_or(0.0);
        self.triad_imp = triad_imp;
        self.triad_exp = triad_exp;
        self
    }

    pub fn add_site_load(mut self, series: Vec<f64>) -> Self {
        self.site_load = Some(series);
        self
    }

    pub fn add_site_limits(
        mut self,
        site_load_restriction_charge: Option<f64>,
        site_load_restriction_discharge: Option<f64>,
        limit_as_penalty: Option<bool>,
    ) -> Self {
        self.site_cap_chg = site_load_restriction_charge;
        self.site_cap_dis = site_load_restriction_discharge;
        if let Some(flag) = limit_as_penalty {
            self.limit_as_penalty = flag;
        }
        self
    }

    pub fn add_date_range(mut self, index: Vec<DateTime<Utc>>) -> Self {
        self.date_range = Some(index);
        self
    }

    pub fn add_marketed_volumes(mut self, series: Vec<Option<f64>>) -> Self {
        self.marketed_volume = Some(series);
        self
    }

    pub fn add_flex(mut self, prices_flex_pos: Vec<f64>, prices_flex_neg: Vec<f64>, symmetrical_flex: Option<bool>) -> Self {
        self.price_flex_pos = Some(prices_flex_pos);
        self.price_flex_neg = Some(prices_flex_neg);
        if let Some(flag) = symmetrical_flex {
            self.symmetrical_flex = flag;
        }
        self
    }

    pub fn add_marketed_flex(mut self, pos: Vec<f64>, neg: Vec<f64>) -> Self {
        self.marketed_flex_pos = Some(pos);
        self.marketed_flex_neg = Some(neg);
        self
    }

    fn max_registered_length(&self) -> usize {
        let mut lengths = vec![
            self.price_import.as_ref().map_or(0, Vec::len),
            self.price_export.as_ref().map_or(0, Vec::len),
            self.site_load.as_ref().map_or(0, Vec::len),
            self.marketed_volume.as_ref().map_or(0, Vec::len),
            self.triad_imp.as_ref().map_or(0, Vec::len),
            self.triad_exp.as_ref().map_or(0, Vec::len),
            self.price_flex_pos.as_ref().map_or(0, Vec::len),
            self.price_flex_neg.as_ref().map_or(0, Vec::len),
            self.marketed_flex_pos.as_ref().map_or(0, Vec::len),
            self.marketed_flex_neg.as_ref().map_or(0, Vec::len),
            self.date_range.as_ref().map_or(0, Vec::len),
        ];
        lengths.extend(self.batteries.iter().map(|b| b.connected.len()));
        lengths.into_iter().max().unwrap_or(0)
    }

    fn validate_lengths(&self, steps: usize) -> Result<(), ValidationError> {
        for battery in &self.batteries {
            if battery.connected.len() != steps {
                return Err(ValidationError::ConnectionLengthMismatch {
                    battery_id: battery.id,
                    actual: battery.connected.len(),
                    expected: steps,
                });
            }
            if let Some(cp_id) = battery.affected_charging_point_id {
                if !self.charging_points.iter().any(|cp| cp.asset_id == cp_id) {
                    return Err(ValidationError::UnknownChargingPoint {
                        battery_id: battery.id,
                        cp_id,
                    });
                }
            }
        }
        let named: [(&'static str, Option<usize>); 9] = [
            ("price_import", self.price_import.as_ref().map(Vec::len)),
            ("price_export", self.price_export.as_ref().map(Vec::len)),
            ("site_load", self.site_load.as_ref().map(Vec::len)),
            ("marketed_volume", self.marketed_volume.as_ref().map(Vec::len)),
            ("triad_imp", self.triad_imp.as_ref().map(Vec::len)),
            ("triad_exp", self.triad_exp.as_ref().map(Vec::len)),
            ("price_flex_pos", self.price_flex_pos.as_ref().map(Vec::len)),
            ("price_flex_neg", self.price_flex_neg.as_ref().map(Vec::len)),
            ("date_range", self.date_range.as_ref().map(Vec::len)),
        ];
        for (name, len) in named {
            if let Some(len) = len {
                if len != steps {
                    return Err(ValidationError::SeriesLengthMismatch {
                        name,
                        actual: len,
                        expected: steps,
                    });
                }
            }
        }
        Ok(())
    }

    fn validate_config(&self) -> Result<(), ConfigError> {
        if (self.marketed_flex_pos.is_some() || self.marketed_flex_neg.is_some())
            && (self.price_flex_pos.is_none() || self.price_flex_neg.is_none())
        {
            return Err(ConfigError::MarketedFlexWithoutPrices);
        }
        if self.symmetrical_flex && (self.price_flex_pos.is_none() || self.price_flex_neg.is_none()) {
            return Err(ConfigError::SymmetricalFlexWithoutPrices);
        }
        if self.config.allow_curtailment && self.site_load.is_none() {
            return Err(ConfigError::CurtailmentWithoutSiteLoad);
        }
        if self.limit_as_penalty && self.site_cap_chg.is_none() && self.site_cap_dis.is_none() && self.grid.is_none() {
            return Err(ConfigError::LimitPenaltyWithoutLimits);
        }
        Ok(())
    }

    /// `single_continuous_session_allowed` restricts *use* within an ongoing
    /// connection window; it does not arbitrate across separate connect/
    /// disconnect events. Reject registrations where the flag is set but a
    /// battery's own connection schedule already has more than one session.
    fn validate_sessions(&self) -> Result<(), ValidationError> {
        if !self.config.single_continuous_session_allowed {
            return Ok(());
        }
        for battery in &self.batteries {
            if !battery.has_single_charging_session() {
                return Err(ValidationError::MultipleChargingSessions { battery_id: battery.id });
            }
        }
        Ok(())
    }

    /// Freezes builder state, builds and solves the MILP, and projects the
    /// solution into a `FleetResult`. Returns a `ValidationError` or
    /// `ConfigError` before ever touching the solver; a `SolveError`
    /// otherwise. The builder's own state is unchanged on failure.
    #[instrument(skip(self), fields(batteries = self.batteries.len()))]
    pub fn optimize(&self) -> Result<FleetResult, FleetError> {
        if self.batteries.is_empty() {
            return Err(ValidationError::EmptyFleet.into());
        }

        let steps = self.max_registered_length();
        if steps == 0 {
            return Err(ValidationError::EmptyHorizon.into());
        }
        self.validate_lengths(steps)?;
        self.validate_config()?;
        self.validate_sessions()?;

        let mut config = self.config.clone();
        config.symmetrical_flex = config.symmetrical_flex || self.symmetrical_flex;
        config.limit_as_penalty = config.limit_as_penalty || self.limit_as_penalty;

        let mut horizon = Horizon::new(self.dt, steps)?;
        if let Some(index) = &self.date_range {
            horizon = horizon.with_datetime_index(index.clone())?;
        }

        let price_import = self.price_import.clone().unwrap_or_else(|| vec![0.0; steps]);
        let price_export = self.price_export.clone().unwrap_or_else(|| price_import.clone());

        let snapshot = FleetSnapshot {
            horizon,
            batteries: self.batteries.clone(),
            charging_points: self.charging_points.clone(),
            grid: self.grid.clone(),
            price_import,
            price_export,
            capacity_tariff_imp: self.capacity_tariff_imp,
            capacity_tariff_exp: self.capacity_tariff_exp,
            triad_imp: self.triad_imp.clone(),
            triad_exp: self.triad_exp.clone(),
            site_load: self.site_load.clone(),
            site_cap_chg: self.site_cap_chg,
            site_cap_dis: self.site_cap_dis,
            marketed_volume: self.marketed_volume.clone(),
            price_flex_pos: self.price_flex_pos.clone(),
            price_flex_neg: self.price_flex_neg.clone(),
            marketed_flex_pos: self.marketed_flex_pos.clone(),
            marketed_flex_neg: self.marketed_flex_neg.clone(),
            config,
        };

        let raw = solver::solve(&snapshot)?;
        let savings_sek = if snapshot.config.calculate_savings {
            let baseline_cost = solver::solve_baseline(&snapshot)?;
            Some(baseline_cost - raw.objective_value)
        } else {
            None
        };
        Ok(FleetResult::project(raw, &snapshot, savings_sek))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_fleet() {
        let result = FleetOptimizer::new(0.5).optimize();
        assert!(matches!(result, Err(FleetError::Validation(ValidationError::EmptyFleet))));
    }

    #[test]
    fn rejects_mismatched_connection_length() {
        let battery = Battery::mobile(1, 40.0, 5.0, 40.0, 10.0, 40.0, 5.0, 0.0, vec![true; 5]).unwrap();
        let optimizer = FleetOptimizer::new(0.5)
            .add_battery(battery)
            .add_prices(vec![1.0; 10], None, None, None, None, None);
        assert!(matches!(
            optimizer.optimize(),
            Err(FleetError::Validation(ValidationError::ConnectionLengthMismatch { .. }))
        ));
    }

    #[test]
    fn rejects_marketed_flex_without_prices() {
        let battery = Battery::mobile(1, 40.0, 5.0, 40.0, 10.0, 40.0, 5.0, 0.0, vec![true; 4]).unwrap();
        let optimizer = FleetOptimizer::new(0.5)
            .add_battery(battery)
            .add_prices(vec![1.0; 4], None, None, None, None, None)
            .add_marketed_flex(vec![0.0; 4], vec![0.0; 4]);
        assert!(matches!(
            optimizer.optimize(),
            Err(FleetError::Config(ConfigError::MarketedFlexWithoutPrices))
        ));
    }

    #[test]
    fn rejects_multiple_sessions_when_single_session_required() {
        let battery = Battery::mobile(1, 40.0, 5.0, 40.0, 10.0, 40.0, 5.0, 0.0, vec![true, false, true, false]).unwrap();
        let optimizer = FleetOptimizer::new(0.5)
            .add_battery(battery)
            .add_prices(vec![1.0; 4], None, None, None, None, None)
            .with_config(crate::config::FleetConfig {
                single_continuous_session_allowed: true,
                ..crate::config::FleetConfig::default()
            });
        assert!(matches!(
            optimizer.optimize(),
            Err(FleetError::Validation(ValidationError::MultipleChargingSessions { battery_id: 1 }))
        ));
    }

    #[test]
    fn accepts_grid_registration_and_uses_its_limits() {
        use crate::domain::Grid;
        let battery = Battery::mobile(1, 40.0, 0.0, 40.0, 10.0, 40.0, 5.0, 0.0, vec![true; 4]).unwrap();
        let grid = Grid::new(3.0, 3.0).unwrap();
        let result = FleetOptimizer::new(0.5)
            .add_battery(battery)
            .add_prices(vec![1.0; 4], None, None, None, None, None)
            .add_grid(grid)
            .optimize()
            .unwrap();
        for row in &result.site_rows {
            assert!(row.grid_import_kw <= 3.0 + 1e-4);
            assert!(row.grid_export_kw <= 3.0 + 1e-4);
        }
    }
}
