use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

use super::{Battery, ChargingPoint, Grid};

/// Thin owning aggregate grouping a site's charging points, stationary
/// batteries, grid connection, and site-load restrictions — the natural
/// unit a request-ingest document's `site_specifications` deserializes
/// into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub site_id: i64,
    pub n_charging_points: i64,
    pub country: Option<String>,
    pub voltage_level: Option<f64>,
    pub charging_points: Vec<ChargingPoint>,
    pub stationary_batteries: Vec<Battery>,
    pub grid: Option<Grid>,
    pub siteload_restriction_half_hour_charge: Option<f64>,
    pub siteload_restriction_half_hour_discharge: Option<f64>,
    pub site_load_components: Vec<String>,
}

impl Site {
    pub fn new(site_id: i64) -> Result<Self, ValidationError> {
        Self::with_charging_point_count(site_id, 0)
    }

    pub fn with_charging_point_count(site_id: i64, n_charging_points: i64) -> Result<Self, ValidationError> {
        if site_id < 0 {
            return Err(ValidationError::NegativeSiteId(site_id));
        }
        if n_charging_points < 0 {
            return Err(ValidationError::NegativeChargingPointCount(n_charging_points));
        }
        Ok(Self {
            site_id,
            n_charging_points,
            country: None,
            voltage_level: None,
            charging_points: Vec::new(),
            stationary_batteries: Vec::new(),
            grid: None,
            siteload_restriction_half_hour_charge: None,
            siteload_restriction_half_hour_discharge: None,
            site_load_components: Vec::new(),
        })
    }

    pub fn add_charging_point(&mut self, cp: ChargingPoint) {
        self.charging_points.push(cp);
        self.n_charging_points += 1;
    }

    pub fn add_stationary_battery(&mut self, battery: Battery) {
        self.stationary_batteries.push(battery);
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let batteries: Vec<String> = self
            .stationary_batteries
            .iter()
            .map(|b| format!("StationaryBattery(id={}, capacity={})", b.id, b.capacity_kwh))
            .collect();
        let cps: Vec<String> = self
            .charging_points
            .iter()
            .map(|cp| format!("ChargingPoint({})", cp.asset_id))
            .collect();
        write!(
            f,
            "Site {}\n- Stationary Batteries: [{}]\n- Charging Points: [{}]",
            self.site_id,
            batteries.join(", "),
            cps.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Site {
        let mut site = Site::with_charging_point_count(1, 2).unwrap();
        site.country = Some("Germany".to_string());
        site.voltage_level = Some(400.0);
        site.grid = Some(Grid::new(100.0, 200.0).unwrap());
        site.siteload_restriction_half_hour_charge = Some(150.0);
        site.siteload_restriction_half_hour_discharge = Some(100.0);
        site.site_load_components = vec!["component1".to_string(), "component2".to_string()];
        site.charging_points.push(ChargingPoint::new(1741, 65.0, 60.0, 0.95, 0.95));
        site.stationary_batteries
            .push(Battery::stationary(42, 100.0, 10.0, 90.0, 50.0, 50.0, 10).unwrap());
        site
    }

    #[test]
    fn creation_carries_fields() {
        let site = sample();
        assert_eq!(site.site_id, 1);
        assert_eq!(site.n_charging_points, 2);
        assert_eq!(site.country.as_deref(), Some("Germany"));
        assert_eq!(site.voltage_level, Some(400.0));
    }

    #[test]
    fn rejects_negative_ids() {
        assert!(Site::new(-1).is_err());
        assert!(Site::with_charging_point_count(1, -2).is_err());
    }

    #[test]
    fn add_charging_point_increments_count() {
        let mut site = sample();
        site.add_charging_point(ChargingPoint::new(1742, 65.0, 60.0, 0.95, 0.95));
        assert_eq!(site.charging_points.len(), 2);
        assert_eq!(site.n_charging_points, 3);
    }

    #[test]
    fn add_stationary_battery_appends() {
        let mut site = sample();
        site.add_stationary_battery(Battery::stationary(43, 200.0, 20.0, 180.0, 100.0, 100.0, 10).unwrap());
        assert_eq!(site.stationary_batteries.len(), 2);
    }

    #[test]
    fn display_matches_expected_format() {
        let site = sample();
        assert_eq!(
            site.to_string(),
            "Site 1\n- Stationary Batteries: [StationaryBattery(id=42, capacity=100)]\n- Charging Points: [ChargingPoint(1741)]"
        );
    }
}
