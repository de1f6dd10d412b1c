use serde::{Deserialize, Serialize};
use std::fmt;

/// Request-ingest-side status of a battery asset: SOC-denominated, clamped
/// to `[0,1]`, converted into the energy-denominated `Battery` contract's
/// `energy_start_kwh`/`energy_end_kwh` at ingest time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetStatus {
    pub asset_id: u32,
    pub battery_capacity_kwh: f64,
    pub soc_current_perc: f64,
    pub soc_target_perc: f64,
}

impl AssetStatus {
    pub fn new(asset_id: u32, battery_capacity_kwh: f64, soc_current_perc: f64) -> Self {
        Self {
            asset_id,
            battery_capacity_kwh,
            soc_current_perc: soc_current_perc.clamp(0.0, 1.0),
            soc_target_perc: 0.0,
        }
    }

    pub fn with_target(mut self, soc_target_perc: f64) -> Self {
        self.soc_target_perc = soc_target_perc.clamp(0.0, 1.0);
        self
    }

    pub fn energy_start_kwh(&self) -> f64 {
        self.soc_current_perc * self.battery_capacity_kwh
    }

    pub fn energy_target_kwh(&self) -> f64 {
        self.soc_target_perc * self.battery_capacity_kwh
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Asset {}\n- SOC Current [%]: {:.2}%\n- SOC Target [%]: {:.2}%\n- Capacity [kWh]: {}",
            self.asset_id,
            self.soc_current_perc * 100.0,
            self.soc_target_perc * 100.0,
            self.battery_capacity_kwh
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_carries_fields() {
        let status = AssetStatus::new(42, 100.0, 0.8);
        assert_eq!(status.asset_id, 42);
        assert_eq!(status.battery_capacity_kwh, 100.0);
        assert_eq!(status.soc_current_perc, 0.8);
        assert_eq!(status.soc_target_perc, 0.0);
    }

    #[test]
    fn clamps_soc_to_unit_interval() {
        assert_eq!(AssetStatus::new(1, 100.0, 1.2).soc_current_perc, 1.0);
        assert_eq!(AssetStatus::new(2, 100.0, -0.2).soc_current_perc, 0.0);
    }

    #[test]
    fn display_matches_expected_format() {
        let status = AssetStatus::new(42, 100.0, 0.8);
        assert_eq!(
            status.to_string(),
            "Asset 42\n- SOC Current [%]: 80.00%\n- SOC Target [%]: 0.00%\n- Capacity [kWh]: 100"
        );
    }

    #[test]
    fn energy_conversions() {
        let status = AssetStatus::new(1, 50.0, 0.5).with_target(0.9);
        assert_eq!(status.energy_start_kwh(), 25.0);
        assert_eq!(status.energy_target_kwh(), 45.0);
    }
}
