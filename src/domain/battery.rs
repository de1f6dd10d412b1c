use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Distinguishes a fleet-mobile battery (an EV, arriving and departing on a
/// connection schedule) from a stationary on-site battery that is always
/// connected. Represented as a tag on a single record rather than as
/// subtypes, since the two only ever differ in how their fields are derived,
/// never in how the model treats them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatteryKind {
    Mobile,
    Stationary,
}

/// A single battery asset: capacity, energy bounds, power limits, and the
/// per-step connection schedule the optimizer dispatches it against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Battery {
    pub id: u32,
    pub capacity_kwh: f64,
    pub energy_min_kwh: f64,
    pub energy_max_kwh: f64,
    pub energy_start_kwh: f64,
    pub energy_end_kwh: f64,
    pub power_charge_max_kw: f64,
    pub power_discharge_max_kw: f64,
    pub power_charge_min_kw: f64,
    pub efficiency_charge: f64,
    pub efficiency_discharge: f64,
    pub connected: Vec<bool>,
    pub cycle_life: u32,
    pub battery_costs_sek: f64,
    pub affected_charging_point_id: Option<u32>,
    pub kind: BatteryKind,
}

#[allow(clippy::too_many_arguments)]
impl Battery {
    /// Construct a mobile battery. `connected` carries the per-step
    /// connection schedule and determines the horizon length this battery
    /// contributes.
    pub fn mobile(
        id: u32,
        capacity_kwh: f64,
        energy_min_kwh: f64,
        energy_max_kwh: f64,
        energy_start_kwh: f64,
        energy_end_kwh: f64,
        power_charge_max_kw: f64,
        power_discharge_max_kw: f64,
        connected: Vec<bool>,
    ) -> Result<Self, ValidationError> {
        let battery = Self {
            id,
            capacity_kwh,
            energy_min_kwh,
            energy_max_kwh,
            energy_start_kwh,
            energy_end_kwh,
            power_charge_max_kw,
            power_discharge_max_kw,
            power_charge_min_kw: 0.0,
            efficiency_charge: 1.0,
            efficiency_discharge: 1.0,
            connected,
            cycle_life: 5000,
            battery_costs_sek: 0.0,
            affected_charging_point_id: None,
            kind: BatteryKind::Mobile,
        };
        battery.validate()?;
        Ok(battery)
    }

    /// Construct a stationary battery: always connected, and charged/
    /// discharged from and back to `energy_min_kwh` by construction.
    pub fn stationary(
        id: u32,
        capacity_kwh: f64,
        energy_min_kwh: f64,
        energy_max_kwh: f64,
        power_charge_max_kw: f64,
        power_discharge_max_kw: f64,
        steps: usize,
    ) -> Result<Self, ValidationError> {
        let battery = Self {
            id,
            capacity_kwh,
            energy_min_kwh,
            energy_max_kwh,
            energy_start_kwh: energy_min_kwh,
            energy_end_kwh: energy_min_kwh,
            power_charge_max_kw,
            power_discharge_max_kw,
            power_charge_min_kw: 0.0,
            efficiency_charge: 1.0,
            efficiency_discharge: 1.0,
            connected: vec![true; steps],
            cycle_life: 5000,
            battery_costs_sek: 0.0,
            affected_charging_point_id: None,
            kind: BatteryKind::Stationary,
        };
        battery.validate()?;
        Ok(battery)
    }

    pub fn with_power_charge_min(mut self, power_charge_min_kw: f64) -> Result<Self, ValidationError> {
        self.power_charge_min_kw = power_charge_min_kw;
        self.validate()?;
        Ok(self)
    }

    pub fn with_efficiencies(
        mut self,
        efficiency_charge: f64,
        efficiency_discharge: f64,
    ) -> Result<Self, ValidationError> {
        self.efficiency_charge = efficiency_charge;
        self.efficiency_discharge = efficiency_discharge;
        self.validate()?;
        Ok(self)
    }

    pub fn with_affected_charging_point(mut self, cp_id: u32) -> Self {
        self.affected_charging_point_id = Some(cp_id);
        self
    }

    pub fn add_cycle_costs(mut self, battery_costs_sek: f64, cycle_life: u32) -> Self {
        self.battery_costs_sek = battery_costs_sek;
        self.cycle_life = cycle_life;
        self
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.capacity_kwh <= 0.0 {
            return Err(ValidationError::NonPositiveCapacity {
                battery_id: self.id,
                value: self.capacity_kwh,
            });
        }
        if !(self.energy_min_kwh <= self.energy_start_kwh && self.energy_start_kwh <= self.energy_max_kwh) {
            return Err(ValidationError::EnergyOutOfBounds {
                battery_id: self.id,
                field: "energy_start_kwh",
                value: self.energy_start_kwh,
                min: self.energy_min_kwh,
                max: self.energy_max_kwh,
            });
        }
        if !(self.energy_min_kwh <= self.energy_end_kwh && self.energy_end_kwh <= self.energy_max_kwh) {
            return Err(ValidationError::EnergyOutOfBounds {
                battery_id: self.id,
                field: "energy_end_kwh",
                value: self.energy_end_kwh,
                min: self.energy_min_kwh,
                max: self.energy_max_kwh,
            });
        }
        if self.power_discharge_max_kw > 0.0 && self.power_charge_min_kw > 0.0 {
            return Err(ValidationError::IncompatiblePowerSettings { battery_id: self.id });
        }
        for (field, value) in [
            ("efficiency_charge", self.efficiency_charge),
            ("efficiency_discharge", self.efficiency_discharge),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ValidationError::InvalidEfficiency {
                    battery_id: self.id,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }

    pub fn is_stationary(&self) -> bool {
        matches!(self.kind, BatteryKind::Stationary)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.iter().any(|&c| c)
    }

    /// Amortized wear cost per kWh of throughput:
    /// `battery_costs / (cycle_life * 2 * capacity)`.
    pub fn cycle_cost_per_kwh(&self) -> f64 {
        self.battery_costs_sek / (self.cycle_life as f64 * 2.0 * self.capacity_kwh)
    }

    /// A single pass over `connected` counting rising (0→1) and falling
    /// (1→0) edges; true unless there is more than one contiguous run of
    /// connection.
    pub fn has_single_charging_session(&self) -> bool {
        let mut starts = 0u32;
        let mut ends = 0u32;
        let mut start_idx = None;
        let mut end_idx = None;
        for (i, window) in self.connected.windows(2).enumerate() {
            let (prev, cur) = (window[0], window[1]);
            if !prev && cur {
                starts += 1;
                if start_idx.is_none() {
                    start_idx = Some(i + 1);
                }
            } else if prev && !cur {
                ends += 1;
                if end_idx.is_none() {
                    end_idx = Some(i + 1);
                }
            }
        }
        if starts > 1 || ends > 1 {
            return false;
        }
        match (start_idx, end_idx) {
            (Some(s), Some(e)) => s < e,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Battery {
        Battery::mobile(
            42,
            40.0,
            5.0,
            40.0,
            12.0,
            40.0,
            5.0,
            5.0,
            [vec![false; 5], vec![true; 25]].concat(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_energy_start_out_of_bounds() {
        let err = Battery::mobile(1, 40.0, 5.0, 40.0, 50.0, 40.0, 5.0, 5.0, vec![true; 30]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_charge_min_with_discharge() {
        let err = sample().with_power_charge_min(1.0).and_then(|b| {
            let mut b = b;
            b.power_discharge_max_kw = 5.0;
            b.validate().map(|_| b)
        });
        assert!(err.is_err());
    }

    #[test]
    fn cycle_cost_matches_formula() {
        let battery = sample().add_cycle_costs(1000.0, 5000);
        assert!((battery.cycle_cost_per_kwh() - 1000.0 / (5000.0 * 2.0 * 40.0)).abs() < 1e-12);
    }

    #[test]
    fn single_session_detected() {
        assert!(sample().has_single_charging_session());
    }

    #[test]
    fn two_sessions_rejected() {
        let b = Battery::mobile(
            1,
            40.0,
            5.0,
            40.0,
            10.0,
            20.0,
            5.0,
            5.0,
            vec![true, false, true, false],
        )
        .unwrap();
        assert!(!b.has_single_charging_session());
    }

    #[test]
    fn stationary_is_always_connected() {
        let b = Battery::stationary(7, 100.0, 10.0, 90.0, 20.0, 20.0, 10).unwrap();
        assert!(b.is_stationary());
        assert_eq!(b.energy_start_kwh, b.energy_end_kwh);
        assert!(b.connected.iter().all(|&c| c));
    }
}
