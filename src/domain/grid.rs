use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ValidationError;

/// A site's single grid connection point: import/export power limits and
/// efficiencies, constant across the horizon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Grid {
    pub feed_power_limit: f64,
    pub purchase_power_limit: f64,
    pub feed_efficiency: f64,
    pub purchase_efficiency: f64,
}

impl Grid {
    pub fn new(feed_power_limit: f64, purchase_power_limit: f64) -> Result<Self, ValidationError> {
        Self::with_efficiencies(feed_power_limit, purchase_power_limit, 0.9, 1.0)
    }

    pub fn with_efficiencies(
        feed_power_limit: f64,
        purchase_power_limit: f64,
        feed_efficiency: f64,
        purchase_efficiency: f64,
    ) -> Result<Self, ValidationError> {
        let grid = Self {
            feed_power_limit,
            purchase_power_limit,
            feed_efficiency,
            purchase_efficiency,
        };
        grid.validate()?;
        Ok(grid)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for (name, value) in [
            ("feed_power_limit", self.feed_power_limit),
            ("purchase_power_limit", self.purchase_power_limit),
        ] {
            if value < 0.0 {
                return Err(ValidationError::NegativeGridLimit { name, value });
            }
        }
        for (name, value) in [
            ("feed_efficiency", self.feed_efficiency),
            ("purchase_efficiency", self.purchase_efficiency),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ValidationError::InvalidGridEfficiency { name, value });
            }
        }
        Ok(())
    }

    pub fn dict(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("Grid always serializes")
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Grid(feed_power_limit={}, purchase_power_limit={}, feed_efficiency={}, purchase_efficiency={})",
            self.feed_power_limit, self.purchase_power_limit, self.feed_efficiency, self.purchase_efficiency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Grid {
        Grid::with_efficiencies(100.0, 200.0, 0.9, 1.0).unwrap()
    }

    #[test]
    fn creation_carries_fields_and_defaults() {
        let grid = Grid::new(100.0, 200.0).unwrap();
        assert_eq!(grid.feed_power_limit, 100.0);
        assert_eq!(grid.purchase_power_limit, 200.0);
        assert_eq!(grid.purchase_efficiency, 1.0);
        assert_eq!(grid.feed_efficiency, 0.9);
    }

    #[test]
    fn rejects_negative_limits() {
        assert!(Grid::new(-100.0, 200.0).is_err());
        assert!(Grid::new(100.0, -200.0).is_err());
    }

    #[test]
    fn rejects_efficiency_above_one() {
        assert!(Grid::with_efficiencies(100.0, 200.0, 1.1, 1.0).is_err());
    }

    #[test]
    fn display_matches_expected_format() {
        let grid = sample();
        assert_eq!(
            grid.to_string(),
            "Grid(feed_power_limit=100, purchase_power_limit=200, feed_efficiency=0.9, purchase_efficiency=1)"
        );
    }
}
