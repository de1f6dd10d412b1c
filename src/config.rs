use serde::{Deserialize, Serialize};
use validator::Validate;

/// Solver time limit and MIP gap, matching the solver harness defaults (C6).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SolverSettings {
    #[validate(range(min = 1, max = 3600))]
    pub time_limit_secs: u64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub mip_gap: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            time_limit_secs: 60,
            mip_gap: 1e-4,
        }
    }
}

/// Feature toggles read once at `optimize()`. Re-architected from the
/// source's ad-hoc attribute toggles into a single explicit record.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FleetConfig {
    /// Soften terminal `e_end` as a penalty instead of a hard equality.
    #[serde(default)]
    pub fully_charged_as_penalty: bool,

    /// Enforce at most one contiguous connected session per battery.
    #[serde(default)]
    pub single_continuous_session_allowed: bool,

    /// Add a spike damper (L1 on Δpower) to the objective.
    #[serde(default)]
    pub penalize_spiky_behaviour: bool,

    /// Add the battery cycle-wear term to the objective.
    #[serde(default)]
    pub include_battery_costs: bool,

    /// Enable the curtailment variable for PV surplus.
    #[serde(default)]
    pub allow_curtailment: bool,

    /// Run a baseline (no-optimization) pass to report Δcost.
    #[serde(default)]
    pub calculate_savings: bool,

    /// Price the registered site load through the objective.
    #[serde(default)]
    pub include_site_load_costs: bool,

    /// Force `flex_pos = flex_neg` at every step.
    #[serde(default)]
    pub symmetrical_flex: bool,

    /// Soften site/grid caps with a penalized slack instead of a hard bound.
    #[serde(default)]
    pub limit_as_penalty: bool,

    #[serde(default)]
    #[validate(nested)]
    pub solver: SolverSettings,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            fully_charged_as_penalty: false,
            single_continuous_session_allowed: false,
            penalize_spiky_behaviour: false,
            include_battery_costs: false,
            allow_curtailment: false,
            calculate_savings: false,
            include_site_load_costs: false,
            symmetrical_flex: false,
            limit_as_penalty: false,
            solver: SolverSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(FleetConfig::default().validate().is_ok());
    }

    #[test]
    fn solver_settings_reject_zero_gap_out_of_range() {
        let settings = SolverSettings {
            time_limit_secs: 60,
            mip_gap: 1.5,
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn solver_settings_reject_zero_time_limit() {
        let settings = SolverSettings {
            time_limit_secs: 0,
            mip_gap: 1e-4,
        };
        assert!(settings.validate().is_err());
    }
}
