use good_lp::{variable, ProblemVariables, Variable};

use crate::optimizer::FleetSnapshot;

/// Every decision variable the model can contain, indexed the way the
/// constraint and objective builders expect: `[battery][step]` for per-
/// battery series, `[step]` for site-wide series. Optional families are
/// `None` at every index when the corresponding feature is inactive, so
/// callers can `if let Some(v) = ...` without threading the active flags
/// through twice.
pub struct VariableSet {
    pub chg: Vec<Vec<Variable>>,
    pub dis: Vec<Vec<Variable>>,
    /// Energy content at the start of each step; `T+1` entries per battery,
    /// the last one being the terminal energy `e[b,T]`.
    pub e: Vec<Vec<Variable>>,
    pub z_chg: Vec<Vec<Option<Variable>>>,
    pub z_dis: Vec<Vec<Option<Variable>>>,

    pub p_site: Vec<Variable>,
    pub p_imp: Vec<Variable>,
    pub p_exp: Vec<Variable>,
    pub peak_imp: Variable,
    pub peak_exp: Variable,

    pub flex_pos: Vec<Vec<Option<Variable>>>,
    pub flex_neg: Vec<Vec<Option<Variable>>>,

    pub y_on: Vec<Vec<Option<Variable>>>,
    pub y_start: Vec<Vec<Option<Variable>>>,
    pub y_end: Vec<Vec<Option<Variable>>>,

    pub delta_chg: Vec<Vec<Option<Variable>>>,
    pub delta_dis: Vec<Vec<Option<Variable>>>,

    pub curt: Vec<Option<Variable>>,
    pub slack_site_chg: Vec<Option<Variable>>,
    pub slack_site_dis: Vec<Option<Variable>>,
    pub slack_grid_imp: Vec<Option<Variable>>,
    pub slack_grid_exp: Vec<Option<Variable>>,

    /// Per-battery non-negative slack standing in for `max(0, energy_end -
    /// e[b,T])` when `fully_charged_as_penalty` softens the terminal target.
    pub slack_full: Vec<Option<Variable>>,

    /// Battery-to-charging-point assignment, `[battery][cp][step]`; empty
    /// when no charging points are registered.
    pub x_assign: Vec<Vec<Vec<Option<Variable>>>>,
}

impl VariableSet {
    pub fn build(problem: &mut ProblemVariables, snapshot: &FleetSnapshot) -> Self {
        let steps = snapshot.horizon.steps;
        let n_batteries = snapshot.batteries.len();
        let n_cp = snapshot.charging_points.len();
        let config = &snapshot.config;

        let needs_power_indicator = |b: &crate::domain::Battery| {
            b.power_charge_min_kw > 0.0 || (b.power_charge_max_kw > 0.0 && b.power_discharge_max_kw > 0.0)
        };
        let flex_active = snapshot.price_flex_pos.is_some() && snapshot.price_flex_neg.is_some();
        let session_active = config.single_continuous_session_allowed;
        let spike_active = config.penalize_spiky_behaviour;
        let curtailment_active = config.allow_curtailment && snapshot.site_load.is_some();
        let limit_penalty_active = config.limit_as_penalty;
        let full_charge_penalty_active = config.fully_charged_as_penalty;

        let mut chg = Vec::with_capacity(n_batteries);
        let mut dis = Vec::with_capacity(n_batteries);
        let mut e = Vec::with_capacity(n_batteries);
        let mut z_chg = Vec::with_capacity(n_batteries);
        let mut z_dis = Vec::with_capacity(n_batteries);
        let mut flex_pos = Vec::with_capacity(n_batteries);
        let mut flex_neg = Vec::with_capacity(n_batteries);
        let mut y_on = Vec::with_capacity(n_batteries);
        let mut y_start = Vec::with_capacity(n_batteries);
        let mut y_end = Vec::with_capacity(n_batteries);
        let mut delta_chg = Vec::with_capacity(n_batteries);
        let mut delta_dis = Vec::with_capacity(n_batteries);
        let mut x_assign = Vec::with_capacity(n_batteries);
        let mut slack_full = Vec::with_capacity(n_batteries);

        for battery in &snapshot.batteries {
            let indicator = needs_power_indicator(battery);

            let mut chg_row = Vec::with_capacity(steps);
            let mut dis_row = Vec::with_capacity(steps);
            let mut z_chg_row = Vec::with_capacity(steps);
            let mut z_dis_row = Vec::with_capacity(steps);
            let mut flex_pos_row = Vec::with_capacity(steps);
            let mut flex_neg_row = Vec::with_capacity(steps);
            let mut y_on_row = Vec::with_capacity(steps);
            let mut y_start_row = Vec::with_capacity(steps);
            let mut y_end_row = Vec::with_capacity(steps);
            let mut delta_chg_row = Vec::with_capacity(steps);
            let mut delta_dis_row = Vec::with_capacity(steps);

            for t in 0..steps {
                let connected = battery.connected.get(t).copied().unwrap_or(false);
                let chg_upper = if connected { battery.power_charge_max_kw } else { 0.0 };
                let dis_upper = if connected { battery.power_discharge_max_kw } else { 0.0 };

                chg_row.push(problem.add(variable().min(0.0).max(chg_upper)));
                dis_row.push(problem.add(variable().min(0.0).max(dis_upper)));

                z_chg_row.push(if indicator { Some(problem.add(variable().binary())) } else { None });
                z_dis_row.push(if indicator { Some(problem.add(variable().binary())) } else { None });

                flex_pos_row.push(if flex_active { Some(problem.add(variable().min(0.0))) } else { None });
                flex_neg_row.push(if flex_active { Some(problem.add(variable().min(0.0))) } else { None });

                y_on_row.push(if session_active { Some(problem.add(variable().binary())) } else { None });
                y_start_row.push(if session_active { Some(problem.add(variable().binary())) } else { None });
                y_end_row.push(if session_active { Some(problem.add(variable().binary())) } else { None });

                delta_chg_row.push(if spike_active { Some(problem.add(variable().min(0.0))) } else { None });
                delta_dis_row.push(if spike_active { Some(problem.add(variable().min(0.0))) } else { None });
            }

            let mut e_row = Vec::with_capacity(steps + 1);
            for _ in 0..=steps {
                e_row.push(problem.add(variable().min(battery.energy_min_kwh).max(battery.energy_max_kwh)));
            }

            let mut assign_for_battery = Vec::with_capacity(n_cp);
            for _cp in &snapshot.charging_points {
                let mut assign_row = Vec::with_capacity(steps);
                for _ in 0..steps {
                    assign_row.push(Some(problem.add(variable().binary())));
                }
                assign_for_battery.push(assign_row);
            }

            chg.push(chg_row);
            dis.push(dis_row);
            e.push(e_row);
            z_chg.push(z_chg_row);
            z_dis.push(z_dis_row);
            flex_pos.push(flex_pos_row);
            flex_neg.push(flex_neg_row);
            y_on.push(y_on_row);
            y_start.push(y_start_row);
            y_end.push(y_end_row);
            delta_chg.push(delta_chg_row);
            delta_dis.push(delta_dis_row);
            x_assign.push(assign_for_battery);
            slack_full.push(if full_charge_penalty_active {
                Some(problem.add(variable().min(0.0)))
            } else {
                None
            });
        }

        let p_site = (0..steps).map(|_| problem.add(variable())).collect();
        let p_imp = (0..steps).map(|_| problem.add(variable().min(0.0))).collect();
        let p_exp = (0..steps).map(|_| problem.add(variable().min(0.0))).collect();
        let peak_imp = problem.add(variable().min(0.0));
        let peak_exp = problem.add(variable().min(0.0));

        let curt = (0..steps)
            .map(|_| if curtailment_active { Some(problem.add(variable().min(0.0))) } else { None })
            .collect();

        let (slack_site_chg, slack_site_dis): (Vec<_>, Vec<_>) = (0..steps)
            .map(|_| {
                if limit_penalty_active {
                    (Some(problem.add(variable().min(0.0))), Some(problem.add(variable().min(0.0))))
                } else {
                    (None, None)
                }
            })
            .unzip();

        let (slack_grid_imp, slack_grid_exp): (Vec<_>, Vec<_>) = (0..steps)
            .map(|_| {
                if limit_penalty_active {
                    (Some(problem.add(variable().min(0.0))), Some(problem.add(variable().min(0.0))))
                } else {
                    (None, None)
                }
            })
            .unzip();

        Self {
            chg,
            dis,
            e,
            z_chg,
            z_dis,
            p_site,
            p_imp,
            p_exp,
            peak_imp,
            peak_exp,
            flex_pos,
            flex_neg,
            y_on,
            y_start,
            y_end,
            delta_chg,
            delta_dis,
            curt,
            slack_site_chg,
            slack_site_dis,
            slack_grid_imp,
            slack_grid_exp,
            slack_full,
            x_assign,
        }
    }
}
