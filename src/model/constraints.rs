use good_lp::{constraint, Expression, SolverModel};

use crate::optimizer::FleetSnapshot;

use super::variables::VariableSet;

/// `e[b,t+1] = e[b,t] + dt*(eta_chg*chg[b,t] - dis[b,t]/eta_dis)`, with
/// `e[b,0] = energy_start` and a terminal constraint on `e[b,T]` that is a
/// hard equality unless `fully_charged_as_penalty` softens it. The soft case
/// ties `slack_full[b] >= energy_end - e[b][T]` so the objective's penalty
/// term only ever sees the shortfall, never a reward for overshooting.
pub fn energy_balance<M: SolverModel>(mut model: M, vars: &VariableSet, snapshot: &FleetSnapshot) -> M {
    let dt = snapshot.horizon.dt;
    for (b, battery) in snapshot.batteries.iter().enumerate() {
        model = model.with(constraint!(vars.e[b][0] == battery.energy_start_kwh));
        for t in 0..snapshot.horizon.steps {
            let delta = dt * (battery.efficiency_charge * vars.chg[b][t] - vars.dis[b][t] / battery.efficiency_discharge);
            model = model.with(constraint!(vars.e[b][t + 1] == vars.e[b][t] + delta));
        }
        if snapshot.config.fully_charged_as_penalty {
            if let Some(slack_full) = vars.slack_full[b] {
                model = model.with(constraint!(
                    slack_full >= battery.energy_end_kwh - vars.e[b][snapshot.horizon.steps]
                ));
            }
        } else {
            model = model.with(constraint!(vars.e[b][snapshot.horizon.steps] == battery.energy_end_kwh));
        }
    }
    model
}

/// `chg[b,t] >= p_chg_min*z_chg`, `chg[b,t] <= p_chg_max*z_chg` (mirrored for
/// discharge), and `z_chg + z_dis <= conn[b,t]` wherever both directions are
/// physically possible, forbidding simultaneous charge and discharge.
pub fn power_exclusivity<M: SolverModel>(mut model: M, vars: &VariableSet, snapshot: &FleetSnapshot) -> M {
    for (b, battery) in snapshot.batteries.iter().enumerate() {
        for t in 0..snapshot.horizon.steps {
            let connected = battery.connected.get(t).copied().unwrap_or(false) as i32 as f64;
            if let (Some(z_chg), Some(z_dis)) = (vars.z_chg[b][t], vars.z_dis[b][t]) {
                if battery.power_charge_min_kw > 0.0 {
                    model = model.with(constraint!(vars.chg[b][t] >= battery.power_charge_min_kw * z_chg));
                }
                model = model.with(constraint!(vars.chg[b][t] <= battery.power_charge_max_kw * z_chg));
                model = model.with(constraint!(vars.dis[b][t] <= battery.power_discharge_max_kw * z_dis));
                model = model.with(constraint!(z_chg + z_dis <= connected));
            }
        }
    }
    model
}

/// `p_site[t] = sum_b(chg[b,t] - dis[b,t])`; with a registered site load,
/// `p_imp[t] - p_exp[t] = p_site[t] + L[t] - curt[t]`.
pub fn site_aggregation<M: SolverModel>(mut model: M, vars: &VariableSet, snapshot: &FleetSnapshot) -> M {
    for t in 0..snapshot.horizon.steps {
        let battery_power: Expression = (0..snapshot.batteries.len())
            .map(|b| vars.chg[b][t] - vars.dis[b][t])
            .sum();
        model = model.with(constraint!(vars.p_site[t] == battery_power));

        let site_load = snapshot.site_load.as_ref().map(|series| series[t]).unwrap_or(0.0);
        let curt = vars.curt[t].map(Expression::from).unwrap_or_else(|| Expression::from(0.0));
        model = model.with(constraint!(
            vars.p_imp[t] - vars.p_exp[t] == vars.p_site[t] + site_load - curt
        ));
    }
    model
}

/// Hard or soft (slack-penalized) site and grid power limits, plus running
/// peak trackers for the capacity tariff.
pub fn site_and_grid_limits<M: SolverModel>(mut model: M, vars: &VariableSet, snapshot: &FleetSnapshot) -> M {
    let grid = snapshot.grid.as_ref();
    for t in 0..snapshot.horizon.steps {
        if let Some(grid) = grid {
            let imp_slack = vars.slack_grid_imp[t].map(Expression::from).unwrap_or_else(|| Expression::from(0.0));
            let exp_slack = vars.slack_grid_exp[t].map(Expression::from).unwrap_or_else(|| Expression::from(0.0));
            model = model.with(constraint!(vars.p_imp[t] <= grid.purchase_power_limit + imp_slack));
            model = model.with(constraint!(vars.p_exp[t] <= grid.feed_power_limit + exp_slack));
        }

        let site_load = snapshot.site_load.as_ref().map(|series| series[t]).unwrap_or(0.0);
        let site_level = vars.p_site[t] + site_load;

        if let Some(cap_chg) = snapshot.site_cap_chg {
            let slack = vars.slack_site_chg[t].map(Expression::from).unwrap_or_else(|| Expression::from(0.0));
            model = model.with(constraint!(site_level.clone() <= cap_chg + slack));
        }
        if let Some(cap_dis) = snapshot.site_cap_dis {
            let slack = vars.slack_site_dis[t].map(Expression::from).unwrap_or_else(|| Expression::from(0.0));
            model = model.with(constraint!(site_level >= -cap_dis - slack));
        }

        model = model.with(constraint!(vars.peak_imp >= vars.p_imp[t]));
        model = model.with(constraint!(vars.peak_exp >= vars.p_exp[t]));
    }
    model
}

/// `p_site[t] = m[t]` wherever a marketed volume is registered for step `t`.
pub fn marketed_volume<M: SolverModel>(mut model: M, vars: &VariableSet, snapshot: &FleetSnapshot) -> M {
    if let Some(series) = &snapshot.marketed_volume {
        for (t, value) in series.iter().enumerate() {
            if let Some(m) = value {
                model = model.with(constraint!(vars.p_site[t] == *m));
            }
        }
    }
    model
}

/// Flex headroom bounds and, when marketed, a floor on the site-aggregate
/// flex volume. `symmetrical_flex` ties `flex_pos = flex_neg` per battery.
/// Headroom is gated by `y_on` rather than raw `conn` whenever session
/// enforcement is active, matching the gate `single_continuous_session`
/// already applies to `chg`/`dis` themselves.
pub fn flex_market<M: SolverModel>(mut model: M, vars: &VariableSet, snapshot: &FleetSnapshot) -> M {
    for (b, battery) in snapshot.batteries.iter().enumerate() {
        for t in 0..snapshot.horizon.steps {
            let connected = battery.connected.get(t).copied().unwrap_or(false) as i32 as f64;
            let gate = vars.y_on[b][t].map(Expression::from).unwrap_or_else(|| Expression::from(connected));
            if let (Some(flex_pos), Some(flex_neg)) = (vars.flex_pos[b][t], vars.flex_neg[b][t]) {
                model = model.with(constraint!(
                    flex_pos <= vars.chg[b][t] + battery.power_discharge_max_kw * gate.clone()
                ));
                model = model.with(constraint!(
                    flex_neg <= battery.power_charge_max_kw * gate - vars.chg[b][t] + vars.dis[b][t]
                ));
                if snapshot.config.symmetrical_flex {
                    model = model.with(constraint!(flex_pos == flex_neg));
                }
            }
        }
    }
    if let (Some(marketed_pos), Some(marketed_neg)) = (&snapshot.marketed_flex_pos, &snapshot.marketed_flex_neg) {
        for t in 0..snapshot.horizon.steps {
            let total_pos: Expression = (0..snapshot.batteries.len())
                .filter_map(|b| vars.flex_pos[b][t])
                .map(Expression::from)
                .sum();
            let total_neg: Expression = (0..snapshot.batteries.len())
                .filter_map(|b| vars.flex_neg[b][t])
                .map(Expression::from)
                .sum();
            model = model.with(constraint!(total_pos >= marketed_pos[t]));
            model = model.with(constraint!(total_neg >= marketed_neg[t]));
        }
    }
    model
}

/// Battery-to-charging-point assignment: a battery may use at most one CP
/// per step (capped by `conn`), a CP serves at most `capacity` batteries per
/// step, and `chg`/`dis` are bounded by the rated power of the assigned CP.
/// A battery with `affected_charging_point_id` is pinned to that CP.
pub fn charging_point_capacity<M: SolverModel>(mut model: M, vars: &VariableSet, snapshot: &FleetSnapshot) -> M {
    if snapshot.charging_points.is_empty() {
        return model;
    }
    for (b, battery) in snapshot.batteries.iter().enumerate() {
        for t in 0..snapshot.horizon.steps {
            let connected = battery.connected.get(t).copied().unwrap_or(false) as i32 as f64;

            let assign_sum: Expression = (0..snapshot.charging_points.len())
                .filter_map(|c| vars.x_assign[b][c][t])
                .map(Expression::from)
                .sum();
            model = model.with(constraint!(assign_sum <= connected));

            let chg_cap: Expression = (0..snapshot.charging_points.len())
                .filter_map(|c| vars.x_assign[b][c][t].map(|x| snapshot.charging_points[c].charging_power_kw * x))
                .sum();
            let dis_cap: Expression = (0..snapshot.charging_points.len())
                .filter_map(|c| vars.x_assign[b][c][t].map(|x| snapshot.charging_points[c].discharging_power_kw * x))
                .sum();
            model = model.with(constraint!(vars.chg[b][t] <= chg_cap));
            model = model.with(constraint!(vars.dis[b][t] <= dis_cap));

            if let Some(affected) = battery.affected_charging_point_id {
                for (c, cp) in snapshot.charging_points.iter().enumerate() {
                    if let Some(x) = vars.x_assign[b][c][t] {
                        let expected = if cp.asset_id == affected { connected } else { 0.0 };
                        model = model.with(constraint!(x == expected));
                    }
                }
            }
        }
    }
    for (c, cp) in snapshot.charging_points.iter().enumerate() {
        for t in 0..snapshot.horizon.steps {
            let occupancy: Expression = (0..snapshot.batteries.len())
                .filter_map(|b| vars.x_assign[b][c][t])
                .map(Expression::from)
                .sum();
            model = model.with(constraint!(occupancy <= cp.capacity as f64));
        }
    }
    model
}

/// At most one `0->1` and one `1->0` transition of `y_on` across the
/// horizon, power and flex gated by `y_on` rather than raw `conn`.
pub fn single_continuous_session<M: SolverModel>(mut model: M, vars: &VariableSet, snapshot: &FleetSnapshot) -> M {
    if !snapshot.config.single_continuous_session_allowed {
        return model;
    }
    for (b, battery) in snapshot.batteries.iter().enumerate() {
        let mut starts_sum = Expression::from(0.0);
        let mut ends_sum = Expression::from(0.0);
        for t in 0..snapshot.horizon.steps {
            let connected = battery.connected.get(t).copied().unwrap_or(false) as i32 as f64;
            let (Some(y_on), Some(y_start), Some(y_end)) = (vars.y_on[b][t], vars.y_start[b][t], vars.y_end[b][t])
            else {
                continue;
            };
            model = model.with(constraint!(y_on <= connected));
            model = model.with(constraint!(vars.chg[b][t] <= battery.power_charge_max_kw * y_on));
            model = model.with(constraint!(vars.dis[b][t] <= battery.power_discharge_max_kw * y_on));

            if t == 0 {
                model = model.with(constraint!(y_start >= y_on));
            } else if let Some(y_on_prev) = vars.y_on[b][t - 1] {
                model = model.with(constraint!(y_start >= y_on - y_on_prev));
            }
            if t + 1 == snapshot.horizon.steps {
                model = model.with(constraint!(y_end >= y_on));
            } else if let Some(y_on_next) = vars.y_on[b][t + 1] {
                model = model.with(constraint!(y_end >= y_on - y_on_next));
            }
            starts_sum += y_start;
            ends_sum += y_end;
        }
        model = model.with(constraint!(starts_sum <= 1.0));
        model = model.with(constraint!(ends_sum <= 1.0));
    }
    model
}

/// `delta[b,t] >= |chg[b,t] - chg[b,t-1]|` (and mirrored for discharge),
/// linearized as two one-sided inequalities per step.
pub fn spike_penalty<M: SolverModel>(mut model: M, vars: &VariableSet, snapshot: &FleetSnapshot) -> M {
    if !snapshot.config.penalize_spiky_behaviour {
        return model;
    }
    for b in 0..snapshot.batteries.len() {
        for t in 1..snapshot.horizon.steps {
            if let Some(delta_chg) = vars.delta_chg[b][t] {
                model = model.with(constraint!(delta_chg >= vars.chg[b][t] - vars.chg[b][t - 1]));
                model = model.with(constraint!(delta_chg >= vars.chg[b][t - 1] - vars.chg[b][t]));
            }
            if let Some(delta_dis) = vars.delta_dis[b][t] {
                model = model.with(constraint!(delta_dis >= vars.dis[b][t] - vars.dis[b][t - 1]));
                model = model.with(constraint!(delta_dis >= vars.dis[b][t - 1] - vars.dis[b][t]));
            }
        }
    }
    model
}

/// Applies every active constraint family in sequence.
pub fn apply_all<M: SolverModel>(model: M, vars: &VariableSet, snapshot: &FleetSnapshot) -> M {
    let model = energy_balance(model, vars, snapshot);
    let model = power_exclusivity(model, vars, snapshot);
    let model = site_aggregation(model, vars, snapshot);
    let model = site_and_grid_limits(model, vars, snapshot);
    let model = marketed_volume(model, vars, snapshot);
    let model = flex_market(model, vars, snapshot);
    let model = charging_point_capacity(model, vars, snapshot);
    let model = single_continuous_session(model, vars, snapshot);
    spike_penalty(model, vars, snapshot)
}
