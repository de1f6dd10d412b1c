use good_lp::Expression;

use crate::optimizer::FleetSnapshot;

use super::variables::VariableSet;

/// `lambda_full ~= 10x` the largest tariff in the horizon.
pub fn lambda_full(prices: &[f64]) -> f64 {
    10.0 * prices.iter().cloned().fold(0.0_f64, f64::max)
}

/// `lambda_spike ~= 0.001 *` the median tariff.
pub fn lambda_spike(prices: &[f64]) -> f64 {
    0.001 * median(prices)
}

/// `lambda_limit ~= 100x` the largest tariff.
pub fn lambda_limit(prices: &[f64]) -> f64 {
    100.0 * prices.iter().cloned().fold(0.0_f64, f64::max)
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Assembles the full objective: energy cost, demand charge, cycle wear,
/// flex revenue, spike penalty, soft full-charge, soft caps, and triad.
pub fn build(vars: &VariableSet, snapshot: &FleetSnapshot) -> Expression {
    let dt = snapshot.horizon.dt;
    let config = &snapshot.config;
    let steps = snapshot.horizon.steps;

    let mut all_prices = snapshot.price_import.clone();
    all_prices.extend(snapshot.price_export.iter().copied());
    let lambda_full = lambda_full(&all_prices);
    let lambda_spike = lambda_spike(&all_prices);
    let lambda_limit = lambda_limit(&all_prices);

    let mut objective = Expression::from(0.0);

    for t in 0..steps {
        objective += snapshot.price_import[t] * vars.p_imp[t] * dt;
        objective -= snapshot.price_export[t] * vars.p_exp[t] * dt;
    }

    objective += snapshot.capacity_tariff_imp * vars.peak_imp;
    objective += snapshot.capacity_tariff_exp * vars.peak_exp;

    if config.include_battery_costs {
        for (b, battery) in snapshot.batteries.iter().enumerate() {
            let cost_per_kwh = battery.cycle_cost_per_kwh();
            for t in 0..steps {
                objective += cost_per_kwh * (vars.chg[b][t] + vars.dis[b][t]) * dt;
            }
        }
    }

    if let (Some(price_pos), Some(price_neg)) = (&snapshot.price_flex_pos, &snapshot.price_flex_neg) {
        for (b, _) in snapshot.batteries.iter().enumerate() {
            for t in 0..steps {
                if let Some(flex_pos) = vars.flex_pos[b][t] {
                    objective -= price_pos[t] * flex_pos * dt;
                }
                if let Some(flex_neg) = vars.flex_neg[b][t] {
                    objective -= price_neg[t] * flex_neg * dt;
                }
            }
        }
    }

    if config.penalize_spiky_behaviour {
        for b in 0..snapshot.batteries.len() {
            for t in 0..steps {
                if let Some(delta_chg) = vars.delta_chg[b][t] {
                    objective += lambda_spike * delta_chg;
                }
                if let Some(delta_dis) = vars.delta_dis[b][t] {
                    objective += lambda_spike * delta_dis;
                }
            }
        }
    }

    if config.fully_charged_as_penalty {
        for b in 0..snapshot.batteries.len() {
            if let Some(slack_full) = vars.slack_full[b] {
                objective += lambda_full * slack_full;
            }
        }
    }

    if config.limit_as_penalty {
        for t in 0..steps {
            for slack in [
                vars.slack_site_chg[t],
                vars.slack_site_dis[t],
                vars.slack_grid_imp[t],
                vars.slack_grid_exp[t],
            ] {
                if let Some(slack) = slack {
                    objective += lambda_limit * slack;
                }
            }
        }
    }

    if config.include_site_load_costs {
        if let Some(site_load) = &snapshot.site_load {
            for (t, load) in site_load.iter().enumerate() {
                objective += snapshot.price_import[t] * load * dt;
            }
        }
    }

    if let (Some(triad_imp), Some(triad_exp)) = (&snapshot.triad_imp, &snapshot.triad_exp) {
        for t in 0..steps {
            objective += triad_imp[t] * vars.p_imp[t];
            objective += triad_exp[t] * vars.p_exp[t];
        }
    }

    objective
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_length() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn median_of_even_length() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), 2.5);
    }

    #[test]
    fn lambda_full_scales_with_max_price() {
        assert_eq!(lambda_full(&[0.5, 2.0, 1.0]), 20.0);
    }
}
