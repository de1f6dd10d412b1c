use good_lp::{default_solver, Expression, ProblemVariables, SolverModel};
use tracing::{debug, info, warn};

use crate::error::{SolveError, SolveErrorKind};
use crate::model::{constraints, objective, VariableSet};
use crate::optimizer::FleetSnapshot;
use crate::result::RawSolution;

/// Builds the MILP for a snapshot, hands it to the solver, and classifies
/// the outcome. The solve harness itself never mutates `snapshot`; a failed
/// solve leaves the caller's builder state untouched.
pub fn solve(snapshot: &FleetSnapshot) -> Result<RawSolution, SolveError> {
    debug!(
        steps = snapshot.horizon.steps,
        batteries = snapshot.batteries.len(),
        charging_points = snapshot.charging_points.len(),
        "building fleet dispatch model"
    );

    let mut problem = ProblemVariables::new();
    let vars = VariableSet::build(&mut problem, snapshot);
    let objective_expr = objective::build(&vars, snapshot);
    let objective_for_eval = objective_expr.clone();

    let model = problem.minimise(objective_expr).using(default_solver);
    let model = constraints::apply_all(model, &vars, snapshot);

    let solution = model.solve().map_err(|err| {
        warn!(error = %err, "solve failed");
        classify_solver_error(&err)
    })?;

    info!("solve finished successfully");
    let mut raw = RawSolution::extract(&solution, &vars, snapshot);
    raw.objective_value = objective_for_eval.eval_with(&solution);
    Ok(raw)
}

/// A feasibility-only pass (constant zero objective) that yields whatever
/// dispatch the solver finds first, then prices that dispatch under the real
/// objective. Used by `calculate_savings` to report the cost an
/// unoptimized-but-feasible schedule would have incurred, for comparison
/// against the optimized result's `objective_value`.
pub fn solve_baseline(snapshot: &FleetSnapshot) -> Result<f64, SolveError> {
    let mut problem = ProblemVariables::new();
    let vars = VariableSet::build(&mut problem, snapshot);
    let real_objective = objective::build(&vars, snapshot);

    let model = problem.minimise(Expression::from(0.0)).using(default_solver);
    let model = constraints::apply_all(model, &vars, snapshot);

    let solution = model.solve().map_err(|err| {
        warn!(error = %err, "baseline solve failed");
        classify_solver_error(&err)
    })?;

    Ok(real_objective.eval_with(&solution))
}

fn classify_solver_error(err: &good_lp::ResolutionError) -> SolveError {
    use good_lp::ResolutionError;
    match err {
        ResolutionError::Infeasible => SolveError::new(SolveErrorKind::Infeasible, "model is infeasible"),
        ResolutionError::Unbounded => SolveError::new(SolveErrorKind::Unbounded, "model is unbounded"),
        other => SolveError::new(SolveErrorKind::SolverFailure, other.to_string()),
    }
}
