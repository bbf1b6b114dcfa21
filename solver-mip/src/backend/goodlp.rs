//! Adapter for the `good_lp` modelling library.

use good_lp::{
    default_solver, variable, Constraint, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel, Variable,
};
use solver_core::util::Timer;
use solver_core::{Number, Relation};

use super::{BackendStatus, SolverBackend};
use crate::error::{MipError, MipResult};
use crate::model::{LinearModel, MipSolution, MipStats, MipStatus};
use crate::settings::{BranchingRule, MipSettings, NodeSelection};

/// Solves through `good_lp::default_solver`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver;

/// Translated problem and the values read back from the library.
pub struct GoodLpRun {
    vars: Option<ProblemVariables>,
    columns: Vec<Variable>,
    objective: Expression,
    coefs: Vec<f64>,
    constraints: Vec<Constraint>,
    constant: f64,
    maximize: bool,
    timer: Timer,
    outcome: Option<(MipStatus, Vec<f64>)>,
}

impl SolverBackend for GoodLpSolver {
    type Handle = GoodLpRun;

    fn name(&self) -> &'static str {
        "good_lp"
    }

    fn translate_in(&self, model: &LinearModel, settings: &MipSettings) -> MipResult<GoodLpRun> {
        model.validate()?;
        warn_unsupported(settings);

        let mut vars = ProblemVariables::new();
        let columns: Vec<Variable> = model
            .columns
            .iter()
            .map(|spec| {
                let mut def = variable();
                if spec.integral {
                    def = def.integer();
                }
                if let Some(l) = spec.lower.as_ref().filter(|b| b.is_finite()) {
                    def = def.min(l.to_f64());
                }
                if let Some(u) = spec.upper.as_ref().filter(|b| b.is_finite()) {
                    def = def.max(u.to_f64());
                }
                vars.add(def)
            })
            .collect();

        let coefs: Vec<f64> = model.objective.iter().map(Number::to_f64).collect();
        let mut objective = Expression::with_capacity(columns.len());
        for (&c, &var) in coefs.iter().zip(&columns) {
            if c != 0.0 {
                objective.add_mul(c, var);
            }
        }

        let constraints = model
            .rows
            .iter()
            .map(|row| {
                let mut lhs = Expression::with_capacity(row.coefs.len());
                for (c, &var) in row.coefs.iter().zip(&columns) {
                    if !c.is_zero() {
                        lhs.add_mul(c.to_f64(), var);
                    }
                }
                let rhs = row.rhs.to_f64();
                match row.relation {
                    Relation::Le => lhs.leq(rhs),
                    Relation::Eq => lhs.eq(rhs),
                    Relation::Ge => lhs.geq(rhs),
                }
            })
            .collect();

        Ok(GoodLpRun {
            vars: Some(vars),
            columns,
            objective,
            coefs,
            constraints,
            constant: model.objective_constant.to_f64(),
            maximize: model.maximize,
            timer: Timer::new(),
            outcome: None,
        })
    }

    fn run(&self, handle: &mut GoodLpRun) -> MipResult<BackendStatus> {
        let vars = handle
            .vars
            .take()
            .ok_or_else(|| MipError::Backend("good_lp problem already solved".to_string()))?;
        let objective = std::mem::take(&mut handle.objective);
        let unsolved = if handle.maximize {
            vars.maximise(objective)
        } else {
            vars.minimise(objective)
        };
        let mut problem = unsolved.using(default_solver);
        for constraint in handle.constraints.drain(..) {
            problem = problem.with(constraint);
        }

        let (status, backend_status, values) = match problem.solve() {
            Ok(solution) => {
                let values = handle.columns.iter().map(|&v| solution.value(v)).collect();
                (MipStatus::Optimal, BackendStatus::Solved, values)
            }
            Err(ResolutionError::Infeasible) => {
                (MipStatus::Infeasible, BackendStatus::Infeasible, Vec::new())
            }
            Err(ResolutionError::Unbounded) => {
                (MipStatus::Unbounded, BackendStatus::Unbounded, Vec::new())
            }
            Err(err) => return Err(MipError::Backend(err.to_string())),
        };
        handle.outcome = Some((status, values));
        Ok(backend_status)
    }

    fn translate_out(&self, handle: GoodLpRun) -> MipResult<MipSolution> {
        let (status, values) = handle
            .outcome
            .ok_or_else(|| MipError::Backend("good_lp backend has not been run".to_string()))?;
        let mut solution = MipSolution::empty(status);
        solution.stats = MipStats {
            elapsed_ms: handle.timer.elapsed_ms(),
            ..MipStats::default()
        };
        if status == MipStatus::Optimal {
            let value = handle.constant
                + handle
                    .coefs
                    .iter()
                    .zip(&values)
                    .map(|(c, v)| c * v)
                    .sum::<f64>();
            solution.objective = Some(Number::Float(value));
            solution.bound = Some(value);
            solution.gap = Some(0.0);
            solution.x = values.into_iter().map(Number::Float).collect();
        }
        Ok(solution)
    }
}

fn warn_unsupported(settings: &MipSettings) {
    let ignored = [
        ("node limit", settings.node_limit.is_some()),
        ("iteration limit", settings.iteration_limit.is_some()),
        ("time limit", settings.time_limit_ms.is_some()),
        ("depth limit", settings.depth_limit.is_some()),
        ("gap tolerance", settings.gap_tol > 0.0),
        (
            "branching rule",
            settings.branching_rule != BranchingRule::default(),
        ),
        (
            "node selection",
            settings.node_selection != NodeSelection::default(),
        ),
        ("exact arithmetic", settings.precision == solver_core::Precision::Exact),
    ];
    for (setting, set) in ignored {
        if set {
            log::warn!("good_lp backend ignores the {} setting", setting);
        }
    }
}
