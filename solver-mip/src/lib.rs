//! Mixed-integer linear programming on top of `solver-core`.
//!
//! This crate solves
//!
//! ```text
//! minimize (or maximize)  c'x + c0
//! subject to              A x {<=, =, >=} b
//!                         l <= x <= u,  x_j integer for j in J
//! ```
//!
//! by branch-and-bound over simplex relaxations:
//!
//! - **Presolve** shrinks the problem once and, optionally, at every node
//! - **Gomory mixed-integer cuts** tighten each node relaxation
//! - **Branching** picks a variable by pseudocost or fractionality and a node
//!   by depth-first, breadth-first, best-bound, best-projection or a hybrid
//! - **Rounding with repair** supplies early incumbents
//!
//! Exact input (integers and rationals) is solved in exact rational
//! arithmetic unless [`MipSettings::precision`] says otherwise.
//!
//! # Example
//!
//! ```
//! use solver_core::{Number, Relation};
//! use solver_mip::{solve_model, ColumnSpec, LinearModel, MipSettings, MipStatus};
//!
//! // min x + y  s.t.  x + 2y >= 4, 3x + y >= 6, x, y >= 0 integer
//! let mut model = LinearModel::new(2);
//! model.objective = vec![Number::from(1), Number::from(1)];
//! model.columns = vec![ColumnSpec::integer(Some(Number::from(0)), None); 2];
//! model.add_row(vec![Number::from(1), Number::from(2)], Relation::Ge, Number::from(4));
//! model.add_row(vec![Number::from(3), Number::from(1)], Relation::Ge, Number::from(6));
//!
//! let solution = solve_model(&model, &MipSettings::default()).unwrap();
//! assert_eq!(solution.status, MipStatus::Optimal);
//! assert_eq!(solution.objective_f64(), Some(3.0));
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod cuts;
pub mod error;
pub mod heuristic;
pub mod model;
pub mod search;
pub mod settings;

use num_rational::BigRational;
use solver_core::Scalar;

pub use backend::{
    parse_mps, read_mps, BackendStatus, InProcessSolver, MpsModel, SolverBackend,
};
#[cfg(feature = "good_lp")]
pub use backend::GoodLpSolver;
pub use error::{MipError, MipResult};
pub use model::{
    ColumnSpec, LinearModel, LinearRow, MipSolution, MipStats, MipStatus, Problem,
};
pub use settings::{BranchingRule, MipSettings, NodeSelection, PresolveLevel};

/// Solve `model` with the in-process engine.
///
/// The arithmetic is chosen once from `settings.precision` and the model's
/// values. The reported objective and bound are in the model's own sense.
pub fn solve_model(model: &LinearModel, settings: &MipSettings) -> MipResult<MipSolution> {
    model.validate()?;
    let exact = settings.precision.use_exact(model.numbers());
    if settings.verbose {
        log::info!(
            "solving {} rows x {} columns in {} arithmetic",
            model.num_rows(),
            model.num_cols(),
            if exact { "exact" } else { "floating point" }
        );
    }

    let mut solution = if exact {
        solve_as::<BigRational>(model, settings)?
    } else {
        solve_as::<f64>(model, settings)?
    };
    if model.maximize {
        solution.objective = solution.objective.map(|v| v.negated());
        solution.bound = solution.bound.map(|b| -b);
    }
    Ok(solution)
}

fn solve_as<T: Scalar>(model: &LinearModel, settings: &MipSettings) -> MipResult<MipSolution> {
    let mut problem = model.to_problem::<T>(settings.clone())?;
    problem.solve()?;
    problem.postprocess();
    Ok(problem.to_solution())
}
