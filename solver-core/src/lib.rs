//! Solver core: linear programs over a generic scalar field.
//!
//! This library provides the LP building blocks that the branch-and-bound
//! driver in `solver-mip` is assembled from:
//!
//! - **Numerics**: the [`Scalar`] trait, implemented for `f64` (with
//!   tolerances) and `BigRational` (exact)
//! - **Problem data**: [`LinearProgram`] with per-variable [`Range`] bounds,
//!   integrality, sign handling and pseudocosts
//! - **Presolve**: fixed-point row and column reductions
//! - **Postsolve**: the [`UndoLog`] that re-inserts removed columns
//! - **Simplex**: a dense bounded-variable two-phase simplex with warm-started
//!   cut rows
//!
//! # Example
//!
//! ```
//! use solver_core::{Constraints, LinearProgram, Range, Relation, Variable};
//! use solver_core::simplex::{solve_program, IterationBudget, LpStatus};
//!
//! // min x + y  s.t.  x + 2y >= 4, 3x + y >= 6
//! let lp = LinearProgram {
//!     objective: vec![1.0, 1.0],
//!     constant: 0.0,
//!     constraints: Constraints::new(
//!         vec![vec![1.0, 2.0], vec![3.0, 1.0]],
//!         vec![4.0, 6.0],
//!         vec![Relation::Ge, Relation::Ge],
//!     ),
//!     variables: vec![
//!         Variable::continuous(Range::default()),
//!         Variable::continuous(Range::default()),
//!     ],
//! };
//!
//! let (status, x, obj) = solve_program(&lp, &mut IterationBudget::unlimited()).unwrap();
//! assert_eq!(status, LpStatus::Optimal);
//! assert!((obj - 2.8).abs() < 1e-9);
//! assert!((x[0] - 1.6).abs() < 1e-9);
//! ```

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod numeric;
pub mod postsolve;
pub mod presolve;
pub mod problem;
pub mod simplex;
pub mod util;

// Re-export main types
pub use numeric::{Number, Precision, Scalar};
pub use postsolve::{RemovedColumn, UndoLog};
pub use presolve::{presolve, PresolveOptions, PresolveStats, PresolveStatus, Presolver};
pub use problem::{
    BranchDirection, Constraints, LinearProgram, ModelError, Range, Relation, SignType,
    Substitution, Variable,
};
pub use simplex::{IterationBudget, LpStatus, StandardForm, Tableau};
