//! Solver backends and model input.
//!
//! A [`SolverBackend`] takes a [`LinearModel`] through three stages:
//! translation into the backend's own representation, the solve itself, and
//! translation of the outcome back into a [`MipSolution`]. The in-process
//! branch-and-bound engine and the optional `good_lp` adapter both sit behind
//! this trait, so the command line can switch between them.

#[cfg(feature = "good_lp")]
mod goodlp;
mod mps;

#[cfg(feature = "good_lp")]
pub use goodlp::{GoodLpRun, GoodLpSolver};
pub use mps::{parse_mps, read_mps, MpsModel};

use crate::error::{MipError, MipResult};
use crate::model::{LinearModel, MipSolution, MipStatus};
use crate::settings::MipSettings;

/// Coarse outcome of a backend run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendStatus {
    /// Optimal solution found.
    Solved,

    /// No feasible point exists.
    Infeasible,

    /// Objective unbounded in the optimisation direction.
    Unbounded,

    /// Stopped on a node, iteration, time, depth or gap limit.
    Limit,

    /// The backend failed without a usable answer.
    Error,
}

impl From<MipStatus> for BackendStatus {
    fn from(status: MipStatus) -> Self {
        match status {
            MipStatus::Optimal => BackendStatus::Solved,
            MipStatus::Infeasible => BackendStatus::Infeasible,
            MipStatus::Unbounded => BackendStatus::Unbounded,
            MipStatus::NodeLimit
            | MipStatus::IterationLimit
            | MipStatus::TimeLimit
            | MipStatus::DepthLimit
            | MipStatus::GapLimit => BackendStatus::Limit,
        }
    }
}

/// A MILP solver driven through translate-in, run, translate-out.
pub trait SolverBackend {
    /// Backend-specific problem state between the stages.
    type Handle;

    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// Build the backend's problem from `model`.
    fn translate_in(&self, model: &LinearModel, settings: &MipSettings) -> MipResult<Self::Handle>;

    /// Solve the translated problem.
    fn run(&self, handle: &mut Self::Handle) -> MipResult<BackendStatus>;

    /// Extract the outcome in the caller's objective sense.
    fn translate_out(&self, handle: Self::Handle) -> MipResult<MipSolution>;

    /// All three stages in order.
    fn solve(&self, model: &LinearModel, settings: &MipSettings) -> MipResult<MipSolution> {
        let mut handle = self.translate_in(model, settings)?;
        let status = self.run(&mut handle)?;
        log::debug!("{} backend finished: {:?}", self.name(), status);
        if status == BackendStatus::Error {
            return Err(MipError::Backend(format!(
                "{} backend failed without a result",
                self.name()
            )));
        }
        self.translate_out(handle)
    }
}

/// The branch-and-bound engine of this crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct InProcessSolver;

/// Model, settings and result of one in-process run.
#[derive(Debug)]
pub struct InProcessRun {
    model: LinearModel,
    settings: MipSettings,
    solution: Option<MipSolution>,
}

impl SolverBackend for InProcessSolver {
    type Handle = InProcessRun;

    fn name(&self) -> &'static str {
        "in-process"
    }

    fn translate_in(&self, model: &LinearModel, settings: &MipSettings) -> MipResult<InProcessRun> {
        model.validate()?;
        Ok(InProcessRun {
            model: model.clone(),
            settings: settings.clone(),
            solution: None,
        })
    }

    fn run(&self, handle: &mut InProcessRun) -> MipResult<BackendStatus> {
        let solution = crate::solve_model(&handle.model, &handle.settings)?;
        let status = BackendStatus::from(solution.status);
        handle.solution = Some(solution);
        Ok(status)
    }

    fn translate_out(&self, handle: InProcessRun) -> MipResult<MipSolution> {
        handle
            .solution
            .ok_or_else(|| MipError::Backend("in-process backend has not been run".to_string()))
    }
}
