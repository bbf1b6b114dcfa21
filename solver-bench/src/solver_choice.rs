use clap::ValueEnum;
use solver_core::Precision;
use solver_mip::{
    BranchingRule, InProcessSolver, LinearModel, MipResult, MipSettings, MipSolution,
    NodeSelection, PresolveLevel, SolverBackend,
};

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum BackendChoice {
    InProcess,
    GoodLp,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PrecisionChoice {
    Auto,
    Exact,
    Float,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum PresolveChoice {
    Off,
    Full,
    RootOnly,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum SelectionChoice {
    DepthFirst,
    BreadthFirst,
    BestBound,
    BestProjection,
    Hybrid,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum RuleChoice {
    Pseudocost,
    MostFractional,
    FirstFractional,
    LastFractional,
}

impl From<PrecisionChoice> for Precision {
    fn from(choice: PrecisionChoice) -> Self {
        match choice {
            PrecisionChoice::Auto => Precision::Auto,
            PrecisionChoice::Exact => Precision::Exact,
            PrecisionChoice::Float => Precision::Float,
        }
    }
}

impl From<PresolveChoice> for PresolveLevel {
    fn from(choice: PresolveChoice) -> Self {
        match choice {
            PresolveChoice::Off => PresolveLevel::Off,
            PresolveChoice::Full => PresolveLevel::Full,
            PresolveChoice::RootOnly => PresolveLevel::RootOnly,
        }
    }
}

impl From<SelectionChoice> for NodeSelection {
    fn from(choice: SelectionChoice) -> Self {
        match choice {
            SelectionChoice::DepthFirst => NodeSelection::DepthFirst,
            SelectionChoice::BreadthFirst => NodeSelection::BreadthFirst,
            SelectionChoice::BestBound => NodeSelection::BestBound,
            SelectionChoice::BestProjection => NodeSelection::BestProjection,
            SelectionChoice::Hybrid => NodeSelection::Hybrid,
        }
    }
}

impl From<RuleChoice> for BranchingRule {
    fn from(choice: RuleChoice) -> Self {
        match choice {
            RuleChoice::Pseudocost => BranchingRule::Pseudocost,
            RuleChoice::MostFractional => BranchingRule::MostFractional,
            RuleChoice::FirstFractional => BranchingRule::FirstFractional,
            RuleChoice::LastFractional => BranchingRule::LastFractional,
        }
    }
}

pub fn solve(
    choice: BackendChoice,
    model: &LinearModel,
    settings: &MipSettings,
) -> anyhow::Result<MipSolution> {
    let result: MipResult<MipSolution> = match choice {
        BackendChoice::InProcess => InProcessSolver.solve(model, settings),
        #[cfg(feature = "good_lp")]
        BackendChoice::GoodLp => solver_mip::GoodLpSolver.solve(model, settings),
        #[cfg(not(feature = "good_lp"))]
        BackendChoice::GoodLp => {
            anyhow::bail!("built without the good_lp feature")
        }
    };
    Ok(result?)
}
