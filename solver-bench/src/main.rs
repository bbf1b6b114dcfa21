//! Command-line driver: solve an MPS model and print the result.

mod solver_choice;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use solver_mip::{read_mps, MipSettings, MipSolution, MipStatus};

use solver_choice::{BackendChoice, PrecisionChoice, PresolveChoice, RuleChoice, SelectionChoice};

#[derive(Parser, Debug)]
#[command(name = "milp", about = "Branch-and-bound MILP solver for MPS files")]
struct Cli {
    /// Model file; `.gz` files are decompressed on the fly.
    model: PathBuf,

    #[arg(long, value_enum, default_value_t = BackendChoice::InProcess)]
    backend: BackendChoice,

    #[arg(long, value_enum, default_value_t = PrecisionChoice::Auto)]
    precision: PrecisionChoice,

    #[arg(long, value_enum, default_value_t = PresolveChoice::RootOnly)]
    presolve: PresolveChoice,

    /// Node selection strategy.
    #[arg(long, value_enum, default_value_t = SelectionChoice::Hybrid)]
    selection: SelectionChoice,

    /// Branching variable rule.
    #[arg(long, value_enum, default_value_t = RuleChoice::Pseudocost)]
    rule: RuleChoice,

    /// Relative optimality gap at which to stop.
    #[arg(long, default_value_t = 0.0)]
    gap: f64,

    /// Time limit in seconds.
    #[arg(long)]
    time_limit: Option<f64>,

    #[arg(long)]
    max_nodes: Option<u64>,

    #[arg(long)]
    max_iterations: Option<u64>,

    #[arg(long)]
    max_depth: Option<usize>,

    /// Gomory cuts per node relaxation.
    #[arg(long, default_value_t = 5)]
    max_cuts: usize,

    /// Disable the rounding heuristic.
    #[arg(long)]
    no_heuristic: bool,

    /// Print the value of every column.
    #[arg(long)]
    print_solution: bool,

    /// Progress output; repeat for debug detail.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn settings(&self) -> MipSettings {
        let mut settings = MipSettings {
            verbose: self.verbose > 0,
            ..MipSettings::default()
        }
        .with_precision(self.precision.into())
        .with_presolve(self.presolve.into())
        .with_node_selection(self.selection.into())
        .with_branching_rule(self.rule.into())
        .with_gap_tol(self.gap)
        .with_max_cuts(self.max_cuts)
        .with_heuristic(!self.no_heuristic);
        if let Some(seconds) = self.time_limit {
            settings = settings.with_time_limit(seconds);
        }
        if let Some(nodes) = self.max_nodes {
            settings = settings.with_max_nodes(nodes);
        }
        if let Some(iterations) = self.max_iterations {
            settings = settings.with_iteration_limit(iterations);
        }
        if let Some(depth) = self.max_depth {
            settings = settings.with_depth_limit(depth);
        }
        settings
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).init();

    let mps = read_mps(&cli.model)
        .with_context(|| format!("Failed to read MPS file: {:?}", cli.model))?;
    println!(
        "{}: {} rows, {} columns ({} integer), {}",
        mps.name,
        mps.model.num_rows(),
        mps.model.num_cols(),
        mps.model.columns.iter().filter(|c| c.integral).count(),
        if mps.maximize { "maximize" } else { "minimize" }
    );

    let settings = cli.settings();
    let solution = solver_choice::solve(cli.backend, &mps.model, &settings)
        .with_context(|| format!("Solve failed for {}", mps.name))?;
    report(&solution, cli.print_solution);
    Ok(())
}

fn report(solution: &MipSolution, print_solution: bool) {
    println!("\n{}", "=".repeat(60));
    println!("Status:     {:?}", solution.status);
    match &solution.objective {
        Some(value) if value.is_exact() => {
            println!("Objective:  {} (~{:.6})", value, value.to_f64())
        }
        Some(value) => println!("Objective:  {:.6}", value.to_f64()),
        None => println!("Objective:  -"),
    }
    if solution.status != MipStatus::Optimal {
        if let Some(bound) = solution.bound {
            println!("Bound:      {:.6}", bound);
        }
        if let Some(gap) = solution.gap {
            println!("Gap:        {:.2}%", 100.0 * gap);
        }
    }

    let stats = &solution.stats;
    println!("Nodes:      {} explored, {} pruned", stats.nodes_explored, stats.nodes_pruned);
    println!("Iterations: {}", stats.simplex_iterations);
    println!(
        "Cuts:       {} (bound +{:.6})",
        stats.cuts_added, stats.cut_improvement
    );
    println!("Time:       {} ms", stats.elapsed_ms);
    println!("{}", "=".repeat(60));

    if print_solution {
        for (j, value) in solution.x.iter().enumerate() {
            println!("x[{}] = {}", j, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solver_mip::{BranchingRule, NodeSelection, PresolveLevel};

    #[test]
    fn test_flags_map_onto_settings() {
        let cli = Cli::parse_from([
            "milp",
            "model.mps.gz",
            "--selection",
            "best-bound",
            "--rule",
            "most-fractional",
            "--presolve",
            "full",
            "--max-nodes",
            "10",
            "--time-limit",
            "2.5",
            "--no-heuristic",
            "-v",
        ]);
        let s = cli.settings();
        assert_eq!(s.node_selection, NodeSelection::BestBound);
        assert_eq!(s.branching_rule, BranchingRule::MostFractional);
        assert_eq!(s.presolve, PresolveLevel::Full);
        assert_eq!(s.node_limit, Some(10));
        assert_eq!(s.time_limit_ms, Some(2500));
        assert!(!s.heuristic);
        assert!(s.verbose);
    }

    #[test]
    fn test_defaults_match_library() {
        let s = Cli::parse_from(["milp", "model.mps"]).settings();
        let d = MipSettings::default();
        assert_eq!(s.node_selection, d.node_selection);
        assert_eq!(s.branching_rule, d.branching_rule);
        assert_eq!(s.max_cuts, d.max_cuts);
        assert!(!s.verbose);
    }
}
