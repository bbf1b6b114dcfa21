//! Cut validity and postprocessing properties on generated instances.

use num_rational::BigRational;
use solver_core::simplex::IterationBudget;
use solver_core::{
    Constraints, LinearProgram, LpStatus, Number, Range, Relation, Scalar, StandardForm, Tableau,
    Variable,
};
use solver_mip::cuts::{GomoryGenerator, GomorySettings};
use solver_mip::{ColumnSpec, LinearModel, MipSettings, MipStatus};

type Q = BigRational;

fn q(v: i64) -> Q {
    Q::from_i64(v)
}

struct Lcg(u64);

impl Lcg {
    fn below(&mut self, bound: i64) -> i64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) % bound as u64) as i64
    }
}

/// `min c·x` over two integer columns in [0, 4] and `rows` packing rows,
/// written as equalities with integral slack columns.
fn instance(seed: u64, rows: usize) -> (LinearProgram<Q>, Vec<(Vec<i64>, i64)>) {
    let mut rng = Lcg(seed);
    let mut data = Vec::new();
    for _ in 0..rows {
        let coefs = vec![1 + rng.below(6), 1 + rng.below(6)];
        let rhs = 3 + rng.below(12);
        data.push((coefs, rhs));
    }

    let n = 2 + rows;
    let mut lhs = Vec::new();
    for (i, (coefs, _)) in data.iter().enumerate() {
        let mut r = vec![q(0); n];
        r[0] = q(coefs[0]);
        r[1] = q(coefs[1]);
        r[2 + i] = q(1);
        lhs.push(r);
    }
    let mut objective = vec![q(0); n];
    objective[0] = q(-1 - rng.below(5));
    objective[1] = q(-1 - rng.below(5));

    let mut variables = vec![Variable::integer(Range::new(Some(q(0)), Some(q(4)))); 2];
    for _ in 0..rows {
        variables.push(Variable {
            slack: true,
            ..Variable::integer(Range::default())
        });
    }
    let lp = LinearProgram {
        objective,
        constant: q(0),
        constraints: Constraints::new(
            lhs,
            data.iter().map(|(_, b)| q(*b)).collect(),
            vec![Relation::Eq; rows],
        ),
        variables,
    };
    (lp, data)
}

/// Every integer point of the box that satisfies the packing rows, with slacks.
fn integer_points(data: &[(Vec<i64>, i64)]) -> Vec<Vec<Q>> {
    let mut points = Vec::new();
    for x in 0..=4i64 {
        for y in 0..=4i64 {
            let slacks: Vec<i64> = data.iter().map(|(a, b)| b - a[0] * x - a[1] * y).collect();
            if slacks.iter().all(|&s| s >= 0) {
                let mut p = vec![q(x), q(y)];
                p.extend(slacks.into_iter().map(q));
                points.push(p);
            }
        }
    }
    points
}

fn activity(coefs: &[Q], x: &[Q]) -> Q {
    coefs
        .iter()
        .zip(x)
        .fold(q(0), |acc, (a, v)| acc + a.clone() * v.clone())
}

#[test]
fn test_gomory_cuts_keep_integer_points() {
    let mut cuts_checked = 0;
    for seed in 0..20 {
        let (lp, data) = instance(seed, 2);
        let points = integer_points(&data);
        let mut tableau = Tableau::new(StandardForm::from_program(&lp).unwrap());
        let mut budget = IterationBudget::unlimited();
        if tableau.optimize(&mut budget) != LpStatus::Optimal {
            continue;
        }

        let mut generator = GomoryGenerator::new(&lp, tableau.num_cols(), GomorySettings::default());
        for _ in 0..5 {
            let Some(cut) = generator.generate(&tableau) else {
                break;
            };
            let vertex: Vec<Q> = tableau.solution().into_iter().take(lp.num_vars()).collect();
            assert!(
                activity(&cut.x_coefs, &vertex) < cut.x_rhs,
                "seed {}: cut does not separate the vertex",
                seed
            );
            for p in &points {
                assert!(
                    activity(&cut.x_coefs, p) >= cut.x_rhs,
                    "seed {}: cut removes integer point {:?}",
                    seed,
                    p
                );
            }
            cuts_checked += 1;

            tableau.add_cut(&cut.coefs, cut.rhs.clone());
            generator.record(&cut);
            if tableau.optimize(&mut budget) != LpStatus::Optimal {
                break;
            }
        }
    }
    assert!(cuts_checked > 0);
}

#[test]
fn test_cut_rounds_never_pass_the_integer_optimum() {
    for seed in 0..20 {
        let (lp, data) = instance(seed, 2);
        let best = integer_points(&data)
            .iter()
            .map(|p| lp.objective_value(p))
            .fold(None::<Q>, |acc, v| match acc {
                Some(b) if b <= v => Some(b),
                _ => Some(v),
            })
            .expect("the origin is always feasible");

        let mut tableau = Tableau::new(StandardForm::from_program(&lp).unwrap());
        let mut budget = IterationBudget::unlimited();
        assert_eq!(tableau.optimize(&mut budget), LpStatus::Optimal);
        let mut generator = GomoryGenerator::new(&lp, tableau.num_cols(), GomorySettings::default());
        let mut previous = tableau.objective_value();
        for _ in 0..5 {
            let Some(cut) = generator.generate(&tableau) else {
                break;
            };
            tableau.add_cut(&cut.coefs, cut.rhs.clone());
            generator.record(&cut);
            assert_eq!(tableau.optimize(&mut budget), LpStatus::Optimal);
            let value = tableau.objective_value();
            assert!(value >= previous, "seed {}: bound decreased", seed);
            assert!(value <= best, "seed {}: bound {} above optimum {}", seed, value, best);
            previous = value;
        }
    }
}

/// Scenario B plus a fixed column and a singleton row for presolve to remove.
fn reducible_model() -> LinearModel {
    let n = |v: i64| Number::from(v);
    let mut model = LinearModel::new(3);
    model.objective = vec![n(1), n(1), n(2)];
    model.columns = vec![
        ColumnSpec::integer(Some(n(0)), None),
        ColumnSpec::integer(Some(n(0)), None),
        ColumnSpec::continuous(Some(n(1)), Some(n(1))),
    ];
    model.add_row(vec![n(1), n(2), n(1)], Relation::Ge, n(5));
    model.add_row(vec![n(3), n(1), n(0)], Relation::Ge, n(6));
    model.add_row(vec![n(0), n(0), n(1)], Relation::Le, n(3));
    model
}

#[test]
fn test_postprocess_is_idempotent() {
    let model = reducible_model();
    let mut problem = model.to_problem::<Q>(MipSettings::default()).unwrap();
    assert_eq!(problem.solve().unwrap(), MipStatus::Optimal);
    assert!(problem.stats.presolve.cols_removed > 0);

    problem.postprocess();
    let first = problem.solution().unwrap().to_vec();
    assert_eq!(first.len(), 3);
    assert_eq!(first[2], q(1));

    problem.postprocess();
    assert_eq!(problem.solution().unwrap(), &first[..]);
    assert_eq!(problem.optimum(), Some(&q(5)));
}

#[test]
fn test_solution_audits_against_original_rows() {
    let model = reducible_model();
    let mut problem = model.to_problem::<f64>(MipSettings::default()).unwrap();
    problem.solve().unwrap();
    problem.postprocess();
    let x = problem.solution().unwrap();

    let original: LinearProgram<f64> = model.to_program().unwrap();
    for i in 0..original.num_rows() {
        let c = &original.constraints;
        assert!(c.relations[i].holds(&c.row_activity(i, x), &c.rhs[i]), "row {}", i);
    }
    assert!((original.objective_value(x) - 5.0).abs() < 1e-9);
}
