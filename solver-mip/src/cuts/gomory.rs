//! Gomory mixed-integer cuts from an optimal tableau.
//!
//! For a row `z_B + Σ a_k z_k = β` whose basic column is integral with
//! `f0 = frac(β) > 0`, every integer-feasible point satisfies
//!
//! ```text
//! Σ_{k int, f_k <= f0} f_k / f0 z_k + Σ_{k int, f_k > f0} (1 - f_k) / (1 - f0) z_k
//!   + Σ_{k cont, a_k >= 0} a_k / f0 z_k + Σ_{k cont, a_k < 0} -a_k / (1 - f0) z_k >= 1
//! ```
//!
//! over the nonbasic columns, while the current vertex (all `z_k = 0`)
//! violates it.

use solver_core::{LinearProgram, Scalar, Tableau};

/// Gomory cut filter settings.
#[derive(Debug, Clone)]
pub struct GomorySettings {
    /// Smallest `min(f0, 1 - f0)` of a source row.
    pub min_awayness: f64,

    /// Smallest |cosine| between the cut and the objective.
    pub min_cosine: f64,

    /// Largest coefficient magnitude after integralisation.
    pub max_magnitude: f64,
}

impl Default for GomorySettings {
    fn default() -> Self {
        Self {
            min_awayness: 0.08,
            min_cosine: 0.86,
            max_magnitude: 1e6,
        }
    }
}

/// Counters for generated and rejected candidates.
#[derive(Debug, Default, Clone)]
pub struct GomoryStats {
    pub candidates: usize,
    pub rejected_magnitude: usize,
    pub rejected_parallelism: usize,
}

/// One cut, over the tableau's oriented columns and over the program's columns.
#[derive(Debug, Clone)]
pub struct GomoryCut<T> {
    /// `coefs · z >= rhs` over the tableau columns.
    pub coefs: Vec<T>,
    pub rhs: T,

    /// `x_coefs · x >= x_rhs` over the program columns, slacks substituted out.
    pub x_coefs: Vec<T>,
    pub x_rhs: T,

    /// Largest integralised coefficient magnitude.
    pub magnitude: f64,
}

/// Generates one cut per round for a node's tableau.
///
/// Remembers the program-space definition of every cut it hands out, so
/// later cuts that mention an earlier cut's slack can be expressed in the
/// program's columns too.
pub struct GomoryGenerator<'a, T: Scalar> {
    settings: GomorySettings,
    lp: &'a LinearProgram<T>,

    /// First tableau column that is a cut slack.
    base: usize,

    /// `s = d · x - e` for each cut slack, in order.
    definitions: Vec<(Vec<T>, T)>,

    pub stats: GomoryStats,
}

impl<'a, T: Scalar> GomoryGenerator<'a, T> {
    /// `base` is the tableau's column count before any cut was added.
    pub fn new(lp: &'a LinearProgram<T>, base: usize, settings: GomorySettings) -> Self {
        Self {
            settings,
            lp,
            base,
            definitions: Vec::new(),
            stats: GomoryStats::default(),
        }
    }

    /// Best surviving candidate over all fractional integral rows.
    ///
    /// The candidate with the smallest magnitude wins; ties keep the first row.
    pub fn generate(&mut self, tableau: &Tableau<T>) -> Option<GomoryCut<T>> {
        let n = tableau.num_cols();
        let mut basic = vec![false; n];
        for i in 0..tableau.num_rows() {
            let b = tableau.basic(i);
            if b < n {
                basic[b] = true;
            }
        }

        let mut best: Option<GomoryCut<T>> = None;
        for i in 0..tableau.num_rows() {
            let b = tableau.basic(i);
            if b >= n || !tableau.is_integral(b) {
                continue;
            }
            let f0 = tableau.rhs(i).frac();
            let away = f0.to_f64().min(1.0 - f0.to_f64());
            if away < self.settings.min_awayness {
                continue;
            }
            self.stats.candidates += 1;
            let Some(cut) = self.derive(tableau, i, &basic, f0) else {
                continue;
            };
            if best.as_ref().map_or(true, |c| cut.magnitude < c.magnitude) {
                best = Some(cut);
            }
        }
        best
    }

    /// Remember the program-space definition of a cut just added.
    pub fn record(&mut self, cut: &GomoryCut<T>) {
        self.definitions.push((cut.x_coefs.clone(), cut.x_rhs.clone()));
    }

    fn derive(&mut self, tableau: &Tableau<T>, i: usize, basic: &[bool], f0: T) -> Option<GomoryCut<T>> {
        let row = tableau.row(i);
        let n = tableau.num_cols();
        let one_minus_f0 = T::one() - f0.clone();

        let mut coefs = vec![T::zero(); n + 1];
        for k in (0..n).filter(|&k| !basic[k]) {
            let a = &row[k];
            if a.is_negligible() {
                continue;
            }
            coefs[k] = if tableau.is_integral(k) {
                let fk = a.frac();
                if fk <= f0 {
                    fk / f0.clone()
                } else {
                    (T::one() - fk) / one_minus_f0.clone()
                }
            } else if a.is_positive() {
                a.clone() / f0.clone()
            } else {
                -a.clone() / one_minus_f0.clone()
            };
        }
        coefs[n] = T::one();

        T::scale_to_integers(&mut coefs);
        let magnitude = coefs
            .iter()
            .map(|c| c.abs().to_f64())
            .fold(0.0, f64::max);
        if magnitude > self.settings.max_magnitude {
            self.stats.rejected_magnitude += 1;
            return None;
        }
        let mut rhs = coefs.pop().unwrap_or_else(T::one);
        if !T::EXACT {
            let slack = if rhs.abs() > T::one() { rhs.abs() } else { T::one() };
            rhs = rhs - T::feas_tol() * slack;
        }

        let (x_coefs, x_rhs) = self.to_program_space(tableau, &coefs, &rhs);
        if !self.parallel_enough(&x_coefs) {
            self.stats.rejected_parallelism += 1;
            return None;
        }
        Some(GomoryCut {
            coefs,
            rhs,
            x_coefs,
            x_rhs,
            magnitude,
        })
    }

    /// Undo orientation, shifts, and slacks.
    fn to_program_space(&self, tableau: &Tableau<T>, coefs: &[T], rhs: &T) -> (Vec<T>, T) {
        let m = self.lp.num_vars();
        let mut x = vec![T::zero(); m];
        let mut b = rhs.clone();
        for (k, g) in coefs.iter().enumerate() {
            if g.is_zero() {
                continue;
            }
            if k < self.base {
                let l = tableau.lower(k).clone();
                match (tableau.is_complemented(k), tableau.upper(k)) {
                    // z = u' + l - x
                    (true, Some(u)) => {
                        x[k] = x[k].clone() - g.clone();
                        b = b - g.clone() * (u.clone() + l);
                    }
                    // z = x - l
                    _ => {
                        x[k] = x[k].clone() + g.clone();
                        b = b + g.clone() * l;
                    }
                }
            } else if let Some((d, e)) = self.definitions.get(k - self.base) {
                for (xj, dj) in x.iter_mut().zip(d) {
                    *xj = xj.clone() + g.clone() * dj.clone();
                }
                b = b + g.clone() * e.clone();
            }
        }

        let cons = &self.lp.constraints;
        for k in 0..m {
            if !self.lp.variables[k].slack || x[k].is_zero() {
                continue;
            }
            let Some(i) = (0..cons.num_rows()).find(|&i| !cons.lhs[i][k].is_zero()) else {
                continue;
            };
            let factor = x[k].clone() / cons.lhs[i][k].clone();
            for (xj, a) in x.iter_mut().zip(&cons.lhs[i]) {
                if !a.is_zero() {
                    *xj = xj.clone() - factor.clone() * a.clone();
                }
            }
            b = b - factor * cons.rhs[i].clone();
            x[k] = T::zero();
        }
        (x, b)
    }

    fn parallel_enough(&self, x_coefs: &[T]) -> bool {
        let (mut dot, mut cut_norm, mut obj_norm) = (0.0, 0.0, 0.0);
        for (a, c) in x_coefs.iter().zip(&self.lp.objective) {
            let (a, c) = (a.to_f64(), c.to_f64());
            dot += a * c;
            cut_norm += a * a;
            obj_norm += c * c;
        }
        if cut_norm == 0.0 || obj_norm == 0.0 {
            return true;
        }
        (dot / (cut_norm.sqrt() * obj_norm.sqrt())).abs() >= self.settings.min_cosine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use num_rational::BigRational;
    use solver_core::simplex::IterationBudget;
    use solver_core::{Constraints, LpStatus, Range, Relation, StandardForm, Variable};

    fn q(n: i64) -> BigRational {
        BigRational::from_integer(BigInt::from(n))
    }

    /// min x + y, x + 2y - s1 = 4, 3x + y - s2 = 6, all integral.
    fn scenario_b() -> LinearProgram<BigRational> {
        let slack = Variable {
            integral: true,
            slack: true,
            ..Variable::default()
        };
        LinearProgram {
            objective: vec![q(1), q(1), q(0), q(0)],
            constant: q(0),
            constraints: Constraints::new(
                vec![
                    vec![q(1), q(2), q(-1), q(0)],
                    vec![q(3), q(1), q(0), q(-1)],
                ],
                vec![q(4), q(6)],
                vec![Relation::Eq, Relation::Eq],
            ),
            variables: vec![
                Variable::integer(Range::default()),
                Variable::integer(Range::default()),
                slack.clone(),
                slack,
            ],
        }
    }

    #[test]
    fn test_cut_from_scenario_b_vertex() {
        let lp = scenario_b();
        let mut tableau = Tableau::new(StandardForm::from_program(&lp).unwrap());
        let mut budget = IterationBudget::unlimited();
        assert_eq!(tableau.optimize(&mut budget), LpStatus::Optimal);

        let mut gen = GomoryGenerator::new(&lp, tableau.num_cols(), GomorySettings::default());
        let cut = gen.generate(&tableau).expect("fractional vertex yields a cut");
        assert_eq!(gen.stats.candidates, 2);

        // The x row gives s1 + 3 s2 >= 3, i.e. 10x + 5y >= 25.
        assert_eq!(cut.magnitude, 3.0);
        assert_eq!(cut.x_coefs, vec![q(10), q(5), q(0), q(0)]);
        assert_eq!(cut.x_rhs, q(25));

        // Adding it makes the relaxation integral at (2, 1).
        tableau.add_cut(&cut.coefs, cut.rhs.clone());
        gen.record(&cut);
        assert_eq!(tableau.optimize(&mut budget), LpStatus::Optimal);
        assert_eq!(tableau.objective_value(), q(3));
        assert!(gen.generate(&tableau).is_none());
    }

    #[test]
    fn test_cut_keeps_integer_points() {
        let lp = scenario_b();
        let mut tableau = Tableau::new(StandardForm::from_program(&lp).unwrap());
        tableau.optimize(&mut IterationBudget::unlimited());
        let mut gen = GomoryGenerator::new(&lp, tableau.num_cols(), GomorySettings::default());
        let cut = gen.generate(&tableau).unwrap();

        for x in 0..8 {
            for y in 0..8 {
                let feasible = x + 2 * y >= 4 && 3 * x + y >= 6;
                if !feasible {
                    continue;
                }
                let point = [q(x), q(y), q(x + 2 * y - 4), q(3 * x + y - 6)];
                let lhs = solver_core::numeric::dot(&cut.x_coefs, &point);
                assert!(lhs >= cut.x_rhs, "cut removes ({}, {})", x, y);
            }
        }
        // The fractional optimum (8/5, 6/5) is cut off.
        let frac = [
            BigRational::new(8.into(), 5.into()),
            BigRational::new(6.into(), 5.into()),
            q(0),
            q(0),
        ];
        assert!(solver_core::numeric::dot(&cut.x_coefs, &frac) < cut.x_rhs);
    }

    #[test]
    fn test_parallelism_filter() {
        let mut lp = scenario_b();
        // Objective orthogonal to 2x + y.
        lp.objective = vec![q(1), q(-2), q(0), q(0)];
        let gen: GomoryGenerator<'_, BigRational> =
            GomoryGenerator::new(&lp, 4, GomorySettings::default());
        assert!(!gen.parallel_enough(&[q(2), q(1), q(0), q(0)]));
        assert!(gen.parallel_enough(&[q(0), q(0), q(0), q(0)]));
        assert!(gen.parallel_enough(&[q(-1), q(2), q(0), q(0)]));
    }
}
