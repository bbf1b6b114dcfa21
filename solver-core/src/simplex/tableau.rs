//! Dense tableau with bound flipping and warm-started cut rows.

use super::{IterationBudget, LpStatus, StandardForm};
use crate::numeric::Scalar;

const NO_BASIS: usize = usize::MAX;

/// What leaves when a column enters.
enum Leaving {
    /// The entering column reaches its own upper bound.
    Flip,
    /// Row `row` leaves the basis, at its upper bound if `at_upper`.
    Row { row: usize, at_upper: bool },
    Unbounded,
}

/// Simplex tableau in oriented, shifted variables.
///
/// Column `j` carries `z_j = x_j - l_j`, or `u_j - z_j` when complemented.
/// The objective is `z + Σ reduced_j z_j`, with `reduced` zero on basic columns.
#[derive(Debug, Clone)]
pub struct Tableau<T> {
    rows: Vec<Vec<T>>,
    rhs: Vec<T>,
    basis: Vec<usize>,
    reduced: Vec<T>,
    z: T,
    costs: Vec<T>,
    upper: Vec<Option<T>>,
    lower: Vec<T>,
    integral: Vec<bool>,
    complemented: Vec<bool>,
    constant: T,
    cost_ready: bool,
    bland: bool,
    iterations: u64,
}

fn clean<T: Scalar>(v: T) -> T {
    if !T::EXACT && v.is_negligible() {
        T::zero()
    } else {
        v
    }
}

impl<T: Scalar> Tableau<T> {
    pub fn new(sf: StandardForm<T>) -> Self {
        let m = sf.num_rows();
        let n = sf.num_cols();
        Self {
            rows: sf.a,
            rhs: sf.b,
            basis: vec![NO_BASIS; m],
            reduced: vec![T::zero(); n],
            z: T::zero(),
            costs: sf.cost,
            upper: sf.upper,
            lower: sf.lower,
            integral: sf.integral,
            complemented: vec![false; n],
            constant: sf.constant,
            cost_ready: false,
            bland: false,
            iterations: 0,
        }
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.costs.len()
    }

    /// Column basic in row `i`.
    pub fn basic(&self, i: usize) -> usize {
        self.basis[i]
    }

    pub fn row(&self, i: usize) -> &[T] {
        &self.rows[i]
    }

    pub fn rhs(&self, i: usize) -> &T {
        &self.rhs[i]
    }

    pub fn is_complemented(&self, j: usize) -> bool {
        self.complemented[j]
    }

    /// Shifted upper bound of column `j`.
    pub fn upper(&self, j: usize) -> Option<&T> {
        self.upper[j].as_ref()
    }

    /// Shift applied to column `j`.
    pub fn lower(&self, j: usize) -> &T {
        &self.lower[j]
    }

    pub fn is_integral(&self, j: usize) -> bool {
        self.integral[j]
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn objective_value(&self) -> T {
        self.z.clone() + self.constant.clone()
    }

    /// Values of every column in the unshifted space.
    pub fn solution(&self) -> Vec<T> {
        let n = self.num_cols();
        let mut y = vec![T::zero(); n];
        for (i, &b) in self.basis.iter().enumerate() {
            if b < n {
                y[b] = self.rhs[i].clone();
            }
        }
        y.into_iter()
            .enumerate()
            .map(|(j, v)| {
                let v = match (&self.upper[j], self.complemented[j]) {
                    (Some(u), true) => u.clone() - v,
                    _ => v,
                };
                self.lower[j].clone() + v
            })
            .collect()
    }

    /// Solve from the current basis.
    pub fn optimize(&mut self, budget: &mut IterationBudget) -> LpStatus {
        let started = self.iterations;
        let status = match self.phase_one(budget) {
            Ok(()) => match self.iterate(self.num_cols(), budget) {
                Ok(()) => LpStatus::Optimal,
                Err(status) => status,
            },
            Err(status) => status,
        };
        log::trace!(
            "simplex: {:?} after {} iterations, {} rows",
            status,
            self.iterations - started,
            self.num_rows()
        );
        status
    }

    /// Append `Σ coefs_j z_j >= rhs` over the oriented columns.
    ///
    /// The new row gets its own basic slack; returns the slack's column.
    pub fn add_cut(&mut self, coefs: &[T], rhs: T) -> usize {
        let n = self.num_cols();
        for row in &mut self.rows {
            row.push(T::zero());
        }
        self.costs.push(T::zero());
        self.upper.push(None);
        self.lower.push(T::zero());
        self.integral.push(false);
        self.complemented.push(false);
        self.reduced.push(T::zero());

        let mut row: Vec<T> = coefs.iter().map(|a| -a.clone()).collect();
        row.resize(n, T::zero());
        row.push(T::one());
        let mut b = -rhs;
        for (i, &col) in self.basis.iter().enumerate() {
            if col >= n {
                continue;
            }
            let f = row[col].clone();
            if f.is_zero() {
                continue;
            }
            for (k, a) in self.rows[i].iter().enumerate() {
                if !a.is_zero() {
                    row[k] = clean(row[k].clone() - f.clone() * a.clone());
                }
            }
            row[col] = T::zero();
            b = b - f * self.rhs[i].clone();
        }
        self.rows.push(row);
        self.rhs.push(b);
        self.basis.push(n);
        n
    }

    /// Whether row `i` has no feasible basic variable.
    fn is_pending(&self, i: usize) -> bool {
        let b = self.basis[i];
        if b == NO_BASIS || T::zero().exceeds(&self.rhs[i]) {
            return true;
        }
        b < self.num_cols()
            && self.upper[b]
                .as_ref()
                .map_or(false, |u| self.rhs[i].exceeds(u))
    }

    /// Restore primal feasibility with one artificial per violated row.
    fn phase_one(&mut self, budget: &mut IterationBudget) -> Result<(), LpStatus> {
        let n = self.num_cols();
        let pending: Vec<usize> = (0..self.num_rows()).filter(|&i| self.is_pending(i)).collect();
        if pending.is_empty() {
            if !self.cost_ready {
                self.rebuild_costs();
            }
            return Ok(());
        }

        for &i in &pending {
            let b = self.basis[i];
            if b != NO_BASIS && self.upper[b].as_ref().map_or(false, |u| self.rhs[i].exceeds(u)) {
                self.complement_basic(i);
            }
            if self.rhs[i].is_negative() {
                self.negate_row(i);
            }
        }
        for (k, &i) in pending.iter().enumerate() {
            for (r, row) in self.rows.iter_mut().enumerate() {
                row.push(if r == i { T::one() } else { T::zero() });
            }
            self.basis[i] = n + k;
        }

        self.reduced = vec![T::zero(); n + pending.len()];
        self.z = T::zero();
        for &i in &pending {
            for j in 0..n {
                self.reduced[j] = self.reduced[j].clone() - self.rows[i][j].clone();
            }
            self.z = self.z.clone() + self.rhs[i].clone();
        }
        self.cost_ready = false;

        match self.iterate(n, budget) {
            Ok(()) => {}
            Err(LpStatus::Unbounded) => return Err(LpStatus::Error),
            Err(status) => return Err(status),
        }
        if self.z.exceeds(&T::zero()) {
            return Err(LpStatus::Infeasible);
        }

        let mut i = self.num_rows();
        while i > 0 {
            i -= 1;
            if self.basis[i] < n {
                continue;
            }
            let mut best: Option<(usize, T)> = None;
            for (j, a) in self.rows[i][..n].iter().enumerate() {
                let mag = a.abs();
                if mag.is_negligible() {
                    continue;
                }
                if best.as_ref().map_or(true, |(_, m)| mag > *m) {
                    best = Some((j, mag));
                }
            }
            match best {
                Some((j, _)) => {
                    self.rhs[i] = T::zero();
                    self.pivot(i, j);
                }
                None => {
                    log::warn!("simplex: dropping redundant row {}", i);
                    self.rows.remove(i);
                    self.rhs.remove(i);
                    self.basis.remove(i);
                }
            }
        }
        for row in &mut self.rows {
            row.truncate(n);
        }
        self.rebuild_costs();
        Ok(())
    }

    /// Primal simplex over columns `0..cols`.
    fn iterate(&mut self, cols: usize, budget: &mut IterationBudget) -> Result<(), LpStatus> {
        loop {
            let Some(j) = self.entering(cols) else {
                return Ok(());
            };
            if !budget.tick() {
                return Err(LpStatus::IterationLimit);
            }
            self.iterations += 1;
            let before = self.z.clone();
            match self.ratio_test(j) {
                Leaving::Unbounded => return Err(LpStatus::Unbounded),
                Leaving::Flip => self.flip(j),
                Leaving::Row { row, at_upper } => {
                    if at_upper {
                        self.complement_basic(row);
                    }
                    self.pivot(row, j);
                }
            }
            // Bland's rule while degenerate.
            self.bland = !(before - self.z.clone()).is_pos();
        }
    }

    fn entering(&self, cols: usize) -> Option<usize> {
        let candidates = self.reduced[..cols]
            .iter()
            .enumerate()
            .filter(|(_, d)| d.is_neg());
        if self.bland {
            return candidates.map(|(j, _)| j).next();
        }
        let mut best: Option<(usize, &T)> = None;
        for (j, d) in candidates {
            if best.map_or(true, |(_, b)| d < b) {
                best = Some((j, d));
            }
        }
        best.map(|(j, _)| j)
    }

    fn basic_upper(&self, i: usize) -> Option<&T> {
        let b = self.basis[i];
        if b < self.num_cols() {
            self.upper[b].as_ref()
        } else {
            None
        }
    }

    fn ratio_test(&self, j: usize) -> Leaving {
        let eps = T::epsilon();
        let mut best: Option<(T, Leaving)> = self.upper[j].clone().map(|u| (u, Leaving::Flip));
        for i in 0..self.num_rows() {
            let t = &self.rows[i][j];
            let candidate = if *t > eps {
                Some((self.rhs[i].clone().max_zero() / t.clone(), false))
            } else if *t < -eps.clone() {
                self.basic_upper(i).map(|u| {
                    let room = (u.clone() - self.rhs[i].clone()).max_zero();
                    (room / -t.clone(), true)
                })
            } else {
                None
            };
            let Some((ratio, at_upper)) = candidate else {
                continue;
            };
            let better = match &best {
                None => true,
                Some((r, Leaving::Flip)) => ratio < r.clone() - eps.clone(),
                Some((r, Leaving::Row { row, .. })) => {
                    ratio < r.clone() - eps.clone()
                        || ((ratio.clone() - r.clone()).abs() <= eps
                            && self.basis[i] < self.basis[*row])
                }
                Some((_, Leaving::Unbounded)) => true,
            };
            if better {
                best = Some((ratio, Leaving::Row { row: i, at_upper }));
            }
        }
        best.map_or(Leaving::Unbounded, |(_, leaving)| leaving)
    }

    fn pivot(&mut self, r: usize, j: usize) {
        let p = self.rows[r][j].clone();
        if p != T::one() {
            for v in self.rows[r].iter_mut() {
                *v = v.clone() / p.clone();
            }
            self.rhs[r] = self.rhs[r].clone() / p;
        }
        self.rows[r][j] = T::one();
        let pivot_row = self.rows[r].clone();
        let pivot_rhs = self.rhs[r].clone();

        for i in 0..self.rows.len() {
            if i == r {
                continue;
            }
            let f = self.rows[i][j].clone();
            if f.is_zero() {
                continue;
            }
            for (v, a) in self.rows[i].iter_mut().zip(&pivot_row) {
                if !a.is_zero() {
                    *v = clean(v.clone() - f.clone() * a.clone());
                }
            }
            self.rows[i][j] = T::zero();
            self.rhs[i] = clean(self.rhs[i].clone() - f * pivot_rhs.clone());
        }

        let f = self.reduced[j].clone();
        if !f.is_zero() {
            for (d, a) in self.reduced.iter_mut().zip(&pivot_row) {
                if !a.is_zero() {
                    *d = clean(d.clone() - f.clone() * a.clone());
                }
            }
            self.z = self.z.clone() + f * pivot_rhs;
        }
        self.reduced[j] = T::zero();
        self.basis[r] = j;
    }

    /// Move nonbasic column `j` to its other bound.
    fn flip(&mut self, j: usize) {
        let Some(u) = self.upper[j].clone() else {
            return;
        };
        for (row, b) in self.rows.iter_mut().zip(self.rhs.iter_mut()) {
            if row[j].is_zero() {
                continue;
            }
            *b = clean(b.clone() - row[j].clone() * u.clone());
            row[j] = -row[j].clone();
        }
        self.z = self.z.clone() + self.reduced[j].clone() * u;
        self.reduced[j] = -self.reduced[j].clone();
        self.complemented[j] = !self.complemented[j];
    }

    /// Re-express row `r` in terms of the complement of its basic column.
    fn complement_basic(&mut self, r: usize) {
        let b = self.basis[r];
        let Some(u) = self.upper[b].clone() else {
            return;
        };
        for (k, v) in self.rows[r].iter_mut().enumerate() {
            if k != b && !v.is_zero() {
                *v = -v.clone();
            }
        }
        self.rhs[r] = u - self.rhs[r].clone();
        self.complemented[b] = !self.complemented[b];
    }

    fn negate_row(&mut self, i: usize) {
        for v in self.rows[i].iter_mut() {
            *v = -v.clone();
        }
        self.rhs[i] = -self.rhs[i].clone();
    }

    /// Phase-two reduced costs from the original costs and the current basis.
    fn rebuild_costs(&mut self) {
        let n = self.num_cols();
        self.z = T::zero();
        self.reduced = (0..n)
            .map(|j| {
                if self.complemented[j] {
                    -self.costs[j].clone()
                } else {
                    self.costs[j].clone()
                }
            })
            .collect();
        for j in 0..n {
            if let (true, Some(u)) = (self.complemented[j], &self.upper[j]) {
                self.z = self.z.clone() + self.costs[j].clone() * u.clone();
            }
        }
        for i in 0..self.num_rows() {
            let b = self.basis[i];
            let f = self.reduced[b].clone();
            if f.is_zero() {
                continue;
            }
            for (d, a) in self.reduced.iter_mut().zip(&self.rows[i]) {
                if !a.is_zero() {
                    *d = clean(d.clone() - f.clone() * a.clone());
                }
            }
            self.reduced[b] = T::zero();
            self.z = self.z.clone() + f * self.rhs[i].clone();
        }
        self.cost_ready = true;
    }
}

trait MaxZero {
    fn max_zero(self) -> Self;
}

impl<T: Scalar> MaxZero for T {
    fn max_zero(self) -> Self {
        if self < T::zero() {
            T::zero()
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Constraints, LinearProgram, Range, Relation, Variable};

    fn scenario_a() -> Tableau<f64> {
        let lp = LinearProgram {
            objective: vec![1.0, 1.0],
            constant: 0.0,
            constraints: Constraints::new(
                vec![vec![1.0, 2.0], vec![3.0, 1.0]],
                vec![4.0, 6.0],
                vec![Relation::Ge, Relation::Ge],
            ),
            variables: vec![
                Variable::continuous(Range::default()),
                Variable::continuous(Range::default()),
            ],
        };
        Tableau::new(StandardForm::from_program(&lp).unwrap())
    }

    #[test]
    fn test_warm_cut_reoptimizes() {
        let mut t = scenario_a();
        let mut budget = IterationBudget::unlimited();
        assert_eq!(t.optimize(&mut budget), LpStatus::Optimal);
        assert!((t.objective_value() - 2.8).abs() < 1e-9);

        // x + y >= 3
        let slack = t.add_cut(&[1.0, 1.0, 0.0, 0.0], 3.0);
        assert_eq!(slack, 4);
        assert_eq!(t.num_rows(), 3);
        assert_eq!(t.optimize(&mut budget), LpStatus::Optimal);
        assert!((t.objective_value() - 3.0).abs() < 1e-9);

        let x = t.solution();
        assert!(x[0] + 2.0 * x[1] >= 4.0 - 1e-9);
        assert!(3.0 * x[0] + x[1] >= 6.0 - 1e-9);
        assert!(x[0] + x[1] >= 3.0 - 1e-9);
    }

    #[test]
    fn test_basis_rows_are_unit_columns() {
        let mut t = scenario_a();
        t.optimize(&mut IterationBudget::unlimited());
        for i in 0..t.num_rows() {
            let b = t.basic(i);
            for k in 0..t.num_rows() {
                let expected = if k == i { 1.0 } else { 0.0 };
                assert!((t.row(k)[b] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_infeasible_cut() {
        // x in [0, 1], min x, then cut x >= 2
        let lp = LinearProgram {
            objective: vec![1.0],
            constant: 0.0,
            constraints: Constraints::empty(),
            variables: vec![Variable::continuous(Range::new(Some(0.0), Some(1.0)))],
        };
        let mut t = Tableau::new(StandardForm::from_program(&lp).unwrap());
        let mut budget = IterationBudget::unlimited();
        assert_eq!(t.optimize(&mut budget), LpStatus::Optimal);
        t.add_cut(&[1.0], 2.0);
        assert_eq!(t.optimize(&mut budget), LpStatus::Infeasible);
    }
}
