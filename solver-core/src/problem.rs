//! Problem data structures and validation.
//!
//! This module defines the normalized linear model shared by presolve, the
//! simplex engine, and the branch-and-bound search:
//!
//! ```text
//! minimize    c^T x + c0
//! subject to  A x (<=, =, >=) b
//!             l <= x <= u,  x_j integer for j in I
//! ```
//!
//! The constraint matrix is dense. Infinite bounds are `None`.

use std::fmt;

use thiserror::Error;

use crate::numeric::Scalar;

/// Errors raised by malformed models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Row/column counts disagree.
    #[error("Dimension mismatch: {0}")]
    Dimension(String),

    /// A bound pair with lower above upper.
    #[error("Variable {var} has empty range [{lower}, {upper}]")]
    EmptyRange {
        var: usize,
        lower: String,
        upper: String,
    },

    /// The simplex needs a finite lower bound on every column.
    #[error("Column {0} has no finite lower bound")]
    FreeColumn(usize),
}

/// Row relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `a^T x <= b`
    Le,
    /// `a^T x = b`
    Eq,
    /// `a^T x >= b`
    Ge,
}

impl Relation {
    /// Whether `lhs rel rhs` holds within `tol`.
    pub fn holds_within<T: Scalar>(self, lhs: &T, rhs: &T, tol: &T) -> bool {
        let diff = lhs.clone() - rhs.clone();
        match self {
            Relation::Le => diff <= tol.clone(),
            Relation::Ge => diff >= -tol.clone(),
            Relation::Eq => diff.abs() <= tol.clone(),
        }
    }

    /// Whether `lhs rel rhs` holds within the scalar's feasibility tolerance.
    pub fn holds<T: Scalar>(self, lhs: &T, rhs: &T) -> bool {
        self.holds_within(lhs, rhs, &T::feas_tol())
    }

    /// Amount by which `lhs rel rhs` is violated (zero if satisfied).
    pub fn violation<T: Scalar>(self, lhs: &T, rhs: &T) -> T {
        let diff = lhs.clone() - rhs.clone();
        match self {
            Relation::Le if diff.is_positive() => diff,
            Relation::Ge if diff.is_negative() => -diff,
            Relation::Eq => diff.abs(),
            _ => T::zero(),
        }
    }

    /// Relation after multiplying both sides by -1.
    pub fn flipped(self) -> Self {
        match self {
            Relation::Le => Relation::Ge,
            Relation::Eq => Relation::Eq,
            Relation::Ge => Relation::Le,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Le => write!(f, "<="),
            Relation::Eq => write!(f, "="),
            Relation::Ge => write!(f, ">="),
        }
    }
}

/// Variable range `[lower, upper]`, `None` meaning infinite.
///
/// Tightening is monotone: a bound is only replaced by a strictly tighter one.
#[derive(Debug, Clone, PartialEq)]
pub struct Range<T> {
    lower: Option<T>,
    upper: Option<T>,
}

impl<T: Scalar> Default for Range<T> {
    fn default() -> Self {
        Self {
            lower: Some(T::zero()),
            upper: None,
        }
    }
}

impl<T: Scalar> Range<T> {
    pub fn new(lower: Option<T>, upper: Option<T>) -> Self {
        Self { lower, upper }
    }

    pub fn free() -> Self {
        Self::new(None, None)
    }

    pub fn fixed(value: T) -> Self {
        Self::new(Some(value.clone()), Some(value))
    }

    pub fn lower(&self) -> Option<&T> {
        self.lower.as_ref()
    }

    pub fn upper(&self) -> Option<&T> {
        self.upper.as_ref()
    }

    /// Raise the lower bound to `value` if that tightens it.
    ///
    /// Returns true if the bound moved.
    pub fn tighten_lower(&mut self, value: T) -> bool {
        match &self.lower {
            Some(l) if *l >= value => false,
            _ => {
                self.lower = Some(value);
                true
            }
        }
    }

    /// Lower the upper bound to `value` if that tightens it.
    ///
    /// Returns true if the bound moved.
    pub fn tighten_upper(&mut self, value: T) -> bool {
        match &self.upper {
            Some(u) if *u <= value => false,
            _ => {
                self.upper = Some(value);
                true
            }
        }
    }

    /// True when lower exceeds upper beyond tolerance.
    pub fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(l), Some(u)) => l.exceeds(u),
            _ => false,
        }
    }

    pub fn is_fixed(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(l), Some(u)) => (u.clone() - l.clone()).abs() <= T::feas_tol(),
            _ => false,
        }
    }

    /// `upper - lower`, `None` if either side is infinite.
    pub fn width(&self) -> Option<T> {
        match (&self.lower, &self.upper) {
            (Some(l), Some(u)) => Some(u.clone() - l.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        let above = self.lower.as_ref().map_or(true, |l| !l.exceeds(value));
        let below = self.upper.as_ref().map_or(true, |u| !value.exceeds(u));
        above && below
    }

    /// Distance from `value` to the range (zero inside).
    pub fn violation(&self, value: &T) -> T {
        if let Some(l) = &self.lower {
            if value < l {
                return l.clone() - value.clone();
            }
        }
        if let Some(u) = &self.upper {
            if value > u {
                return value.clone() - u.clone();
            }
        }
        T::zero()
    }

    /// Round both bounds inward to integers.
    pub fn round_inward(&mut self) {
        if let Some(l) = &self.lower {
            self.lower = Some(l.ceil());
        }
        if let Some(u) = &self.upper {
            self.upper = Some(u.floor());
        }
    }
}

/// How a working column relates to the structural column it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignType {
    /// `x = x'`
    #[default]
    Positive,
    /// `x = -x'` (original had only an upper bound)
    Negated,
    /// `x = x+ - x-`, this column is `x+`; its `x-` follows it
    PositivePart,
    /// `x = x+ - x-`, this column is `x-`; its `x+` precedes it
    NegativePart,
}

impl SignType {
    /// Sign applied when mapping the column back to its structural variable.
    pub fn coefficient<T: Scalar>(self) -> T {
        match self {
            SignType::Positive | SignType::PositivePart => T::one(),
            SignType::Negated | SignType::NegativePart => -T::one(),
        }
    }
}

/// Branching direction, also used to index pseudocost arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchDirection {
    /// `x <= floor(v)`
    Down = 0,
    /// `x >= ceil(v)`
    Up = 1,
}

impl BranchDirection {
    pub const BOTH: [BranchDirection; 2] = [BranchDirection::Down, BranchDirection::Up];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// How a removed variable is recovered from the surviving ones.
#[derive(Debug, Clone, PartialEq)]
pub enum Substitution<T> {
    /// `x = c`
    Constant(T),
    /// `x = c + Σ a_k x_k`, indices refer to the column layout at removal time.
    Affine { constant: T, coefs: Vec<(usize, T)> },
}

impl<T: Scalar> Substitution<T> {
    pub fn evaluate(&self, values: &[T]) -> T {
        match self {
            Substitution::Constant(c) => c.clone(),
            Substitution::Affine { constant, coefs } => {
                coefs.iter().fold(constant.clone(), |acc, (k, a)| {
                    acc + a.clone() * values[*k].clone()
                })
            }
        }
    }
}

/// A decision (or slack) variable.
#[derive(Debug, Clone)]
pub struct Variable<T> {
    /// Integrality requirement.
    pub integral: bool,

    /// Sign transform relative to the structural variable.
    pub sign: SignType,

    /// Current (tightened) bounds.
    pub range: Range<T>,

    /// Slack column introduced for an inequality row.
    pub slack: bool,

    /// Structural column this variable maps to (`None` for slacks).
    pub origin: Option<usize>,

    /// Recovery rule, set when presolve removes the variable.
    pub substitution: Option<Substitution<T>>,

    /// Average objective degradation per unit change, per direction.
    pub pseudocost: [f64; 2],

    /// Number of pseudocost observations, per direction.
    pub branch_count: [u64; 2],
}

impl<T: Scalar> Default for Variable<T> {
    fn default() -> Self {
        Self {
            integral: false,
            sign: SignType::Positive,
            range: Range::default(),
            slack: false,
            origin: None,
            substitution: None,
            pseudocost: [0.0; 2],
            branch_count: [0; 2],
        }
    }
}

impl<T: Scalar> Variable<T> {
    pub fn continuous(range: Range<T>) -> Self {
        Self {
            range,
            ..Default::default()
        }
    }

    pub fn integer(range: Range<T>) -> Self {
        Self {
            integral: true,
            range,
            ..Default::default()
        }
    }

    /// Fold one observation into the running pseudocost average.
    pub fn update_pseudocost(&mut self, delta: f64, fraction: f64, dir: BranchDirection) {
        if fraction <= 0.0 || !delta.is_finite() {
            return;
        }
        let d = dir.index();
        let sigma = self.pseudocost[d] * self.branch_count[d] as f64;
        self.branch_count[d] += 1;
        self.pseudocost[d] = (sigma + delta / fraction) / self.branch_count[d] as f64;
    }

    pub fn has_pseudocosts(&self) -> bool {
        self.branch_count.iter().all(|&c| c > 0)
    }
}

/// Constraint block with a frozen reference copy for auditing.
#[derive(Debug, Clone)]
pub struct Constraints<T> {
    /// Dense row-major coefficients.
    pub lhs: Vec<Vec<T>>,
    pub rhs: Vec<T>,
    pub relations: Vec<Relation>,

    frozen_lhs: Vec<Vec<T>>,
    frozen_rhs: Vec<T>,
    frozen_relations: Vec<Relation>,
}

impl<T: Scalar> Constraints<T> {
    pub fn new(lhs: Vec<Vec<T>>, rhs: Vec<T>, relations: Vec<Relation>) -> Self {
        Self {
            lhs,
            rhs,
            relations,
            frozen_lhs: Vec::new(),
            frozen_rhs: Vec::new(),
            frozen_relations: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new())
    }

    pub fn num_rows(&self) -> usize {
        self.rhs.len()
    }

    /// Column count of the first row (zero when there are no rows).
    pub fn num_cols(&self) -> usize {
        self.lhs.first().map_or(0, Vec::len)
    }

    /// Check the shape invariant against `n` columns.
    pub fn validate(&self, n: usize) -> Result<(), ModelError> {
        if self.lhs.len() != self.rhs.len() || self.rhs.len() != self.relations.len() {
            return Err(ModelError::Dimension(format!(
                "{} rows, {} right-hand sides, {} relations",
                self.lhs.len(),
                self.rhs.len(),
                self.relations.len()
            )));
        }
        if let Some((i, row)) = self.lhs.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(ModelError::Dimension(format!(
                "row {} has {} coefficients, expected {}",
                i,
                row.len(),
                n
            )));
        }
        Ok(())
    }

    pub fn push_row(&mut self, coefs: Vec<T>, relation: Relation, rhs: T) {
        self.lhs.push(coefs);
        self.relations.push(relation);
        self.rhs.push(rhs);
    }

    pub fn remove_row(&mut self, i: usize) {
        self.lhs.remove(i);
        self.rhs.remove(i);
        self.relations.remove(i);
    }

    pub fn remove_column(&mut self, j: usize) {
        for row in &mut self.lhs {
            row.remove(j);
        }
    }

    /// Append a column, one coefficient per row.
    pub fn push_column(&mut self, coefs: &[T]) {
        for (row, a) in self.lhs.iter_mut().zip(coefs) {
            row.push(a.clone());
        }
    }

    pub fn row_activity(&self, i: usize, x: &[T]) -> T {
        crate::numeric::dot(&self.lhs[i], x)
    }

    /// Nonzero count of column `j`.
    pub fn column_count(&self, j: usize) -> usize {
        self.lhs.iter().filter(|row| !row[j].is_negligible()).count()
    }

    /// Snapshot the current rows as the reference for [`Constraints::audit`].
    pub fn freeze(&mut self) {
        self.frozen_lhs = self.lhs.clone();
        self.frozen_rhs = self.rhs.clone();
        self.frozen_relations = self.relations.clone();
    }

    pub fn frozen_rows(&self) -> impl Iterator<Item = (&[T], Relation, &T)> {
        self.frozen_lhs
            .iter()
            .zip(&self.frozen_relations)
            .zip(&self.frozen_rhs)
            .map(|((row, rel), b)| (row.as_slice(), *rel, b))
    }

    /// First frozen row violated by `x`, if any.
    ///
    /// Floating tolerance scales with the row's magnitude.
    pub fn audit(&self, x: &[T]) -> Option<usize> {
        self.frozen_rows().position(|(row, rel, b)| {
            let lhs = crate::numeric::dot(row, x);
            let scale = row
                .iter()
                .zip(x)
                .map(|(a, v)| (a.clone() * v.clone()).abs())
                .fold(b.abs(), |acc, t| acc + t);
            let tol = T::feas_tol() * (T::one() + scale);
            !rel.holds_within(&lhs, b, &tol)
        })
    }
}

/// Objective, constraints, and variables of one linear program.
#[derive(Debug, Clone)]
pub struct LinearProgram<T> {
    pub objective: Vec<T>,
    pub constant: T,
    pub constraints: Constraints<T>,
    pub variables: Vec<Variable<T>>,
}

impl<T: Scalar> LinearProgram<T> {
    pub fn num_vars(&self) -> usize {
        self.variables.len()
    }

    pub fn num_rows(&self) -> usize {
        self.constraints.num_rows()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let n = self.variables.len();
        if self.objective.len() != n {
            return Err(ModelError::Dimension(format!(
                "objective has {} coefficients, expected {}",
                self.objective.len(),
                n
            )));
        }
        self.constraints.validate(n)?;
        for (j, var) in self.variables.iter().enumerate() {
            if var.range.is_empty() {
                return Err(ModelError::EmptyRange {
                    var: j,
                    lower: format!("{:?}", var.range.lower()),
                    upper: format!("{:?}", var.range.upper()),
                });
            }
        }
        Ok(())
    }

    pub fn objective_value(&self, x: &[T]) -> T {
        crate::numeric::dot(&self.objective, x) + self.constant.clone()
    }

    /// Remove column `j` from objective, rows, and variable list.
    pub fn remove_column(&mut self, j: usize) -> Variable<T> {
        self.objective.remove(j);
        self.constraints.remove_column(j);
        self.variables.remove(j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_monotone_tightening() {
        let mut r: Range<f64> = Range::default();
        assert_eq!(r.lower(), Some(&0.0));
        assert_eq!(r.upper(), None);

        assert!(r.tighten_upper(5.0));
        assert!(!r.tighten_upper(7.0));
        assert_eq!(r.upper(), Some(&5.0));

        assert!(r.tighten_lower(2.0));
        assert!(!r.tighten_lower(1.0));
        assert_eq!(r.width(), Some(3.0));
        assert!(!r.is_empty());

        r.tighten_lower(6.0);
        assert!(r.is_empty());
    }

    #[test]
    fn test_relation_violation() {
        assert_eq!(Relation::Le.violation(&5.0, &3.0), 2.0);
        assert_eq!(Relation::Le.violation(&2.0, &3.0), 0.0);
        assert_eq!(Relation::Ge.violation(&2.0, &3.0), 1.0);
        assert_eq!(Relation::Eq.violation(&2.0, &3.0), 1.0);
        assert!(Relation::Ge.holds(&3.0, &3.0));
    }

    #[test]
    fn test_substitution_evaluate() {
        let s = Substitution::Affine {
            constant: 1.0,
            coefs: vec![(0, 2.0), (2, -1.0)],
        };
        assert_eq!(s.evaluate(&[3.0, 100.0, 4.0]), 3.0);
        assert_eq!(Substitution::Constant(7.0).evaluate(&[]), 7.0);
    }

    #[test]
    fn test_pseudocost_running_average() {
        let mut v: Variable<f64> = Variable::integer(Range::default());
        assert!(!v.has_pseudocosts());

        v.update_pseudocost(1.0, 0.5, BranchDirection::Down);
        v.update_pseudocost(3.0, 0.5, BranchDirection::Down);
        assert_eq!(v.pseudocost[0], 4.0);
        assert_eq!(v.branch_count[0], 2);

        v.update_pseudocost(1.0, 0.25, BranchDirection::Up);
        assert!(v.has_pseudocosts());
        assert_eq!(v.pseudocost[1], 4.0);
    }

    #[test]
    fn test_constraints_validate_and_audit() {
        let mut c = Constraints::new(
            vec![vec![1.0, 2.0], vec![3.0, 1.0]],
            vec![4.0, 6.0],
            vec![Relation::Ge, Relation::Ge],
        );
        assert!(c.validate(2).is_ok());
        assert!(c.validate(3).is_err());

        c.freeze();
        assert_eq!(c.audit(&[1.6, 1.2]), None);
        assert_eq!(c.audit(&[0.0, 3.0]), Some(1));

        c.remove_row(0);
        assert_eq!(c.num_rows(), 1);
        // Audit still uses the frozen copy.
        assert_eq!(c.audit(&[0.0, 0.0]), Some(0));
    }
}
