//! Activity-based row analysis and bound tightening.

use super::{Presolver, Step, Verdict};
use crate::numeric::Scalar;
use crate::problem::{Range, Relation, Variable};

/// Minimum and maximum activity of one row, with counts of infinite terms.
#[derive(Debug, Clone)]
pub struct Activity<T> {
    /// Sum of finite minimum contributions.
    pub min: T,
    /// Number of terms whose minimum is -inf.
    pub min_inf: usize,
    /// Sum of finite maximum contributions.
    pub max: T,
    /// Number of terms whose maximum is +inf.
    pub max_inf: usize,
}

/// `(min, max)` contribution of `a * x` for `x` in `range`.
fn contribution<T: Scalar>(a: &T, range: &Range<T>) -> (Option<T>, Option<T>) {
    let lo = range.lower().map(|l| a.clone() * l.clone());
    let hi = range.upper().map(|u| a.clone() * u.clone());
    if a.is_positive() {
        (lo, hi)
    } else {
        (hi, lo)
    }
}

impl<T: Scalar> Activity<T> {
    pub fn of(row: &[T], variables: &[Variable<T>]) -> Self {
        let mut act = Activity {
            min: T::zero(),
            min_inf: 0,
            max: T::zero(),
            max_inf: 0,
        };
        for (a, var) in row.iter().zip(variables) {
            if a.is_zero() {
                continue;
            }
            let (lo, hi) = contribution(a, &var.range);
            match lo {
                Some(v) => act.min = act.min.clone() + v,
                None => act.min_inf += 1,
            }
            match hi {
                Some(v) => act.max = act.max.clone() + v,
                None => act.max_inf += 1,
            }
        }
        act
    }

    pub fn finite_min(&self) -> Option<&T> {
        (self.min_inf == 0).then_some(&self.min)
    }

    pub fn finite_max(&self) -> Option<&T> {
        (self.max_inf == 0).then_some(&self.max)
    }

    /// Minimum activity of the row without the term `a * x`.
    pub fn residual_min(&self, a: &T, range: &Range<T>) -> Option<T> {
        let (lo, _) = contribution(a, range);
        Self::residual(&self.min, self.min_inf, lo)
    }

    /// Maximum activity of the row without the term `a * x`.
    pub fn residual_max(&self, a: &T, range: &Range<T>) -> Option<T> {
        let (_, hi) = contribution(a, range);
        Self::residual(&self.max, self.max_inf, hi)
    }

    fn residual(sum: &T, infinite: usize, own: Option<T>) -> Option<T> {
        match (infinite, own) {
            (0, Some(v)) => Some(sum.clone() - v),
            (1, None) => Some(sum.clone()),
            _ => None,
        }
    }
}

/// Whether `candidate` improves `current` enough to be worth recording.
fn improves<T: Scalar>(candidate: &T, current: Option<&T>, upper: bool) -> bool {
    let Some(cur) = current else {
        return true;
    };
    let gain = if upper {
        cur.clone() - candidate.clone()
    } else {
        candidate.clone() - cur.clone()
    };
    gain > T::feas_tol() * (T::one() + candidate.abs())
}

impl<'a, T: Scalar> Presolver<'a, T> {
    /// Infeasible rows, redundant rows, and forcing rows.
    pub(crate) fn check_row_activities(&mut self) -> Step {
        let mut changed = false;
        let mut i = self.lp.num_rows();
        while i > 0 {
            i -= 1;
            let act = Activity::of(&self.lp.constraints.lhs[i], &self.lp.variables);
            let b = self.lp.constraints.rhs[i].clone();
            let rel = self.lp.constraints.relations[i];

            let min_over = act.finite_min().map_or(false, |g| g.exceeds(&b));
            let max_under = act.finite_max().map_or(false, |h| b.exceeds(h));
            let infeasible = match rel {
                Relation::Le => min_over,
                Relation::Ge => max_under,
                Relation::Eq => min_over || max_under,
            };
            if infeasible {
                return Err(Verdict::Infeasible);
            }

            let redundant = match rel {
                Relation::Le => act.finite_max().map_or(false, |h| !h.exceeds(&b)),
                Relation::Ge => act.finite_min().map_or(false, |g| !b.exceeds(g)),
                Relation::Eq => false,
            };
            if redundant {
                self.remove_row(i);
                changed = true;
                continue;
            }

            let meets = |v: Option<&T>| v.map_or(false, |v| (v.clone() - b.clone()).abs() <= T::feas_tol());
            let force_min = rel != Relation::Ge && meets(act.finite_min());
            let force_max = rel != Relation::Le && meets(act.finite_max());
            if force_min || force_max {
                self.force_row(i, force_min)?;
                self.remove_row(i);
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Pin every variable of row `i` to the bound attaining its min (or max) activity.
    fn force_row(&mut self, i: usize, at_min: bool) -> Step {
        let row = self.lp.constraints.lhs[i].clone();
        for (j, a) in row.iter().enumerate() {
            if a.is_negligible() {
                continue;
            }
            let range = &self.lp.variables[j].range;
            let take_lower = a.is_positive() == at_min;
            let value = if take_lower { range.lower() } else { range.upper() };
            if let Some(v) = value.cloned() {
                self.tighten(j, Some(v.clone()), Some(v))?;
            }
        }
        Ok(true)
    }

    /// Narrow each variable's range from the other variables' bounds in each row.
    pub(crate) fn tighten_bounds(&mut self) -> Step {
        let mut changed = false;
        for i in 0..self.lp.num_rows() {
            let rel = self.lp.constraints.relations[i];
            let b = self.lp.constraints.rhs[i].clone();
            let mut act = Activity::of(&self.lp.constraints.lhs[i], &self.lp.variables);
            for j in 0..self.lp.num_vars() {
                let a = self.lp.constraints.lhs[i][j].clone();
                if a.is_negligible() {
                    continue;
                }
                let range = self.lp.variables[j].range.clone();
                let mut lower = None;
                let mut upper = None;

                // a x <= b - residual_min
                if rel != Relation::Ge {
                    if let Some(r) = act.residual_min(&a, &range) {
                        let t = (b.clone() - r) / a.clone();
                        if a.is_positive() {
                            upper = Some(t);
                        } else {
                            lower = Some(t);
                        }
                    }
                }
                // a x >= b - residual_max
                if rel != Relation::Le {
                    if let Some(r) = act.residual_max(&a, &range) {
                        let t = (b.clone() - r) / a.clone();
                        if a.is_positive() {
                            lower = Some(t);
                        } else {
                            upper = Some(t);
                        }
                    }
                }

                let lower = lower.filter(|t| improves(t, range.lower(), false));
                let upper = upper.filter(|t| improves(t, range.upper(), true));
                if lower.is_none() && upper.is_none() {
                    continue;
                }
                if self.tighten(j, lower, upper)? {
                    changed = true;
                    act = Activity::of(&self.lp.constraints.lhs[i], &self.lp.variables);
                }
            }
        }
        Ok(changed)
    }

    /// Round integer bounds inward.
    pub(crate) fn round_integral_bounds(&mut self) -> Step {
        let mut changed = false;
        for var in self.lp.variables.iter_mut().filter(|v| v.integral) {
            let before = var.range.clone();
            var.range.round_inward();
            if var.range.is_empty() {
                return Err(Verdict::Infeasible);
            }
            if var.range != before {
                self.stats.bounds_tightened += 1;
                changed = true;
            }
        }
        Ok(changed)
    }
}
