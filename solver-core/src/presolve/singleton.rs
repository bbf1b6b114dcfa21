//! Empty and singleton row elimination.

use super::{Presolver, Step, Verdict};
use crate::numeric::Scalar;
use crate::problem::Relation;

impl<'a, T: Scalar> Presolver<'a, T> {
    /// Drop rows with no nonzero coefficient, or fail if `0 rel b` is false.
    pub(crate) fn remove_empty_rows(&mut self) -> Step {
        let mut changed = false;
        let mut i = self.lp.num_rows();
        while i > 0 {
            i -= 1;
            if self.lp.constraints.lhs[i].iter().all(|a| a.is_negligible()) {
                let rel = self.lp.constraints.relations[i];
                if !rel.holds(&T::zero(), &self.lp.constraints.rhs[i]) {
                    return Err(Verdict::Infeasible);
                }
                self.remove_row(i);
                changed = true;
            }
        }
        Ok(changed)
    }

    /// Turn rows `a x_j rel b` into bounds on `x_j`.
    pub(crate) fn remove_singleton_rows(&mut self) -> Step {
        let mut changed = false;
        let mut i = self.lp.num_rows();
        while i > 0 {
            i -= 1;
            let mut nonzeros = self.lp.constraints.lhs[i]
                .iter()
                .enumerate()
                .filter(|(_, a)| !a.is_negligible());
            let (Some((j, a)), None) = (nonzeros.next(), nonzeros.next()) else {
                continue;
            };
            let a = a.clone();
            let t = self.lp.constraints.rhs[i].clone() / a.clone();
            let rel = if a.is_negative() {
                self.lp.constraints.relations[i].flipped()
            } else {
                self.lp.constraints.relations[i]
            };
            match rel {
                Relation::Le => self.tighten(j, None, Some(t))?,
                Relation::Ge => self.tighten(j, Some(t), None)?,
                Relation::Eq => self.tighten(j, Some(t.clone()), Some(t))?,
            };
            self.remove_row(i);
            changed = true;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use crate::postsolve::UndoLog;
    use crate::presolve::{Presolver, PresolveOptions, PresolveStatus};
    use crate::problem::{Constraints, LinearProgram, Range, Relation, Variable};

    #[test]
    fn test_negative_singleton_flips_relation() {
        // -2x <= -6  =>  x >= 3, alongside x + y <= 10
        let mut lp = LinearProgram {
            objective: vec![1.0, -1.0],
            constant: 0.0,
            constraints: Constraints::new(
                vec![vec![-2.0, 0.0], vec![1.0, 1.0]],
                vec![-6.0, 10.0],
                vec![Relation::Le, Relation::Le],
            ),
            variables: vec![
                Variable::continuous(Range::default()),
                Variable::continuous(Range::default()),
            ],
        };
        let mut log = UndoLog::new();
        let (status, _) = Presolver::new(&mut lp, &mut log)
            .with_options(PresolveOptions { max_passes: 1 })
            .run();
        assert_eq!(status, PresolveStatus::Reduced);
        assert_eq!(lp.variables[0].range.lower(), Some(&3.0));
        assert_eq!(lp.num_rows(), 1);
    }

    #[test]
    fn test_empty_row_checked_against_rhs() {
        let mut lp: LinearProgram<f64> = LinearProgram {
            objective: vec![1.0],
            constant: 0.0,
            constraints: Constraints::new(vec![vec![0.0]], vec![-1.0], vec![Relation::Ge]),
            variables: vec![Variable::continuous(Range::default())],
        };
        let mut log = UndoLog::new();
        let (status, _) = Presolver::new(&mut lp, &mut log).run();
        assert_eq!(status, PresolveStatus::Solved);

        lp.constraints = Constraints::new(vec![vec![0.0]], vec![1.0], vec![Relation::Ge]);
        lp.objective = vec![1.0];
        lp.variables = vec![Variable::continuous(Range::default())];
        let mut log = UndoLog::new();
        let (status, _) = Presolver::new(&mut lp, &mut log).run();
        assert_eq!(status, PresolveStatus::Infeasible);
    }
}
