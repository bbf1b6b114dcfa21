//! Undo log for columns removed by presolve.
//!
//! Presolve appends one entry per eliminated column; postsolve pops them in
//! reverse order, reinserting each column at its removal index and evaluating
//! its substitution against the partially restored vector.

use crate::numeric::Scalar;
use crate::problem::Variable;

/// One eliminated column.
#[derive(Debug, Clone)]
pub struct RemovedColumn<T> {
    /// Column index at the moment of removal.
    pub index: usize,

    /// The variable, carrying the substitution that recovers it.
    pub variable: Variable<T>,
}

/// Append-only stack of removed columns.
#[derive(Debug, Clone, Default)]
pub struct UndoLog<T> {
    entries: Vec<RemovedColumn<T>>,
}

impl<T: Scalar> UndoLog<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, index: usize, variable: Variable<T>) {
        self.entries.push(RemovedColumn { index, variable });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expand a reduced vector to the pre-presolve layout.
    ///
    /// Drains the log, so a second call leaves `values` untouched.
    pub fn replay(&mut self, values: &mut Vec<T>) {
        while let Some(entry) = self.entries.pop() {
            values.insert(entry.index, T::zero());
            let value = match &entry.variable.substitution {
                Some(sub) => sub.evaluate(values),
                None => entry
                    .variable
                    .range
                    .lower()
                    .cloned()
                    .unwrap_or_else(T::zero),
            };
            values[entry.index] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Range, Substitution};

    fn removed(sub: Substitution<f64>) -> Variable<f64> {
        let mut v = Variable::continuous(Range::default());
        v.substitution = Some(sub);
        v
    }

    #[test]
    fn test_replay_lifo() {
        // Original layout [a, b, c, d]. Remove b = 5 first, then (in layout
        // [a, c, d]) remove d = 1 + 2a.
        let mut log = UndoLog::new();
        log.push(1, removed(Substitution::Constant(5.0)));
        log.push(
            2,
            removed(Substitution::Affine {
                constant: 1.0,
                coefs: vec![(0, 2.0)],
            }),
        );

        assert_eq!(log.len(), 2);

        let mut x = vec![3.0, 4.0];
        log.replay(&mut x);
        assert_eq!(x, vec![3.0, 5.0, 4.0, 7.0]);
        assert!(log.is_empty());

        // Second replay is a no-op.
        log.replay(&mut x);
        assert_eq!(x, vec![3.0, 5.0, 4.0, 7.0]);
    }
}
