//! Rounding heuristic with ±1 repair moves.

use solver_core::{LinearProgram, Range, Scalar};

/// Upper limit on repair moves per call.
const MAX_MOVES: usize = 1000;

/// Round the integral columns of `values` and repair the result.
///
/// Fractional integral columns are rounded to the nearest integer inside
/// their range. While rows are violated, the single ±1 move on a rounded
/// column that most reduces the squared violation is applied. Returns the
/// feasible point, or `None` once no move improves.
pub fn round_and_repair<T: Scalar>(lp: &LinearProgram<T>, values: &[T]) -> Option<Vec<T>> {
    let mut x = values.to_vec();
    let mut rounded = Vec::new();
    for (j, var) in lp.variables.iter().enumerate() {
        if !var.integral {
            continue;
        }
        if !x[j].is_integral() {
            rounded.push(j);
        }
        x[j] = clamp(x[j].round(), &var.range);
    }

    let mut current = violation(lp, &x);
    for _ in 0..MAX_MOVES {
        if is_feasible(lp, &x) {
            return Some(x);
        }
        let mut best: Option<(usize, T, T)> = None;
        for &j in &rounded {
            for step in [-T::one(), T::one()] {
                let candidate = x[j].clone() + step;
                if !lp.variables[j].range.contains(&candidate) {
                    continue;
                }
                let previous = std::mem::replace(&mut x[j], candidate.clone());
                let v = violation(lp, &x);
                x[j] = previous;
                let improves = v < current && best.as_ref().map_or(true, |(_, _, b)| v < *b);
                if improves {
                    best = Some((j, candidate, v));
                }
            }
        }
        let (j, value, v) = best?;
        x[j] = value;
        current = v;
    }
    is_feasible(lp, &x).then_some(x)
}

fn clamp<T: Scalar>(value: T, range: &Range<T>) -> T {
    if let Some(l) = range.lower() {
        if value < *l {
            return l.clone();
        }
    }
    if let Some(u) = range.upper() {
        if value > *u {
            return u.clone();
        }
    }
    value
}

/// Sum of squared row and bound violations.
fn violation<T: Scalar>(lp: &LinearProgram<T>, x: &[T]) -> T {
    let cons = &lp.constraints;
    let rows = (0..cons.num_rows()).map(|i| {
        let v = cons.relations[i].violation(&cons.row_activity(i, x), &cons.rhs[i]);
        v.clone() * v
    });
    let bounds = lp.variables.iter().zip(x).map(|(var, v)| {
        let d = var.range.violation(v);
        d.clone() * d
    });
    rows.chain(bounds).fold(T::zero(), |acc, v| acc + v)
}

fn is_feasible<T: Scalar>(lp: &LinearProgram<T>, x: &[T]) -> bool {
    let cons = &lp.constraints;
    let rows_hold = (0..cons.num_rows())
        .all(|i| cons.relations[i].holds(&cons.row_activity(i, x), &cons.rhs[i]));
    rows_hold
        && lp
            .variables
            .iter()
            .zip(x)
            .all(|(var, v)| var.range.contains(v))
}
