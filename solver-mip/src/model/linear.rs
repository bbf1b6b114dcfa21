//! Caller-facing model with [`Number`] coefficients.

use solver_core::{Constraints, LinearProgram, Number, Range, Relation, Scalar, Variable};

use super::Problem;
use crate::error::{MipError, MipResult};
use crate::settings::MipSettings;

/// One constraint row `coefs · x rel rhs`.
#[derive(Debug, Clone)]
pub struct LinearRow {
    pub coefs: Vec<Number>,
    pub relation: Relation,
    pub rhs: Number,
}

/// Column bounds and integrality; `None` bounds are infinite.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub lower: Option<Number>,
    pub upper: Option<Number>,
    pub integral: bool,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            lower: Some(Number::from(0)),
            upper: None,
            integral: false,
        }
    }
}

impl ColumnSpec {
    pub fn continuous(lower: Option<Number>, upper: Option<Number>) -> Self {
        Self {
            lower,
            upper,
            integral: false,
        }
    }

    pub fn integer(lower: Option<Number>, upper: Option<Number>) -> Self {
        Self {
            lower,
            upper,
            integral: true,
        }
    }

    pub fn binary() -> Self {
        Self::integer(Some(Number::from(0)), Some(Number::from(1)))
    }
}

/// A MILP as handed over by a parser or a model file.
#[derive(Debug, Clone, Default)]
pub struct LinearModel {
    pub objective: Vec<Number>,
    pub objective_constant: Number,
    pub rows: Vec<LinearRow>,
    pub columns: Vec<ColumnSpec>,
    pub maximize: bool,
}

impl LinearModel {
    /// Model with `n` default columns and a zero objective.
    pub fn new(n: usize) -> Self {
        Self {
            objective: vec![Number::from(0); n],
            columns: vec![ColumnSpec::default(); n],
            ..Default::default()
        }
    }

    pub fn num_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn add_row(&mut self, coefs: Vec<Number>, relation: Relation, rhs: Number) {
        self.rows.push(LinearRow {
            coefs,
            relation,
            rhs,
        });
    }

    /// Every value of the model, for the precision decision.
    pub fn numbers(&self) -> impl Iterator<Item = &Number> {
        self.objective
            .iter()
            .chain(std::iter::once(&self.objective_constant))
            .chain(self.rows.iter().flat_map(|r| r.coefs.iter().chain(std::iter::once(&r.rhs))))
            .chain(
                self.columns
                    .iter()
                    .flat_map(|c| c.lower.iter().chain(c.upper.iter())),
            )
    }

    /// Shape and value checks.
    pub fn validate(&self) -> MipResult<()> {
        let n = self.num_cols();
        if self.objective.len() != n {
            return Err(MipError::InvalidProblem(format!(
                "objective has {} coefficients but there are {} columns",
                self.objective.len(),
                n
            )));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.coefs.len() != n {
                return Err(MipError::InvalidProblem(format!(
                    "row {} has {} coefficients, expected {}",
                    i,
                    row.coefs.len(),
                    n
                )));
            }
        }
        let finite = self
            .objective
            .iter()
            .chain(std::iter::once(&self.objective_constant))
            .chain(self.rows.iter().flat_map(|r| r.coefs.iter().chain(std::iter::once(&r.rhs))))
            .all(Number::is_finite);
        if !finite {
            return Err(MipError::InvalidProblem(
                "objective and constraint values must be finite".to_string(),
            ));
        }
        let nan_bound = self
            .columns
            .iter()
            .flat_map(|c| c.lower.iter().chain(c.upper.iter()))
            .any(|b| matches!(b, Number::Float(v) if v.is_nan()));
        if nan_bound {
            return Err(MipError::InvalidProblem("NaN variable bound".to_string()));
        }
        Ok(())
    }

    /// Minimisation program over `T`; the objective is negated when maximising.
    pub fn to_program<T: Scalar>(&self) -> MipResult<LinearProgram<T>> {
        self.validate()?;
        let sign = if self.maximize { -T::one() } else { T::one() };
        let objective = self
            .objective
            .iter()
            .map(|c| sign.clone() * T::from_number(c))
            .collect();
        let constant = sign * T::from_number(&self.objective_constant);

        let mut constraints = Constraints::empty();
        for row in &self.rows {
            constraints.push_row(
                row.coefs.iter().map(T::from_number).collect(),
                row.relation,
                T::from_number(&row.rhs),
            );
        }

        let variables = self
            .columns
            .iter()
            .map(|c| {
                let range = Range::new(bound(c.lower.as_ref()), bound(c.upper.as_ref()));
                if c.integral {
                    Variable::integer(range)
                } else {
                    Variable::continuous(range)
                }
            })
            .collect();

        Ok(LinearProgram {
            objective,
            constant,
            constraints,
            variables,
        })
    }

    /// The core problem for this model.
    pub fn to_problem<T: Scalar>(&self, settings: MipSettings) -> MipResult<Problem<T>> {
        Problem::new(self.to_program()?, settings)
    }
}

/// Infinite floats become missing bounds.
fn bound<T: Scalar>(value: Option<&Number>) -> Option<T> {
    value.filter(|v| v.is_finite()).map(T::from_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> LinearModel {
        let mut m = LinearModel::new(2);
        m.objective = vec![Number::from(1), Number::from(1)];
        m.add_row(vec![Number::from(1), Number::from(2)], Relation::Ge, Number::from(4));
        m.add_row(vec![Number::from(3), Number::from(1)], Relation::Ge, Number::from(6));
        m
    }

    #[test]
    fn test_program_conversion() {
        let mut m = scenario_a();
        m.maximize = true;
        m.columns[1].upper = Some(Number::Float(f64::INFINITY));
        let lp: LinearProgram<f64> = m.to_program().unwrap();
        assert_eq!(lp.objective, vec![-1.0, -1.0]);
        assert_eq!(lp.num_rows(), 2);
        assert_eq!(lp.variables[1].range.upper(), None);
    }

    #[test]
    fn test_numbers_drive_precision() {
        use solver_core::Precision;
        let mut m = scenario_a();
        assert!(Precision::Auto.use_exact(m.numbers()));
        m.rows[0].rhs = Number::Float(4.0);
        assert!(!Precision::Auto.use_exact(m.numbers()));
        assert!(Precision::Exact.use_exact(m.numbers()));
    }

    #[test]
    fn test_validation() {
        let mut m = scenario_a();
        m.rows[1].coefs.pop();
        assert!(matches!(m.validate(), Err(MipError::InvalidProblem(_))));

        let mut m = scenario_a();
        m.objective[0] = Number::Float(f64::NAN);
        assert!(m.validate().is_err());
    }
}
