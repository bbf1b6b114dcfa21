//! Numeric value abstraction.
//!
//! The solver is generic over a single [`Scalar`] type chosen once per solve:
//! `f64` for floating-point pivoting or [`BigRational`] for exact pivoting.
//! Inbound and outbound values are carried as [`Number`], which remembers
//! whether a value is exact.

use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Zero tolerance used by floating-point pivoting.
pub const FLOAT_EPSILON: f64 = 1e-9;

/// Feasibility tolerance used by floating-point bound and integrality checks.
pub const FLOAT_FEAS_TOL: f64 = 1e-6;

/// Numeric operations required by presolve, simplex, and search.
pub trait Scalar: Clone + fmt::Debug + fmt::Display + PartialOrd + Signed + 'static {
    /// True for exact (rational) arithmetic.
    const EXACT: bool;

    fn from_f64(value: f64) -> Self;

    fn from_i64(value: i64) -> Self;

    fn to_f64(&self) -> f64;

    fn to_number(&self) -> Number;

    fn from_number(value: &Number) -> Self;

    /// Largest integer not above `self`.
    ///
    /// Floating values within [`FLOAT_FEAS_TOL`] of an integer snap to it first.
    fn floor(&self) -> Self;

    /// Smallest integer not below `self`, with the same snapping as [`Scalar::floor`].
    fn ceil(&self) -> Self;

    /// Zero tolerance for pivot and reduced-cost tests.
    fn epsilon() -> Self;

    /// Tolerance for bound, row, and integrality checks.
    fn feas_tol() -> Self;

    /// Scale `values` by a positive factor so they become integers (exact)
    /// or so the smallest nonzero magnitude becomes one (floating).
    fn scale_to_integers(values: &mut [Self]);

    fn is_negligible(&self) -> bool {
        self.abs() <= Self::epsilon()
    }

    fn is_pos(&self) -> bool {
        *self > Self::epsilon()
    }

    fn is_neg(&self) -> bool {
        *self < -Self::epsilon()
    }

    /// `self > other` beyond the feasibility tolerance.
    fn exceeds(&self, other: &Self) -> bool {
        self.clone() - other.clone() > Self::feas_tol()
    }

    /// Fractional part in `[0, 1)`.
    fn frac(&self) -> Self {
        let f = self.clone() - self.floor();
        if f < Self::zero() {
            Self::zero()
        } else {
            f
        }
    }

    fn round(&self) -> Self {
        let half = Self::one() / (Self::one() + Self::one());
        (self.clone() + half).floor()
    }

    fn is_integral(&self) -> bool {
        let f = self.clone() - self.round();
        f.abs() <= Self::feas_tol()
    }
}

impl Scalar for f64 {
    const EXACT: bool = false;

    fn from_f64(value: f64) -> Self {
        value
    }

    fn from_i64(value: i64) -> Self {
        value as f64
    }

    fn to_f64(&self) -> f64 {
        *self
    }

    fn to_number(&self) -> Number {
        Number::Float(*self)
    }

    fn from_number(value: &Number) -> Self {
        value.to_f64()
    }

    fn floor(&self) -> Self {
        let r = f64::round(*self);
        if (*self - r).abs() <= FLOAT_FEAS_TOL {
            r
        } else {
            f64::floor(*self)
        }
    }

    fn ceil(&self) -> Self {
        let r = f64::round(*self);
        if (*self - r).abs() <= FLOAT_FEAS_TOL {
            r
        } else {
            f64::ceil(*self)
        }
    }

    fn epsilon() -> Self {
        FLOAT_EPSILON
    }

    fn feas_tol() -> Self {
        FLOAT_FEAS_TOL
    }

    fn scale_to_integers(values: &mut [Self]) {
        let min = values
            .iter()
            .map(|v| v.abs())
            .filter(|v| *v > FLOAT_EPSILON)
            .fold(f64::INFINITY, f64::min);
        if min.is_finite() {
            for v in values.iter_mut() {
                *v /= min;
            }
        }
    }

    fn round(&self) -> Self {
        f64::round(*self)
    }

    fn is_integral(&self) -> bool {
        (*self - f64::round(*self)).abs() <= FLOAT_FEAS_TOL
    }
}

impl Scalar for BigRational {
    const EXACT: bool = true;

    fn from_f64(value: f64) -> Self {
        BigRational::from_float(value).unwrap_or_else(BigRational::zero)
    }

    fn from_i64(value: i64) -> Self {
        BigRational::from_integer(BigInt::from(value))
    }

    fn to_f64(&self) -> f64 {
        ratio_to_f64(self)
    }

    fn to_number(&self) -> Number {
        Number::Exact(self.clone())
    }

    fn from_number(value: &Number) -> Self {
        match value {
            Number::Exact(q) => q.clone(),
            Number::Float(f) => Self::from_f64(*f),
        }
    }

    fn floor(&self) -> Self {
        BigRational::floor(self)
    }

    fn ceil(&self) -> Self {
        BigRational::ceil(self)
    }

    fn epsilon() -> Self {
        BigRational::zero()
    }

    fn feas_tol() -> Self {
        BigRational::zero()
    }

    fn scale_to_integers(values: &mut [Self]) {
        let mut lcm = BigInt::one();
        for v in values.iter().filter(|v| !v.is_zero()) {
            lcm = lcm.lcm(v.denom());
        }
        let mut gcd = BigInt::zero();
        for v in values.iter_mut() {
            *v = v.clone() * BigRational::from_integer(lcm.clone());
            if !v.is_zero() {
                gcd = gcd.gcd(v.numer());
            }
        }
        if !gcd.is_zero() && !gcd.is_one() {
            let divisor = BigRational::from_integer(gcd);
            for v in values.iter_mut() {
                *v = v.clone() / divisor.clone();
            }
        }
    }

    fn is_integral(&self) -> bool {
        BigRational::is_integer(self)
    }
}

fn ratio_to_f64(q: &BigRational) -> f64 {
    match (q.numer().to_f64(), q.denom().to_f64()) {
        (Some(n), Some(d)) if n.is_finite() && d.is_finite() => n / d,
        _ => {
            // Huge numerator or denominator: divide with integer arithmetic first.
            let (quot, rem) = q.numer().div_rem(q.denom());
            let whole = quot.to_f64().unwrap_or(f64::NAN);
            let part = BigRational::new(rem, q.denom().clone());
            whole + part.numer().to_f64().unwrap_or(0.0) / part.denom().to_f64().unwrap_or(1.0)
        }
    }
}

/// A value in the caller's model: exact rational or floating point.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Exact(BigRational),
    Float(f64),
}

impl Number {
    /// Exact rational `numer / denom`.
    ///
    /// # Panics
    ///
    /// Panics if `denom` is zero.
    pub fn ratio(numer: i64, denom: i64) -> Self {
        Number::Exact(BigRational::new(BigInt::from(numer), BigInt::from(denom)))
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, Number::Exact(_))
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Number::Exact(_) => true,
            Number::Float(f) => f.is_finite(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Exact(q) => q.is_zero(),
            Number::Float(f) => *f == 0.0,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Exact(q) => ratio_to_f64(q),
            Number::Float(f) => *f,
        }
    }

    /// Negation preserving exactness.
    pub fn negated(&self) -> Self {
        match self {
            Number::Exact(q) => Number::Exact(-q.clone()),
            Number::Float(f) => Number::Float(-f),
        }
    }
}

impl Default for Number {
    fn default() -> Self {
        Number::Exact(BigRational::zero())
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Exact(BigRational::from_integer(BigInt::from(value)))
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl From<BigRational> for Number {
    fn from(value: BigRational) -> Self {
        Number::Exact(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Exact(q) => write!(f, "{}", q),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Arithmetic used for pivoting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Always pivot with exact rationals.
    Exact,

    /// Always pivot in floating point.
    Float,

    /// Exact iff every input value is exact.
    #[default]
    Auto,
}

impl Precision {
    /// Whether the solve should run on exact rationals.
    pub fn use_exact<'a>(self, mut inputs: impl Iterator<Item = &'a Number>) -> bool {
        match self {
            Precision::Exact => true,
            Precision::Float => false,
            Precision::Auto => inputs.all(Number::is_exact),
        }
    }
}

/// Componentwise `Σ a_i * b_i`.
pub fn dot<T: Scalar>(a: &[T], b: &[T]) -> T {
    a.iter()
        .zip(b)
        .fold(T::zero(), |acc, (x, y)| acc + x.clone() * y.clone())
}
