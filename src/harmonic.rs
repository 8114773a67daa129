//! The truncated harmonic-totient sum S(Q) = Σ_{q=2}^{Q} 1/(q·φ(q))

use crate::error::{Error, Result};
use crate::sieve::TotientTable;
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};
use std::cmp::Ordering;

/// Generic interface for the three interchangeable evaluations of S(Q).
///
/// All strategies walk the same shared totient table in ascending q; they
/// differ only in the accumulator representation and therefore in how much
/// rounding the result carries.
pub trait SumStrategy {
    /// Returns the name of this summation mode
    fn name(&self) -> &'static str;

    /// Digit precision the mode works at, if it has one
    fn precision(&self) -> Option<u64> {
        None
    }

    /// Computes S(q_max) over the supplied totient table
    fn sum(&self, phi: &TotientTable, q_max: u64) -> Result<SumValue>;
}

/// S(Q) in the representation its strategy produced.
#[derive(Clone, Debug, PartialEq)]
pub enum SumValue {
    /// Native f64 accumulation (~15-17 significant digits)
    Float(f64),
    /// Fixed fractional-digit decimal at a caller-chosen precision
    Decimal(BigDecimal),
    /// Exact rational, no rounding anywhere
    Fraction(BigRational),
}

impl SumValue {
    /// Casts to f64, losing whatever excess precision the mode carried.
    pub fn approx_f64(&self) -> f64 {
        match self {
            SumValue::Float(v) => *v,
            SumValue::Decimal(d) => d.to_f64().unwrap_or(f64::NAN),
            SumValue::Fraction(r) => r.to_f64().unwrap_or(f64::NAN),
        }
    }
}

impl PartialOrd for SumValue {
    /// Same-representation values order exactly; mixed representations do not
    /// compare (monotonicity checks always run within one strategy).
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (SumValue::Float(a), SumValue::Float(b)) => a.partial_cmp(b),
            (SumValue::Decimal(a), SumValue::Decimal(b)) => Some(a.cmp(b)),
            (SumValue::Fraction(a), SumValue::Fraction(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

fn check_table(phi: &TotientTable, q_max: u64) -> Result<()> {
    if q_max > phi.limit() {
        return Err(Error::InvalidArgument(format!(
            "harmonic sum to Q={q_max} needs a totient table of at least that size (have {})",
            phi.limit()
        )));
    }
    Ok(())
}

/// S(q_max) with a single f64 accumulator, ascending q. Fastest, least exact.
pub fn sum_float(phi: &TotientTable, q_max: u64) -> Result<f64> {
    check_table(phi, q_max)?;
    let mut s = 0.0_f64;
    for q in 2..=q_max {
        let ph = phi.phi(q);
        if ph == 0 {
            continue;
        }
        s += 1.0 / ((q * ph) as f64);
    }
    Ok(s)
}

/// S(q_max) with every term divided out to exactly `prec` fractional digits.
///
/// Terms are produced by scaled integer division, so the precision is a
/// property of the call, not of any ambient context, and two calls at
/// different precisions cannot interfere.
pub fn sum_decimal(phi: &TotientTable, q_max: u64, prec: u64) -> Result<BigDecimal> {
    let digits = u32::try_from(prec).ok().filter(|&d| d >= 1).ok_or_else(|| {
        Error::InvalidArgument(format!("decimal precision must be in 1..=2^32, got {prec}"))
    })?;
    check_table(phi, q_max)?;
    let unit = BigInt::from(10u32).pow(digits);
    let mut acc = BigInt::zero();
    for q in 2..=q_max {
        let ph = phi.phi(q);
        if ph == 0 {
            continue;
        }
        acc += &unit / (BigInt::from(q) * BigInt::from(ph));
    }
    Ok(BigDecimal::new(acc, prec as i64))
}

/// S(q_max) as an exact rational. The denominator grows combinatorially with
/// Q, so this is the slow path; it is also the only one with zero rounding.
pub fn sum_fraction(phi: &TotientTable, q_max: u64) -> Result<BigRational> {
    check_table(phi, q_max)?;
    let mut acc = BigRational::zero();
    for q in 2..=q_max {
        let ph = phi.phi(q);
        if ph == 0 {
            continue;
        }
        acc += BigRational::new(BigInt::one(), BigInt::from(q) * BigInt::from(ph));
    }
    Ok(acc)
}

/// Native floating-point mode
#[derive(Clone, Copy, Debug, Default)]
pub struct FloatSum;

impl SumStrategy for FloatSum {
    fn name(&self) -> &'static str {
        "float"
    }
    fn sum(&self, phi: &TotientTable, q_max: u64) -> Result<SumValue> {
        Ok(SumValue::Float(sum_float(phi, q_max)?))
    }
}

/// Arbitrary-precision decimal mode at an explicit digit count
#[derive(Clone, Copy, Debug)]
pub struct DecimalSum {
    /// Fractional digits every intermediate division is carried to
    pub prec: u64,
}

impl SumStrategy for DecimalSum {
    fn name(&self) -> &'static str {
        "decimal"
    }
    fn precision(&self) -> Option<u64> {
        Some(self.prec)
    }
    fn sum(&self, phi: &TotientTable, q_max: u64) -> Result<SumValue> {
        Ok(SumValue::Decimal(sum_decimal(phi, q_max, self.prec)?))
    }
}

/// Exact rational mode
#[derive(Clone, Copy, Debug, Default)]
pub struct FractionSum;

impl SumStrategy for FractionSum {
    fn name(&self) -> &'static str {
        "fraction"
    }
    fn sum(&self, phi: &TotientTable, q_max: u64) -> Result<SumValue> {
        Ok(SumValue::Fraction(sum_fraction(phi, q_max)?))
    }
}
