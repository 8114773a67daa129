//! Tail-margin evaluation: derived scales, harmonic sum, envelopes, ratios

use crate::envelope::{e_trivial, e_uniform, Fallback, PerQTable};
use crate::error::{Error, Result};
use crate::harmonic::{sum_decimal, sum_float, sum_fraction, SumStrategy};
use crate::roots::nth_root_floor;
use crate::sieve::TotientTable;
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint};
use num_traits::{ToPrimitive, Zero};
use serde::Serialize;
use std::collections::BTreeMap;

/// Q is derived as the integer fifth root of N.
const SCALE_ROOT: u32 = 5;

/// Acceptance ceiling for EMA_trivial / share.
pub const RATIO_TRIVIAL_MAX: f64 = 1e-3;
/// Acceptance ceiling for EMA_uniform / share.
pub const RATIO_UNIFORM_MAX: f64 = 1e-8;

/// Recorded float-mode S(Q) at the reference scale N* = 4×10^18.
pub const BASELINE_SUM: f64 = 1.20348665358;
/// Permitted deviation from [`BASELINE_SUM`].
pub const BASELINE_TOLERANCE: f64 = 1e-10;
/// Reference scale the baseline was recorded at.
pub const BASELINE_N: f64 = 4.0e18;
/// Half-width of the window around [`BASELINE_N`] where the baseline applies.
pub const BASELINE_WINDOW: f64 = 0.5e18;

/// Proof constants the margin computation is parameterized by.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Constants {
    /// Guard-space divisor K
    pub k: f64,
    /// Allowed density floor S_floor
    pub s_floor: f64,
    /// Weight constant C_W (2·W_sup when derived from a supremum weight)
    pub c_w: f64,
    /// Exponent of the R = N^e scale (0.6 in the paper)
    pub r_exp: f64,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            k: 10.0,
            s_floor: 1.2,
            c_w: 2.0,
            r_exp: 0.6,
        }
    }
}

impl Constants {
    fn validate(&self) -> Result<()> {
        if !(self.k > 0.0) {
            return Err(Error::InvalidArgument(format!("K must be > 0, got {}", self.k)));
        }
        if !(self.s_floor > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "S_floor must be > 0, got {}",
                self.s_floor
            )));
        }
        if !(self.c_w > 0.0) {
            return Err(Error::InvalidArgument(format!(
                "C_W must be > 0, got {}",
                self.c_w
            )));
        }
        if !(self.r_exp > 0.0 && self.r_exp < 1.0) {
            return Err(Error::InvalidArgument(format!(
                "R exponent must lie in (0, 1), got {}",
                self.r_exp
            )));
        }
        Ok(())
    }
}

/// Echo of the inputs a record was computed under.
#[derive(Clone, Debug, Serialize)]
pub struct ConstantsEcho {
    /// Guard-space divisor
    #[serde(rename = "K")]
    pub k: f64,
    /// Allowed density floor
    #[serde(rename = "S_floor")]
    pub s_floor: f64,
    /// Weight constant
    #[serde(rename = "C_W")]
    pub c_w: f64,
    /// Summation mode name
    pub method: String,
    /// Digit precision, when the mode has one
    pub prec: Option<u64>,
}

/// Complete tail-margin result at one scale N.
#[derive(Clone, Debug, Serialize)]
pub struct TailMargins {
    /// Inputs the record was computed under
    pub constants: ConstantsEcho,
    /// N as a float (display only; the computation used the exact integer)
    #[serde(rename = "N")]
    pub n: f64,
    /// ln N
    #[serde(rename = "logN")]
    pub log_n: f64,
    /// floor(N^(1/5))
    #[serde(rename = "Q")]
    pub q: u64,
    /// N^r_exp
    #[serde(rename = "R")]
    pub r: f64,
    /// S(Q) cast to f64
    pub sum_q: f64,
    /// (C_W/R)·E_trivial·S(Q)
    #[serde(rename = "EMA_trivial")]
    pub ema_trivial: f64,
    /// (C_W/R)·E_uniform·S(Q)
    #[serde(rename = "EMA_uniform")]
    pub ema_uniform: f64,
    /// Allowed error budget (S_floor/(8K))·N/L²
    pub share: f64,
    /// EMA_trivial / share
    pub ratio_trivial: f64,
    /// EMA_uniform / share
    pub ratio_uniform: f64,
}

impl TailMargins {
    /// Acceptance policy: both ratios under their fixed ceilings.
    pub fn accepted(&self) -> bool {
        self.ratio_trivial < RATIO_TRIVIAL_MAX && self.ratio_uniform < RATIO_UNIFORM_MAX
    }
}

fn require_positive(n: &BigUint) -> Result<()> {
    if n.is_zero() {
        return Err(Error::InvalidArgument("N must be a positive integer".into()));
    }
    Ok(())
}

fn derived_q(n: &BigUint) -> Result<u64> {
    nth_root_floor(n, SCALE_ROOT)?.to_u64().ok_or_else(|| {
        Error::InvalidArgument(format!("Q = floor(N^(1/5)) does not fit in u64 for N={n}"))
    })
}

fn as_f64(n: &BigUint) -> f64 {
    n.to_f64().unwrap_or(f64::INFINITY)
}

/// Evaluates the closed-form tail margins at scale N.
///
/// Derives Q and R, computes S(Q) under `strategy` (checking strict
/// monotonicity at Q-1, Q, Q+1 in the same representation), and compares the
/// major-arc error EMA = (C_W/R)·E·S(Q) against the allowed share for both
/// envelope models.
pub fn compute_tail_margins(
    n: &BigUint,
    constants: &Constants,
    strategy: &dyn SumStrategy,
) -> Result<TailMargins> {
    require_positive(n)?;
    constants.validate()?;
    let q = derived_q(n)?;

    // One table serves all three point evaluations.
    let phi = TotientTable::up_to(q + 1)?;
    let s_prev = strategy.sum(&phi, q - 1)?;
    let s_q = strategy.sum(&phi, q)?;
    let s_next = strategy.sum(&phi, q + 1)?;
    if !(s_prev < s_q && s_q < s_next) {
        return Err(Error::Monotonicity {
            q,
            method: strategy.name(),
        });
    }
    let sum_q = s_q.approx_f64();

    let n_f = as_f64(n);
    let l = n_f.ln();
    let r = n_f.powf(constants.r_exp);
    let ema_trivial = (constants.c_w / r) * e_trivial(n_f, l) * sum_q;
    let ema_uniform = (constants.c_w / r) * e_uniform(n_f, l) * sum_q;
    let share = (constants.s_floor / (8.0 * constants.k)) * n_f / (l * l);

    Ok(TailMargins {
        constants: ConstantsEcho {
            k: constants.k,
            s_floor: constants.s_floor,
            c_w: constants.c_w,
            method: strategy.name().to_string(),
            prec: strategy.precision(),
        },
        n: n_f,
        log_n: l,
        q,
        r,
        sum_q,
        ema_trivial,
        ema_uniform,
        share,
        ratio_trivial: ema_trivial / share,
        ratio_uniform: ema_uniform / share,
    })
}

/// Margin result for the per-q summed envelope variant.
#[derive(Clone, Debug, Serialize)]
pub struct PerQMargins {
    /// N as a float
    #[serde(rename = "N")]
    pub n: f64,
    /// Upper summation limit for q
    #[serde(rename = "Qcap")]
    pub q_cap: u64,
    /// Count of q in [2, Qcap] with no table row
    pub missing: u64,
    /// (C_W/R)·Σ E(q)/(q·φ(q))
    #[serde(rename = "EMA")]
    pub ema: f64,
    /// Allowed error budget
    pub share: f64,
    /// EMA / share
    pub ratio: f64,
}

/// Evaluates the table-driven envelope summed per q over [2, Qcap].
///
/// Every q missing from the table substitutes the fallback closed form and
/// bumps the `missing` diagnostic; an empty table therefore reproduces the
/// pure fallback-formula computation.
pub fn compute_per_q_margin(
    n: &BigUint,
    constants: &Constants,
    q_cap: u64,
    table: &PerQTable,
    fallback: Fallback,
) -> Result<PerQMargins> {
    require_positive(n)?;
    constants.validate()?;
    let phi = TotientTable::up_to(q_cap)?;
    let n_f = as_f64(n);
    let l = n_f.ln();
    let r = n_f.powf(constants.r_exp);

    let mut acc = 0.0_f64;
    let mut missing = 0u64;
    for q in 2..=q_cap {
        let ph = phi.phi(q);
        if ph == 0 {
            continue;
        }
        let e = match table.lookup(q) {
            Some(row) => row.eval(n_f, l),
            None => {
                missing += 1;
                fallback.envelope(n_f, l)
            }
        };
        acc += e / ((q * ph) as f64);
    }

    let ema = (constants.c_w / r) * acc;
    let share = (constants.s_floor / (8.0 * constants.k)) * n_f / (l * l);
    Ok(PerQMargins {
        n: n_f,
        q_cap,
        missing,
        ema,
        share,
        ratio: ema / share,
    })
}

/// High-precision cross-checks around Q.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostics {
    /// floor(N^(1/5))
    #[serde(rename = "Q")]
    pub q: u64,
    /// S(Q) at the base precision
    pub s_decimal_base: String,
    /// S(Q) at the high precision
    pub s_decimal_hi: String,
    /// Exact S(Q) as numerator/denominator
    pub s_fraction: String,
    /// |decimal_hi − fraction| at the high precision
    pub s_decimal_minus_fraction_abs: String,
    /// S(Q+k) − S(Q+k−1) at the high precision, keyed by k
    pub monotone_deltas_hi_prec: BTreeMap<u64, String>,
}

/// Recomputes S around Q at two precisions and against the exact rational.
///
/// The successive hi-precision deltas exhibit the smooth monotone growth the
/// point checks in [`compute_tail_margins`] sample; the decimal-vs-fraction
/// difference bounds the rounding the decimal mode carries.
pub fn strict_diagnostics(
    n: &BigUint,
    base_prec: u64,
    hi_prec: u64,
    k_max: u64,
) -> Result<Diagnostics> {
    require_positive(n)?;
    let q = derived_q(n)?;
    let phi = TotientTable::up_to(q + k_max)?;

    let lo = q.saturating_sub(k_max).max(1);
    let mut hi_sums: BTreeMap<u64, BigDecimal> = BTreeMap::new();
    for qq in lo..=q + k_max {
        hi_sums.insert(qq, sum_decimal(&phi, qq, hi_prec)?);
    }
    let s_base = sum_decimal(&phi, q, base_prec)?;
    let frac = sum_fraction(&phi, q)?;

    let digits = u32::try_from(hi_prec).map_err(|_| {
        Error::InvalidArgument(format!("precision {hi_prec} is too large"))
    })?;
    let unit = BigInt::from(10u32).pow(digits);
    let frac_dec = BigDecimal::new((frac.numer() * &unit) / frac.denom(), hi_prec as i64);
    let diff = (&hi_sums[&q] - &frac_dec).abs();

    let mut deltas = BTreeMap::new();
    for k in 1..=k_max {
        let d = &hi_sums[&(q + k)] - &hi_sums[&(q + k - 1)];
        deltas.insert(k, d.to_string());
    }

    Ok(Diagnostics {
        q,
        s_decimal_base: s_base.to_string(),
        s_decimal_hi: hi_sums[&q].to_string(),
        s_fraction: format!("{}/{}", frac.numer(), frac.denom()),
        s_decimal_minus_fraction_abs: diff.to_string(),
        monotone_deltas_hi_prec: deltas,
    })
}

/// True when N falls in the window the baseline was recorded for.
pub fn near_baseline(n: &BigUint) -> bool {
    (as_f64(n) - BASELINE_N).abs() < BASELINE_WINDOW
}

/// Asserts float-mode S(Q) against the recorded reference value.
///
/// A mismatch beyond [`BASELINE_TOLERANCE`] signals a defect in the sieve or
/// the summation, never a recoverable condition.
pub fn check_baseline(n: &BigUint) -> Result<f64> {
    require_positive(n)?;
    let q = derived_q(n)?;
    let phi = TotientTable::up_to(q)?;
    let got = sum_float(&phi, q)?;
    if (got - BASELINE_SUM).abs() > BASELINE_TOLERANCE {
        return Err(Error::Baseline {
            got,
            expected: BASELINE_SUM,
        });
    }
    Ok(got)
}
