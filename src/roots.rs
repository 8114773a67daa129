//! Exact integer n-th roots

use crate::error::{Error, Result};
use num_bigint::BigUint;
use num_traits::{One, Zero};

/// Returns the unique r ≥ 0 with r^k ≤ n < (r+1)^k.
///
/// Doubles an upper bound from 1 until it overshoots, then bisects the
/// bracket. Exact for any magnitude of `n`; no floating point is involved, so
/// values above 2^53 keep their low bits.
pub fn nth_root_floor(n: &BigUint, k: u32) -> Result<BigUint> {
    if k == 0 {
        return Err(Error::InvalidArgument(
            "root exponent k must be ≥ 1".into(),
        ));
    }
    if *n < BigUint::from(2u32) {
        return Ok(n.clone());
    }

    let mut lo = BigUint::zero();
    let mut hi = BigUint::one();
    while hi.pow(k) <= *n {
        hi <<= 1u32;
    }
    // lo^k ≤ n < hi^k
    while &hi - &lo > BigUint::one() {
        let mid: BigUint = (&lo + &hi) >> 1u32;
        if mid.pow(k) <= *n {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(lo)
}
