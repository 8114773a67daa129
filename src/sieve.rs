//! Euler-totient sieve

use crate::error::{Error, Result};

/// φ(n) for every n in [0, limit], built once and queried read-only.
///
/// The table starts as the identity A[i] = i; for each prime p (detected as
/// A[p] still equal to p when p is reached) every multiple k of p receives the
/// correction A[k] -= A[k]/p. Each distinct prime factor of n contributes its
/// (1 - 1/p) factor exactly once, so the final entries are φ(n).
#[derive(Clone, Debug)]
pub struct TotientTable {
    values: Vec<u64>,
}

impl TotientTable {
    /// Sieves φ for all n in [0, q_max]. O(Q log log Q) time, O(Q) space.
    pub fn up_to(q_max: u64) -> Result<Self> {
        let len = q_max
            .checked_add(1)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "totient table up to {q_max} does not fit in the address space"
                ))
            })?;
        let mut values: Vec<u64> = (0..len as u64).collect();
        for p in 2..len {
            if values[p] == p as u64 {
                let mut k = p;
                while k < len {
                    values[k] -= values[k] / p as u64;
                    k += p;
                }
            }
        }
        Ok(Self { values })
    }

    /// Largest n the table covers.
    pub fn limit(&self) -> u64 {
        (self.values.len() - 1) as u64
    }

    /// φ(n). Panics if `n` exceeds [`limit`](Self::limit).
    pub fn phi(&self, n: u64) -> u64 {
        self.values[n as usize]
    }
}
