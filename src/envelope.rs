//! Major-arc error envelopes: closed forms and the per-q override table

use crate::error::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Trivial envelope E(N, L) = N·L + N.
pub fn e_trivial(n: f64, l: f64) -> f64 {
    n * l + n
}

/// Uniform envelope E(N, L) = N / (160·L).
pub fn e_uniform(n: f64, l: f64) -> f64 {
    n / (160.0 * l)
}

/// Closed form substituted when a per-q lookup misses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fallback {
    /// Substitute [`e_trivial`]
    Trivial,
    /// Substitute [`e_uniform`]
    Uniform,
}

impl Fallback {
    /// Evaluates the selected closed form at (N, L).
    pub fn envelope(self, n: f64, l: f64) -> f64 {
        match self {
            Fallback::Trivial => e_trivial(n, l),
            Fallback::Uniform => e_uniform(n, l),
        }
    }
}

/// Externally supplied envelope constants for a single q.
#[derive(Clone, Debug, Deserialize)]
pub struct PerQRow {
    /// Form tag selecting the closed-form expression
    pub form: String,
    /// Leading coefficient
    pub c1: f64,
    /// Second coefficient (used by the affine form only)
    pub c2: f64,
}

impl PerQRow {
    /// Evaluates this row's envelope at (N, L).
    pub fn eval(&self, n: f64, l: f64) -> f64 {
        match self.form.as_str() {
            "cNlog" => self.c1 * n * l,
            "affine" => self.c1 * n * l + self.c2 * n,
            // "cNoverlog" and any unrecognized tag
            _ => self.c1 * n / l,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PerQRecord {
    q: u64,
    form: String,
    c1: f64,
    c2: f64,
}

/// Per-q envelope constants keyed by q, loaded once and queried read-only.
#[derive(Clone, Debug, Default)]
pub struct PerQTable {
    rows: HashMap<u64, PerQRow>,
}

impl PerQTable {
    /// Reads rows of `q,form,c1,c2` from a CSV file.
    ///
    /// Rows that fail to parse are warned about on stderr and skipped; the
    /// caller treats the absent entries like any other lookup miss.
    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)?;
        let mut rows = HashMap::new();
        for rec in rdr.deserialize::<PerQRecord>() {
            match rec {
                Ok(r) => {
                    rows.insert(
                        r.q,
                        PerQRow {
                            form: r.form,
                            c1: r.c1,
                            c2: r.c2,
                        },
                    );
                }
                Err(e) => eprintln!("[warn] skipping malformed per-q row: {e}"),
            }
        }
        Ok(Self { rows })
    }

    /// Constants for q, if the table has them.
    pub fn lookup(&self, q: u64) -> Option<&PerQRow> {
        self.rows.get(&q)
    }

    /// Adds or replaces the row for q.
    pub fn insert(&mut self, q: u64, row: PerQRow) {
        self.rows.insert(q, row);
    }

    /// Number of q values the table covers.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when no rows are loaded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
