//! Active-subtensor linear operators for the chunking trainer (§4.2 step 4,
//! §4.3 `active_subtensors`).
//!
//! A chunking outer iteration only ever needs the rows indexed by the
//! working set `B`; these operators hold shared handles to exactly those
//! rows so the subproblem stays well-defined even if the cache evicts one of
//! them while the inner solver is still running.

use std::sync::Arc;

use super::concurrent::RowCache;
use super::creator::RowCreator;

/// Action of the `B x B` block of the Hessian on a vector over `B`.
pub struct QBB {
    rows: Vec<Arc<Vec<f32>>>,
    b: Vec<usize>,
}

impl QBB {
    /// `(Q_BB * lambda)[i] = sum_k Q[B[i]][B[k]] * lambda[k]`.
    pub fn apply(&self, lambda: &[f64]) -> Vec<f64> {
        debug_assert_eq!(lambda.len(), self.b.len());
        self.rows
            .iter()
            .map(|row| {
                self.b
                    .iter()
                    .zip(lambda)
                    .map(|(&k, &lk)| row[k] as f64 * lk)
                    .sum()
            })
            .collect()
    }

    /// `diag(Q_BB)[i] = Q[B[i]][B[i]]`.
    pub fn diagonal(&self) -> Vec<f64> {
        self.rows
            .iter()
            .zip(&self.b)
            .map(|(row, &i)| row[i] as f64)
            .collect()
    }

    /// `|B|`.
    pub fn len(&self) -> usize {
        self.b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.b.is_empty()
    }
}

/// Action of the `B x N` block of the Hessian on `alpha` restricted to `N`.
pub struct QBN {
    rows: Vec<Arc<Vec<f32>>>,
    n: Vec<usize>,
}

impl QBN {
    /// `(Q_BN * alpha_N)[i] = sum_{j in N} Q[B[i]][j] * alpha[j]`. `alpha` is
    /// indexed by the full, unrestricted index space `0..P`.
    pub fn apply(&self, alpha: &[f64]) -> Vec<f64> {
        self.rows
            .iter()
            .map(|row| self.n.iter().map(|&j| row[j] as f64 * alpha[j]).sum())
            .collect()
    }
}

/// Action of the full `P`-wide rows indexed by `B` on a vector over `B`,
/// producing a vector over the full index space `0..P`.
pub struct QA {
    rows: Vec<Arc<Vec<f32>>>,
    p: usize,
}

impl QA {
    /// `(Q_a * v)[j] = sum_i Q[B[i]][j] * v[i]`, `j` ranging over `0..P`.
    pub fn apply(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.rows.len());
        let mut out = vec![0.0f64; self.p];
        for (row, &vi) in self.rows.iter().zip(v) {
            for (slot, &q) in out.iter_mut().zip(row.iter()) {
                *slot += q as f64 * vi;
            }
        }
        out
    }
}

/// Bundle returned by [`active_subtensors`]: the three operators plus the
/// materialised diagonal of `Q_BB`, which trainers need directly for the
/// Jacobi preconditioner.
pub struct ActiveSubtensors {
    pub qbb: QBB,
    pub qbn: QBN,
    pub qa: QA,
    pub diagonal: Vec<f64>,
}

/// Pre-fetch every row indexed by `b` (in parallel, when the `parallel`
/// feature is enabled) and build the three active-subtensor operators over
/// the working set `b` and its complement `n`.
pub fn active_subtensors<T, C: RowCreator<T>>(
    cache: &RowCache<T, C>,
    b: &[usize],
    n: &[usize],
) -> ActiveSubtensors {
    let rows = fetch_rows(cache, b);

    let qbb = QBB {
        rows: rows.clone(),
        b: b.to_vec(),
    };
    let diagonal = qbb.diagonal();
    let qbn = QBN {
        rows: rows.clone(),
        n: n.to_vec(),
    };
    let qa = QA {
        rows,
        p: cache.p(),
    };

    ActiveSubtensors {
        qbb,
        qbn,
        qa,
        diagonal,
    }
}

#[cfg(feature = "parallel")]
fn fetch_rows<T, C: RowCreator<T>>(cache: &RowCache<T, C>, b: &[usize]) -> Vec<Arc<Vec<f32>>> {
    use rayon::prelude::*;
    b.par_iter().map(|&i| cache.row_handle(i)).collect()
}

#[cfg(not(feature = "parallel"))]
fn fetch_rows<T, C: RowCreator<T>>(cache: &RowCache<T, C>, b: &[usize]) -> Vec<Arc<Vec<f32>>> {
    b.iter().map(|&i| cache.row_handle(i)).collect()
}
