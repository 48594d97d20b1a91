//! District × party matrices.
//!
//! Rows are districts in input order; columns are parties in input order.
//! Algorithms work on `f64` vote rows (scaled or eliminated copies), so
//! conversion helpers live here too.

use crate::errors::CoreError;

/// Raw vote counts, district × party.
pub type VoteMatrix = Vec<Vec<u64>>;

/// Seats, district × party.
pub type AllocationMatrix = Vec<Vec<u32>>;

/// Every row must have exactly `cols` entries.
pub fn check_shape<T>(m: &[Vec<T>], cols: usize) -> Result<(), CoreError> {
    for (row, r) in m.iter().enumerate() {
        if r.len() != cols {
            return Err(CoreError::RaggedMatrix { row, expected: cols, found: r.len() });
        }
    }
    Ok(())
}

#[inline]
pub fn zeros(rows: usize, cols: usize) -> AllocationMatrix {
    vec![vec![0u32; cols]; rows]
}

#[inline]
pub fn row_sums(m: &[Vec<u32>]) -> Vec<u32> {
    m.iter().map(|r| r.iter().sum()).collect()
}

/// Column sums; `cols` is explicit so an empty matrix still yields a vector.
pub fn col_sums(m: &[Vec<u32>], cols: usize) -> Vec<u32> {
    let mut out = vec![0u32; cols];
    for r in m {
        for (p, &s) in r.iter().enumerate() {
            out[p] += s;
        }
    }
    out
}

#[inline]
pub fn total(m: &[Vec<u32>]) -> u32 {
    m.iter().flatten().sum()
}

pub fn to_f64(m: &[Vec<u64>]) -> Vec<Vec<f64>> {
    m.iter().map(|r| r.iter().map(|&v| v as f64).collect()).collect()
}

pub fn vote_col_totals(m: &[Vec<f64>], cols: usize) -> Vec<f64> {
    let mut out = vec![0.0; cols];
    for r in m {
        for (p, &v) in r.iter().enumerate() {
            out[p] += v;
        }
    }
    out
}

#[inline]
pub fn vote_row_totals(m: &[Vec<f64>]) -> Vec<f64> {
    m.iter().map(|r| r.iter().sum()).collect()
}

/// Element-wise `a - b`; panics in debug if any cell would go negative.
pub fn difference(a: &[Vec<u32>], b: &[Vec<u32>]) -> AllocationMatrix {
    a.iter()
        .zip(b)
        .map(|(ra, rb)| {
            ra.iter()
                .zip(rb)
                .map(|(&x, &y)| {
                    debug_assert!(x >= y, "allocation below prior");
                    x.saturating_sub(y)
                })
                .collect()
        })
        .collect()
}

/// Transpose (party × district view), used by the scaling methods.
pub fn transpose<T: Copy>(m: &[Vec<T>], cols: usize) -> Vec<Vec<T>> {
    (0..cols).map(|p| m.iter().map(|r| r[p]).collect()).collect()
}
