//! Threshold elimination.
//!
//! An entry survives iff `votes >= total * pct / 100`, where `total` is the row
//! total for per-district filters and the national column total for the
//! national filter. Eliminated entries become `0.0`; shapes never change.
//!
//! Parties or districts whose seats are already all placed are zeroed by
//! `eliminate_satisfied`; the scaling strategies start from that matrix.

/// Keep entries whose share of `Σ votes` is at least `pct` percent.
pub fn filter_votes(votes: &[f64], pct: f64) -> Vec<f64> {
    if pct <= 0.0 {
        return votes.to_vec();
    }
    let cutoff = votes.iter().sum::<f64>() * pct / 100.0;
    votes.iter().map(|&v| if v >= cutoff { v } else { 0.0 }).collect()
}

/// Per-district filter: each row is thresholded against its own total.
pub fn district_filter(matrix: &[Vec<f64>], pct: f64) -> Vec<Vec<f64>> {
    matrix.iter().map(|row| filter_votes(row, pct)).collect()
}

/// National filter: parties whose national share is below `pct` lose the whole column.
pub fn national_filter(matrix: &[Vec<f64>], pct: f64) -> Vec<Vec<f64>> {
    let keep = surviving_parties(matrix, pct);
    matrix
        .iter()
        .map(|row| row.iter().zip(&keep).map(|(&v, &k)| if k { v } else { 0.0 }).collect())
        .collect()
}

/// Which parties survive the national filter (`true` = above threshold with votes).
pub fn surviving_parties(matrix: &[Vec<f64>], pct: f64) -> Vec<bool> {
    let cols = matrix.first().map_or(0, Vec::len);
    let national = sa_core::matrix::vote_col_totals(matrix, cols);
    filter_votes(&national, pct).iter().map(|&v| v > 0.0).collect()
}

/// Zero the rows of full districts and the columns of full parties.
/// `None` leaves that dimension untouched.
pub fn eliminate_satisfied(
    matrix: &[Vec<f64>],
    full_districts: Option<&[bool]>,
    full_parties: Option<&[bool]>,
) -> Vec<Vec<f64>> {
    matrix
        .iter()
        .enumerate()
        .map(|(d, row)| {
            let row_full = full_districts.is_some_and(|f| f[d]);
            row.iter()
                .enumerate()
                .map(|(p, &v)| {
                    let col_full = full_parties.is_some_and(|f| f[p]);
                    if row_full || col_full { 0.0 } else { v }
                })
                .collect()
        })
        .collect()
}
