//! Allocation quality measures used by the simulation.
//!
//! All functions are pure. National measures work on column totals of the
//! vote and seat matrices; parties without votes are skipped where a ratio
//! would divide by zero.

use sa_core::DivisorRule;

/// Σ over awarded seats of `ln(votes / divisor_at(k))`.
/// Cells without votes contribute nothing.
pub fn entropy(votes: &[Vec<f64>], allocation: &[Vec<u32>], rule: DivisorRule) -> f64 {
    let mut e = 0.0;
    for (vrow, arow) in votes.iter().zip(allocation) {
        for (&v, &s) in vrow.iter().zip(arow) {
            if v <= 0.0 {
                continue;
            }
            for k in 0..s {
                e += (v / rule.divisor_at(k)).ln();
            }
        }
    }
    e
}

/// Σ |a − b| over all cells.
pub fn deviation(a: &[Vec<u32>], b: &[Vec<u32>]) -> f64 {
    a.iter()
        .zip(b)
        .flat_map(|(ra, rb)| ra.iter().zip(rb))
        .map(|(&x, &y)| f64::from(x.abs_diff(y)))
        .sum()
}

/// Σ |a − b| over party totals (vectors).
pub fn deviation_1d(a: &[u32], b: &[u32]) -> f64 {
    a.iter().zip(b).map(|(&x, &y)| f64::from(x.abs_diff(y))).sum()
}

fn shares(votes: &[f64], seats: &[u32]) -> Option<(Vec<f64>, Vec<f64>)> {
    let v_total: f64 = votes.iter().sum();
    let s_total: f64 = seats.iter().map(|&s| f64::from(s)).sum();
    if v_total <= 0.0 || s_total <= 0.0 {
        return None;
    }
    Some((
        votes.iter().map(|v| v / v_total).collect(),
        seats.iter().map(|&s| f64::from(s) / s_total).collect(),
    ))
}

/// Loosemore–Hanby index: ½ Σ |vote share − seat share|.
pub fn loosemore_hanby(votes: &[f64], seats: &[u32]) -> f64 {
    let Some((v, s)) = shares(votes, seats) else { return 0.0 };
    0.5 * v.iter().zip(&s).map(|(a, b)| (a - b).abs()).sum::<f64>()
}

/// Sainte-Laguë index: Σ (seat share − vote share)² / vote share.
pub fn sainte_lague(votes: &[f64], seats: &[u32]) -> f64 {
    let Some((v, s)) = shares(votes, seats) else { return 0.0 };
    v.iter()
        .zip(&s)
        .filter(|(&vs, _)| vs > 0.0)
        .map(|(&vs, &ss)| (ss - vs).powi(2) / vs)
        .sum()
}

/// Smallest votes-per-seat among seated parties over the largest next d'Hondt
/// quotient `v/(s+1)`. At least 1.0 exactly when the national totals form a
/// d'Hondt allocation.
pub fn dhondt_min(votes: &[f64], seats: &[u32]) -> f64 {
    let (min_per_seat, max_next) = dhondt_bounds(votes, seats);
    if max_next <= 0.0 {
        return 1.0;
    }
    min_per_seat / max_next
}

/// Seats d'Hondt would have to move: Σ max(0, v/a − (s+1)) with `a` the
/// smallest votes-per-seat among seated parties.
pub fn dhondt_sum(votes: &[f64], seats: &[u32]) -> f64 {
    let (min_per_seat, _) = dhondt_bounds(votes, seats);
    if !min_per_seat.is_finite() || min_per_seat <= 0.0 {
        return 0.0;
    }
    votes
        .iter()
        .zip(seats)
        .map(|(&v, &s)| (v / min_per_seat - f64::from(s + 1)).max(0.0))
        .sum()
}

fn dhondt_bounds(votes: &[f64], seats: &[u32]) -> (f64, f64) {
    let mut min_per_seat = f64::INFINITY;
    let mut max_next: f64 = 0.0;
    for (&v, &s) in votes.iter().zip(seats) {
        if s > 0 {
            min_per_seat = min_per_seat.min(v / f64::from(s));
        }
        if v > 0.0 {
            max_next = max_next.max(v / f64::from(s + 1));
        }
    }
    (min_per_seat, max_next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entropy_sums_log_divided_votes() {
        let e = entropy(&[vec![100.0, 0.0]], &[vec![2, 0]], DivisorRule::DHondt);
        assert!((e - (100f64.ln() + 50f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn deviation_is_l1() {
        assert_eq!(deviation(&[vec![2, 0], vec![1, 1]], &[vec![1, 1], vec![1, 1]]), 2.0);
        assert_eq!(deviation_1d(&[3, 1], &[1, 3]), 4.0);
    }

    #[test]
    fn proportional_outcome_scores_zero() {
        let votes = [60.0, 40.0];
        let seats = [3, 2];
        assert!(loosemore_hanby(&votes, &seats).abs() < 1e-12);
        assert!(sainte_lague(&votes, &seats).abs() < 1e-12);
        assert!(dhondt_min(&votes, &seats) >= 1.0);
        assert_eq!(dhondt_sum(&votes, &seats), 0.0);
    }

    #[test]
    fn skewed_outcome_is_flagged() {
        let votes = [50.0, 50.0];
        let seats = [4, 0];
        assert!((loosemore_hanby(&votes, &seats) - 0.5).abs() < 1e-12);
        assert!(dhondt_min(&votes, &seats) < 1.0);
        assert!(dhondt_sum(&votes, &seats) > 0.0);
    }
}
