//! Bipartite transport feasibility.
//!
//! Can every district's free seats be placed in open cells so that every
//! party's free seats are used exactly? Modelled as max-flow:
//! source → district (cap `free_row`), district → party where the cell is
//! open (unbounded), party → sink (cap `free_col`). Feasible iff the flow
//! saturates both sides. Graphs here have a few dozen nodes, so a plain
//! Edmonds-Karp on a dense capacity matrix is enough.

use std::collections::VecDeque;

/// `open[d][p]` says whether seats may go to party `p` in district `d`.
pub fn transport_feasible(open: &[Vec<bool>], free_row: &[u32], free_col: &[u32]) -> bool {
    let need_rows: u64 = free_row.iter().map(|&x| u64::from(x)).sum();
    let need_cols: u64 = free_col.iter().map(|&x| u64::from(x)).sum();
    if need_rows != need_cols {
        return false;
    }
    max_flow(open, free_row, free_col) == need_rows
}

/// Maximum number of seats that can be placed.
pub fn max_flow(open: &[Vec<bool>], free_row: &[u32], free_col: &[u32]) -> u64 {
    let rows = free_row.len();
    let cols = free_col.len();
    let n = rows + cols + 2;
    let (source, sink) = (0, n - 1);
    let district = |d: usize| 1 + d;
    let party = |p: usize| 1 + rows + p;

    let mut cap = vec![vec![0u64; n]; n];
    for d in 0..rows {
        cap[source][district(d)] = u64::from(free_row[d]);
        for p in 0..cols {
            if open[d][p] {
                cap[district(d)][party(p)] = u64::MAX / 4;
            }
        }
    }
    for p in 0..cols {
        cap[party(p)][sink] = u64::from(free_col[p]);
    }

    let mut flow = 0u64;
    loop {
        // BFS for a shortest augmenting path.
        let mut prev = vec![usize::MAX; n];
        prev[source] = source;
        let mut queue = VecDeque::from([source]);
        while let Some(u) = queue.pop_front() {
            if u == sink {
                break;
            }
            for v in 0..n {
                if prev[v] == usize::MAX && cap[u][v] > 0 {
                    prev[v] = u;
                    queue.push_back(v);
                }
            }
        }
        if prev[sink] == usize::MAX {
            return flow;
        }
        let mut push = u64::MAX;
        let mut v = sink;
        while v != source {
            let u = prev[v];
            push = push.min(cap[u][v]);
            v = u;
        }
        let mut v = sink;
        while v != source {
            let u = prev[v];
            cap[u][v] -= push;
            cap[v][u] += push;
            v = u;
        }
        flow += push;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concentrated_votes_need_matching_targets() {
        let open = vec![vec![true, false], vec![false, true]];
        assert!(!transport_feasible(&open, &[2, 2], &[1, 3]));
        assert!(transport_feasible(&open, &[2, 2], &[2, 2]));
        assert_eq!(max_flow(&open, &[2, 2], &[1, 3]), 3);
    }

    #[test]
    fn totals_must_agree() {
        let open = vec![vec![true, true]];
        assert!(!transport_feasible(&open, &[2], &[1, 2]));
        assert!(transport_feasible(&open, &[3], &[1, 2]));
    }

    #[test]
    fn empty_is_trivially_feasible() {
        assert!(transport_feasible(&[], &[], &[]));
    }
}
