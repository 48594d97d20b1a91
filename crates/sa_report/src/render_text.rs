//! render_text.rs: fixed-width plain-text tables for terminals.

use core::fmt::Write as _;

use sa_pipeline::{RulesetReport, SimulationReport, Summary};

use crate::structure::{ElectionReport, SeatRow};

/// Left-aligned first column, right-aligned numbers.
fn table(header: &[String], rows: &[Vec<String>]) -> String {
    let ncols = header.len();
    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }
    let mut out = String::new();
    let mut line = |cells: &[String]| {
        for (i, cell) in cells.iter().enumerate().take(ncols) {
            if i > 0 {
                out.push_str("  ");
            }
            let pad = widths[i].saturating_sub(cell.chars().count());
            if i == 0 {
                out.push_str(cell);
                out.extend(std::iter::repeat(' ').take(pad));
            } else {
                out.extend(std::iter::repeat(' ').take(pad));
                out.push_str(cell);
            }
        }
        out.push('\n');
    };
    line(header);
    let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    line(&rule);
    for row in rows {
        line(row);
    }
    out
}

fn header(first: &str, parties: &[String], last: Option<&str>) -> Vec<String> {
    std::iter::once(first.to_string())
        .chain(parties.iter().cloned())
        .chain(last.map(str::to_string))
        .collect()
}

fn seat_line(r: &SeatRow, pick: fn(&SeatRow) -> &[u32]) -> Vec<String> {
    let cells = pick(r);
    std::iter::once(r.district.clone())
        .chain(cells.iter().map(u32::to_string))
        .chain(std::iter::once(cells.iter().sum::<u32>().to_string()))
        .collect()
}

pub fn render_election_text(m: &ElectionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Ruleset: {} ({})", m.ruleset.name, m.ruleset.method);
    if let Some(d) = &m.input_digest {
        let _ = writeln!(out, "Input sha256: {d}");
    }
    out.push('\n');

    let votes: Vec<Vec<String>> = m
        .votes
        .iter()
        .map(|r| {
            std::iter::once(r.district.clone())
                .chain(r.votes.iter().map(u64::to_string))
                .chain(std::iter::once(r.votes.iter().sum::<u64>().to_string()))
                .collect()
        })
        .collect();
    out.push_str("Votes\n");
    out.push_str(&table(&header("District", &m.parties, Some("Total")), &votes));

    let sections: [(&str, fn(&SeatRow) -> &[u32]); 3] = [
        ("Constituency seats", |r| &r.constituency),
        ("Adjustment seats", |r| &r.adjustment),
        ("Total seats", |r| &r.total),
    ];
    for (title, pick) in sections {
        let rows: Vec<Vec<String>> = m
            .seats
            .rows
            .iter()
            .chain(std::iter::once(&m.seats.total))
            .map(|r| seat_line(r, pick))
            .collect();
        let _ = writeln!(out, "\n{title}");
        out.push_str(&table(&header("District", &m.parties, Some("Total")), &rows));
    }

    if !m.awards.is_empty() {
        out.push_str("\nAdjustment seat awards\n");
        let rows: Vec<Vec<String>> = m
            .awards
            .iter()
            .map(|a| {
                let party = match &a.from_party {
                    Some(from) => format!("{} (from {from})", a.party),
                    None => a.party.clone(),
                };
                vec![(a.seat + 1).to_string(), a.district.clone(), party, a.reason.clone(), format!("{:.4}", a.score)]
            })
            .collect();
        let hdr: Vec<String> = ["#", "District", "Party", "Reason", "Score"].iter().map(|s| s.to_string()).collect();
        out.push_str(&table(&hdr, &rows));
    }

    let _ = writeln!(out, "\nEntropy: {:.6}", m.entropy);
    if m.tie_breaks > 0 {
        let _ = writeln!(out, "Ties broken at random: {}", m.tie_breaks);
    }
    if m.violating {
        out.push_str("WARNING: party seat targets could not all be met\n");
    }
    out
}

fn summary_cells(name: &str, s: &Summary) -> Vec<String> {
    vec![
        name.to_string(),
        s.count.to_string(),
        format!("{:.4}", s.avg),
        format!("{:.4}", s.std),
        format!("{:.4}", s.min),
        format!("{:.4}", s.max),
    ]
}

fn ruleset_text(out: &mut String, parties: &[String], r: &RulesetReport) {
    let _ = writeln!(out, "\nRuleset: {} ({}), failed iterations: {}", r.name, r.method, r.failures);
    let rows: Vec<Vec<String>> = r.measures.iter().map(|(k, s)| summary_cells(k, s)).collect();
    let hdr: Vec<String> = ["Measure", "Count", "Avg", "Std", "Min", "Max"].iter().map(|s| s.to_string()).collect();
    out.push_str(&table(&hdr, &rows));

    if let Some(total) = r.lists.get("total_seats") {
        let rows: Vec<Vec<String>> = r
            .rows
            .iter()
            .zip(total)
            .map(|(name, cells)| {
                std::iter::once(name.clone()).chain(cells.iter().map(|s| format!("{:.2}", s.avg))).collect()
            })
            .collect();
        out.push_str("\nAverage total seats\n");
        out.push_str(&table(&header("District", parties, None), &rows));
    }
}

pub fn render_simulation_text(r: &SimulationReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Simulation: {} of {} iterations{}, stability {}, seed {}",
        r.completed,
        r.config.simulation_count.max(1),
        if r.cancelled { " (stopped early)" } else { "" },
        r.config.stability,
        r.config.seed
    );
    let parties: Vec<String> = r.parties.iter().map(|p| p.to_string()).collect();
    for rs in &r.rulesets {
        ruleset_text(&mut out, &parties, rs);
    }
    out
}
