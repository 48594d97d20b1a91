//! Divisor sequences and quotas.
//!
//! Contract:
//! - `DivisorRule::divisor_at(k)` is the divisor applied to a list that already holds `k`
//!   seats (closed form; no hidden state).
//! - `DivisorCursor` is the explicit, restartable cursor over that sequence. Two cursors
//!   of the same rule advanced by the same number of draws always agree.
//! - `QuotaRule::quota` is a pure function of (votes, seats); no rounding.
//!
//! Tokens are the wire names used by `Rules` (`"dhondt"`, `"sainte-lague"`, …).

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// First Huntington-Hill divisor. Positive so every list with votes wins its
/// first seat before any list gets a second one, without dividing by zero.
pub const HUNTINGTON_HILL_FIRST: f64 = 1e-12;

/// Highest-averages divisor rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DivisorRule {
    #[serde(rename = "dhondt")]
    DHondt,
    #[serde(rename = "sainte-lague")]
    SainteLague,
    #[serde(rename = "nordic")]
    Nordic,
    #[serde(rename = "imperiali")]
    Imperiali,
    #[serde(rename = "danish")]
    Danish,
    #[serde(rename = "huntington-hill")]
    HuntingtonHill,
}

impl DivisorRule {
    pub const ALL: [DivisorRule; 6] = [
        DivisorRule::DHondt,
        DivisorRule::SainteLague,
        DivisorRule::Nordic,
        DivisorRule::Imperiali,
        DivisorRule::Danish,
        DivisorRule::HuntingtonHill,
    ];

    pub fn token(self) -> &'static str {
        match self {
            DivisorRule::DHondt => "dhondt",
            DivisorRule::SainteLague => "sainte-lague",
            DivisorRule::Nordic => "nordic",
            DivisorRule::Imperiali => "imperiali",
            DivisorRule::Danish => "danish",
            DivisorRule::HuntingtonHill => "huntington-hill",
        }
    }

    /// Divisor for the next seat of a list that already holds `k` seats.
    ///
    /// - d'Hondt: 1, 2, 3, …
    /// - Sainte-Laguë: 0.5, 1.5, 2.5, …
    /// - Nordic: 0.7, 1.5, 2.5, …
    /// - Imperiali: 1, 1.5, 2, …
    /// - Danish: 1/3, 4/3, 7/3, …
    /// - Huntington-Hill: ε, √2, √6, √12, …
    #[inline]
    pub fn divisor_at(self, k: u32) -> f64 {
        let k = f64::from(k);
        match self {
            DivisorRule::DHondt => k + 1.0,
            DivisorRule::SainteLague => k + 0.5,
            DivisorRule::Nordic => {
                if k == 0.0 { 0.7 } else { k + 0.5 }
            }
            DivisorRule::Imperiali => (k + 2.0) / 2.0,
            DivisorRule::Danish => k + 1.0 / 3.0,
            DivisorRule::HuntingtonHill => {
                if k == 0.0 { HUNTINGTON_HILL_FIRST } else { (k * (k + 1.0)).sqrt() }
            }
        }
    }

    /// Fresh cursor positioned before the first divisor.
    #[inline]
    pub fn cursor(self) -> DivisorCursor {
        DivisorCursor::new(self)
    }
}

impl fmt::Display for DivisorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for DivisorRule {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DivisorRule::ALL
            .into_iter()
            .find(|r| r.token() == s)
            .ok_or_else(|| CoreError::UnknownRule(s.to_owned()))
    }
}

/// Restartable cursor over a divisor sequence.
///
/// `drawn` counts values handed out so far; `peek` shows the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct DivisorCursor {
    rule: DivisorRule,
    drawn: u32,
}

impl DivisorCursor {
    #[inline]
    pub fn new(rule: DivisorRule) -> Self {
        Self { rule, drawn: 0 }
    }

    #[inline]
    pub fn rule(&self) -> DivisorRule {
        self.rule
    }

    #[inline]
    pub fn drawn(&self) -> u32 {
        self.drawn
    }

    /// Next value without consuming it.
    #[inline]
    pub fn peek(&self) -> f64 {
        self.rule.divisor_at(self.drawn)
    }

    /// Consume and return the next value.
    #[inline]
    pub fn advance(&mut self) -> f64 {
        let d = self.peek();
        self.drawn = self.drawn.saturating_add(1);
        d
    }

    /// Consume `n` values and return the last one (or `None` when `n == 0`).
    pub fn advance_by(&mut self, n: u32) -> Option<f64> {
        if n == 0 {
            return None;
        }
        self.drawn = self.drawn.saturating_add(n - 1);
        Some(self.advance())
    }
}

impl Iterator for DivisorCursor {
    type Item = f64;

    #[inline]
    fn next(&mut self) -> Option<f64> {
        Some(self.advance())
    }
}

/// Quota rules for largest-remainder sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuotaRule {
    #[serde(rename = "droop")]
    Droop,
    #[serde(rename = "hare")]
    Hare,
}

impl QuotaRule {
    pub const ALL: [QuotaRule; 2] = [QuotaRule::Droop, QuotaRule::Hare];

    pub fn token(self) -> &'static str {
        match self {
            QuotaRule::Droop => "droop",
            QuotaRule::Hare => "hare",
        }
    }

    /// Droop: votes/(seats+1); Hare: votes/seats (0 when seats == 0).
    #[inline]
    pub fn quota(self, votes: f64, seats: u32) -> f64 {
        match self {
            QuotaRule::Droop => votes / (f64::from(seats) + 1.0),
            QuotaRule::Hare => {
                if seats == 0 { 0.0 } else { votes / f64::from(seats) }
            }
        }
    }
}

impl FromStr for QuotaRule {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuotaRule::ALL
            .into_iter()
            .find(|r| r.token() == s)
            .ok_or_else(|| CoreError::UnknownRule(s.to_owned()))
    }
}

/// Either family, as configured for primary apportionment and seat-count determination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SeatRule {
    Divisor(DivisorRule),
    Quota(QuotaRule),
}

impl SeatRule {
    pub fn token(self) -> &'static str {
        match self {
            SeatRule::Divisor(d) => d.token(),
            SeatRule::Quota(q) => q.token(),
        }
    }

    pub fn as_divisor(self) -> Option<DivisorRule> {
        match self {
            SeatRule::Divisor(d) => Some(d),
            SeatRule::Quota(_) => None,
        }
    }
}

impl fmt::Display for SeatRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for SeatRule {
    type Err = CoreError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(d) = s.parse::<DivisorRule>() {
            return Ok(SeatRule::Divisor(d));
        }
        s.parse::<QuotaRule>()
            .map(SeatRule::Quota)
            .map_err(|_| CoreError::UnknownRule(s.to_owned()))
    }
}

impl TryFrom<String> for SeatRule {
    type Error = CoreError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatRule> for String {
    fn from(v: SeatRule) -> String {
        v.token().to_owned()
    }
}

impl From<DivisorRule> for SeatRule {
    fn from(d: DivisorRule) -> Self {
        SeatRule::Divisor(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn first(rule: DivisorRule, n: usize) -> Vec<f64> {
        rule.cursor().take(n).collect()
    }

    #[test]
    fn established_sequences() {
        assert_eq!(first(DivisorRule::DHondt, 4), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(first(DivisorRule::SainteLague, 3), vec![0.5, 1.5, 2.5]);
        assert_eq!(first(DivisorRule::Nordic, 3), vec![0.7, 1.5, 2.5]);
        assert_eq!(first(DivisorRule::Imperiali, 3), vec![1.0, 1.5, 2.0]);

        let danish = first(DivisorRule::Danish, 2);
        assert!((danish[0] - 0.3333333333).abs() < 1e-9);
        assert!((danish[1] - 1.3333333333).abs() < 1e-9);

        let hh = first(DivisorRule::HuntingtonHill, 4);
        assert!(hh[0] > 0.0 && hh[0] < 1e-9);
        assert!((hh[1] - 2f64.sqrt()).abs() < 1e-12);
        assert!((hh[2] - 6f64.sqrt()).abs() < 1e-12);
        assert!((hh[3] - 12f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn cursors_replay_identically() {
        for rule in DivisorRule::ALL {
            let mut a = rule.cursor();
            let mut b = rule.cursor();
            for _ in 0..7 {
                a.advance();
            }
            assert_eq!(b.advance_by(7), Some(rule.divisor_at(6)));
            assert_eq!(a.peek(), b.peek());
            assert_eq!(a.drawn(), 7);
        }
    }

    #[test]
    fn quotas_are_unrounded() {
        assert!((QuotaRule::Droop.quota(100.0, 3) - 25.0).abs() < 1e-12);
        assert!((QuotaRule::Hare.quota(100.0, 3) - 33.333333333333336).abs() < 1e-12);
        assert_eq!(QuotaRule::Hare.quota(100.0, 0), 0.0);
    }

    #[test]
    fn seat_rule_tokens() {
        assert_eq!("dhondt".parse::<SeatRule>().unwrap(), SeatRule::Divisor(DivisorRule::DHondt));
        assert_eq!("hare".parse::<SeatRule>().unwrap(), SeatRule::Quota(QuotaRule::Hare));
        assert!("borda".parse::<SeatRule>().is_err());
        for rule in DivisorRule::ALL {
            assert_eq!(rule.token().parse::<DivisorRule>().unwrap(), rule);
        }
    }

    proptest! {
        #[test]
        fn cursor_draws_follow_closed_form(idx in 0usize..DivisorRule::ALL.len(), k in 0u32..300) {
            let rule = DivisorRule::ALL[idx];
            let drawn = first(rule, k as usize + 1);
            prop_assert_eq!(drawn[k as usize], rule.divisor_at(k));
            prop_assert!(drawn.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
