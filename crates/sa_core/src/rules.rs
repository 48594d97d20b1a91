//! rules.rs: Ruleset configuration.
//!
//! A `Rules` value is validated once, on construction, and is immutable afterwards.
//! Wire shape is `RulesSpec` (plain serde struct); `Rules` deserializes through it.
//! Variants ("all seats become adjustment seats", a different method, …) are built
//! with `with_*` methods that return a new, re-validated value.

use core::fmt;

use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};

use crate::divisors::{DivisorRule, SeatRule};
use crate::ids::RulesetName;

/// ------------ Macros ------------

/// Define a serde'd enum with explicit wire tokens, plus `token()`/`ALL`/`FromStr`.
macro_rules! serde_enum {
    ($(#[$m:meta])* $name:ident => { $($variant:ident = $token:expr),+ $(,)? }) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $token)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn token(self) -> &'static str {
                match self {
                    $($name::$variant => $token,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.token()) }
        }

        impl core::str::FromStr for $name {
            type Err = String;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.token() == s)
                    .ok_or_else(|| format!("expected one of {:?}, got {s:?}",
                        $name::ALL.iter().map(|v| v.token()).collect::<Vec<_>>()))
            }
        }
    };
}

/// ------------ Canonical enums (wire tokens explicit) ------------

serde_enum!(
    /// Adjustment-seat allocation algorithm.
    AdjustmentMethod => {
    AlternatingScaling        = "alternating-scaling",
    VarAltScal                = "var-alt-scal",
    IcelandicLaw              = "icelandic-law",
    IcelandicShareLaw         = "icelandic-share-law",
    NorwegianLaw              = "norwegian-law",
    NorwegianIcelandic        = "norwegian-icelandic",
    Monge                     = "monge",
    RelativeSuperiority       = "relative-superiority",
    RelativeSuperioritySimple = "relative-superiority-simple",
    RelativeInferiority       = "relative-inferiority",
    NearestNeighbor           = "nearest-neighbor",
    Switching                 = "switching",
    PureVoteRatios            = "pure-vote-ratios",
    OptEntropy                = "opt-entropy",
});

serde_enum!(
    /// How district seat records are reinterpreted before a run.
    SeatSpecOption => {
    Refer    = "refer",
    AllAdj   = "all-adj",
    AllConst = "all-const",
    OneConst = "one-const",
    Custom   = "custom",
});

/// ------------ Newtypes with invariants (validated on de/ser) ------------

/// Percentage in `0.0..=100.0`, finite.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Default)]
pub struct Pct(f64);

impl Pct {
    pub fn new(v: f64) -> Result<Self, String> {
        if v.is_finite() && (0.0..=100.0).contains(&v) {
            Ok(Self(v))
        } else {
            Err(format!("pct out of range: {v}"))
        }
    }
    pub fn get(self) -> f64 { self.0 }
}

impl<'de> Deserialize<'de> for Pct {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = f64::deserialize(d)?;
        Pct::new(v).map_err(|_| D::Error::invalid_value(Unexpected::Float(v), &"0..=100"))
    }
}

/// Seats of one district.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSpec {
    pub constituency_seats: u32,
    pub adjustment_seats: u32,
}

impl SeatSpec {
    #[inline]
    pub fn total(self) -> u32 {
        self.constituency_seats + self.adjustment_seats
    }
}

/// ------------ Errors ------------

#[derive(Debug, Clone, PartialEq)]
pub enum RulesError {
    /// A key's value violates its domain (enumeration, range, list shape).
    Domain { key: &'static str, msg: String },
    /// Cross-field inconsistency.
    Consistency(String),
    /// `with_setting` was given a key the ruleset does not have.
    UnknownKey(String),
}

impl fmt::Display for RulesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulesError::Domain { key, msg } => write!(f, "rules.{key}: {msg}"),
            RulesError::Consistency(m) => write!(f, "rules: {m}"),
            RulesError::UnknownKey(k) => write!(f, "rules: unknown key {k:?}"),
        }
    }
}

impl std::error::Error for RulesError {}

pub type RulesResult<T> = Result<T, RulesError>;

/// ------------ Wire shape ------------

fn default_divider() -> SeatRule { SeatRule::Divisor(DivisorRule::DHondt) }
fn default_alloc_divider() -> DivisorRule { DivisorRule::DHondt }
fn default_adjustment_threshold() -> Pct { Pct(5.0) }
fn default_method() -> AdjustmentMethod { AdjustmentMethod::IcelandicLaw }
fn default_seat_spec() -> SeatSpecOption { SeatSpecOption::Refer }

/// Unvalidated ruleset as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RulesSpec {
    pub name: RulesetName,
    #[serde(default = "default_divider")]
    pub primary_divider: SeatRule,
    #[serde(default = "default_divider")]
    pub adj_determine_divider: SeatRule,
    #[serde(default = "default_alloc_divider")]
    pub adj_alloc_divider: DivisorRule,
    #[serde(default)]
    pub constituency_threshold: Pct,
    #[serde(default = "default_adjustment_threshold")]
    pub adjustment_threshold: Pct,
    #[serde(default = "default_method")]
    pub adjustment_method: AdjustmentMethod,
    #[serde(default = "default_seat_spec")]
    pub seat_spec_option: SeatSpecOption,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_seats: Vec<SeatSpec>,
    #[serde(default)]
    pub tie_seed: u64,
}

/// ------------ Validated ruleset ------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RulesSpec", into = "RulesSpec")]
pub struct Rules {
    spec: RulesSpec,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            spec: RulesSpec {
                name: RulesetName::try_from("default").expect("static name is valid"),
                primary_divider: default_divider(),
                adj_determine_divider: default_divider(),
                adj_alloc_divider: default_alloc_divider(),
                constituency_threshold: Pct(0.0),
                adjustment_threshold: default_adjustment_threshold(),
                adjustment_method: default_method(),
                seat_spec_option: default_seat_spec(),
                custom_seats: Vec::new(),
                tie_seed: 0,
            },
        }
    }
}

impl TryFrom<RulesSpec> for Rules {
    type Error = RulesError;
    fn try_from(spec: RulesSpec) -> Result<Self, Self::Error> {
        Rules::new(spec)
    }
}

impl From<Rules> for RulesSpec {
    fn from(r: Rules) -> Self {
        r.spec
    }
}

impl Rules {
    /// Validate and freeze.
    pub fn new(spec: RulesSpec) -> RulesResult<Self> {
        validate_spec(&spec)?;
        Ok(Self { spec })
    }

    pub fn name(&self) -> &RulesetName { &self.spec.name }
    pub fn primary_divider(&self) -> SeatRule { self.spec.primary_divider }
    pub fn adj_determine_divider(&self) -> SeatRule { self.spec.adj_determine_divider }
    pub fn adj_alloc_divider(&self) -> DivisorRule { self.spec.adj_alloc_divider }
    pub fn constituency_threshold(&self) -> f64 { self.spec.constituency_threshold.get() }
    pub fn adjustment_threshold(&self) -> f64 { self.spec.adjustment_threshold.get() }
    pub fn adjustment_method(&self) -> AdjustmentMethod { self.spec.adjustment_method }
    pub fn seat_spec_option(&self) -> SeatSpecOption { self.spec.seat_spec_option }
    pub fn custom_seats(&self) -> &[SeatSpec] { &self.spec.custom_seats }
    pub fn tie_seed(&self) -> u64 { self.spec.tie_seed }
    pub fn spec(&self) -> &RulesSpec { &self.spec }

    fn rebuild(&self, f: impl FnOnce(&mut RulesSpec)) -> RulesResult<Self> {
        let mut spec = self.spec.clone();
        f(&mut spec);
        Rules::new(spec)
    }

    /// Same rules under another name.
    pub fn with_name(&self, name: RulesetName) -> Self {
        let mut spec = self.spec.clone();
        spec.name = name;
        Self { spec }
    }

    /// Same rules with another adjustment method.
    pub fn with_method(&self, method: AdjustmentMethod) -> Self {
        let mut spec = self.spec.clone();
        spec.adjustment_method = method;
        Self { spec }
    }

    /// Same rules with another seat-spec interpretation.
    /// `Custom` is rejected here (it needs a seat list; use `with_setting`).
    pub fn with_seat_spec(&self, option: SeatSpecOption) -> RulesResult<Self> {
        self.rebuild(|s| s.seat_spec_option = option)
    }

    /// Assign one key from its textual form; the result is re-validated.
    ///
    /// `custom_seats` takes a list `"c+a,c+a,…"` (constituency+adjustment per district).
    pub fn with_setting(&self, key: &str, value: &str) -> RulesResult<Self> {
        let value = value.trim();
        let mut spec = self.spec.clone();
        match key {
            "name" => {
                spec.name = value.parse().map_err(|e| domain("name", e))?;
            }
            "primary_divider" => {
                spec.primary_divider = value.parse().map_err(|e| domain("primary_divider", e))?;
            }
            "adj_determine_divider" => {
                spec.adj_determine_divider =
                    value.parse().map_err(|e| domain("adj_determine_divider", e))?;
            }
            "adj_alloc_divider" => {
                spec.adj_alloc_divider =
                    value.parse().map_err(|e| domain("adj_alloc_divider", e))?;
            }
            "constituency_threshold" => {
                spec.constituency_threshold = parse_pct("constituency_threshold", value)?;
            }
            "adjustment_threshold" => {
                spec.adjustment_threshold = parse_pct("adjustment_threshold", value)?;
            }
            "adjustment_method" => {
                spec.adjustment_method =
                    value.parse().map_err(|e| domain("adjustment_method", e))?;
            }
            "seat_spec_option" => {
                spec.seat_spec_option = value.parse().map_err(|e| domain("seat_spec_option", e))?;
            }
            "custom_seats" => {
                spec.custom_seats = parse_seat_list(value)?;
            }
            "tie_seed" => {
                spec.tie_seed = value
                    .parse()
                    .map_err(|_| domain("tie_seed", format!("not a u64: {value:?}")))?;
            }
            other => return Err(RulesError::UnknownKey(other.to_owned())),
        }
        Rules::new(spec)
    }

    /// Reinterpret district seat records according to `seat_spec_option`.
    ///
    /// `OneConst` collapses everything into a single record; the caller is
    /// responsible for merging vote rows accordingly.
    pub fn apply_seat_spec(&self, seats: &[SeatSpec]) -> RulesResult<Vec<SeatSpec>> {
        let out = match self.spec.seat_spec_option {
            SeatSpecOption::Refer => seats.to_vec(),
            SeatSpecOption::AllAdj => seats
                .iter()
                .map(|s| SeatSpec { constituency_seats: 0, adjustment_seats: s.total() })
                .collect(),
            SeatSpecOption::AllConst => seats
                .iter()
                .map(|s| SeatSpec { constituency_seats: s.total(), adjustment_seats: 0 })
                .collect(),
            SeatSpecOption::OneConst => vec![SeatSpec {
                constituency_seats: seats.iter().map(|s| s.constituency_seats).sum(),
                adjustment_seats: seats.iter().map(|s| s.adjustment_seats).sum(),
            }],
            SeatSpecOption::Custom => {
                if self.spec.custom_seats.len() != seats.len() {
                    return Err(RulesError::Consistency(format!(
                        "custom_seats has {} entries for {} districts",
                        self.spec.custom_seats.len(),
                        seats.len()
                    )));
                }
                self.spec.custom_seats.clone()
            }
        };
        Ok(out)
    }
}

/// ------------ Validation (domain + cross-field consistency) ------------

fn domain(key: &'static str, msg: impl ToString) -> RulesError {
    RulesError::Domain { key, msg: msg.to_string() }
}

fn parse_pct(key: &'static str, value: &str) -> RulesResult<Pct> {
    let v: f64 = value.parse().map_err(|_| domain(key, format!("not a number: {value:?}")))?;
    Pct::new(v).map_err(|e| domain(key, e))
}

fn parse_seat_list(value: &str) -> RulesResult<Vec<SeatSpec>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|item| {
            let (c, a) = item
                .trim()
                .split_once('+')
                .ok_or_else(|| domain("custom_seats", format!("expected c+a, got {item:?}")))?;
            let constituency_seats = c
                .trim()
                .parse()
                .map_err(|_| domain("custom_seats", format!("bad seat count {c:?}")))?;
            let adjustment_seats = a
                .trim()
                .parse()
                .map_err(|_| domain("custom_seats", format!("bad seat count {a:?}")))?;
            Ok(SeatSpec { constituency_seats, adjustment_seats })
        })
        .collect()
}

fn validate_spec(spec: &RulesSpec) -> RulesResult<()> {
    // Pct already enforces ranges; re-check for values built in code.
    for (key, p) in [
        ("constituency_threshold", spec.constituency_threshold),
        ("adjustment_threshold", spec.adjustment_threshold),
    ] {
        Pct::new(p.get()).map_err(|e| domain(key, e))?;
    }

    match spec.seat_spec_option {
        SeatSpecOption::Custom => {
            if spec.custom_seats.is_empty() {
                return Err(domain("custom_seats", "must be a non-empty list when seat_spec_option is 'custom'"));
            }
            if let Some(i) = spec.custom_seats.iter().position(|s| s.total() == 0) {
                return Err(domain("custom_seats", format!("entry {i} has no seats")));
            }
        }
        // custom_seats is kept but ignored under the other options
        _ => {}
    }
    Ok(())
}
