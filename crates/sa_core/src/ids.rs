//! crates/sa_core/src/ids.rs
//! Display names for districts, parties and rulesets.
//! Unicode is allowed (district names are rarely ASCII); shapes are still strict:
//! 1..=64 chars, no control characters, no leading/trailing whitespace.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

const NAME_MAX_CHARS: usize = 64;

/// True if `s` is an acceptable display name.
#[inline]
pub fn is_valid_name(s: &str) -> bool {
    let n = s.chars().count();
    n > 0
        && n <= NAME_MAX_CHARS
        && s.trim() == s
        && !s.chars().any(char::is_control)
}

macro_rules! name_newtype {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            #[inline] pub fn as_str(&self) -> &str { &self.0 }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if is_valid_name(s) { Ok($name(s.to_owned())) } else { Err(CoreError::InvalidName(s.to_owned())) }
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;
            fn try_from(value: String) -> Result<Self, Self::Error> {
                if is_valid_name(&value) { Ok($name(value)) } else { Err(CoreError::InvalidName(value)) }
            }
        }

        impl TryFrom<&str> for $name {
            type Error = CoreError;
            #[inline]
            fn try_from(value: &str) -> Result<Self, Self::Error> { value.parse() }
        }

        impl From<$name> for String {
            #[inline]
            fn from(v: $name) -> String { v.0 }
        }
    }
}

name_newtype!(
    /// Constituency name as shown in reports.
    DistrictName
);
name_newtype!(
    /// Party (list) name as shown in reports.
    PartyName
);
name_newtype!(
    /// Ruleset label; unique within a simulation.
    RulesetName
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_accept_unicode() {
        for ok in ["Reykjavík norður", "A", "Suðurkjördæmi", "Party-1 (list)"] {
            assert!(is_valid_name(ok), "{ok}");
            let _d: DistrictName = ok.parse().unwrap();
        }
    }

    #[test]
    fn names_reject_bad_shapes() {
        for bad in ["", " padded", "tab\tinside", &"x".repeat(65)] {
            assert!(!is_valid_name(bad));
            assert!(bad.parse::<PartyName>().is_err());
        }
    }

    #[test]
    fn serde_validates_on_the_way_in() {
        let ok: PartyName = serde_json::from_str("\"D\"").unwrap();
        assert_eq!(ok.as_str(), "D");
        assert!(serde_json::from_str::<PartyName>("\"\"").is_err());
        assert_eq!(serde_json::to_string(&ok).unwrap(), "\"D\"");
    }
}
