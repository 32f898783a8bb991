// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Allowed coordinate systems
//!
//! A service may restrict the coordinate systems accepted inside geometry
//! literals with patterns of the form `"framePart refposPart flavorPart"`,
//! where each part is a literal value, `*` (any value) or an explicit set
//! `(v1|v2|…)`.
//!
//! All patterns compile into a single anchored regex matched against the
//! fully spelled-out form of a parsed coordinate system. The default value
//! of each part is always added to its set, so the empty coordinate system
//! (all defaults) validates against any pattern list, including the empty
//! list, which admits nothing but the defaults.

use crate::coordsys::{CoordSys, Flavor, Frame, RefPos};
use crate::error::{StcsError, StcsResult};
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;

/// Compiled restriction over coordinate systems
///
/// # Examples
///
/// ```
/// use adql_check_stcs::{CoordSys, CoordSysRestriction};
///
/// let restriction = CoordSysRestriction::compile(&["(ICRS|FK5) * *"]).unwrap();
///
/// let icrs: CoordSys = "ICRS GEOCENTER".parse().unwrap();
/// assert!(restriction.allows(&icrs));
///
/// let galactic: CoordSys = "GALACTIC".parse().unwrap();
/// assert!(!restriction.allows(&galactic));
///
/// // Defaults are always reachable
/// assert!(restriction.allows(&"".parse().unwrap()));
/// ```
#[derive(Debug, Clone)]
pub struct CoordSysRestriction {
    regex: Regex,
    patterns: Vec<String>,
}

/// Expand one pattern part into the set of uppercased values it denotes
///
/// `parse` validates a single value against the part's keyword enum;
/// `all` enumerates the whole keyword set for `*`.
fn expand_part<T: fmt::Display>(
    pattern: &str,
    part: &str,
    default: T,
    all: &[T],
    parse: impl Fn(&str) -> Option<T>,
) -> StcsResult<Vec<String>> {
    let mut values: Vec<String> = vec![default.to_string()];
    let mut add = |value: String| {
        if !values.contains(&value) {
            values.push(value);
        }
    };

    if part == "*" {
        for value in all {
            add(value.to_string());
        }
    } else if let Some(inner) = part.strip_prefix('(').and_then(|p| p.strip_suffix(')')) {
        for candidate in inner.split('|') {
            match parse(candidate.trim()) {
                Some(value) => add(value.to_string()),
                None => {
                    return Err(StcsError::InvalidPattern {
                        pattern: pattern.to_string(),
                        reason: format!("unknown value {:?}", candidate.trim()),
                    });
                }
            }
        }
    } else {
        match parse(part) {
            Some(value) => add(value.to_string()),
            None => {
                return Err(StcsError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: format!("unknown value {part:?}"),
                });
            }
        }
    }

    Ok(values)
}

impl CoordSysRestriction {
    /// Compile a pattern list into one regex
    ///
    /// An empty list admits only the all-defaults coordinate system.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> StcsResult<Self> {
        let mut alternatives: Vec<String> = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let parts: Vec<&str> = pattern.split_whitespace().collect();
            if parts.len() != 3 {
                return Err(StcsError::InvalidPattern {
                    pattern: pattern.to_string(),
                    reason: "expected three parts: frame, refpos, flavor".to_string(),
                });
            }

            let frames = expand_part(pattern, parts[0], Frame::default(), &Frame::iter().collect::<Vec<_>>(), |v| {
                Frame::from_str(v).ok()
            })?;
            let refpos = expand_part(pattern, parts[1], RefPos::default(), &RefPos::iter().collect::<Vec<_>>(), |v| {
                RefPos::from_str(v).ok()
            })?;
            let flavors = expand_part(pattern, parts[2], Flavor::default(), &Flavor::iter().collect::<Vec<_>>(), |v| {
                Flavor::from_str(v).ok()
            })?;

            alternatives.push(format!(
                "(?:{}) (?:{}) (?:{})",
                frames.join("|"),
                refpos.join("|"),
                flavors.join("|")
            ));
        }

        if alternatives.is_empty() {
            // Only the defaults remain reachable
            alternatives.push(format!(
                "{} {} {}",
                Frame::default(),
                RefPos::default(),
                Flavor::default()
            ));
        }

        let source = format!("^(?:{})$", alternatives.join("|"));
        let regex = Regex::new(&source).map_err(|e| StcsError::InvalidPattern {
            pattern: source.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            regex,
            patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
        })
    }

    /// Whether the parsed coordinate system is admitted
    pub fn allows(&self, coord_sys: &CoordSys) -> bool {
        self.regex.is_match(&coord_sys.to_full_stcs())
    }

    /// The original pattern texts, for diagnostics
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parse(text: &str) -> CoordSys {
        text.parse().unwrap()
    }

    #[test]
    fn test_literal_pattern() {
        let restriction = CoordSysRestriction::compile(&["ICRS GEOCENTER SPHERICAL2"]).unwrap();
        assert!(restriction.allows(&parse("ICRS GEOCENTER")));
        assert!(!restriction.allows(&parse("ICRS BARYCENTER")));
    }

    #[test]
    fn test_wildcard_parts() {
        let restriction = CoordSysRestriction::compile(&["(ICRS|FK5) * *"]).unwrap();
        assert!(restriction.allows(&parse("ICRS TOPOCENTER")));
        assert!(restriction.allows(&parse("FK5")));
        assert!(!restriction.allows(&parse("GALACTIC")));
    }

    #[test]
    fn test_defaults_always_reachable() {
        let restriction = CoordSysRestriction::compile(&["ICRS GEOCENTER SPHERICAL2"]).unwrap();
        // The empty coordinate system (all defaults) always validates
        assert!(restriction.allows(&parse("")));
        // So do partial defaults of an allowed pattern
        assert!(restriction.allows(&parse("ICRS")));
    }

    #[test]
    fn test_empty_list_admits_only_defaults() {
        let restriction = CoordSysRestriction::compile::<&str>(&[]).unwrap();
        assert!(restriction.allows(&parse("")));
        assert!(!restriction.allows(&parse("ICRS")));
    }

    #[test]
    fn test_invalid_value_rejected() {
        let err = CoordSysRestriction::compile(&["EQUATORIAL * *"]).unwrap_err();
        assert!(matches!(err, StcsError::InvalidPattern { .. }));
    }

    #[test]
    fn test_wrong_arity_rejected() {
        let err = CoordSysRestriction::compile(&["ICRS"]).unwrap_err();
        assert!(matches!(err, StcsError::InvalidPattern { .. }));
    }

    fn arb_frame() -> impl Strategy<Value = Frame> {
        prop::sample::select(Frame::iter().collect::<Vec<_>>())
    }

    fn arb_refpos() -> impl Strategy<Value = RefPos> {
        prop::sample::select(RefPos::iter().collect::<Vec<_>>())
    }

    proptest! {
        /// Anything the wildcard restriction admits also parses back to the
        /// same coordinate system.
        #[test]
        fn prop_accepted_implies_parseable(frame in arb_frame(), refpos in arb_refpos()) {
            let restriction = CoordSysRestriction::compile(&["* * *"]).unwrap();
            let cs = CoordSys::new(frame, refpos, Flavor::Spherical2);
            prop_assert!(restriction.allows(&cs));
            let reparsed: CoordSys = cs.to_stcs().parse().unwrap();
            prop_assert_eq!(reparsed, cs);
        }
    }
}
