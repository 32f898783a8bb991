// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # STC-S coordinate systems
//!
//! A coordinate system is `frame? refpos? flavor?`: three optional parts,
//! parsed positionally and greedily: each part consumes its token when it
//! matches, and is left at its default otherwise. The empty string is a
//! valid coordinate system made of the three defaults.
//!
//! One constraint applies: a Cartesian flavor only makes sense without a
//! celestial frame or reference position, so it requires both UNKNOWN
//! defaults.

use crate::error::{StcsError, StcsResult};
use crate::tokenizer::{Token, TokenKind, tokenize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coordinate frame
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Frame {
    Ecliptic,
    Fk4,
    Fk5,
    Galactic,
    Icrs,
    #[default]
    UnknownFrame,
}

/// Reference position
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RefPos {
    Barycenter,
    Geocenter,
    Heliocenter,
    Lsr,
    Topocenter,
    Relocatable,
    #[default]
    UnknownRefPos,
}

/// Coordinate flavor
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Flavor {
    Cartesian2,
    Cartesian3,
    #[default]
    Spherical2,
}

impl Flavor {
    pub fn is_cartesian(&self) -> bool {
        matches!(self, Flavor::Cartesian2 | Flavor::Cartesian3)
    }
}

/// A parsed coordinate system
///
/// # Examples
///
/// ```
/// use adql_check_stcs::{CoordSys, Frame, Flavor, RefPos};
///
/// let cs: CoordSys = "ICRS GEOCENTER".parse().unwrap();
/// assert_eq!(cs.frame, Frame::Icrs);
/// assert_eq!(cs.refpos, RefPos::Geocenter);
/// assert_eq!(cs.flavor, Flavor::Spherical2);
///
/// // All parts are optional
/// let empty: CoordSys = "".parse().unwrap();
/// assert!(empty.is_default());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoordSys {
    pub frame: Frame,
    pub refpos: RefPos,
    pub flavor: Flavor,
}

impl CoordSys {
    pub fn new(frame: Frame, refpos: RefPos, flavor: Flavor) -> Self {
        Self {
            frame,
            refpos,
            flavor,
        }
    }

    /// Whether all three parts are at their defaults
    pub fn is_default(&self) -> bool {
        *self == CoordSys::default()
    }

    /// Greedy positional parse over word tokens
    ///
    /// Returns the coordinate system and the number of consumed tokens, so
    /// the region parser can hand over a token window and carry on from
    /// where the coordinate system stopped.
    pub(crate) fn parse_tokens(tokens: &[Token]) -> StcsResult<(CoordSys, usize)> {
        let mut consumed = 0;
        let word_at = |i: usize| match tokens.get(i) {
            Some(Token {
                kind: TokenKind::Word(word),
                ..
            }) => Some(word.as_str()),
            _ => None,
        };

        let frame = match word_at(consumed).and_then(|w| Frame::from_str(w).ok()) {
            Some(frame) => {
                consumed += 1;
                frame
            }
            None => Frame::default(),
        };
        let refpos = match word_at(consumed).and_then(|w| RefPos::from_str(w).ok()) {
            Some(refpos) => {
                consumed += 1;
                refpos
            }
            None => RefPos::default(),
        };
        let (flavor, flavor_offset) = match word_at(consumed).and_then(|w| Flavor::from_str(w).ok())
        {
            Some(flavor) => {
                let offset = tokens[consumed].offset;
                consumed += 1;
                (flavor, Some(offset))
            }
            None => (Flavor::default(), None),
        };

        if flavor.is_cartesian()
            && (frame != Frame::UnknownFrame || refpos != RefPos::UnknownRefPos)
        {
            return Err(StcsError::IncompatibleFlavor {
                offset: flavor_offset.unwrap_or(0),
            });
        }

        Ok((
            CoordSys {
                frame,
                refpos,
                flavor,
            },
            consumed,
        ))
    }

    /// STC-S form with default parts elided
    pub fn to_stcs(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if self.frame != Frame::default() {
            parts.push(self.frame.to_string());
        }
        if self.refpos != RefPos::default() {
            parts.push(self.refpos.to_string());
        }
        if self.flavor != Flavor::default() {
            parts.push(self.flavor.to_string());
        }
        parts.join(" ")
    }

    /// Fully spelled-out form, `FRAME REFPOS FLAVOR`
    ///
    /// This is the normalized text the allowed-pattern regex matches, and
    /// what diagnostics print next to the literal the user wrote.
    pub fn to_full_stcs(&self) -> String {
        format!("{} {} {}", self.frame, self.refpos, self.flavor)
    }
}

impl FromStr for CoordSys {
    type Err = StcsError;

    fn from_str(input: &str) -> StcsResult<Self> {
        let tokens = tokenize(input)?;
        let (coord_sys, consumed) = CoordSys::parse_tokens(&tokens)?;
        if let Some(extra) = tokens.get(consumed) {
            return Err(StcsError::UnexpectedToken {
                expected: "end of coordinate system".to_string(),
                found: extra.describe(),
                offset: extra.offset,
            });
        }
        Ok(coord_sys)
    }
}

impl fmt::Display for CoordSys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_stcs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_default() {
        let cs: CoordSys = "".parse().unwrap();
        assert!(cs.is_default());
        assert_eq!(cs.to_stcs(), "");
        assert_eq!(cs.to_full_stcs(), "UNKNOWNFRAME UNKNOWNREFPOS SPHERICAL2");
    }

    #[test]
    fn test_all_three_parts() {
        let cs: CoordSys = "FK5 GEOCENTER SPHERICAL2".parse().unwrap();
        assert_eq!(cs.frame, Frame::Fk5);
        assert_eq!(cs.refpos, RefPos::Geocenter);
        assert_eq!(cs.flavor, Flavor::Spherical2);
    }

    #[test]
    fn test_parts_optional_in_any_combination() {
        let cs: CoordSys = "GEOCENTER".parse().unwrap();
        assert_eq!(cs.frame, Frame::UnknownFrame);
        assert_eq!(cs.refpos, RefPos::Geocenter);

        let cs: CoordSys = "ICRS SPHERICAL2".parse().unwrap();
        assert_eq!(cs.frame, Frame::Icrs);
        assert_eq!(cs.refpos, RefPos::UnknownRefPos);
        assert_eq!(cs.flavor, Flavor::Spherical2);
    }

    #[test]
    fn test_case_insensitive_keywords() {
        let cs: CoordSys = "icrs Geocenter".parse().unwrap();
        assert_eq!(cs.frame, Frame::Icrs);
        assert_eq!(cs.refpos, RefPos::Geocenter);
    }

    #[test]
    fn test_positional_not_reordered() {
        // A flavor cannot come before a frame
        let err = "SPHERICAL2 ICRS".parse::<CoordSys>().unwrap_err();
        assert!(matches!(err, StcsError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_cartesian_requires_unknown_frame_and_refpos() {
        let cs: CoordSys = "CARTESIAN2".parse().unwrap();
        assert_eq!(cs.flavor, Flavor::Cartesian2);

        let err = "ICRS CARTESIAN3".parse::<CoordSys>().unwrap_err();
        assert!(matches!(err, StcsError::IncompatibleFlavor { .. }));

        let err = "GEOCENTER CARTESIAN2".parse::<CoordSys>().unwrap_err();
        assert!(matches!(err, StcsError::IncompatibleFlavor { .. }));
    }

    #[test]
    fn test_unknown_word_rejected() {
        let err = "EQUATORIAL".parse::<CoordSys>().unwrap_err();
        assert!(matches!(err, StcsError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_stcs_roundtrip_elides_defaults() {
        let cs: CoordSys = "ICRS".parse().unwrap();
        assert_eq!(cs.to_stcs(), "ICRS");
        let back: CoordSys = cs.to_stcs().parse().unwrap();
        assert_eq!(back, cs);
    }
}
