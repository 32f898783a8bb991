// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # STC-S regions
//!
//! Recursive-descent parser and serializer for the STC-S region subset:
//!
//! ```text
//! region   := POSITION      coordSys numeric numeric
//!           | CIRCLE        coordSys numeric numeric numeric
//!           | BOX           coordSys numeric numeric numeric numeric
//!           | POLYGON       coordSys numeric numeric (numeric numeric)+
//!           | UNION         coordSys "(" region region region* ")"
//!           | INTERSECTION  coordSys "(" region region region* ")"
//!           | NOT                    "(" region ")"
//! ```
//!
//! Keywords are case-insensitive; a polygon needs at least three vertices.
//! UNION and INTERSECTION accept a coordinate system of their own but inner
//! regions may carry their own as well; the outer one is kept as parsed and
//! simply ignored when inner regions define theirs.
//!
//! On failure the parser reports the character offset of the first offending
//! token and what it expected instead.

use crate::coordsys::CoordSys;
use crate::error::{StcsError, StcsResult};
use crate::tokenizer::{Token, TokenKind, tokenize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Region keywords
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum RegionKind {
    Position,
    Circle,
    Box,
    Polygon,
    Union,
    Intersection,
    Not,
}

/// A parsed STC-S region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Region {
    /// Single position
    Position { coord_sys: CoordSys, x: f64, y: f64 },

    /// Circle around a center
    Circle {
        coord_sys: CoordSys,
        x: f64,
        y: f64,
        radius: f64,
    },

    /// Axis-aligned box around a center
    Box {
        coord_sys: CoordSys,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },

    /// Polygon with at least three vertices
    Polygon {
        coord_sys: CoordSys,
        vertices: Vec<(f64, f64)>,
    },

    /// Union of at least two regions
    Union {
        coord_sys: CoordSys,
        regions: Vec<Region>,
    },

    /// Intersection of at least two regions
    Intersection {
        coord_sys: CoordSys,
        regions: Vec<Region>,
    },

    /// Complement of a region
    Not { region: std::boxed::Box<Region> },
}

impl Region {
    /// The keyword this region was built from
    pub fn kind(&self) -> RegionKind {
        match self {
            Region::Position { .. } => RegionKind::Position,
            Region::Circle { .. } => RegionKind::Circle,
            Region::Box { .. } => RegionKind::Box,
            Region::Polygon { .. } => RegionKind::Polygon,
            Region::Union { .. } => RegionKind::Union,
            Region::Intersection { .. } => RegionKind::Intersection,
            Region::Not { .. } => RegionKind::Not,
        }
    }

    /// This region's own coordinate system; NOT has none
    pub fn coord_sys(&self) -> Option<&CoordSys> {
        match self {
            Region::Position { coord_sys, .. }
            | Region::Circle { coord_sys, .. }
            | Region::Box { coord_sys, .. }
            | Region::Polygon { coord_sys, .. }
            | Region::Union { coord_sys, .. }
            | Region::Intersection { coord_sys, .. } => Some(coord_sys),
            Region::Not { .. } => None,
        }
    }

    /// Directly nested regions, for UNION / INTERSECTION / NOT
    pub fn inner_regions(&self) -> &[Region] {
        match self {
            Region::Union { regions, .. } | Region::Intersection { regions, .. } => regions,
            Region::Not { region } => std::slice::from_ref(region.as_ref()),
            _ => &[],
        }
    }

    /// STC-S form with default coordinate-system parts elided
    pub fn to_stcs(&self) -> String {
        fn push_coord_sys(out: &mut String, coord_sys: &CoordSys) {
            let cs = coord_sys.to_stcs();
            if !cs.is_empty() {
                out.push_str(&cs);
                out.push(' ');
            }
        }

        let mut out = String::new();
        match self {
            Region::Position { coord_sys, x, y } => {
                out.push_str("POSITION ");
                push_coord_sys(&mut out, coord_sys);
                out.push_str(&format!("{x} {y}"));
            }
            Region::Circle {
                coord_sys,
                x,
                y,
                radius,
            } => {
                out.push_str("CIRCLE ");
                push_coord_sys(&mut out, coord_sys);
                out.push_str(&format!("{x} {y} {radius}"));
            }
            Region::Box {
                coord_sys,
                x,
                y,
                width,
                height,
            } => {
                out.push_str("BOX ");
                push_coord_sys(&mut out, coord_sys);
                out.push_str(&format!("{x} {y} {width} {height}"));
            }
            Region::Polygon {
                coord_sys,
                vertices,
            } => {
                out.push_str("POLYGON ");
                push_coord_sys(&mut out, coord_sys);
                let coords: Vec<String> = vertices
                    .iter()
                    .map(|(x, y)| format!("{x} {y}"))
                    .collect();
                out.push_str(&coords.join(" "));
            }
            Region::Union { coord_sys, regions }
            | Region::Intersection { coord_sys, regions } => {
                out.push_str(if matches!(self, Region::Union { .. }) {
                    "UNION "
                } else {
                    "INTERSECTION "
                });
                push_coord_sys(&mut out, coord_sys);
                out.push('(');
                let parts: Vec<String> = regions.iter().map(Region::to_stcs).collect();
                out.push_str(&parts.join(" "));
                out.push(')');
            }
            Region::Not { region } => {
                out.push_str("NOT (");
                out.push_str(&region.to_stcs());
                out.push(')');
            }
        }
        out
    }
}

impl FromStr for Region {
    type Err = StcsError;

    fn from_str(input: &str) -> StcsResult<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            tokens: &tokens,
            cursor: 0,
            input_len: input.chars().count(),
        };
        let region = parser.parse_region()?;
        if let Some(extra) = parser.peek() {
            return Err(StcsError::UnexpectedToken {
                expected: "end of region".to_string(),
                found: extra.describe(),
                offset: extra.offset,
            });
        }
        Ok(region)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_stcs())
    }
}

struct Parser<'a> {
    tokens: &'a [Token],
    cursor: usize,
    input_len: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.cursor)
    }

    fn end_offset(&self) -> usize {
        self.input_len
    }

    fn expect_number(&mut self, what: &str) -> StcsResult<f64> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::Number(value),
                ..
            }) => {
                self.cursor += 1;
                Ok(*value)
            }
            Some(token) => Err(StcsError::UnexpectedToken {
                expected: what.to_string(),
                found: token.describe(),
                offset: token.offset,
            }),
            None => Err(StcsError::UnexpectedEnd {
                expected: what.to_string(),
                offset: self.end_offset(),
            }),
        }
    }

    fn expect_lparen(&mut self) -> StcsResult<()> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::LParen,
                ..
            }) => {
                self.cursor += 1;
                Ok(())
            }
            Some(token) => Err(StcsError::UnexpectedToken {
                expected: "an opening parenthesis".to_string(),
                found: token.describe(),
                offset: token.offset,
            }),
            None => Err(StcsError::UnexpectedEnd {
                expected: "an opening parenthesis".to_string(),
                offset: self.end_offset(),
            }),
        }
    }

    fn expect_rparen(&mut self) -> StcsResult<()> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::RParen,
                ..
            }) => {
                self.cursor += 1;
                Ok(())
            }
            Some(token) => Err(StcsError::UnexpectedToken {
                expected: "a closing parenthesis".to_string(),
                found: token.describe(),
                offset: token.offset,
            }),
            None => Err(StcsError::UnexpectedEnd {
                expected: "a closing parenthesis".to_string(),
                offset: self.end_offset(),
            }),
        }
    }

    fn parse_coord_sys(&mut self) -> StcsResult<CoordSys> {
        let (coord_sys, consumed) = CoordSys::parse_tokens(&self.tokens[self.cursor..])?;
        self.cursor += consumed;
        Ok(coord_sys)
    }

    fn parse_region(&mut self) -> StcsResult<Region> {
        let token = match self.peek() {
            Some(token) => token,
            None => {
                return Err(StcsError::UnexpectedEnd {
                    expected: "a region keyword".to_string(),
                    offset: self.end_offset(),
                });
            }
        };
        let kind = match &token.kind {
            TokenKind::Word(word) => match RegionKind::from_str(word) {
                Ok(kind) => kind,
                Err(_) => {
                    return Err(StcsError::UnexpectedToken {
                        expected: "a region keyword".to_string(),
                        found: token.describe(),
                        offset: token.offset,
                    });
                }
            },
            _ => {
                return Err(StcsError::UnexpectedToken {
                    expected: "a region keyword".to_string(),
                    found: token.describe(),
                    offset: token.offset,
                });
            }
        };
        self.cursor += 1;

        match kind {
            RegionKind::Position => {
                let coord_sys = self.parse_coord_sys()?;
                let x = self.expect_number("a coordinate value")?;
                let y = self.expect_number("a coordinate value")?;
                Ok(Region::Position { coord_sys, x, y })
            }
            RegionKind::Circle => {
                let coord_sys = self.parse_coord_sys()?;
                let x = self.expect_number("a coordinate value")?;
                let y = self.expect_number("a coordinate value")?;
                let radius = self.expect_number("a radius value")?;
                Ok(Region::Circle {
                    coord_sys,
                    x,
                    y,
                    radius,
                })
            }
            RegionKind::Box => {
                let coord_sys = self.parse_coord_sys()?;
                let x = self.expect_number("a coordinate value")?;
                let y = self.expect_number("a coordinate value")?;
                let width = self.expect_number("a width value")?;
                let height = self.expect_number("a height value")?;
                Ok(Region::Box {
                    coord_sys,
                    x,
                    y,
                    width,
                    height,
                })
            }
            RegionKind::Polygon => {
                let coord_sys = self.parse_coord_sys()?;
                let mut coordinates = vec![self.expect_number("a coordinate value")?];
                while matches!(
                    self.peek(),
                    Some(Token {
                        kind: TokenKind::Number(_),
                        ..
                    })
                ) {
                    coordinates.push(self.expect_number("a coordinate value")?);
                }
                if coordinates.len() % 2 != 0 {
                    return Err(StcsError::UnexpectedEnd {
                        expected: "a coordinate value".to_string(),
                        offset: self
                            .peek()
                            .map(|t| t.offset)
                            .unwrap_or_else(|| self.end_offset()),
                    });
                }
                if coordinates.len() < 6 {
                    return Err(StcsError::UnexpectedEnd {
                        expected: "at least 3 polygon vertices".to_string(),
                        offset: self
                            .peek()
                            .map(|t| t.offset)
                            .unwrap_or_else(|| self.end_offset()),
                    });
                }
                let vertices = coordinates
                    .chunks_exact(2)
                    .map(|pair| (pair[0], pair[1]))
                    .collect();
                Ok(Region::Polygon {
                    coord_sys,
                    vertices,
                })
            }
            RegionKind::Union | RegionKind::Intersection => {
                let coord_sys = self.parse_coord_sys()?;
                self.expect_lparen()?;
                let mut regions = vec![self.parse_region()?, self.parse_region()?];
                while !matches!(
                    self.peek(),
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) | None
                ) {
                    regions.push(self.parse_region()?);
                }
                self.expect_rparen()?;
                if kind == RegionKind::Union {
                    Ok(Region::Union { coord_sys, regions })
                } else {
                    Ok(Region::Intersection { coord_sys, regions })
                }
            }
            RegionKind::Not => {
                self.expect_lparen()?;
                let region = std::boxed::Box::new(self.parse_region()?);
                self.expect_rparen()?;
                Ok(Region::Not { region })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordsys::{Flavor, Frame, RefPos};
    use proptest::prelude::*;

    #[test]
    fn test_parse_position() {
        let region: Region = "POSITION ICRS 12.5 -45".parse().unwrap();
        match region {
            Region::Position { coord_sys, x, y } => {
                assert_eq!(coord_sys.frame, Frame::Icrs);
                assert_eq!(x, 12.5);
                assert_eq!(y, -45.0);
            }
            other => panic!("expected a position, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_circle_without_coord_sys() {
        let region: Region = "Circle 1 2 0.5".parse().unwrap();
        match region {
            Region::Circle {
                coord_sys, radius, ..
            } => {
                assert!(coord_sys.is_default());
                assert_eq!(radius, 0.5);
            }
            other => panic!("expected a circle, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_box() {
        let region: Region = "BOX GALACTIC GEOCENTER 10 20 2 4".parse().unwrap();
        match region {
            Region::Box {
                coord_sys,
                width,
                height,
                ..
            } => {
                assert_eq!(coord_sys.frame, Frame::Galactic);
                assert_eq!(coord_sys.refpos, RefPos::Geocenter);
                assert_eq!((width, height), (2.0, 4.0));
            }
            other => panic!("expected a box, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_polygon() {
        let region: Region = "POLYGON ICRS 0 0 1 0 1 1 0 1".parse().unwrap();
        match region {
            Region::Polygon { vertices, .. } => assert_eq!(vertices.len(), 4),
            other => panic!("expected a polygon, got {other:?}"),
        }
    }

    #[test]
    fn test_polygon_needs_three_vertices() {
        let err = "POLYGON 0 0 1 1".parse::<Region>().unwrap_err();
        assert!(matches!(err, StcsError::UnexpectedEnd { .. }));
    }

    #[test]
    fn test_polygon_needs_even_coordinates() {
        let err = "POLYGON 0 0 1 1 2 2 3".parse::<Region>().unwrap_err();
        assert!(matches!(err, StcsError::UnexpectedEnd { .. }));
    }

    #[test]
    fn test_parse_nested_union() {
        let region: Region = "UNION ICRS (CIRCLE 1 2 0.5 NOT (BOX 0 0 1 1) POSITION 3 4)"
            .parse()
            .unwrap();
        match &region {
            Region::Union { coord_sys, regions } => {
                assert_eq!(coord_sys.frame, Frame::Icrs);
                assert_eq!(regions.len(), 3);
                assert_eq!(regions[1].kind(), RegionKind::Not);
            }
            other => panic!("expected a union, got {other:?}"),
        }
    }

    #[test]
    fn test_union_needs_two_regions() {
        let err = "UNION (CIRCLE 1 2 0.5)".parse::<Region>().unwrap_err();
        assert!(matches!(err, StcsError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_error_carries_offset() {
        let err = "CIRCLE ICRS 1 2 x".parse::<Region>().unwrap_err();
        assert_eq!(
            err,
            StcsError::UnexpectedToken {
                expected: "a radius value".to_string(),
                found: "x".to_string(),
                offset: 16,
            }
        );
    }

    #[test]
    fn test_unknown_keyword() {
        let err = "ELLIPSE 1 2 3 4".parse::<Region>().unwrap_err();
        assert!(matches!(err, StcsError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_to_stcs_elides_defaults() {
        let region: Region = "CIRCLE 1 2 0.5".parse().unwrap();
        assert_eq!(region.to_stcs(), "CIRCLE 1 2 0.5");

        let region: Region = "circle icrs 1 2 0.5".parse().unwrap();
        assert_eq!(region.to_stcs(), "CIRCLE ICRS 1 2 0.5");
    }

    fn arb_coord_sys() -> impl Strategy<Value = CoordSys> {
        prop_oneof![
            Just(CoordSys::default()),
            Just(CoordSys::new(
                Frame::Icrs,
                RefPos::UnknownRefPos,
                Flavor::Spherical2
            )),
            Just(CoordSys::new(
                Frame::Galactic,
                RefPos::Geocenter,
                Flavor::Spherical2
            )),
            Just(CoordSys::new(
                Frame::UnknownFrame,
                RefPos::Barycenter,
                Flavor::Spherical2
            )),
            Just(CoordSys::new(
                Frame::UnknownFrame,
                RefPos::UnknownRefPos,
                Flavor::Cartesian2
            )),
        ]
    }

    fn arb_value() -> impl Strategy<Value = f64> {
        // Values that print and re-parse exactly
        (-3600i32..3600i32).prop_map(|n| f64::from(n) / 16.0)
    }

    fn arb_region() -> impl Strategy<Value = Region> {
        let leaf = prop_oneof![
            (arb_coord_sys(), arb_value(), arb_value())
                .prop_map(|(coord_sys, x, y)| Region::Position { coord_sys, x, y }),
            (arb_coord_sys(), arb_value(), arb_value(), arb_value()).prop_map(
                |(coord_sys, x, y, radius)| Region::Circle {
                    coord_sys,
                    x,
                    y,
                    radius
                }
            ),
            (
                arb_coord_sys(),
                arb_value(),
                arb_value(),
                arb_value(),
                arb_value()
            )
                .prop_map(|(coord_sys, x, y, width, height)| Region::Box {
                    coord_sys,
                    x,
                    y,
                    width,
                    height
                }),
            (
                arb_coord_sys(),
                prop::collection::vec((arb_value(), arb_value()), 3..6)
            )
                .prop_map(|(coord_sys, vertices)| Region::Polygon {
                    coord_sys,
                    vertices
                }),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                (arb_coord_sys(), prop::collection::vec(inner.clone(), 2..4))
                    .prop_map(|(coord_sys, regions)| Region::Union { coord_sys, regions }),
                (arb_coord_sys(), prop::collection::vec(inner.clone(), 2..4)).prop_map(
                    |(coord_sys, regions)| Region::Intersection { coord_sys, regions }
                ),
                inner.prop_map(|region| Region::Not {
                    region: std::boxed::Box::new(region)
                }),
            ]
        })
    }

    proptest! {
        /// Serializing a region and parsing it back yields the same region.
        #[test]
        fn prop_stcs_roundtrip(region in arb_region()) {
            let text = region.to_stcs();
            let back: Region = text.parse().unwrap();
            prop_assert_eq!(back, region);
        }
    }
}
