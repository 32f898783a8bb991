// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ADQL Check - STC-S Mini-Language
//!
//! This crate parses and validates the STC-S subset embedded in ADQL
//! geometry calls: coordinate systems (`frame? refpos? flavor?`) and
//! geometric regions (`POSITION`, `CIRCLE`, `BOX`, `POLYGON`, `UNION`,
//! `INTERSECTION`, `NOT`).
//!
//! ## Parsing
//!
//! Both grammars are recursive descent over a shared tokenizer; every
//! diagnostic carries the character offset of the first offending token.
//!
//! ```
//! use adql_check_stcs::Region;
//!
//! let region: Region = "UNION ICRS (CIRCLE 1 2 0.5 BOX 0 0 1 1)".parse().unwrap();
//! assert_eq!(region.inner_regions().len(), 2);
//! ```
//!
//! ## Restriction
//!
//! [`CoordSysRestriction`] compiles a list of allowed-coordinate-system
//! patterns (`"(ICRS|FK5) * *"`) into one regex; the checker matches parsed
//! coordinate systems against it. Default values are always admitted so the
//! empty coordinate system never violates a restriction.
//!
//! ## Serialization
//!
//! [`Region::to_stcs`] and [`CoordSys::to_stcs`] render back to STC-S with
//! default coordinate-system parts elided; parsing the rendering yields the
//! original value.

pub mod coordsys;
pub mod error;
pub mod pattern;
pub mod region;
mod tokenizer;

// Re-exports
pub use coordsys::{CoordSys, Flavor, Frame, RefPos};
pub use error::{StcsError, StcsResult};
pub use pattern::CoordSysRestriction;
pub use region::{Region, RegionKind};
