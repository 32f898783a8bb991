// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # ADQL Check - Test Utilities
//!
//! Shared fixtures for the workspace's integration tests: a canned
//! astronomical catalog ([`mock_catalog::sky_catalog`]) and shorthand AST
//! builders ([`fixtures`]) standing in for the external parser.

pub mod fixtures;
pub mod mock_catalog;

pub use fixtures::*;
pub use mock_catalog::{footprints, galaxies, observations, sky_catalog, stars};
