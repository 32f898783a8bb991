// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Canned astronomical catalog
//!
//! A small TAP-like schema shared by the integration tests: two star/galaxy
//! object tables with positions, an observation table referencing them, and
//! one table carrying DB-side names that differ from the ADQL names.

use adql_check_catalog::{DbTable, DbType, StaticCatalog};
use std::sync::Arc;

/// Number of tables [`sky_catalog`] publishes
pub const SKY_TABLE_COUNT: usize = 4;

/// `stars(oid BIGINT, ra DOUBLE, dec DOUBLE, mag REAL, name VARCHAR(64))`
pub fn stars() -> Arc<DbTable> {
    DbTable::builder("tap.public.stars")
        .column("oid", DbType::BigInt)
        .column("ra", DbType::Double)
        .column("dec", DbType::Double)
        .column("mag", DbType::Real)
        .column("name", DbType::VarChar(Some(64)))
        .build()
        .expect("the stars fixture is well-formed")
}

/// `galaxies(oid BIGINT, ra DOUBLE, dec DOUBLE, z REAL)`
pub fn galaxies() -> Arc<DbTable> {
    DbTable::builder("tap.public.galaxies")
        .column("oid", DbType::BigInt)
        .column("ra", DbType::Double)
        .column("dec", DbType::Double)
        .column("z", DbType::Real)
        .build()
        .expect("the galaxies fixture is well-formed")
}

/// `observations(obs_id BIGINT, oid BIGINT, mjd DOUBLE, flux DOUBLE, filter CHAR(1))`
pub fn observations() -> Arc<DbTable> {
    DbTable::builder("tap.public.observations")
        .column("obs_id", DbType::BigInt)
        .column("oid", DbType::BigInt)
        .column("mjd", DbType::Double)
        .column("flux", DbType::Double)
        .column("filter", DbType::Char(Some(1)))
        .build()
        .expect("the observations fixture is well-formed")
}

/// `footprints(oid BIGINT, center POINT, outline REGION)` with DB-side names
/// differing from the published ADQL names
pub fn footprints() -> Arc<DbTable> {
    DbTable::builder("tap.public.footprints")
        .db_name("tap.internal.fp_geom")
        .column("oid", DbType::BigInt)
        .column_with_db_name("center", "fp_center", DbType::Point)
        .column_with_db_name("outline", "fp_outline", DbType::Region)
        .build()
        .expect("the footprints fixture is well-formed")
}

/// The full canned catalog
pub fn sky_catalog() -> Arc<StaticCatalog> {
    Arc::new(
        StaticCatalog::new().with_tables([stars(), galaxies(), observations(), footprints()]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use adql_check_catalog::{SchemaCatalog, TableName};

    #[test]
    fn test_sky_catalog_contents() {
        let catalog = sky_catalog();
        assert_eq!(catalog.tables().len(), SKY_TABLE_COUNT);
        let name = TableName::split("public.stars").unwrap();
        assert_eq!(catalog.search(&name).len(), 1);
    }
}
