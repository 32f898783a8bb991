// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Database column types
//!
//! This module defines [`DbType`], the coarse type model shared by the
//! schema metadata, the function registry and the type-checking phase of the
//! checker. The model follows the TAP type enumeration, extended with two
//! unknown tags for types the host database reports but ADQL cannot name.
//!
//! Only type *categories* (numeric, string, geometry) matter to the checker;
//! exact precision, scale and range are out of scope.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A database column type
///
/// Length parameters are carried for the four sized types but play no role
/// in category checks or compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum DbType {
    // Numeric types
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,

    // Binary types (numeric for category checks)
    Binary(Option<u32>),
    VarBinary(Option<u32>),
    Blob,

    // String types
    Char(Option<u32>),
    VarChar(Option<u32>),
    Clob,
    Timestamp,

    // Geometric types
    Point,
    Region,

    // Types the host database reports but ADQL cannot name
    Unknown(Option<String>),
    UnknownNumeric(Option<String>),
}

impl DbType {
    /// Whether values of this type can appear where a number is expected
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DbType::SmallInt
                | DbType::Integer
                | DbType::BigInt
                | DbType::Real
                | DbType::Double
                | DbType::Binary(_)
                | DbType::VarBinary(_)
                | DbType::Blob
                | DbType::UnknownNumeric(_)
        )
    }

    /// Whether values of this type can appear where a string is expected
    pub fn is_string(&self) -> bool {
        matches!(
            self,
            DbType::Char(_) | DbType::VarChar(_) | DbType::Clob | DbType::Timestamp
        )
    }

    /// Whether this is one of the two geometric types
    pub fn is_geometry(&self) -> bool {
        matches!(self, DbType::Point | DbType::Region)
    }

    /// Whether the exact type could not be determined
    pub fn is_unknown(&self) -> bool {
        matches!(self, DbType::Unknown(_) | DbType::UnknownNumeric(_))
    }

    /// Whether this is a raw binary type
    pub fn is_binary(&self) -> bool {
        matches!(self, DbType::Binary(_) | DbType::VarBinary(_) | DbType::Blob)
    }

    /// Compatibility rule used when merging NATURAL JOIN / USING columns
    ///
    /// Unknown types are compatible with everything. Binary types must agree
    /// on being BLOB or not, string types on being CLOB or not; numeric
    /// types are mutually compatible; geometric types must carry the same
    /// tag; anything else requires tag equality.
    pub fn is_compatible(&self, other: &DbType) -> bool {
        if self.is_unknown() || other.is_unknown() {
            true
        } else if self.is_binary() && other.is_binary() {
            matches!(self, DbType::Blob) == matches!(other, DbType::Blob)
        } else if self.is_numeric() && other.is_numeric() {
            true
        } else if self.is_geometry() && other.is_geometry() {
            std::mem::discriminant(self) == std::mem::discriminant(other)
        } else if self.is_string() && other.is_string() {
            matches!(self, DbType::Clob) == matches!(other, DbType::Clob)
        } else {
            std::mem::discriminant(self) == std::mem::discriminant(other)
        }
    }

    /// Parse a type name reported by a host database
    ///
    /// Exact (case-insensitive) TAP names are tried first; the length
    /// parameter applies only to CHAR, VARCHAR, BINARY and VARBINARY.
    /// Common database synonyms are mapped next; anything else becomes
    /// [`DbType::Unknown`] carrying the original label.
    pub fn from_db_name(name: &str, length: Option<u32>) -> DbType {
        let trimmed = name.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "CHAR" => return DbType::Char(length),
            "VARCHAR" => return DbType::VarChar(length),
            "BINARY" => return DbType::Binary(length),
            "VARBINARY" => return DbType::VarBinary(length),
            "SMALLINT" => return DbType::SmallInt,
            "INTEGER" => return DbType::Integer,
            "BIGINT" => return DbType::BigInt,
            "REAL" => return DbType::Real,
            "DOUBLE" => return DbType::Double,
            "BLOB" => return DbType::Blob,
            "CLOB" => return DbType::Clob,
            "TIMESTAMP" => return DbType::Timestamp,
            "POINT" => return DbType::Point,
            "REGION" => return DbType::Region,
            _ => {}
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "bool" | "boolean" | "int2" => DbType::SmallInt,
            "int" | "int4" => DbType::Integer,
            "int8" => DbType::BigInt,
            "float4" => DbType::Real,
            "float" | "float8" | "double precision" => DbType::Double,
            "bytea" => DbType::Blob,
            "text" => DbType::Clob,
            "date" | "time" | "timetz" | "timestamptz" => DbType::Timestamp,
            "polygon" | "box" | "circle" => DbType::Region,
            "position" | "spoint" => DbType::Point,
            "numeric" | "decimal" => DbType::UnknownNumeric(Some(trimmed.to_string())),
            _ => DbType::Unknown(Some(trimmed.to_string())),
        }
    }
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn sized(f: &mut fmt::Formatter<'_>, name: &str, len: &Option<u32>) -> fmt::Result {
            match len {
                Some(n) => write!(f, "{name}({n})"),
                None => f.write_str(name),
            }
        }
        match self {
            DbType::SmallInt => f.write_str("SMALLINT"),
            DbType::Integer => f.write_str("INTEGER"),
            DbType::BigInt => f.write_str("BIGINT"),
            DbType::Real => f.write_str("REAL"),
            DbType::Double => f.write_str("DOUBLE"),
            DbType::Binary(n) => sized(f, "BINARY", n),
            DbType::VarBinary(n) => sized(f, "VARBINARY", n),
            DbType::Blob => f.write_str("BLOB"),
            DbType::Char(n) => sized(f, "CHAR", n),
            DbType::VarChar(n) => sized(f, "VARCHAR", n),
            DbType::Clob => f.write_str("CLOB"),
            DbType::Timestamp => f.write_str("TIMESTAMP"),
            DbType::Point => f.write_str("POINT"),
            DbType::Region => f.write_str("REGION"),
            DbType::Unknown(Some(label)) | DbType::UnknownNumeric(Some(label)) => {
                f.write_str(label)
            }
            DbType::Unknown(None) => f.write_str("UNKNOWN"),
            DbType::UnknownNumeric(None) => f.write_str("UNKNOWN_NUMERIC"),
        }
    }
}

/// The three type categories the checker reasons about
///
/// An expression whose resolution failed upstream has all three flags set;
/// such *unresolved* triplets are skipped by every category check so a
/// single root cause is reported only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeCategories {
    pub numeric: bool,
    pub string: bool,
    pub geometry: bool,
}

impl TypeCategories {
    /// Categories of a value whose type could not be resolved
    pub const UNRESOLVED: TypeCategories = TypeCategories {
        numeric: true,
        string: true,
        geometry: true,
    };

    /// Categories of a value that is none of the three (e.g. a predicate)
    pub const NONE: TypeCategories = TypeCategories {
        numeric: false,
        string: false,
        geometry: false,
    };

    pub const NUMERIC: TypeCategories = TypeCategories {
        numeric: true,
        string: false,
        geometry: false,
    };

    pub const STRING: TypeCategories = TypeCategories {
        numeric: false,
        string: true,
        geometry: false,
    };

    pub const GEOMETRY: TypeCategories = TypeCategories {
        numeric: false,
        string: false,
        geometry: true,
    };

    /// Categories derived from a concrete column type
    pub fn of(ty: &DbType) -> TypeCategories {
        if ty.is_unknown() && !ty.is_numeric() {
            return TypeCategories::UNRESOLVED;
        }
        TypeCategories {
            numeric: ty.is_numeric(),
            string: ty.is_string(),
            geometry: ty.is_geometry(),
        }
    }

    /// All three categories set: nothing is known about the value yet
    pub fn is_unresolved(&self) -> bool {
        self.numeric && self.string && self.geometry
    }

    /// Whether both sides can hold a value of at least one shared category
    pub fn overlaps(&self, other: &TypeCategories) -> bool {
        (self.numeric && other.numeric)
            || (self.string && other.string)
            || (self.geometry && other.geometry)
    }
}

impl fmt::Display for TypeCategories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unresolved() {
            return f.write_str("?");
        }
        let mut parts: Vec<&str> = Vec::new();
        if self.numeric {
            parts.push("NUMERIC");
        }
        if self.string {
            parts.push("STRING");
        }
        if self.geometry {
            parts.push("GEOMETRY");
        }
        if parts.is_empty() {
            f.write_str("?")
        } else {
            f.write_str(&parts.join("|"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_predicate() {
        assert!(DbType::Integer.is_numeric());
        assert!(DbType::Blob.is_numeric());
        assert!(DbType::UnknownNumeric(None).is_numeric());
        assert!(!DbType::VarChar(None).is_numeric());
        assert!(!DbType::Unknown(None).is_numeric());
    }

    #[test]
    fn test_string_predicate() {
        assert!(DbType::Char(Some(8)).is_string());
        assert!(DbType::Timestamp.is_string());
        assert!(!DbType::Blob.is_string());
    }

    #[test]
    fn test_geometry_predicate() {
        assert!(DbType::Point.is_geometry());
        assert!(DbType::Region.is_geometry());
        assert!(!DbType::Double.is_geometry());
    }

    #[test]
    fn test_unknown_compatible_with_everything() {
        assert!(DbType::Unknown(None).is_compatible(&DbType::Point));
        assert!(DbType::Region.is_compatible(&DbType::UnknownNumeric(None)));
    }

    #[test]
    fn test_numeric_compatibility() {
        assert!(DbType::SmallInt.is_compatible(&DbType::Double));
        assert!(!DbType::Integer.is_compatible(&DbType::VarChar(None)));
    }

    #[test]
    fn test_binary_compatibility() {
        assert!(DbType::Binary(Some(4)).is_compatible(&DbType::VarBinary(None)));
        assert!(!DbType::Binary(None).is_compatible(&DbType::Blob));
        assert!(DbType::Blob.is_compatible(&DbType::Blob));
    }

    #[test]
    fn test_string_compatibility() {
        assert!(DbType::Char(None).is_compatible(&DbType::Timestamp));
        assert!(!DbType::VarChar(None).is_compatible(&DbType::Clob));
    }

    #[test]
    fn test_geometry_compatibility() {
        assert!(DbType::Point.is_compatible(&DbType::Point));
        assert!(!DbType::Point.is_compatible(&DbType::Region));
    }

    #[test]
    fn test_from_db_name_exact() {
        assert_eq!(DbType::from_db_name("varchar", Some(64)), DbType::VarChar(Some(64)));
        assert_eq!(DbType::from_db_name("DOUBLE", None), DbType::Double);
        // Length only applies to the four sized types
        assert_eq!(DbType::from_db_name("INTEGER", Some(4)), DbType::Integer);
    }

    #[test]
    fn test_from_db_name_synonyms() {
        assert_eq!(DbType::from_db_name("int4", None), DbType::Integer);
        assert_eq!(DbType::from_db_name("float8", None), DbType::Double);
        assert_eq!(DbType::from_db_name("bytea", None), DbType::Blob);
        assert_eq!(DbType::from_db_name("text", None), DbType::Clob);
        assert_eq!(DbType::from_db_name("timestamptz", None), DbType::Timestamp);
        assert_eq!(DbType::from_db_name("circle", None), DbType::Region);
        assert_eq!(DbType::from_db_name("position", None), DbType::Point);
    }

    #[test]
    fn test_from_db_name_unmapped() {
        assert_eq!(
            DbType::from_db_name("tsvector", None),
            DbType::Unknown(Some("tsvector".to_string()))
        );
    }

    #[test]
    fn test_categories_of_unknown() {
        assert!(TypeCategories::of(&DbType::Unknown(None)).is_unresolved());
        // An unknown-numeric type is still known to be numeric
        let cats = TypeCategories::of(&DbType::UnknownNumeric(None));
        assert!(cats.numeric && !cats.string && !cats.geometry);
    }

    #[test]
    fn test_categories_display() {
        assert_eq!(TypeCategories::NUMERIC.to_string(), "NUMERIC");
        assert_eq!(TypeCategories::UNRESOLVED.to_string(), "?");
    }

    #[test]
    fn test_serde_roundtrip() {
        let ty = DbType::VarChar(Some(255));
        let json = serde_json::to_string(&ty).unwrap();
        let back: DbType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);

        let ty = DbType::Unknown(Some("tsvector".to_string()));
        let json = serde_json::to_string(&ty).unwrap();
        let back: DbType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ty);
    }
}
