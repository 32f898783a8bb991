// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # ADQL identifier model
//!
//! This module defines [`Identifier`], the normalized form of a table, column,
//! schema or alias name, together with the case-sensitivity rules ADQL
//! inherits from SQL delimited identifiers.
//!
//! A raw name is normalized as follows: surrounding whitespace is stripped;
//! if the remainder is wrapped in one matching pair of double quotes it is a
//! *delimited* identifier: the outer quotes are removed, doubled inner `""`
//! collapse to a single `"`, and the identifier becomes case-sensitive.
//! Anything else is a regular, case-insensitive identifier.
//!
//! Identifiers never embed qualification: a dot inside quotes is part of the
//! name, and qualification is always carried by the containing object
//! (see `TableName`).

use crate::error::{CatalogError, CatalogResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized ADQL identifier
///
/// Two identifiers match when at least one of them is case-insensitive and
/// their texts are equal under ASCII case folding; two delimited identifiers
/// must match exactly.
///
/// # Examples
///
/// ```
/// use adql_check_catalog::Identifier;
///
/// let plain = Identifier::new("  Stars ").unwrap();
/// assert_eq!(plain.text(), "Stars");
/// assert!(!plain.is_case_sensitive());
///
/// let delimited = Identifier::new("\"Stars\"").unwrap();
/// assert!(delimited.is_case_sensitive());
/// assert!(plain.matches(&delimited));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    /// Normalized text, without surrounding quotes
    text: String,

    /// Whether the identifier was delimited (quoted) in the source
    case_sensitive: bool,

    /// Database-side counterpart of this name, when it differs
    db_text: Option<String>,
}

impl Identifier {
    /// Normalize a raw name into an identifier
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EmptyIdentifier`] when the normalized text is
    /// empty, either a blank input or only whitespace between the quotes.
    pub fn new(raw: &str) -> CatalogResult<Self> {
        let trimmed = raw.trim();
        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            let inner = &trimmed[1..trimmed.len() - 1];
            let text = inner.replace("\"\"", "\"");
            if text.trim().is_empty() {
                return Err(CatalogError::EmptyIdentifier(raw.to_string()));
            }
            Ok(Self {
                text,
                case_sensitive: true,
                db_text: None,
            })
        } else if trimmed.is_empty() {
            Err(CatalogError::EmptyIdentifier(raw.to_string()))
        } else {
            Ok(Self {
                text: trimmed.to_string(),
                case_sensitive: false,
                db_text: None,
            })
        }
    }

    /// Build an identifier from pre-normalized text
    ///
    /// Hosts supplying names straight from database metadata use this to skip
    /// quote handling. Empty text is still rejected.
    pub fn exact(text: &str, case_sensitive: bool) -> CatalogResult<Self> {
        if text.trim().is_empty() {
            return Err(CatalogError::EmptyIdentifier(text.to_string()));
        }
        Ok(Self {
            text: text.to_string(),
            case_sensitive,
            db_text: None,
        })
    }

    /// Set the database-side counterpart of this name
    pub fn with_db_text(mut self, db_text: impl Into<String>) -> Self {
        self.db_text = Some(db_text.into());
        self
    }

    /// Normalized text of the identifier
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the identifier was delimited in the source
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Database-side name; falls back to the ADQL text
    pub fn db_text(&self) -> &str {
        self.db_text.as_deref().unwrap_or(&self.text)
    }

    /// ASCII-folded text, used as a lookup key in ordered column maps
    pub fn folded(&self) -> String {
        self.text.to_ascii_lowercase()
    }

    /// Case-combination matching rule
    ///
    /// If either side is case-insensitive the texts are compared under
    /// byte-wise ASCII folding; two case-sensitive identifiers compare
    /// exactly.
    pub fn matches(&self, other: &Identifier) -> bool {
        if self.case_sensitive && other.case_sensitive {
            self.text == other.text
        } else {
            self.text.eq_ignore_ascii_case(&other.text)
        }
    }

    /// Re-apply delimitation, doubling inner quotes
    ///
    /// `Identifier::new(&id.denormalize())` yields `id` back.
    pub fn denormalize(&self) -> String {
        if self.case_sensitive {
            format!("\"{}\"", self.text.replace('"', "\"\""))
        } else {
            self.text.clone()
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.denormalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_plain() {
        let id = Identifier::new("  ra  ").unwrap();
        assert_eq!(id.text(), "ra");
        assert!(!id.is_case_sensitive());
    }

    #[test]
    fn test_normalize_delimited() {
        let id = Identifier::new("\"RAJ2000\"").unwrap();
        assert_eq!(id.text(), "RAJ2000");
        assert!(id.is_case_sensitive());
    }

    #[test]
    fn test_normalize_doubled_quotes() {
        // """" is a delimited identifier containing a single quote
        let id = Identifier::new("\"\"\"\"").unwrap();
        assert_eq!(id.text(), "\"");
        assert!(id.is_case_sensitive());
    }

    #[test]
    fn test_normalize_inner_doubled_quotes() {
        let id = Identifier::new("\"a\"\"b\"").unwrap();
        assert_eq!(id.text(), "a\"b");
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            Identifier::new(""),
            Err(CatalogError::EmptyIdentifier(_))
        ));
        assert!(matches!(
            Identifier::new("   "),
            Err(CatalogError::EmptyIdentifier(_))
        ));
    }

    #[test]
    fn test_whitespace_between_quotes_rejected() {
        assert!(matches!(
            Identifier::new("\"   \""),
            Err(CatalogError::EmptyIdentifier(_))
        ));
        assert!(matches!(
            Identifier::new("\"\""),
            Err(CatalogError::EmptyIdentifier(_))
        ));
    }

    #[test]
    fn test_dot_inside_quotes_not_split() {
        let id = Identifier::new("\"schema.table\"").unwrap();
        assert_eq!(id.text(), "schema.table");
    }

    #[test]
    fn test_matching_folds_when_either_insensitive() {
        let plain = Identifier::new("ra").unwrap();
        let upper = Identifier::new("RA").unwrap();
        let quoted = Identifier::new("\"RA\"").unwrap();

        assert!(plain.matches(&upper));
        assert!(plain.matches(&quoted));
        assert!(quoted.matches(&plain));
    }

    #[test]
    fn test_matching_exact_when_both_sensitive() {
        let a = Identifier::new("\"ra\"").unwrap();
        let b = Identifier::new("\"RA\"").unwrap();
        let c = Identifier::new("\"ra\"").unwrap();

        assert!(!a.matches(&b));
        assert!(a.matches(&c));
    }

    #[test]
    fn test_denormalize() {
        let plain = Identifier::new("ra").unwrap();
        assert_eq!(plain.denormalize(), "ra");

        let quoted = Identifier::new("\"a\"\"b\"").unwrap();
        assert_eq!(quoted.denormalize(), "\"a\"\"b\"");
    }

    #[test]
    fn test_db_text_fallback() {
        let id = Identifier::new("ra").unwrap();
        assert_eq!(id.db_text(), "ra");

        let id = id.with_db_text("raj2000");
        assert_eq!(id.db_text(), "raj2000");
    }

    proptest! {
        #[test]
        fn prop_normalize_denormalize_roundtrip(
            text in "[a-zA-Z_][a-zA-Z0-9_\" .]{0,20}",
            case_sensitive in any::<bool>(),
        ) {
            // Plain identifiers cannot carry quotes or dots without being
            // re-read differently, so restrict the insensitive case.
            prop_assume!(case_sensitive || !text.contains(['"', '.', ' ']));
            let id = Identifier::exact(&text, case_sensitive).unwrap();
            let back = Identifier::new(&id.denormalize()).unwrap();
            prop_assert_eq!(back.text(), id.text());
            prop_assert_eq!(back.is_case_sensitive(), id.is_case_sensitive());
        }
    }
}
