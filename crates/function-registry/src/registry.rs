// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

use crate::def::{CallSignature, FunctionDef};
use crate::error::SignatureResult;
use std::cmp::Ordering;
use std::sync::Arc;

/// Registry of declared user-defined functions
///
/// Definitions are kept sorted by their compare form so that call-site
/// lookup is a binary search with the category-based comparison of
/// [`FunctionDef::compare_to_call`]. Several distinct entries may compare
/// equal to one call (overload ambiguity); the search returns one of them,
/// which is not an error at this stage.
///
/// A registry is immutable after construction and may be shared by
/// concurrent checks.
///
/// # Examples
///
/// ```
/// use adql_check_function_registry::{CallSignature, FunctionRegistry};
/// use adql_check_catalog::TypeCategories;
///
/// let registry = FunctionRegistry::parse(&[
///     "gaia_healpix(ra DOUBLE, dec DOUBLE) -> BIGINT",
///     "ivo_nocasematch(a VARCHAR, b VARCHAR) -> SMALLINT",
/// ])
/// .unwrap();
///
/// let call = CallSignature::new(
///     "GAIA_HEALPIX",
///     vec![TypeCategories::NUMERIC, TypeCategories::NUMERIC],
/// );
/// assert!(registry.lookup(&call).is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    defs: Vec<Arc<FunctionDef>>,
}

impl FunctionRegistry {
    /// Build a registry from parsed definitions
    pub fn new(defs: impl IntoIterator<Item = FunctionDef>) -> Self {
        let mut defs: Vec<Arc<FunctionDef>> = defs.into_iter().map(Arc::new).collect();
        defs.sort_by(|a, b| a.compare_form().cmp(b.compare_form()));
        Self { defs }
    }

    /// Build a registry from textual signatures
    pub fn parse(signatures: &[&str]) -> SignatureResult<Self> {
        let defs = signatures
            .iter()
            .map(|s| s.parse::<FunctionDef>())
            .collect::<SignatureResult<Vec<_>>>()?;
        Ok(Self::new(defs))
    }

    /// An empty registry: every user-defined function is rejected
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<FunctionDef>> {
        self.defs.iter()
    }

    /// Binary-search lookup of a definition matching the call
    ///
    /// Returns `Some` iff some entry's [`FunctionDef::compare_to_call`]
    /// yields `Equal` for this call.
    pub fn lookup(&self, call: &CallSignature) -> Option<&Arc<FunctionDef>> {
        self.defs
            .binary_search_by(|def| def.compare_to_call(call))
            .ok()
            .map(|index| &self.defs[index])
    }

    /// Linear scan equivalent of [`FunctionRegistry::lookup`]
    ///
    /// Exists for the consistency property tests; callers use `lookup`.
    pub fn scan(&self, call: &CallSignature) -> Option<&Arc<FunctionDef>> {
        self.defs
            .iter()
            .find(|def| def.compare_to_call(call) == Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adql_check_catalog::TypeCategories;
    use proptest::prelude::*;

    fn registry() -> FunctionRegistry {
        FunctionRegistry::parse(&[
            "myf(x DOUBLE) -> DOUBLE",
            "myf(s VARCHAR) -> VARCHAR",
            "gaia_healpix(ra DOUBLE, dec DOUBLE) -> BIGINT",
            "footprint(r REGION) -> REGION",
            "ping()",
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_by_categories() {
        let registry = registry();

        let call = CallSignature::new("myf", vec![TypeCategories::NUMERIC]);
        let def = registry.lookup(&call).unwrap();
        assert_eq!(def.params()[0].ty.is_numeric(), true);

        let call = CallSignature::new("myf", vec![TypeCategories::STRING]);
        let def = registry.lookup(&call).unwrap();
        assert_eq!(def.params()[0].ty.is_string(), true);
    }

    #[test]
    fn test_lookup_case_insensitive_name() {
        let registry = registry();
        let call = CallSignature::new("PING", vec![]);
        assert!(registry.lookup(&call).is_some());
    }

    #[test]
    fn test_lookup_wrong_arity() {
        let registry = registry();
        let call = CallSignature::new("ping", vec![TypeCategories::NUMERIC]);
        assert!(registry.lookup(&call).is_none());
    }

    #[test]
    fn test_lookup_unknown_name() {
        let registry = registry();
        let call = CallSignature::new("nope", vec![]);
        assert!(registry.lookup(&call).is_none());
    }

    #[test]
    fn test_lookup_unresolved_argument() {
        let registry = registry();
        let call = CallSignature::new("footprint", vec![TypeCategories::UNRESOLVED]);
        assert!(registry.lookup(&call).is_some());
    }

    fn arb_categories() -> impl Strategy<Value = TypeCategories> {
        prop_oneof![
            Just(TypeCategories::NUMERIC),
            Just(TypeCategories::STRING),
            Just(TypeCategories::GEOMETRY),
            Just(TypeCategories::UNRESOLVED),
        ]
    }

    proptest! {
        /// Binary search finds a match exactly when a linear scan does.
        #[test]
        fn prop_lookup_agrees_with_scan(
            name in prop_oneof![
                Just("myf".to_string()),
                Just("gaia_healpix".to_string()),
                Just("footprint".to_string()),
                Just("ping".to_string()),
                Just("other".to_string()),
            ],
            args in prop::collection::vec(arb_categories(), 0..4),
        ) {
            let registry = registry();
            let call = CallSignature::new(name, args);
            prop_assert_eq!(
                registry.lookup(&call).is_some(),
                registry.scan(&call).is_some()
            );
        }
    }
}
