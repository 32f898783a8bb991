// Copyright (c) 2025 adql-check contributors
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Function definitions
//!
//! This module defines [`FunctionDef`], the declared signature of a
//! user-defined function, its textual form
//! (`name(p1 T1, p2 T2) -> R`), and the three-way comparison against a call
//! site that drives binary-search lookup in the registry.
//!
//! Comparison works on type *categories* only: a declared `DOUBLE` parameter
//! accepts any numeric argument, and an argument whose type is still
//! unresolved (all three categories set) matches anything. Strict
//! return-type checking is deliberately out of scope.

use crate::error::{SignatureError, SignatureResult};
use adql_check_catalog::{DbType, TypeCategories};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

// The parameter list allows one paren level for length parameters
// (e.g. VARCHAR(8)); deeper nesting is not part of the grammar.
static SIGNATURE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*([A-Za-z][A-Za-z0-9_]*)\s*\(((?:[^()]|\([^()]*\))*)\)(?:\s*->\s*([A-Za-z_][A-Za-z0-9 _]*?)\s*(?:\(\s*([0-9]+)\s*\))?)?\s*$",
    )
    .expect("signature grammar is a valid regex")
});

static PARAM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*([A-Za-z][A-Za-z0-9_]*)\s+([A-Za-z_][A-Za-z0-9 _]*?)\s*(?:\(\s*([0-9]+)\s*\))?\s*$",
    )
    .expect("parameter grammar is a valid regex")
});

/// A declared parameter of a user-defined function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    pub name: String,
    pub ty: DbType,
}

/// The declared signature of a user-defined function
///
/// # Examples
///
/// ```
/// use adql_check_function_registry::FunctionDef;
///
/// let def: FunctionDef = "gaia_healpix(ra DOUBLE, dec DOUBLE) -> BIGINT"
///     .parse()
///     .unwrap();
/// assert_eq!(def.name(), "gaia_healpix");
/// assert_eq!(def.params().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    name: String,
    return_type: DbType,
    params: Vec<FunctionParam>,
    /// Ordering key: lowercased name followed by one category triplet per
    /// parameter. Kept alongside the definition so registry sorting never
    /// recomputes it.
    compare_form: String,
}

impl FunctionDef {
    pub fn new(
        name: impl Into<String>,
        return_type: DbType,
        params: Vec<FunctionParam>,
    ) -> SignatureResult<Self> {
        let name = name.into();
        if !name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(SignatureError::InvalidName(name));
        }
        let compare_form = Self::build_compare_form(&name, &params);
        Ok(Self {
            name,
            return_type,
            params,
            compare_form,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &DbType {
        &self.return_type
    }

    pub fn params(&self) -> &[FunctionParam] {
        &self.params
    }

    /// The ordering key used to sort registries
    pub fn compare_form(&self) -> &str {
        &self.compare_form
    }

    fn build_compare_form(name: &str, params: &[FunctionParam]) -> String {
        let mut form = name.to_ascii_lowercase();
        for param in params {
            let cats = TypeCategories::of(&param.ty);
            form.push(if cats.numeric { '1' } else { '0' });
            form.push(if cats.string { '1' } else { '0' });
            form.push(if cats.geometry { '1' } else { '0' });
        }
        form
    }

    /// Three-way comparison against a call site
    ///
    /// Names compare case-insensitively and decide on inequality. Then each
    /// parameter position up to the shorter signature compares by category in
    /// the fixed order numeric, string, geometry, unless the declared type
    /// is unknown or the argument is unresolved, which match anything.
    /// Finally the parameter counts decide.
    pub fn compare_to_call(&self, call: &CallSignature) -> Ordering {
        let name_cmp = self
            .name
            .to_ascii_lowercase()
            .cmp(&call.name.to_ascii_lowercase());
        if name_cmp != Ordering::Equal {
            return name_cmp;
        }

        let common = self.params.len().min(call.args.len());
        for (param, arg) in self.params.iter().zip(call.args.iter()).take(common) {
            if param.ty.is_unknown() || arg.is_unresolved() {
                continue;
            }
            let declared = TypeCategories::of(&param.ty);
            for (has_decl, has_arg) in [
                (declared.numeric, arg.numeric),
                (declared.string, arg.string),
                (declared.geometry, arg.geometry),
            ] {
                if has_decl != has_arg {
                    return if has_decl {
                        Ordering::Greater
                    } else {
                        Ordering::Less
                    };
                }
            }
        }

        self.params.len().cmp(&call.args.len())
    }
}

impl FromStr for FunctionDef {
    type Err = SignatureError;

    /// Parse a textual signature of the form `name(p1 T1, p2 T2) -> R`
    ///
    /// Type names are resolved against the TAP type enumeration first and a
    /// map of common database synonyms second; anything else yields an
    /// unknown type carrying the original label (which matches any argument).
    fn from_str(signature: &str) -> SignatureResult<Self> {
        let captures = SIGNATURE_RE
            .captures(signature)
            .ok_or_else(|| SignatureError::InvalidSignature(signature.to_string()))?;

        let name = captures[1].to_string();
        let params_text = captures[2].trim();
        let mut params = Vec::new();
        if !params_text.is_empty() {
            for part in params_text.split(',') {
                let param = PARAM_RE.captures(part).ok_or_else(|| {
                    SignatureError::InvalidParameter {
                        signature: signature.to_string(),
                        parameter: part.trim().to_string(),
                    }
                })?;
                let length = param
                    .get(3)
                    .and_then(|m| m.as_str().parse::<u32>().ok());
                params.push(FunctionParam {
                    name: param[1].to_string(),
                    ty: DbType::from_db_name(&param[2], length),
                });
            }
        }

        let return_type = match captures.get(3) {
            Some(type_name) => {
                let length = captures
                    .get(4)
                    .and_then(|m| m.as_str().parse::<u32>().ok());
                DbType::from_db_name(type_name.as_str(), length)
            }
            None => DbType::Unknown(None),
        };

        FunctionDef::new(name, return_type, params)
    }
}

impl fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", param.name, param.ty)?;
        }
        write!(f, ") -> {}", self.return_type)
    }
}

/// A call site, reduced to its name and runtime argument categories
///
/// This is what the checker builds from a `UdfCall` node once the argument
/// expressions have been resolved (or not; unresolved arguments carry the
/// all-true triplet and match any declared parameter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSignature {
    name: String,
    args: Vec<TypeCategories>,
}

impl CallSignature {
    pub fn new(name: impl Into<String>, args: Vec<TypeCategories>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[TypeCategories] {
        &self.args
    }

    /// Whether every argument category triplet is fully resolved
    pub fn is_resolved(&self) -> bool {
        self.args.iter().all(|arg| !arg.is_unresolved())
    }
}

impl fmt::Display for CallSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_signature() {
        let def: FunctionDef = "myf(x DOUBLE, label VARCHAR(32)) -> DOUBLE".parse().unwrap();
        assert_eq!(def.name(), "myf");
        assert_eq!(def.params().len(), 2);
        assert_eq!(def.params()[0].ty, DbType::Double);
        assert_eq!(def.params()[1].ty, DbType::VarChar(Some(32)));
        assert_eq!(def.return_type(), &DbType::Double);
    }

    #[test]
    fn test_parse_no_return_type() {
        let def: FunctionDef = "ping()".parse().unwrap();
        assert!(def.params().is_empty());
        assert_eq!(def.return_type(), &DbType::Unknown(None));
    }

    #[test]
    fn test_parse_synonym_types() {
        let def: FunctionDef = "f(a int4, b bytea) -> text".parse().unwrap();
        assert_eq!(def.params()[0].ty, DbType::Integer);
        assert_eq!(def.params()[1].ty, DbType::Blob);
        assert_eq!(def.return_type(), &DbType::Clob);
    }

    #[test]
    fn test_parse_unmapped_type_is_unknown() {
        let def: FunctionDef = "f(a tsvector)".parse().unwrap();
        assert_eq!(
            def.params()[0].ty,
            DbType::Unknown(Some("tsvector".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_bad_signatures() {
        assert!("".parse::<FunctionDef>().is_err());
        assert!("f(a DOUBLE".parse::<FunctionDef>().is_err());
        assert!("f(a (b))".parse::<FunctionDef>().is_err());
        assert!("1f(a DOUBLE)".parse::<FunctionDef>().is_err());
        assert!("f(DOUBLE)".parse::<FunctionDef>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let def: FunctionDef = " myf ( x DOUBLE , s VARCHAR(8) ) -> BIGINT ".parse().unwrap();
        assert_eq!(def.to_string(), "myf(x DOUBLE, s VARCHAR(8)) -> BIGINT");
        let back: FunctionDef = def.to_string().parse().unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn test_compare_form() {
        let def: FunctionDef = "MyF(x DOUBLE, s VARCHAR(8))".parse().unwrap();
        assert_eq!(def.compare_form(), "myf100010");
    }

    #[test]
    fn test_compare_name_decides_first() {
        let def: FunctionDef = "aaa(x DOUBLE)".parse().unwrap();
        let call = CallSignature::new("bbb", vec![TypeCategories::NUMERIC]);
        assert_eq!(def.compare_to_call(&call), Ordering::Less);
    }

    #[test]
    fn test_compare_matching_call() {
        let def: FunctionDef = "myf(x DOUBLE, s VARCHAR(8))".parse().unwrap();
        let call = CallSignature::new(
            "MYF",
            vec![TypeCategories::NUMERIC, TypeCategories::STRING],
        );
        assert_eq!(def.compare_to_call(&call), Ordering::Equal);
    }

    #[test]
    fn test_compare_category_mismatch() {
        let def: FunctionDef = "myf(x DOUBLE)".parse().unwrap();
        // Declared numeric vs string argument: def side has numeric
        let call = CallSignature::new("myf", vec![TypeCategories::STRING]);
        assert_eq!(def.compare_to_call(&call), Ordering::Greater);
    }

    #[test]
    fn test_compare_unresolved_argument_matches() {
        let def: FunctionDef = "myf(x DOUBLE)".parse().unwrap();
        let call = CallSignature::new("myf", vec![TypeCategories::UNRESOLVED]);
        assert_eq!(def.compare_to_call(&call), Ordering::Equal);
    }

    #[test]
    fn test_compare_unknown_parameter_matches() {
        let def: FunctionDef = "myf(x tsvector)".parse().unwrap();
        let call = CallSignature::new("myf", vec![TypeCategories::GEOMETRY]);
        assert_eq!(def.compare_to_call(&call), Ordering::Equal);
    }

    #[test]
    fn test_compare_arity_decides_last() {
        let def: FunctionDef = "myf(x DOUBLE)".parse().unwrap();
        let call = CallSignature::new(
            "myf",
            vec![TypeCategories::NUMERIC, TypeCategories::NUMERIC],
        );
        assert_eq!(def.compare_to_call(&call), Ordering::Less);
    }

    #[test]
    fn test_call_signature_display() {
        let call = CallSignature::new(
            "myf",
            vec![TypeCategories::NUMERIC, TypeCategories::UNRESOLVED],
        );
        assert_eq!(call.to_string(), "myf(NUMERIC, ?)");
    }
}
