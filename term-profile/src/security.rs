//! Input hardening for generated SQL and artifact paths.
//!
//! Column names come from arbitrary source systems, so they are never rejected
//! for their content; they are always quoted instead. Names that become
//! directories under the artifact root are held to a stricter standard.

use crate::error::{ProfileError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum accepted length of an identifier or path component.
const MAX_IDENTIFIER_LENGTH: usize = 256;

/// Maximum accepted length of a lookup signature.
const MAX_SIGNATURE_LENGTH: usize = 4096;

/// SQL identifier and literal escaping utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Quotes an identifier (column or table name) for use in DataFusion SQL.
    ///
    /// Embedded double quotes are doubled, so names containing spaces, keywords
    /// or punctuation are referenced verbatim and case-sensitively.
    ///
    /// # Examples
    /// ```rust
    /// use term_profile::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::quote_identifier("qty").unwrap(), "\"qty\"");
    /// assert_eq!(
    ///     SqlSecurity::quote_identifier("Order \"Date\"").unwrap(),
    ///     "\"Order \"\"Date\"\"\""
    /// );
    /// assert!(SqlSecurity::quote_identifier("").is_err());
    /// ```
    pub fn quote_identifier(identifier: &str) -> Result<String> {
        Self::validate_identifier(identifier)?;
        let escaped = identifier.replace('"', "\"\"");
        Ok(format!("\"{escaped}\""))
    }

    /// Validates an identifier without quoting it.
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.is_empty() {
            return Err(ProfileError::invalid_input("SQL identifier cannot be empty"));
        }

        if identifier.len() > MAX_IDENTIFIER_LENGTH {
            return Err(ProfileError::invalid_input(format!(
                "SQL identifier too long (max {MAX_IDENTIFIER_LENGTH} characters)"
            )));
        }

        if identifier.contains('\0') {
            return Err(ProfileError::invalid_input(
                "SQL identifier cannot contain null bytes",
            ));
        }

        Ok(())
    }

    /// Escapes a string literal, returning it wrapped in single quotes.
    pub fn quote_literal(value: &str) -> Result<String> {
        if value.contains('\0') {
            return Err(ProfileError::invalid_input(
                "SQL literal cannot contain null bytes",
            ));
        }
        let escaped = value.replace('\'', "''");
        Ok(format!("'{escaped}'"))
    }

    /// Validates a target signature for a pattern-match lookup.
    ///
    /// Lookups compare against the strict signature, whose alphabet is `a`, `A`
    /// and `N`; any other character can never match and is rejected early.
    pub fn validate_signature(signature: &str) -> Result<()> {
        if signature.len() > MAX_SIGNATURE_LENGTH {
            return Err(ProfileError::invalid_input(format!(
                "Pattern too long (max {MAX_SIGNATURE_LENGTH} characters)"
            )));
        }

        static SIGNATURE_REGEX: Lazy<Regex> = Lazy::new(|| {
            // This regex is compile-time constant and known to be valid
            #[allow(clippy::expect_used)]
            Regex::new(r"^[aAN]*$").expect("Hard-coded regex pattern should be valid")
        });

        if !SIGNATURE_REGEX.is_match(signature) {
            return Err(ProfileError::invalid_input(format!(
                "Invalid pattern '{signature}': lookup patterns may only contain 'a', 'A' and 'N'"
            )));
        }

        Ok(())
    }
}

/// Validation for names that become directories under the artifact root.
pub struct PathSecurity;

impl PathSecurity {
    /// Validates a connection, schema or table name used as a path component.
    ///
    /// Rejects anything that could escape the artifact root or name a hidden
    /// directory.
    pub fn validate_component(component: &str, name: &str) -> Result<()> {
        if component.is_empty() || component.trim().is_empty() {
            return Err(ProfileError::invalid_input(format!(
                "{name} cannot be empty or whitespace-only"
            )));
        }

        if component.len() > MAX_IDENTIFIER_LENGTH {
            return Err(ProfileError::invalid_input(format!(
                "{name} too long: {} characters (max {MAX_IDENTIFIER_LENGTH})",
                component.len()
            )));
        }

        if component == "." || component == ".." || component.starts_with('.') {
            return Err(ProfileError::invalid_input(format!(
                "{name} '{component}' cannot start with a dot"
            )));
        }

        if component.contains(['/', '\\', '\0', ':']) {
            return Err(ProfileError::invalid_input(format!(
                "{name} '{component}' contains a path separator or reserved character"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_keeps_arbitrary_names() {
        assert_eq!(
            SqlSecurity::quote_identifier("customer_id").unwrap(),
            "\"customer_id\""
        );
        assert_eq!(
            SqlSecurity::quote_identifier("Order Date").unwrap(),
            "\"Order Date\""
        );
        assert_eq!(
            SqlSecurity::quote_identifier("select").unwrap(),
            "\"select\""
        );
        assert_eq!(
            SqlSecurity::quote_identifier("a\"b").unwrap(),
            "\"a\"\"b\""
        );
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(SqlSecurity::quote_identifier("").is_err());
        assert!(SqlSecurity::quote_identifier(&"a".repeat(300)).is_err());
        assert!(SqlSecurity::quote_identifier("bad\0name").is_err());
    }

    #[test]
    fn test_quote_literal() {
        assert_eq!(SqlSecurity::quote_literal("AANN").unwrap(), "'AANN'");
        assert_eq!(SqlSecurity::quote_literal("it's").unwrap(), "'it''s'");
        assert!(SqlSecurity::quote_literal("x\0").is_err());
    }

    #[test]
    fn test_signature_validation() {
        assert!(SqlSecurity::validate_signature("AANN").is_ok());
        assert!(SqlSecurity::validate_signature("aaaNNN").is_ok());
        assert!(SqlSecurity::validate_signature("").is_ok());

        assert!(SqlSecurity::validate_signature("AA-NN").is_err());
        assert!(SqlSecurity::validate_signature("x' OR '1'='1").is_err());
        assert!(SqlSecurity::validate_signature(&"A".repeat(5000)).is_err());
    }

    #[test]
    fn test_path_components() {
        assert!(PathSecurity::validate_component("postgres_prod", "connection").is_ok());
        assert!(PathSecurity::validate_component("public", "schema").is_ok());
        assert!(PathSecurity::validate_component("Order Lines", "table").is_ok());

        assert!(PathSecurity::validate_component("", "schema").is_err());
        assert!(PathSecurity::validate_component("   ", "schema").is_err());
        assert!(PathSecurity::validate_component("..", "schema").is_err());
        assert!(PathSecurity::validate_component(".hidden", "table").is_err());
        assert!(PathSecurity::validate_component("a/b", "table").is_err());
        assert!(PathSecurity::validate_component("a\\b", "table").is_err());
        assert!(PathSecurity::validate_component("c:", "table").is_err());
    }
}
