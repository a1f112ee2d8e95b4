//! Character-class generalization of values.
//!
//! A signature keeps the shape of a value while discarding its content:
//! lowercase ASCII letters become `a`, uppercase ASCII letters become `A` and
//! ASCII digits become `N`. Two variants exist and they are not
//! interchangeable:
//!
//! - [`PatternVariant::Stored`] leaves every other character in place
//!   (`"AB-12"` → `"AA-NN"`). It builds the Pattern Artifact and the
//!   pattern-distinct-count of every Summary Record.
//! - [`PatternVariant::Strict`] first drops every character that is not an
//!   ASCII letter or digit (`"AB-12"` → `"AANN"`). It is only used when looking
//!   up the raw values behind a pattern.
//!
//! Comparing a stored signature with a strict one only works when the value
//! contains no punctuation, whitespace or non-ASCII characters.
//!
//! Folding is a single pass over the characters, so a digit folded to `N` is
//! never re-classified as an uppercase letter within the same call. Applying a
//! signature to its own output does fold `N` to `A`, so a signature is only a
//! fixed point when it contains no `N`; a second application always is one.
//!
//! # Example
//!
//! ```rust
//! use term_profile::patterns::{signature, strict_signature};
//!
//! assert_eq!(signature("Ab-12 x"), "Aa-NN a");
//! assert_eq!(strict_signature("Ab-12 x"), "AaNNa");
//! ```

mod artifact;
mod udf;

pub use artifact::{pattern_columns, write_pattern_artifact};
pub use udf::{
    register_pattern_functions, PatternSignatureUdf, PATTERN_SIGNATURE_FUNCTION,
    STRICT_PATTERN_SIGNATURE_FUNCTION,
};

use serde::{Deserialize, Serialize};

/// Which signature variant to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternVariant {
    /// Fold letters and digits, keep everything else.
    Stored,
    /// Drop non-alphanumeric characters, then fold letters and digits.
    Strict,
}

impl PatternVariant {
    /// Computes the signature of `value` for this variant.
    pub fn apply(self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        for ch in value.chars() {
            match fold(ch) {
                Some(folded) => out.push(folded),
                None if self == PatternVariant::Stored => out.push(ch),
                None => {}
            }
        }
        out
    }

    /// Name of the DataFusion scalar function computing this variant.
    pub fn function_name(self) -> &'static str {
        match self {
            PatternVariant::Stored => PATTERN_SIGNATURE_FUNCTION,
            PatternVariant::Strict => STRICT_PATTERN_SIGNATURE_FUNCTION,
        }
    }
}

fn fold(ch: char) -> Option<char> {
    if ch.is_ascii_lowercase() {
        Some('a')
    } else if ch.is_ascii_uppercase() {
        Some('A')
    } else if ch.is_ascii_digit() {
        Some('N')
    } else {
        None
    }
}

/// Stored-variant signature of a value.
pub fn signature(value: &str) -> String {
    PatternVariant::Stored.apply(value)
}

/// Strict-variant signature of a value, used by pattern-match lookups.
pub fn strict_signature(value: &str) -> String {
    PatternVariant::Strict.apply(value)
}
