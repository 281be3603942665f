use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// A canonical food-additive identifier (E-number).
///
/// Invariant: uppercase `E`, then 3-4 digits, then zero or more sub-variant
/// letters (`E322`, `E322I`, `E150D`). The only way to obtain one is through
/// [`normalize`], so every held value satisfies the shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AdditiveCode(String);

impl AdditiveCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base family code: sub-variant letters stripped (`E322I` -> `E322`).
    /// Total on valid codes; a code without a suffix is its own base.
    pub fn base(&self) -> AdditiveCode {
        AdditiveCode(
            self.0
                .trim_end_matches(|c: char| c.is_ascii_alphabetic())
                .to_string(),
        )
    }
}

impl fmt::Display for AdditiveCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AdditiveCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for AdditiveCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        normalize(&raw).ok_or_else(|| {
            serde::de::Error::custom(format!("not a recognizable additive code: '{}'", raw))
        })
    }
}

fn code_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| Regex::new(r"^E\d{3,4}[A-Z]*$").unwrap())
}

fn base_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| Regex::new(r"^(E\d{3,4})").unwrap())
}

/// Parses a raw token into a canonical [`AdditiveCode`], or `None` when the
/// token has no recognizable E-number shape.
///
/// Accepted inputs include `"E322"`, `"e322i"`, `"E-102"`, `"E 102"`, bare
/// digit runs like `"330"` (which gain the `E` prefix), and OpenFoodFacts
/// tags with a language prefix like `"en:e150d"`. Rejected tokens are a
/// caller-side skip, never an error.
pub fn normalize(token: &str) -> Option<AdditiveCode> {
    let token = token.trim();
    // Tag forms carry a language prefix ("en:e150d"); keep the last segment.
    let token = token.rsplit(':').next().unwrap_or(token);

    let mut cleaned: String = token
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if let Some(rest) = cleaned.strip_prefix("E-") {
        cleaned = format!("E{}", rest);
    }

    let first = cleaned.chars().next()?;
    let candidate = if first == 'E' {
        cleaned
    } else if first.is_ascii_digit() {
        format!("E{}", cleaned)
    } else {
        return None;
    };

    if code_shape().is_match(&candidate) {
        Some(AdditiveCode(candidate))
    } else {
        None
    }
}

/// Strips any sub-variant suffix from a raw code, falling back to the
/// cleaned-up uppercase input when it has no recognizable shape. Never fails;
/// meant for display paths that must not reject loose input.
pub fn base_of(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    match base_prefix().captures(&cleaned) {
        Some(caps) => caps[1].to_string(),
        None => cleaned,
    }
}

/// Expands a raw token into its full and base canonical forms: one code when
/// the token already is a base code, two when it carries a sub-variant
/// suffix, none when it does not normalize.
pub fn expand(token: &str) -> Vec<AdditiveCode> {
    let Some(code) = normalize(token) else {
        return Vec::new();
    };
    let base = code.base();
    if base == code {
        vec![code]
    } else {
        vec![code, base]
    }
}
