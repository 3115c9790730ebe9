//! Numeric extraction from probe output

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HostdError, HostdResult};

/// A decimal followed by a megabyte unit, e.g. `215.04 MB`
static MEGABYTES_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:\.\d*)?)\s*MB").expect("MEGABYTES_REGEX is a valid regex pattern")
});

/// First signed integer or decimal in the text
static NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+(?:\.\d+)?").expect("NUMBER_REGEX is a valid regex pattern")
});

/// How a probe turns command stdout into a number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Extraction {
    /// First `<decimal> MB` token, unit stripped
    Megabytes,
    /// First numeric token
    Number,
    /// First numeric token; empty output counts as zero
    NumberOrZero,
}

impl Extraction {
    /// Extracts a value from `output`.
    ///
    /// # Errors
    ///
    /// Returns [`HostdError::Parse`] when the expected token is missing.
    pub fn extract(self, output: &str) -> HostdResult<f64> {
        let trimmed = output.trim();
        match self {
            Self::Megabytes => MEGABYTES_REGEX
                .captures(trimmed)
                .and_then(|caps| caps.get(1))
                .ok_or_else(|| HostdError::parse(trimmed, "expected '<decimal> MB'"))
                .and_then(|m| parse_number(m.as_str())),
            Self::Number => first_number(trimmed),
            Self::NumberOrZero if trimmed.is_empty() => Ok(0.0),
            Self::NumberOrZero => first_number(trimmed),
        }
    }
}

fn first_number(text: &str) -> HostdResult<f64> {
    NUMBER_REGEX
        .find(text)
        .ok_or_else(|| HostdError::parse(text, "expected a numeric token"))
        .and_then(|m| parse_number(m.as_str()))
}

fn parse_number(token: &str) -> HostdResult<f64> {
    token
        .parse::<f64>()
        .map_err(|e| HostdError::parse(token, e.to_string()))
}
