//! Aggregation functions.

use serde::{Deserialize, Serialize};

use crate::shared::models::{GraphError, Result};

/// Aggregation over 64-bit signed values.
///
/// SUM saturates at the i64 bounds instead of wrapping, so long accumulation
/// chains degrade to a pinned extreme rather than silently corrupting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggFunc {
    Sum,
    Min,
    Max,
    Gcd,
}

impl AggFunc {
    /// Neutral element under `combine`
    #[inline]
    pub fn identity(&self) -> i64 {
        match self {
            AggFunc::Sum => 0,
            AggFunc::Min => i64::MAX,
            AggFunc::Max => i64::MIN,
            AggFunc::Gcd => 0,
        }
    }

    #[inline]
    pub fn combine(&self, a: i64, b: i64) -> i64 {
        match self {
            AggFunc::Sum => a.saturating_add(b),
            AggFunc::Min => a.min(b),
            AggFunc::Max => a.max(b),
            AggFunc::Gcd => gcd(a, b),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunc::Sum => "SUM",
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
            AggFunc::Gcd => "GCD",
        }
    }

    /// Parse an aggregation name (case-insensitive)
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_uppercase().as_str() {
            "SUM" => Ok(AggFunc::Sum),
            "MIN" => Ok(AggFunc::Min),
            "MAX" => Ok(AggFunc::Max),
            "GCD" => Ok(AggFunc::Gcd),
            _ => Err(GraphError::InvalidAggFunc(name.to_string())),
        }
    }
}

/// Greatest common divisor on magnitudes; `gcd(x, 0) = |x|`.
fn gcd(a: i64, b: i64) -> i64 {
    let (mut a, mut b) = (a.unsigned_abs(), b.unsigned_abs());
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a as i64
}
