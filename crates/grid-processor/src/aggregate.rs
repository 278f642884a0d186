//! Horizontal aggregation of per-level values.
//!
//! Aggregates reduce each vertical level of a field over a horizontal
//! subregion to a single number. NaN values are skipped; a level with no
//! valid values reduces to NaN.

use serde::{Deserialize, Serialize};

/// Reduction applied over a horizontal subregion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationOp {
    Mean,
    Min,
    Max,
}

impl AggregationOp {
    /// All supported operations, in the order their fields are added.
    pub const ALL: [AggregationOp; 3] = [Self::Mean, Self::Max, Self::Min];

    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mean" | "avg" | "average" => Some(Self::Mean),
            "min" | "minimum" => Some(Self::Min),
            "max" | "maximum" => Some(Self::Max),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    /// Name of the aggregate field derived from `field`, e.g. `QV_max`.
    pub fn field_name(&self, field: &str) -> String {
        format!("{}_{}", field, self.as_str())
    }

    /// Reduce the values, skipping NaN.
    pub fn reduce<I>(&self, values: I) -> f64
    where
        I: IntoIterator<Item = f64>,
    {
        match self {
            Self::Mean => nan_mean(values),
            Self::Min => nan_fold(values, f64::min),
            Self::Max => nan_fold(values, f64::max),
        }
    }
}

impl std::fmt::Display for AggregationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[inline]
fn nan_mean<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;

    for v in values {
        if !v.is_nan() {
            sum += v;
            count += 1;
        }
    }

    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[inline]
fn nan_fold<I, F>(values: I, pick: F) -> f64
where
    I: IntoIterator<Item = f64>,
    F: Fn(f64, f64) -> f64,
{
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .reduce(pick)
        .unwrap_or(f64::NAN)
}
