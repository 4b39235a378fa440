//! Score records and the numeric helpers used to aggregate them.
//!
//! The scorer reports a nested `category -> metric -> value` structure per
//! sample. Values arrive as JSON numbers, `null`, or text placeholders; all of
//! them are coerced to `f64`, with anything non-numeric becoming NaN.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

/// Category whose F-score feeds the aggregate.
pub const AGGREGATE_CATEGORY: &str = "All";

/// Metric within [`AGGREGATE_CATEGORY`] that feeds the aggregate.
pub const AGGREGATE_METRIC: &str = "f";

/// Metric name -> value (e.g. `"pr"`, `"re"`, `"f"`).
pub type MetricScores = BTreeMap<String, f64>;

/// Category name -> metric scores for one sample.
pub type SampleScores = BTreeMap<String, MetricScores>;

/// Result of scoring one batch.
#[derive(Debug, Clone, Serialize)]
pub struct MetricOutput {
    /// Mean of every sample's `All.f`. NaN if any sample's value is NaN.
    pub average: f64,
    /// Per-sample scores, in the order the samples were given.
    pub per_sample: Vec<SampleScores>,
}

impl MetricOutput {
    /// Number of scored samples.
    pub fn len(&self) -> usize {
        self.per_sample.len()
    }

    /// Whether the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.per_sample.is_empty()
    }
}

/// Convert a reported score leaf to a float.
///
/// Numbers convert directly and numeric strings are parsed. Everything else
/// (`null`, `"null"`, booleans, arrays, objects) becomes NaN rather than an
/// error so one bad leaf cannot abort parsing a whole batch.
pub fn float_convert(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Arithmetic mean that propagates NaN. An empty input yields NaN.
pub fn nan_mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0_f64, 0_usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Convert a raw `category -> metric -> value` map into floats.
pub fn convert_sample(raw: &BTreeMap<String, BTreeMap<String, Value>>) -> SampleScores {
    raw.iter()
        .map(|(category, metrics)| {
            let converted = metrics
                .iter()
                .map(|(name, value)| (name.clone(), float_convert(value)))
                .collect();
            (category.clone(), converted)
        })
        .collect()
}

/// The `All.f` value of a sample, NaN when the scorer did not report it.
pub fn aggregate_value(sample: &SampleScores) -> f64 {
    sample
        .get(AGGREGATE_CATEGORY)
        .and_then(|metrics| metrics.get(AGGREGATE_METRIC))
        .copied()
        .unwrap_or(f64::NAN)
}
