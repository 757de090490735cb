//! Period-over-period trend calculation.
//!
//! A trend compares a metric for the current window with the same metric for
//! the window immediately before it and reports the absolute percentage
//! change plus whether the movement is good news.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column prefix the warehouse uses for previous-period aggregates.
pub const PREVIOUS_PREFIX: &str = "prev_";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    /// Absolute percentage change, never negative.
    pub value: f64,
    #[serde(rename = "isPositive")]
    pub is_positive: bool,
}

impl TrendResult {
    /// No baseline to compare against.
    pub const FLAT: Self = Self {
        value: 0.0,
        is_positive: true,
    };
}

impl Default for TrendResult {
    fn default() -> Self {
        Self::FLAT
    }
}

/// Which direction of change counts as positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Polarity {
    #[default]
    HigherIsBetter,
    /// Bounce rate, error counts and similar.
    LowerIsBetter,
}

impl Polarity {
    pub fn is_inverted(self) -> bool {
        self == Polarity::LowerIsBetter
    }
}

impl From<bool> for Polarity {
    fn from(invert_positive: bool) -> Self {
        if invert_positive {
            Polarity::LowerIsBetter
        } else {
            Polarity::HigherIsBetter
        }
    }
}

/// Compares `current` with `previous`.
///
/// A zero or NaN baseline yields [`TrendResult::FLAT`], as does any input
/// that would make the change non-finite.
pub fn trend(current: f64, previous: f64, invert_positive: bool) -> TrendResult {
    trend_with(current, previous, Polarity::from(invert_positive))
}

/// [`trend`] for a baseline that may be missing entirely.
pub fn trend_opt(current: f64, previous: Option<f64>, invert_positive: bool) -> TrendResult {
    match previous {
        Some(previous) => trend(current, previous, invert_positive),
        None => TrendResult::FLAT,
    }
}

pub fn trend_with(current: f64, previous: f64, polarity: Polarity) -> TrendResult {
    if previous == 0.0 || previous.is_nan() {
        return TrendResult::FLAT;
    }

    let change = (current - previous) / previous * 100.0;
    if !change.is_finite() {
        return TrendResult::FLAT;
    }

    TrendResult {
        value: change.abs(),
        is_positive: if polarity.is_inverted() {
            change <= 0.0
        } else {
            change >= 0.0
        },
    }
}

/// Named trends in insertion order, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrendSet(IndexMap<String, TrendResult>);

impl TrendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the trend for `name`.
    pub fn push(&mut self, name: impl Into<String>, current: f64, previous: f64, polarity: Polarity) {
        self.0
            .insert(name.into(), trend_with(current, previous, polarity));
    }

    pub fn with(mut self, name: impl Into<String>, current: f64, previous: f64, polarity: Polarity) -> Self {
        self.push(name, current, previous, polarity);
        self
    }

    /// Builds trends for `fields` from a current-period row and a
    /// previous-period row whose columns carry the `prev_` prefix.
    ///
    /// Missing columns and values that are not numbers read as zero.
    pub fn from_rows(current: &Map<String, Value>, previous: &Map<String, Value>, fields: &[(&str, Polarity)]) -> Self {
        let mut set = Self::new();
        for (field, polarity) in fields {
            let now = numeric(current.get(*field));
            let before = numeric(previous.get(&format!("{PREVIOUS_PREFIX}{field}")));
            set.push(*field, now, before, *polarity);
        }
        set
    }

    pub fn get(&self, name: &str) -> Option<&TrendResult> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrendResult)> {
        self.0.iter().map(|(name, t)| (name.as_str(), t))
    }
}

/// Warehouse drivers return NUMERIC and BIGNUMERIC columns as strings.
fn numeric(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
