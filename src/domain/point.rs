// Time-series domain models
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Metadata attached to a point, e.g. `{index, hasSpike}` or `{originalCount, aggregated}`.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// A single sample. Never mutated once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Point {
    pub timestamp: i64,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Point {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            value,
            category: None,
            metadata: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}

/// Points ordered by non-decreasing timestamp.
pub type Series = Vec<Point>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        timestamp >= self.start && timestamp <= self.end
    }
}

/// Fixed bucket width used by aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationPeriod {
    #[serde(default)]
    pub label: String,
    #[serde(rename = "milliseconds")]
    pub bucket_size_ms: i64,
}

impl AggregationPeriod {
    pub fn new(label: impl Into<String>, bucket_size_ms: i64) -> Self {
        Self {
            label: label.into(),
            bucket_size_ms,
        }
    }

    pub fn custom(bucket_size_ms: i64) -> Self {
        Self::new("Custom", bucket_size_ms)
    }

    pub fn is_valid(&self) -> bool {
        self.bucket_size_ms > 0
    }

    pub fn presets() -> Vec<AggregationPeriod> {
        vec![
            Self::new("1 minute", 60 * 1000),
            Self::new("5 minutes", 5 * 60 * 1000),
            Self::new("1 hour", 60 * 60 * 1000),
        ]
    }
}

/// Absent fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSpec {
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub categories: Option<BTreeSet<String>>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
}

impl FilterSpec {
    pub fn is_unconstrained(&self) -> bool {
        self.min_value.is_none()
            && self.max_value.is_none()
            && self.categories.as_ref().is_none_or(|c| c.is_empty())
            && self.time_range.is_none()
    }

    pub fn matches(&self, point: &Point) -> bool {
        if let Some(range) = &self.time_range {
            if !range.contains(point.timestamp) {
                return false;
            }
        }
        if let Some(min) = self.min_value {
            if point.value < min {
                return false;
            }
        }
        if let Some(max) = self.max_value {
            if point.value > max {
                return false;
            }
        }
        match &self.categories {
            Some(categories) if !categories.is_empty() => point
                .category
                .as_ref()
                .is_some_and(|c| categories.contains(c)),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_wire_format() {
        let point = Point::new(1_000, 12.5).with_category("A");
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json, serde_json::json!({"timestamp": 1000, "value": 12.5, "category": "A"}));

        let parsed: Point = serde_json::from_value(serde_json::json!({"timestamp": 5, "value": 1.0})).unwrap();
        assert_eq!(parsed.category, None);
        assert_eq!(parsed.metadata, None);
    }

    #[test]
    fn test_period_wire_format() {
        let period: AggregationPeriod =
            serde_json::from_value(serde_json::json!({"label": "1 minute", "milliseconds": 60000})).unwrap();
        assert_eq!(period.bucket_size_ms, 60_000);
        assert!(period.is_valid());
        assert!(!AggregationPeriod::custom(0).is_valid());
    }

    #[test]
    fn test_empty_categories_do_not_constrain() {
        let spec = FilterSpec {
            categories: Some(BTreeSet::new()),
            ..Default::default()
        };
        assert!(spec.is_unconstrained());
        assert!(spec.matches(&Point::new(0, 1.0)));
    }

    #[test]
    fn test_uncategorized_point_fails_category_filter() {
        let spec = FilterSpec {
            categories: Some(["A".to_string()].into_iter().collect()),
            ..Default::default()
        };
        assert!(!spec.matches(&Point::new(0, 1.0)));
        assert!(spec.matches(&Point::new(0, 1.0).with_category("A")));
    }
}
