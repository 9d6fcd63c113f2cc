// Filter and aggregation - Pure series transforms shared by every execution context
use crate::domain::point::{AggregationPeriod, FilterSpec, Metadata, Point, Series};
use std::collections::BTreeMap;
use thiserror::Error;

const MAX_FILTER_CATEGORIES: usize = 10;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterIssue {
    #[error("Min value cannot be greater than max value")]
    InvertedValueRange,
    #[error("Min value cannot be negative")]
    NegativeMinimum,
    #[error("Too many categories selected ({0})")]
    TooManyCategories(usize),
}

/// Keeps the points satisfying every constraint present in `spec`.
pub fn filter(series: &[Point], spec: &FilterSpec) -> Series {
    if spec.is_unconstrained() {
        return series.to_vec();
    }
    series.iter().filter(|p| spec.matches(p)).cloned().collect()
}

#[derive(Default)]
struct Bucket {
    sum: f64,
    count: u64,
}

/// Category of the earliest point in the series; equal timestamps prefer the smaller category.
fn leading_category(series: &[Point]) -> Option<String> {
    series
        .iter()
        .min_by(|a, b| {
            a.timestamp
                .cmp(&b.timestamp)
                .then_with(|| a.category.cmp(&b.category))
        })
        .and_then(|point| point.category.clone())
}

/// Mean value per fixed-width time bucket, ascending by bucket start.
///
/// A non-positive bucket width is rejected by returning the input unchanged.
pub fn aggregate(series: &[Point], period: &AggregationPeriod) -> Series {
    if !period.is_valid() {
        tracing::warn!(
            "Ignoring aggregation period '{}' with bucket size {}ms",
            period.label,
            period.bucket_size_ms
        );
        return series.to_vec();
    }

    let category = leading_category(series);
    let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
    for point in series {
        let start = point.timestamp.div_euclid(period.bucket_size_ms) * period.bucket_size_ms;
        let bucket = buckets.entry(start).or_default();
        bucket.sum += point.value;
        bucket.count += 1;
    }

    buckets
        .into_iter()
        .map(|(start, bucket)| {
            let mut metadata = Metadata::new();
            metadata.insert("originalCount".to_string(), bucket.count.into());
            metadata.insert("aggregated".to_string(), true.into());

            Point {
                timestamp: start,
                value: bucket.sum / bucket.count as f64,
                category: category.clone(),
                metadata: Some(metadata),
            }
        })
        .collect()
}

/// Filter followed by an optional aggregation.
pub fn process(series: &[Point], spec: &FilterSpec, period: Option<&AggregationPeriod>) -> Series {
    let filtered = filter(series, spec);
    match period {
        Some(period) => aggregate(&filtered, period),
        None => filtered,
    }
}

pub fn validate_filters(spec: &FilterSpec) -> Vec<FilterIssue> {
    let mut issues = Vec::new();

    if let (Some(min), Some(max)) = (spec.min_value, spec.max_value) {
        if min > max {
            issues.push(FilterIssue::InvertedValueRange);
        }
    }
    if spec.min_value.is_some_and(|min| min < 0.0) {
        issues.push(FilterIssue::NegativeMinimum);
    }
    if let Some(categories) = &spec.categories {
        if categories.len() > MAX_FILTER_CATEGORIES {
            issues.push(FilterIssue::TooManyCategories(categories.len()));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::series_generator::{GeneratorConfig, SeriesGenerator};
    use crate::domain::point::TimeRange;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;

    fn sample(count: usize) -> Series {
        SeriesGenerator::with_seed(GeneratorConfig::default(), 11).points(count, 0, 1000)
    }

    fn specs() -> Vec<FilterSpec> {
        vec![
            FilterSpec::default(),
            FilterSpec {
                min_value: Some(100.0),
                ..Default::default()
            },
            FilterSpec {
                min_value: Some(95.0),
                max_value: Some(110.0),
                ..Default::default()
            },
            FilterSpec {
                categories: Some(["A".to_string(), "C".to_string()].into_iter().collect()),
                time_range: Some(TimeRange::new(10_000, 60_000)),
                ..Default::default()
            },
            FilterSpec {
                min_value: Some(500.0),
                max_value: Some(0.0),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_filter_is_idempotent() {
        let series = sample(300);
        for spec in specs() {
            let once = filter(&series, &spec);
            assert_eq!(filter(&once, &spec), once);
        }
    }

    #[test]
    fn test_filter_bounds_are_inclusive() {
        let series = vec![Point::new(0, 1.0), Point::new(5, 2.0), Point::new(10, 3.0)];
        let spec = FilterSpec {
            min_value: Some(1.0),
            max_value: Some(3.0),
            time_range: Some(TimeRange::new(0, 10)),
            ..Default::default()
        };
        assert_eq!(filter(&series, &spec).len(), 3);

        let spec = FilterSpec {
            time_range: Some(TimeRange::new(1, 9)),
            ..Default::default()
        };
        assert_eq!(filter(&series, &spec), vec![Point::new(5, 2.0)]);
    }

    #[test]
    fn test_constraints_compose() {
        let series = sample(200);
        let spec = &specs()[3];
        let result = filter(&series, spec);
        assert!(!result.is_empty());
        for p in &result {
            assert!(p.timestamp >= 10_000 && p.timestamp <= 60_000);
            assert!(matches!(p.category.as_deref(), Some("A") | Some("C")));
        }
    }

    #[test]
    fn test_empty_inputs() {
        assert!(filter(&[], &specs()[2]).is_empty());
        assert!(aggregate(&[], &AggregationPeriod::custom(1000)).is_empty());
    }

    #[test]
    fn test_aggregate_means_and_metadata() {
        let series = vec![
            Point::new(0, 1.0).with_category("B"),
            Point::new(400, 3.0).with_category("A"),
            Point::new(1000, 10.0),
        ];
        let result = aggregate(&series, &AggregationPeriod::custom(1000));
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].timestamp, 0);
        assert_relative_eq!(result[0].value, 2.0);
        assert_eq!(result[0].category.as_deref(), Some("B"));
        assert_eq!(result[0].meta("originalCount"), Some(&serde_json::json!(2)));
        assert_eq!(result[0].meta("aggregated"), Some(&serde_json::json!(true)));
        assert_eq!(result[1].category.as_deref(), Some("B"));
    }

    #[test]
    fn test_aggregate_carries_one_category_for_every_bucket() {
        let categories = ["A", "B", "C", "D"];
        let series: Series = (0..20)
            .map(|i| Point::new(i * 1000, i as f64).with_category(categories[i as usize % 4]))
            .collect();

        let result = aggregate(&series, &AggregationPeriod::custom(10_000));
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|p| p.category.as_deref() == Some("A")));

        let mut reversed = series.clone();
        reversed.reverse();
        let result = aggregate(&reversed, &AggregationPeriod::custom(10_000));
        assert!(result.iter().all(|p| p.category.as_deref() == Some("A")));
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let series = sample(500);
        let period = AggregationPeriod::custom(7_000);
        let expected = aggregate(&series, &period);

        let mut shuffled = series.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(5));
        let actual = aggregate(&shuffled, &period);

        assert_eq!(expected.len(), actual.len());
        for (e, a) in expected.iter().zip(&actual) {
            assert_eq!(e.timestamp, a.timestamp);
            assert_eq!(e.category, a.category);
            assert_eq!(e.metadata, a.metadata);
            assert_relative_eq!(e.value, a.value, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_negative_timestamps_floor_down() {
        let result = aggregate(&[Point::new(-1, 4.0)], &AggregationPeriod::custom(1000));
        assert_eq!(result[0].timestamp, -1000);
    }

    #[test]
    fn test_invalid_period_returns_input() {
        let series = sample(10);
        assert_eq!(aggregate(&series, &AggregationPeriod::custom(0)), series);
        assert_eq!(aggregate(&series, &AggregationPeriod::custom(-5)), series);
    }

    #[test]
    fn test_generated_flat_series_aggregates_to_ten_buckets() {
        let config = GeneratorConfig {
            trend: 0.0,
            noise: 0.0,
            seasonality: 0.0,
            spike_probability: 0.0,
            ..Default::default()
        };
        let series = SeriesGenerator::with_seed(config, 0).points(100, 0, 1000);
        let result = aggregate(&series, &AggregationPeriod::custom(10_000));

        assert_eq!(result.len(), 10);
        for (i, p) in result.iter().enumerate() {
            assert_eq!(p.timestamp, i as i64 * 10_000);
            let mean = series[i * 10..(i + 1) * 10].iter().map(|p| p.value).sum::<f64>() / 10.0;
            assert_relative_eq!(p.value, mean);
            assert_eq!(p.meta("originalCount"), Some(&serde_json::json!(10)));
        }
    }

    #[test]
    fn test_process_chains_filter_then_aggregate() {
        let series = vec![Point::new(0, 1.0), Point::new(10, 100.0), Point::new(20, 3.0)];
        let spec = FilterSpec {
            max_value: Some(50.0),
            ..Default::default()
        };
        let result = process(&series, &spec, Some(&AggregationPeriod::custom(1000)));
        assert_eq!(result.len(), 1);
        assert_relative_eq!(result[0].value, 2.0);
        assert_eq!(process(&series, &spec, None).len(), 2);
    }

    #[test]
    fn test_validate_filters() {
        assert!(validate_filters(&FilterSpec::default()).is_empty());

        let spec = FilterSpec {
            min_value: Some(-1.0),
            max_value: Some(-5.0),
            categories: Some((0..11).map(|i| i.to_string()).collect()),
            ..Default::default()
        };
        assert_eq!(
            validate_filters(&spec),
            vec![
                FilterIssue::InvertedValueRange,
                FilterIssue::NegativeMinimum,
                FilterIssue::TooManyCategories(11)
            ]
        );
    }
}
