// Series generator - Synthetic time-series with trend, seasonality, noise and spikes
use crate::domain::point::{Metadata, Point, Series};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

const CATEGORIES: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    #[serde(alias = "base_value")]
    pub base_value: f64,
    pub trend: f64,
    pub noise: f64,
    pub seasonality: f64,
    #[serde(alias = "spike_probability")]
    pub spike_probability: f64,
    /// Fixed seed for reproducible output. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_value: 100.0,
            trend: 0.1,
            noise: 5.0,
            seasonality: 10.0,
            spike_probability: 0.02,
            seed: None,
        }
    }
}

pub struct SeriesGenerator<R: Rng = StdRng> {
    config: GeneratorConfig,
    rng: R,
}

impl SeriesGenerator<StdRng> {
    pub fn new(config: GeneratorConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { config, rng }
    }

    pub fn with_seed(config: GeneratorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> SeriesGenerator<R> {
    pub fn point(&mut self, timestamp_ms: i64, index: u64) -> Point {
        let seconds = timestamp_ms as f64 / 1000.0;
        let trend = self.config.trend * index as f64;
        let seasonal = self.config.seasonality * (seconds / 60.0).sin();
        let noise = (self.rng.r#gen::<f64>() - 0.5) * self.config.noise;
        let has_spike = self.rng.r#gen::<f64>() < self.config.spike_probability;
        let spike = if has_spike { self.config.noise * 10.0 } else { 0.0 };

        let value = (self.config.base_value + trend + seasonal + noise + spike).max(0.0);

        let mut metadata = Metadata::new();
        metadata.insert("index".to_string(), index.into());
        metadata.insert("hasSpike".to_string(), has_spike.into());

        Point::new(timestamp_ms, value)
            .with_category(Self::category(index))
            .with_metadata(metadata)
    }

    pub fn points(&mut self, count: usize, start_ms: i64, interval_ms: i64) -> Series {
        (0..count as u64)
            .map(|i| self.point(Self::timestamp(start_ms, interval_ms, i), i))
            .collect()
    }

    /// Unbounded stream of points spaced `interval_ms` apart.
    pub fn stream(&mut self, start_ms: i64, interval_ms: i64) -> impl Iterator<Item = Point> + '_ {
        (0u64..).map(move |i| self.point(Self::timestamp(start_ms, interval_ms, i), i))
    }

    fn timestamp(start_ms: i64, interval_ms: i64, index: u64) -> i64 {
        let offset = i64::try_from(index).unwrap_or(i64::MAX).saturating_mul(interval_ms);
        start_ms.saturating_add(offset)
    }

    fn category(index: u64) -> &'static str {
        CATEGORIES[(index % CATEGORIES.len() as u64) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> GeneratorConfig {
        GeneratorConfig {
            base_value: 100.0,
            trend: 0.0,
            noise: 0.0,
            seasonality: 0.0,
            spike_probability: 0.0,
            seed: None,
        }
    }

    #[test]
    fn test_flat_series_is_constant() {
        let mut generator = SeriesGenerator::with_seed(flat(), 1);
        let points = generator.points(100, 0, 1000);
        assert_eq!(points.len(), 100);
        assert!(points.iter().all(|p| p.value == 100.0));
        assert_eq!(points[99].timestamp, 99_000);
    }

    #[test]
    fn test_categories_cycle() {
        let mut generator = SeriesGenerator::with_seed(flat(), 1);
        let categories: Vec<_> = generator
            .points(6, 0, 10)
            .into_iter()
            .map(|p| p.category.unwrap())
            .collect();
        assert_eq!(categories, vec!["A", "B", "C", "D", "A", "B"]);
    }

    #[test]
    fn test_seeded_generators_are_reproducible() {
        let config = GeneratorConfig::default();
        let a = SeriesGenerator::with_seed(config.clone(), 42).points(50, 0, 100);
        let b = SeriesGenerator::with_seed(config, 42).points(50, 0, 100);
        assert_eq!(a, b);
    }

    #[test]
    fn test_value_never_negative() {
        let config = GeneratorConfig {
            base_value: 0.0,
            noise: 50.0,
            ..flat()
        };
        let mut generator = SeriesGenerator::with_seed(config, 7);
        assert!(generator.points(500, 0, 1).iter().all(|p| p.value >= 0.0));
    }

    #[test]
    fn test_spike_metadata() {
        let config = GeneratorConfig {
            spike_probability: 1.0,
            noise: 1.0,
            ..flat()
        };
        let mut generator = SeriesGenerator::with_seed(config, 3);
        let point = generator.point(0, 0);
        assert_eq!(point.meta("hasSpike"), Some(&serde_json::Value::Bool(true)));
        // base + noise in [-0.5, 0.5) + spike of 10
        assert!(point.value >= 109.5 && point.value < 110.5);
    }

    #[test]
    fn test_trend_and_seasonality() {
        let config = GeneratorConfig {
            trend: 1.0,
            seasonality: 10.0,
            ..flat()
        };
        let mut generator = SeriesGenerator::with_seed(config, 3);
        let point = generator.point(60_000, 5);
        let expected = 100.0 + 5.0 + 10.0 * 1.0f64.sin();
        assert!((point.value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_stream_spacing() {
        let mut generator = SeriesGenerator::with_seed(flat(), 9);
        let stamps: Vec<i64> = generator.stream(500, 100).take(3).map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![500, 600, 700]);
    }

    #[test]
    fn test_timestamps_saturate_instead_of_overflowing() {
        let mut generator = SeriesGenerator::with_seed(flat(), 1);
        let points = generator.points(3, i64::MAX - 10, i64::MAX);
        assert_eq!(points[0].timestamp, i64::MAX - 10);
        assert_eq!(points[1].timestamp, i64::MAX);
        assert_eq!(points[2].timestamp, i64::MAX);
    }
}
