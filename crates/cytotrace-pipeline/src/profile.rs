//! Per-feature dataset statistics used to drive an input form.
//!
//! Each input ranges over `[0, max]` and starts at the dataset mean. The
//! radar series normalise an input against the dataset's observed
//! `[min, max]` per feature, grouped into mean / standard-error / worst
//! series of ten measurements each.

use cytotrace_core::{
    display_label, CytoError, FeatureGroup, FeatureVector, Result, FEATURE_COUNT, FEATURE_NAMES,
    MEASUREMENTS, MEASUREMENT_COUNT,
};
use serde::Serialize;

use crate::dataset::Dataset;

/// Observed statistics of one feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureStats {
    pub name: &'static str,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Statistics for every feature, in canonical order.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureProfile {
    pub features: Vec<FeatureStats>,
}

/// Min-max normalised input, split by statistic group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RadarSeries {
    /// Axis labels, e.g. `"Concave Points"`.
    pub categories: Vec<String>,
    pub mean: Vec<f64>,
    pub standard_error: Vec<f64>,
    pub worst: Vec<f64>,
}

impl FeatureProfile {
    /// Compute statistics over every row of the dataset.
    pub fn from_dataset(dataset: &Dataset) -> Result<Self> {
        if dataset.is_empty() {
            return Err(CytoError::Dataset(
                "cannot profile an empty dataset".to_string(),
            ));
        }
        let n = dataset.len() as f64;
        let mut min = [f64::INFINITY; FEATURE_COUNT];
        let mut max = [f64::NEG_INFINITY; FEATURE_COUNT];
        let mut sum = [0.0; FEATURE_COUNT];
        for sample in dataset.samples() {
            for (i, v) in sample.features.as_slice().iter().enumerate() {
                min[i] = min[i].min(*v);
                max[i] = max[i].max(*v);
                sum[i] += v;
            }
        }

        let features = FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| FeatureStats {
                name: *name,
                label: display_label(name).unwrap_or_else(|| name.to_string()),
                min: min[i],
                max: max[i],
                mean: sum[i] / n,
            })
            .collect();
        Ok(Self { features })
    }

    /// Allowed input range for a feature: `(0, max)`.
    pub fn input_range(&self, name: &str) -> Option<(f64, f64)> {
        self.features
            .iter()
            .find(|s| s.name == name)
            .map(|s| (0.0, s.max))
    }

    /// Default input: every feature at its dataset mean.
    pub fn defaults(&self) -> Result<FeatureVector> {
        let means: Vec<f64> = self.features.iter().map(|s| s.mean).collect();
        FeatureVector::from_slice(&means)
    }

    /// `(v - min) / (max - min)` per feature; not clamped, so inputs outside
    /// the observed range fall below 0 or above 1. Constant features map to 0.
    pub fn normalize(&self, input: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let mut out = [0.0; FEATURE_COUNT];
        for ((slot, v), stats) in out
            .iter_mut()
            .zip(input.as_slice().iter())
            .zip(self.features.iter())
        {
            let range = stats.max - stats.min;
            *slot = if range > 0.0 {
                (v - stats.min) / range
            } else {
                0.0
            };
        }
        out
    }

    /// Normalised input grouped into the three radar series.
    pub fn radar(&self, input: &FeatureVector) -> RadarSeries {
        let normalized = self.normalize(input);
        let series = |group: FeatureGroup| {
            let start = group.offset();
            normalized[start..start + MEASUREMENT_COUNT].to_vec()
        };
        RadarSeries {
            categories: MEASUREMENTS.iter().map(|m| title_case(m)).collect(),
            mean: series(FeatureGroup::Mean),
            standard_error: series(FeatureGroup::StandardError),
            worst: series(FeatureGroup::Worst),
        }
    }
}

fn title_case(measurement: &str) -> String {
    measurement
        .split(|c: char| c == ' ' || c == '_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::DatasetLoader;
    use crate::fixtures::synthetic_csv;

    fn profile() -> FeatureProfile {
        let dataset = DatasetLoader::load_from_bytes(synthetic_csv(50, 9).as_bytes()).unwrap();
        FeatureProfile::from_dataset(&dataset).unwrap()
    }

    #[test]
    fn test_stats_are_ordered() {
        let p = profile();
        assert_eq!(p.features.len(), FEATURE_COUNT);
        for s in &p.features {
            assert!(s.min <= s.mean && s.mean <= s.max);
        }
        assert_eq!(p.features[7].label, "Concave points (mean)");
    }

    #[test]
    fn test_input_range_and_defaults() {
        let p = profile();
        let (lo, hi) = p.input_range("area_worst").unwrap();
        assert_eq!(lo, 0.0);
        assert_eq!(hi, p.features[23].max);
        assert!(p.input_range("nope").is_none());

        let defaults = p.defaults().unwrap();
        assert_eq!(defaults.get("radius_se"), Some(p.features[10].mean));
    }

    #[test]
    fn test_normalize_bounds() {
        let p = profile();
        let mins: Vec<f64> = p.features.iter().map(|s| s.min).collect();
        let maxs: Vec<f64> = p.features.iter().map(|s| s.max).collect();
        let at_min = p.normalize(&FeatureVector::from_slice(&mins).unwrap());
        let at_max = p.normalize(&FeatureVector::from_slice(&maxs).unwrap());
        assert!(at_min.iter().all(|v| v.abs() < 1e-12));
        assert!(at_max.iter().all(|v| (v - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_zero_radius_lands_at_bottom_of_range() {
        let p = profile();
        let mut values: Vec<f64> = p.features.iter().map(|s| s.min).collect();
        values[0] = 0.0;
        let normalized = p.normalize(&FeatureVector::from_slice(&values).unwrap());
        assert!(normalized[0] < 0.0);
        assert!(normalized[1..].iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_radar_groups() {
        let p = profile();
        let radar = p.radar(&p.defaults().unwrap());
        assert_eq!(radar.categories.len(), MEASUREMENT_COUNT);
        assert_eq!(radar.categories[7], "Concave Points");
        assert_eq!(radar.categories[9], "Fractal Dimension");
        assert_eq!(radar.mean.len(), MEASUREMENT_COUNT);
        assert_eq!(radar.standard_error.len(), MEASUREMENT_COUNT);
        assert_eq!(radar.worst.len(), MEASUREMENT_COUNT);
        assert!(radar.worst.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
