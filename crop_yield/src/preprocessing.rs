use derive_new::new;
use serde::{Deserialize, Serialize};

use crate::error::PreprocessError;

/// Robust scaling, `(x - center) / scale`, keyed by the feature names seen at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct RobustScaler {
    pub feature_names: Vec<String>,
    pub center: Vec<f64>,
    pub scale: Vec<f64>,
}

impl RobustScaler {
    pub fn validate(&self) -> Result<(), String> {
        let n = self.feature_names.len();
        if n == 0 {
            return Err(String::from("scaler has no features"));
        }
        if self.center.len() != n || self.scale.len() != n {
            return Err(format!(
                "{} feature names but {} centers and {} scales",
                n,
                self.center.len(),
                self.scale.len()
            ));
        }
        if let Some(idx) = self.scale.iter().position(|s| *s == 0.0) {
            return Err(format!("zero scale for '{}'", self.feature_names[idx]));
        }
        Ok(())
    }

    /// Scales one row. Columns are matched by name and returned in the order given;
    /// fitted features missing from `names` are simply not produced.
    pub fn transform(&self, names: &[String], row: &[f64]) -> Result<Vec<f64>, PreprocessError> {
        names
            .iter()
            .zip(row)
            .map(|(name, value)| {
                let idx = self
                    .feature_names
                    .iter()
                    .position(|fitted| fitted == name)
                    .ok_or_else(|| PreprocessError::UnseenFeature(name.clone()))?;
                Ok((value - self.center[idx]) / self.scale[idx])
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct LabelEncoder {
    pub classes: Vec<String>,
}

impl LabelEncoder {
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err(String::from("label encoder has no classes"));
        }
        Ok(())
    }

    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct KMeans {
    pub centroids: Vec<Vec<f64>>,
}

impl KMeans {
    pub fn validate(&self) -> Result<(), String> {
        let width = match self.centroids.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return Err(String::from("k-means has no centroids")),
        };
        if self.centroids.iter().any(|c| c.len() != width) {
            return Err(String::from("centroids differ in width"));
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    /// Index of the nearest centroid by squared euclidean distance; ties go to the lowest index.
    pub fn predict(&self, row: &[f64]) -> Result<usize, PreprocessError> {
        if row.len() != self.n_features() {
            return Err(PreprocessError::ClusterWidth {
                expected: self.n_features(),
                got: row.len(),
            });
        }
        if let Some(idx) = row.iter().position(|v| !v.is_finite()) {
            return Err(PreprocessError::NonFinite(format!("cluster input column {idx}")));
        }

        let mut best = (0, f64::INFINITY);
        for (idx, centroid) in self.centroids.iter().enumerate() {
            let distance: f64 = centroid
                .iter()
                .zip(row)
                .map(|(c, x)| (c - x).powi(2))
                .sum();
            if distance < best.1 {
                best = (idx, distance);
            }
        }
        Ok(best.0)
    }
}

/// Fitted power transform. Loaded when present; the feature pipeline does not apply it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct PowerTransformer {
    pub method: String,
    pub lambdas: Vec<f64>,
}

impl PowerTransformer {
    pub fn validate(&self) -> Result<(), String> {
        if self.lambdas.is_empty() {
            return Err(String::from("power transformer has no lambdas"));
        }
        Ok(())
    }
}

/// Feature support mask. Loaded when present; the feature pipeline does not apply it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, new)]
pub struct FeatureSelector {
    pub support: Vec<bool>,
}

impl FeatureSelector {
    pub fn validate(&self) -> Result<(), String> {
        if self.support.is_empty() {
            return Err(String::from("feature selector has an empty support mask"));
        }
        Ok(())
    }

    pub fn n_selected(&self) -> usize {
        self.support.iter().filter(|kept| **kept).count()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn scaler() -> RobustScaler {
        RobustScaler::new(names(&["a", "b", "c"]), vec![1.0, 10.0, 0.0], vec![2.0, 5.0, 1.0])
    }

    #[test]
    fn test_scaler_matches_columns_by_name() {
        let out = scaler().transform(&names(&["c", "a"]), &[3.0, 5.0]).unwrap();
        assert_relative_eq!(out[0], 3.0);
        assert_relative_eq!(out[1], 2.0);
    }

    #[test]
    fn test_scaler_rejects_unseen_feature() {
        let err = scaler().transform(&names(&["a", "z"]), &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, PreprocessError::UnseenFeature(name) if name == "z"));
    }

    #[test]
    fn test_scaler_check() {
        assert!(scaler().validate().is_ok());
        let broken = RobustScaler::new(names(&["a", "b"]), vec![0.0], vec![1.0, 1.0]);
        assert!(broken.validate().is_err());
        let zero = RobustScaler::new(names(&["a"]), vec![0.0], vec![0.0]);
        assert_eq!(zero.validate().unwrap_err(), "zero scale for 'a'");
    }

    #[test]
    fn test_kmeans_nearest_centroid() {
        let kmeans = KMeans::new(vec![vec![0.0, 0.0], vec![10.0, 10.0], vec![-5.0, 4.0]]);
        assert_eq!(kmeans.predict(&[9.0, 8.0]).unwrap(), 1);
        assert_eq!(kmeans.predict(&[-4.0, 3.0]).unwrap(), 2);
        // equidistant from 0 and 1
        assert_eq!(kmeans.predict(&[5.0, 5.0]).unwrap(), 0);
    }

    #[test]
    fn test_kmeans_rejects_bad_rows() {
        let kmeans = KMeans::new(vec![vec![0.0, 0.0]]);
        assert!(matches!(
            kmeans.predict(&[1.0]),
            Err(PreprocessError::ClusterWidth { expected: 2, got: 1 })
        ));
        assert!(matches!(
            kmeans.predict(&[1.0, f64::NAN]),
            Err(PreprocessError::NonFinite(_))
        ));
    }

    #[test]
    fn test_label_encoder_inverse() {
        let encoder = LabelEncoder::new(names(&["Alto", "Bajo", "Medio"]));
        assert_eq!(encoder.inverse_transform(2), Some("Medio"));
        assert_eq!(encoder.inverse_transform(3), None);
        assert!(LabelEncoder::new(vec![]).validate().is_err());
    }

    #[test]
    fn test_feature_selector_counts_support() {
        let selector = FeatureSelector::new(vec![true, false, true, true]);
        assert_eq!(selector.n_selected(), 3);
    }
}
