//! Serialized machine-failure classifier.
//!
//! The model file is a JSON export of a fitted support-vector classifier:
//! an optional standard scaler followed by either a linear or an RBF kernel
//! decision function.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::{AppError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Kernel {
    Linear {
        coef: Vec<f64>,
    },
    Rbf {
        gamma: f64,
        support_vectors: Vec<Vec<f64>>,
        dual_coef: Vec<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierModel {
    pub name: String,
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub scaler: Option<StandardScaler>,
    pub kernel: Kernel,
    pub intercept: f64,
    /// Decision values strictly above this map to `true`
    #[serde(default)]
    pub threshold: f64,
}

impl ClassifierModel {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let model: ClassifierModel = serde_json::from_slice(bytes)
            .map_err(|e| AppError::ModelError(format!("Failed to deserialize model: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Check that every parameter vector agrees with the feature count.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_features();
        if n == 0 {
            return Err(AppError::ModelError(format!(
                "Model '{}' declares no features",
                self.name
            )));
        }

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(AppError::ModelError(format!(
                    "Scaler expects {} mean / {} scale values, model has {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    n
                )));
            }
            if scaler.scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
                return Err(AppError::ModelError(
                    "Scaler contains a zero or non-finite scale".to_string(),
                ));
            }
        }

        match &self.kernel {
            Kernel::Linear { coef } => {
                if coef.len() != n {
                    return Err(AppError::ModelError(format!(
                        "Linear kernel has {} coefficients, model has {} features",
                        coef.len(),
                        n
                    )));
                }
            }
            Kernel::Rbf {
                gamma,
                support_vectors,
                dual_coef,
            } => {
                if !(*gamma > 0.0) {
                    return Err(AppError::ModelError("RBF gamma must be > 0".to_string()));
                }
                if support_vectors.is_empty() || support_vectors.len() != dual_coef.len() {
                    return Err(AppError::ModelError(format!(
                        "RBF kernel has {} support vectors and {} dual coefficients",
                        support_vectors.len(),
                        dual_coef.len()
                    )));
                }
                if let Some(bad) = support_vectors.iter().position(|sv| sv.len() != n) {
                    return Err(AppError::ModelError(format!(
                        "Support vector {} does not have {} features",
                        bad, n
                    )));
                }
            }
        }

        Ok(())
    }

    /// Signed distance of a single row from the separating surface.
    pub fn decision_function(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features() {
            return Err(AppError::ValidationError(format!(
                "Expected {} features, got {}",
                self.n_features(),
                row.len()
            )));
        }

        let x = self.standardize(row);
        let score = match &self.kernel {
            Kernel::Linear { coef } => dot(coef, &x),
            Kernel::Rbf {
                gamma,
                support_vectors,
                dual_coef,
            } => support_vectors
                .iter()
                .zip(dual_coef)
                .map(|(sv, alpha)| alpha * (-gamma * squared_distance(sv, &x)).exp())
                .sum(),
        };

        Ok(score + self.intercept)
    }

    pub fn predict(&self, row: &[f64]) -> Result<bool> {
        Ok(self.decision_function(row)? > self.threshold)
    }

    fn standardize(&self, row: &[f64]) -> Vec<f64> {
        match &self.scaler {
            Some(scaler) => row
                .iter()
                .zip(scaler.mean.iter().zip(&scaler.scale))
                .map(|(v, (mean, scale))| (v - mean) / scale)
                .collect(),
            None => row.to_vec(),
        }
    }
}

impl fmt::Display for ClassifierModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kernel = match &self.kernel {
            Kernel::Linear { .. } => "linear".to_string(),
            Kernel::Rbf {
                support_vectors, ..
            } => format!("rbf, {} support vectors", support_vectors.len()),
        };
        write!(f, "{} ({} features, {})", self.name, self.n_features(), kernel)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_model() -> ClassifierModel {
        ClassifierModel {
            name: "linear".to_string(),
            feature_names: vec!["a".to_string(), "b".to_string()],
            scaler: Some(StandardScaler {
                mean: vec![1.0, 1.0],
                scale: vec![2.0, 1.0],
            }),
            kernel: Kernel::Linear {
                coef: vec![1.0, -1.0],
            },
            intercept: 0.5,
            threshold: 0.0,
        }
    }

    #[test]
    fn test_linear_decision_function() {
        let model = linear_model();
        // ((5-1)/2)*1 + ((1-1)/1)*-1 + 0.5
        assert_eq!(model.decision_function(&[5.0, 1.0]).unwrap(), 2.5);
        assert!(model.predict(&[5.0, 1.0]).unwrap());
        // 0 - 3 + 0.5
        assert!(!model.predict(&[1.0, 4.0]).unwrap());
    }

    #[test]
    fn test_rbf_decision_function() {
        let model = ClassifierModel {
            name: "rbf".to_string(),
            feature_names: vec!["a".to_string()],
            scaler: None,
            kernel: Kernel::Rbf {
                gamma: 1.0,
                support_vectors: vec![vec![0.0], vec![2.0]],
                dual_coef: vec![1.0, -1.0],
            },
            intercept: 0.0,
            threshold: 0.0,
        };
        // at x=0: exp(0) - exp(-4) > 0
        assert!(model.predict(&[0.0]).unwrap());
        // at x=2: exp(-4) - exp(0) < 0
        assert!(!model.predict(&[2.0]).unwrap());
        // midpoint is symmetric
        assert!(model.decision_function(&[1.0]).unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_wrong_row_width_is_rejected() {
        let model = linear_model();
        assert!(matches!(
            model.decision_function(&[1.0]),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_from_json_validates_dimensions() {
        let json = br#"{
            "name": "broken",
            "feature_names": ["a", "b"],
            "kernel": {"type": "linear", "coef": [1.0]},
            "intercept": 0.0
        }"#;
        assert!(matches!(
            ClassifierModel::from_json(json),
            Err(AppError::ModelError(_))
        ));
    }

    #[test]
    fn test_from_json_round_trips_rbf() {
        let json = br#"{
            "name": "svc",
            "feature_names": ["a", "b"],
            "scaler": {"mean": [0.0, 0.0], "scale": [1.0, 1.0]},
            "kernel": {"type": "rbf", "gamma": 0.5, "support_vectors": [[0.0, 1.0]], "dual_coef": [1.0]},
            "intercept": -0.1
        }"#;
        let model = ClassifierModel::from_json(json).unwrap();
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.threshold, 0.0);
        assert_eq!(model.to_string(), "svc (2 features, rbf, 1 support vectors)");
    }
}
