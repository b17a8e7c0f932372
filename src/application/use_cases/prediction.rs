// ============================================================
// PREDICTION USE CASE
// ============================================================

use std::sync::Arc;
use tracing::debug;
use validator::Validate;

use crate::domain::error::{AppError, Result};
use crate::domain::inference::{InferenceFeatures, InferenceRequest, InferenceResponse};
use crate::domain::model::ClassifierModel;

pub struct PredictionUseCase {
    model: Arc<ClassifierModel>,
    range_checks: bool,
}

impl PredictionUseCase {
    /// Fails when the model expects a feature the request does not carry.
    pub fn new(model: Arc<ClassifierModel>) -> Result<Self> {
        if let Some(unknown) = model
            .feature_names
            .iter()
            .find(|name| !InferenceFeatures::NAMES.contains(&name.as_str()))
        {
            return Err(AppError::ModelError(format!(
                "Model feature '{}' is not provided by inference requests",
                unknown
            )));
        }
        Ok(Self {
            model,
            range_checks: false,
        })
    }

    /// Reject physically implausible features (negative Kelvin, torque, ...).
    pub fn with_range_checks(mut self, enabled: bool) -> Self {
        self.range_checks = enabled;
        self
    }

    /// Feature row in the model's column order.
    pub fn feature_row(&self, features: &InferenceFeatures) -> Result<Vec<f64>> {
        self.model
            .feature_names
            .iter()
            .map(|name| {
                features.value_of(name).ok_or_else(|| {
                    AppError::ModelError(format!("Unknown model feature '{}'", name))
                })
            })
            .collect()
    }

    pub fn predict(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        if self.range_checks {
            request.validate()?;
        }

        let row = self.feature_row(&request.features)?;
        let label = self.model.predict(&row)?;
        debug!(request_id = request.request_id, label, "Prediction computed");

        Ok(InferenceResponse {
            response_id: request.request_id,
            label,
        })
    }
}
