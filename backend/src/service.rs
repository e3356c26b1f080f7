use log::{error, info};

use crate::error::ScoringError;
use crate::inference::{ModelState, OutputKind};
use crate::models::{
    CreditApplication, HealthStatus, ModelInfo, ScoringResult, Threshold, FEATURE_COUNT,
    FEATURE_NAMES,
};

/// Holds the model loaded at startup and the deployment threshold.
/// Shared read-only between workers.
#[derive(Debug, Clone)]
pub struct ScoringService {
    model: ModelState,
    threshold: Threshold,
    artifact: String,
    output: OutputKind,
}

impl ScoringService {
    pub fn new(model: ModelState, threshold: Threshold) -> Self {
        ScoringService {
            model,
            threshold,
            artifact: String::new(),
            output: OutputKind::Probabilities,
        }
    }

    /// Records where the model came from, for `/model-info`.
    pub fn with_artifact(mut self, artifact: impl Into<String>, output: OutputKind) -> Self {
        self.artifact = artifact.into();
        self.output = output;
        self
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_loaded()
    }

    /// Validates, scores and applies the threshold. The model is only
    /// reached once the application passed every check.
    pub fn score(&self, application: &CreditApplication) -> Result<ScoringResult, ScoringError> {
        application.validate()?;

        let classifier = match &self.model {
            ModelState::Ready(classifier) => classifier,
            ModelState::Unavailable { cause } => {
                return Err(ScoringError::ModelUnavailable {
                    cause: cause.clone(),
                })
            }
        };

        let probability = classifier
            .predict_proba(&application.to_array())
            .map_err(|e| {
                error!("Model invocation failed: {:#}", e);
                ScoringError::invocation(format!("{:#}", e))
            })?;

        if !(0.0..=1.0).contains(&probability) {
            error!("Model returned out-of-range probability {}", probability);
            return Err(ScoringError::invocation(format!(
                "probability out of range: {}",
                probability
            )));
        }

        let result = ScoringResult::new(probability, self.threshold);
        info!(
            "Scored application: probability={:.3} decision={}",
            result.probability, result.decision
        );
        Ok(result)
    }

    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            message: "Credit scoring API is up".to_string(),
            model_loaded: self.model_loaded(),
            nb_features: FEATURE_COUNT,
            threshold: self.threshold.value(),
        }
    }

    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            model_loaded: self.model_loaded(),
            artifact: self.artifact.clone(),
            output: self.output.to_string(),
            input_shape: vec![1, FEATURE_COUNT],
            features: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
            threshold: self.threshold.value(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            unavailable_reason: match &self.model {
                ModelState::Ready(_) => None,
                ModelState::Unavailable { cause } => Some(cause.clone()),
            },
        }
    }
}
