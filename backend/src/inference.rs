use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail};
use log::{error, info, warn};
use tract_onnx::prelude::*;

use crate::models::FEATURE_COUNT;

/// A loaded binary classifier. Implementations must be safe to share between
/// request workers; they are never mutated after loading.
pub trait Classifier: Send + Sync {
    /// Probability of the positive (default) class for one row.
    fn predict_proba(&self, features: &[f32; FEATURE_COUNT]) -> anyhow::Result<f64>;
}

/// How the positive-class probability is read from the model outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Classifier probability tensor, `[1, 2]` (class 1 taken) or `[1, 1]`.
    Probabilities,
    /// Single raw score; the sigmoid is applied here.
    Logit,
}

impl FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "probabilities" | "proba" => Ok(OutputKind::Probabilities),
            "logit" => Ok(OutputKind::Logit),
            other => Err(format!("expected `probabilities` or `logit`, got `{}`", other)),
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputKind::Probabilities => write!(f, "probabilities"),
            OutputKind::Logit => write!(f, "logit"),
        }
    }
}

pub struct OnnxClassifier {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    output: OutputKind,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(model_path: P, output: OutputKind) -> TractResult<Self> {
        let model = tract_onnx::onnx()
            .model_for_path(model_path)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_COUNT)),
            )?
            .into_optimized()?
            .into_runnable()?;

        Ok(Self { model, output })
    }
}

impl Classifier for OnnxClassifier {
    fn predict_proba(&self, features: &[f32; FEATURE_COUNT]) -> anyhow::Result<f64> {
        let input = Tensor::from_shape(&[1, FEATURE_COUNT], features)?;
        let outputs = self.model.run(tvec!(input.into()))?;

        // skl2onnx puts the i64 label first and the probabilities after it.
        let scores = outputs
            .iter()
            .rev()
            .find(|t| t.datum_type() == f32::datum_type())
            .ok_or_else(|| anyhow!("model produced no f32 output"))?;
        let values: Vec<f32> = scores.to_array_view::<f32>()?.iter().copied().collect();

        extract_probability(&values, self.output)
    }
}

/// Reads the positive-class probability out of a flattened output row.
pub fn extract_probability(values: &[f32], output: OutputKind) -> anyhow::Result<f64> {
    let probability = match (output, values) {
        (OutputKind::Probabilities, [_, positive]) => *positive as f64,
        (OutputKind::Probabilities, [p]) => *p as f64,
        (OutputKind::Logit, [logit]) => 1.0 / (1.0 + (-(*logit as f64)).exp()),
        (_, other) => bail!(
            "unexpected output of {} values for {} mode",
            other.len(),
            output
        ),
    };

    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        bail!("model returned an invalid probability: {}", probability);
    }
    Ok(probability)
}

/// Result of the startup load, fixed for the process lifetime.
#[derive(Clone)]
pub enum ModelState {
    Ready(Arc<dyn Classifier>),
    Unavailable { cause: String },
}

impl ModelState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, ModelState::Ready(_))
    }
}

impl fmt::Debug for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelState::Ready(_) => f.write_str("Ready"),
            ModelState::Unavailable { cause } => {
                f.debug_struct("Unavailable").field("cause", cause).finish()
            }
        }
    }
}

/// Loads the ONNX artifact. Never fails: a missing or broken artifact
/// yields [`ModelState::Unavailable`] so the server can still answer probes.
pub fn load_model<P: AsRef<Path>>(model_path: P, output: OutputKind) -> ModelState {
    let path = model_path.as_ref();

    if !path.exists() {
        let cause = format!("model artifact not found at {}", path.display());
        warn!("{}", cause);
        return ModelState::Unavailable { cause };
    }

    match panic::catch_unwind(AssertUnwindSafe(|| OnnxClassifier::load(path, output))) {
        Ok(Ok(classifier)) => {
            info!("Model loaded from {} ({} output)", path.display(), output);
            ModelState::Ready(Arc::new(classifier))
        }
        Ok(Err(e)) => {
            let cause = format!("failed to load {}: {:#}", path.display(), e);
            error!("{}", cause);
            ModelState::Unavailable { cause }
        }
        Err(_) => {
            let cause = format!("model loader panicked on {}", path.display());
            error!("{}", cause);
            ModelState::Unavailable { cause }
        }
    }
}
