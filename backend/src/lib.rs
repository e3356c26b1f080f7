//! HTTP scoring API for a pre-trained credit default classifier.
//!
//! The model is loaded once at startup into a [`service::ScoringService`],
//! which validates applications, runs the classifier and applies the
//! deployment's business threshold.

pub mod config;
pub mod error;
pub mod inference;
pub mod models;
pub mod routes;
pub mod service;

pub use error::{ConfigError, ScoringError};
pub use inference::{load_model, Classifier, ModelState, OnnxClassifier, OutputKind};
pub use models::{CreditApplication, ScoringResult, Threshold, FEATURE_COUNT, FEATURE_NAMES};
pub use service::ScoringService;
