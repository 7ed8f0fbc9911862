#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Vita health-risk core: synthetic cohort generation, feature encoding,
//! a bagged decision-tree risk classifier, and advisory generation.

/// Synthetic cohort generation and rule-based risk labeling.
#[path = "../cohort.rs"]
pub mod cohort;

/// Feature schema fitting and one-hot encoding.
#[path = "../encoder.rs"]
pub mod encoder;

/// Risk classifier: scaler, decision trees, bagged forest, training pipeline.
#[path = "../classifier/main.rs"]
pub mod classifier;

/// Persisted model artifact triple and its file store.
#[path = "../artifact.rs"]
pub mod artifact;

/// Predictor runtime orchestrating encode, scale, and classify.
#[path = "../runtime.rs"]
pub mod runtime;

/// Advisory text generation from risk level and raw fields.
#[path = "../advice.rs"]
pub mod advice;

/// Telemetry helpers for logging/event emission.
#[path = "../telemetry.rs"]
pub mod telemetry;

pub use advice::recommendations;
pub use artifact::{ArtifactStore, ArtifactStoreError, ModelArtifact};
pub use classifier::{
    forest::{ForestParams, RiskForest},
    scaler::StandardScaler,
    tree::{DecisionTree, TreeParams},
    RiskTrainer, TrainingParams, TrainingReport,
};
pub use cohort::{
    generate, risk_score, ActivityLevel, FamilyHistory, Gender, HealthRecord, RiskLabel,
    SmokingStatus,
};
pub use encoder::{FeatureInput, FeatureSchema};
pub use runtime::{Prediction, PredictionInput, RiskRuntime, RiskRuntimeBuilder};
pub use telemetry::{RiskTelemetry, RiskTelemetryBuilder};
