use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shared_logging::LogLevel;

use crate::artifact::{ArtifactStore, ModelArtifact};
use crate::classifier::{tree::argmax, RiskTrainer, TrainingParams, TrainingReport};
use crate::cohort::RiskLabel;
use crate::encoder::FeatureInput;
use crate::telemetry::RiskTelemetry;

/// Keys a prediction request must carry.
pub const REQUIRED_FIELDS: [&str; 6] = [
    "age",
    "gender",
    "bmi",
    "activity_level",
    "smoking_status",
    "family_history",
];

/// Raw prediction request fields.
///
/// Categorical fields stay as strings: a level the training schema never
/// saw encodes to an all-zero indicator block instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionInput {
    /// Age in years.
    pub age: f64,
    /// Gender level name.
    pub gender: String,
    /// Body mass index.
    pub bmi: f64,
    /// Activity level name.
    pub activity_level: String,
    /// Smoking status level name.
    pub smoking_status: String,
    /// Family history level name.
    pub family_history: String,
    /// Systolic blood pressure, defaulting to 120 when absent.
    #[serde(default = "default_systolic")]
    pub systolic_bp: f64,
    /// Diastolic blood pressure, defaulting to 80 when absent.
    #[serde(default = "default_diastolic")]
    pub diastolic_bp: f64,
}

fn default_systolic() -> f64 {
    120.0
}

fn default_diastolic() -> f64 {
    80.0
}

impl From<&PredictionInput> for FeatureInput {
    fn from(input: &PredictionInput) -> Self {
        Self {
            age: input.age,
            bmi: input.bmi,
            systolic_bp: input.systolic_bp,
            diastolic_bp: input.diastolic_bp,
            gender: input.gender.clone(),
            activity_level: input.activity_level.clone(),
            smoking_status: input.smoking_status.clone(),
            family_history: input.family_history.clone(),
        }
    }
}

/// Classification result for one request.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    /// Predicted risk class.
    pub risk_level: RiskLabel,
    /// Full class distribution, summing to 1.
    pub probabilities: IndexMap<RiskLabel, f64>,
    /// Maximum probability in the distribution.
    pub confidence: f64,
}

/// Predictor runtime owning the shared model artifact.
///
/// Predictions take the artifact read lock and are safe to parallelize;
/// a retrain builds the replacement triple outside the lock and swaps
/// all three pieces in one write-lock critical section.
pub struct RiskRuntime {
    store: ArtifactStore,
    trainer: RiskTrainer,
    artifact: RwLock<Option<Arc<ModelArtifact>>>,
    telemetry: Option<RiskTelemetry>,
}

impl RiskRuntime {
    /// Returns a builder.
    #[must_use]
    pub fn builder() -> RiskRuntimeBuilder {
        RiskRuntimeBuilder::default()
    }

    /// Whether an artifact is currently resident in memory.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.artifact.read().is_some()
    }

    /// Returns the resident artifact, loading the persisted triple or
    /// training a fresh one if nothing is persisted. Callers never see an
    /// untrained state.
    pub fn ensure_loaded(&self) -> Result<Arc<ModelArtifact>> {
        if let Some(artifact) = self.artifact.read().as_ref() {
            return Ok(Arc::clone(artifact));
        }

        let mut slot = self.artifact.write();
        // Another caller may have finished the transition first.
        if let Some(artifact) = slot.as_ref() {
            return Ok(Arc::clone(artifact));
        }

        let persisted = self
            .store
            .load()
            .context("loading persisted model artifact")?;
        let artifact = match persisted {
            Some(artifact) => {
                self.log(
                    LogLevel::Info,
                    "artifact_loaded",
                    json!({ "dir": self.store.dir().display().to_string() }),
                );
                Arc::new(artifact)
            }
            None => {
                self.log(LogLevel::Info, "artifact_missing_training", json!({}));
                let (artifact, _) = self.trainer.run()?;
                self.store
                    .persist(&artifact)
                    .context("persisting trained model artifact")?;
                Arc::new(artifact)
            }
        };
        *slot = Some(Arc::clone(&artifact));
        Ok(artifact)
    }

    /// Retrains and atomically replaces the artifact triple.
    ///
    /// The new generation is built and persisted before the swap, so a
    /// failure at any step leaves the prior artifact fully intact.
    pub fn train(&self) -> Result<TrainingReport> {
        let (artifact, report) = self.trainer.run()?;
        self.store
            .persist(&artifact)
            .context("persisting trained model artifact")?;
        *self.artifact.write() = Some(Arc::new(artifact));
        self.log(
            LogLevel::Info,
            "artifact_replaced",
            json!({ "accuracy": report.accuracy, "trees": report.trees }),
        );
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.event(
                "risk.artifact.replaced",
                json!({ "accuracy": report.accuracy }),
            );
        }
        Ok(report)
    }

    /// Classifies one request: encode against the artifact schema, scale,
    /// and vote over the ensemble.
    pub fn predict(&self, input: &PredictionInput) -> Result<Prediction> {
        let artifact = self.ensure_loaded()?;
        let encoded = artifact.schema.encode(&FeatureInput::from(input));
        let scaled = artifact.scaler.transform(&encoded);
        let distribution = artifact.forest.probabilities(&scaled);

        let top = argmax(&distribution);
        let risk_level = RiskLabel::ALL[top];
        let confidence = distribution[top];
        let probabilities: IndexMap<RiskLabel, f64> = RiskLabel::ALL
            .iter()
            .copied()
            .zip(distribution)
            .collect();

        self.log(
            LogLevel::Debug,
            "prediction_served",
            json!({ "risk_level": risk_level.as_str(), "confidence": confidence }),
        );
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.event(
                "risk.prediction.served",
                json!({ "risk_level": risk_level.as_str(), "confidence": confidence }),
            );
        }

        Ok(Prediction {
            risk_level,
            probabilities,
            confidence,
        })
    }

    fn log(&self, level: LogLevel, message: &str, fields: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.log(level, message, fields);
        }
    }
}

/// Builder for `RiskRuntime`.
pub struct RiskRuntimeBuilder {
    artifact_dir: PathBuf,
    params: TrainingParams,
    telemetry: Option<RiskTelemetry>,
}

impl Default for RiskRuntimeBuilder {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("data/model"),
            params: TrainingParams::default(),
            telemetry: None,
        }
    }
}

impl RiskRuntimeBuilder {
    /// Sets the artifact directory.
    #[must_use]
    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// Sets the training parameters.
    #[must_use]
    pub fn params(mut self, params: TrainingParams) -> Self {
        self.params = params;
        self
    }

    /// Attaches telemetry.
    #[must_use]
    pub fn telemetry(mut self, telemetry: RiskTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Builds the runtime.
    #[must_use]
    pub fn build(self) -> RiskRuntime {
        let trainer = RiskTrainer::new(self.params).with_telemetry(self.telemetry.clone());
        RiskRuntime {
            store: ArtifactStore::new(self.artifact_dir),
            trainer,
            artifact: RwLock::new(None),
            telemetry: self.telemetry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::forest::ForestParams;
    use tempfile::tempdir;

    fn quick_params() -> TrainingParams {
        TrainingParams {
            cohort_size: 600,
            forest: ForestParams {
                trees: 30,
                ..ForestParams::default()
            },
            ..TrainingParams::default()
        }
    }

    fn high_risk_input() -> PredictionInput {
        PredictionInput {
            age: 70.0,
            gender: "male".into(),
            bmi: 32.0,
            activity_level: "sedentary".into(),
            smoking_status: "current".into(),
            family_history: "both".into(),
            systolic_bp: 150.0,
            diastolic_bp: 95.0,
        }
    }

    #[test]
    fn first_predict_trains_on_demand() {
        let dir = tempdir().unwrap();
        let runtime = RiskRuntime::builder()
            .artifact_dir(dir.path())
            .params(quick_params())
            .build();
        assert!(!runtime.is_loaded());

        let prediction = runtime.predict(&high_risk_input()).unwrap();
        assert!(runtime.is_loaded());
        assert_eq!(prediction.risk_level, RiskLabel::High);
        assert!(dir.path().join(crate::artifact::FOREST_FILE).exists());
        assert!(dir.path().join(crate::artifact::SCALER_FILE).exists());
        assert!(dir.path().join(crate::artifact::SCHEMA_FILE).exists());
    }

    #[test]
    fn probabilities_sum_to_one_and_confidence_is_max() {
        let dir = tempdir().unwrap();
        let runtime = RiskRuntime::builder()
            .artifact_dir(dir.path())
            .params(quick_params())
            .build();
        let prediction = runtime.predict(&high_risk_input()).unwrap();
        let sum: f64 = prediction.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        let max = prediction
            .probabilities
            .values()
            .fold(f64::MIN, |acc, v| acc.max(*v));
        assert!((prediction.confidence - max).abs() < f64::EPSILON);
    }

    #[test]
    fn restart_reuses_the_persisted_triple() {
        let dir = tempdir().unwrap();
        let runtime = RiskRuntime::builder()
            .artifact_dir(dir.path())
            .params(quick_params())
            .build();
        runtime.train().unwrap();
        let forest_blob = std::fs::read(dir.path().join(crate::artifact::FOREST_FILE)).unwrap();

        let restarted = RiskRuntime::builder()
            .artifact_dir(dir.path())
            .params(quick_params())
            .build();
        let prediction = restarted.predict(&high_risk_input()).unwrap();
        assert_eq!(prediction.risk_level, RiskLabel::High);
        // Loading must not have rewritten the persisted blobs.
        let unchanged = std::fs::read(dir.path().join(crate::artifact::FOREST_FILE)).unwrap();
        assert_eq!(forest_blob, unchanged);
    }

    #[test]
    fn retrain_recovers_a_deleted_blob() {
        let dir = tempdir().unwrap();
        let runtime = RiskRuntime::builder()
            .artifact_dir(dir.path())
            .params(quick_params())
            .build();
        runtime.train().unwrap();
        std::fs::remove_file(dir.path().join(crate::artifact::SCHEMA_FILE)).unwrap();

        let restarted = RiskRuntime::builder()
            .artifact_dir(dir.path())
            .params(quick_params())
            .build();
        restarted.predict(&high_risk_input()).unwrap();
        assert!(dir.path().join(crate::artifact::SCHEMA_FILE).exists());
    }

    #[test]
    fn unknown_levels_degrade_gracefully() {
        let dir = tempdir().unwrap();
        let runtime = RiskRuntime::builder()
            .artifact_dir(dir.path())
            .params(quick_params())
            .build();
        let mut input = high_risk_input();
        input.family_history = "unknown_condition".into();
        let prediction = runtime.predict(&input).unwrap();
        let sum: f64 = prediction.probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn optional_pressure_fields_default_on_deserialize() {
        let input: PredictionInput = serde_json::from_value(serde_json::json!({
            "age": 30,
            "gender": "female",
            "bmi": 22.0,
            "activity_level": "active",
            "smoking_status": "never",
            "family_history": "none"
        }))
        .unwrap();
        assert!((input.systolic_bp - 120.0).abs() < f64::EPSILON);
        assert!((input.diastolic_bp - 80.0).abs() < f64::EPSILON);
    }
}
