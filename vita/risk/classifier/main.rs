//! Risk classifier modules.

/// Evaluation helpers: seeded partitioning and accuracy.
pub mod eval;
/// Bagged decision-tree ensemble.
pub mod forest;
/// Per-column standardization.
pub mod scaler;
/// Single CART tree.
pub mod tree;

use anyhow::{bail, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::json;
use shared_logging::LogLevel;

use crate::artifact::ModelArtifact;
use crate::cohort::{self, HealthRecord, RiskLabel};
use crate::encoder::{FeatureInput, FeatureSchema};
use crate::telemetry::RiskTelemetry;
use self::forest::{ForestParams, RiskForest};
use self::scaler::StandardScaler;

/// Training pipeline configuration.
#[derive(Debug, Clone, Copy)]
pub struct TrainingParams {
    /// Synthetic cohort size for a training run.
    pub cohort_size: usize,
    /// Seed for cohort generation.
    pub cohort_seed: u64,
    /// Fraction of rows held out for evaluation.
    pub holdout_ratio: f64,
    /// Seed for the train/holdout shuffle, fixed so runs stay comparable.
    pub partition_seed: u64,
    /// Ensemble configuration.
    pub forest: ForestParams,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            cohort_size: cohort::DEFAULT_COHORT_SIZE,
            cohort_seed: cohort::DEFAULT_COHORT_SEED,
            holdout_ratio: 0.2,
            partition_seed: 42,
            forest: ForestParams::default(),
        }
    }
}

/// Report describing one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    /// Held-out accuracy.
    pub accuracy: f64,
    /// Normalized importance per feature column, in schema order.
    pub feature_importance: IndexMap<String, f64>,
    /// Number of cohort rows used.
    pub samples: usize,
    /// Number of trees fitted.
    pub trees: usize,
}

impl TrainingReport {
    /// Renders a concise summary string.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "[risk] accuracy={:.3} samples={} trees={}",
            self.accuracy, self.samples, self.trees
        )
    }
}

/// End-to-end trainer: cohort, schema, scaler, forest, evaluation.
#[derive(Debug, Default)]
pub struct RiskTrainer {
    params: TrainingParams,
    telemetry: Option<RiskTelemetry>,
}

impl RiskTrainer {
    /// Creates a trainer with the given parameters.
    #[must_use]
    pub fn new(params: TrainingParams) -> Self {
        Self {
            params,
            telemetry: None,
        }
    }

    /// Attaches telemetry instrumentation.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: Option<RiskTelemetry>) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Pipeline configuration.
    #[must_use]
    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Generates the configured synthetic cohort and fits over it.
    pub fn run(&self) -> Result<(ModelArtifact, TrainingReport)> {
        let cohort = cohort::generate(self.params.cohort_size, self.params.cohort_seed);
        self.fit(&cohort)
    }

    /// Fits the artifact triple over a labeled cohort and evaluates it on
    /// the held-out partition.
    pub fn fit(&self, cohort: &[(HealthRecord, RiskLabel)]) -> Result<(ModelArtifact, TrainingReport)> {
        if cohort.is_empty() {
            bail!("cannot train over an empty cohort");
        }
        let records: Vec<HealthRecord> = cohort.iter().map(|(r, _)| r.clone()).collect();
        let labels: Vec<usize> = cohort.iter().map(|(_, l)| l.index()).collect();

        self.log(
            LogLevel::Info,
            "risk_training_start",
            json!({ "samples": records.len(), "trees": self.params.forest.trees }),
        );

        let schema = FeatureSchema::fit(&records);
        let rows: Vec<Vec<f64>> = records
            .iter()
            .map(|record| schema.encode(&FeatureInput::from(record)))
            .collect();

        let (train_idx, holdout_idx) = eval::train_test_split(
            rows.len(),
            self.params.holdout_ratio,
            self.params.partition_seed,
        );

        let train_rows: Vec<Vec<f64>> = train_idx.iter().map(|i| rows[*i].clone()).collect();
        let train_labels: Vec<usize> = train_idx.iter().map(|i| labels[*i]).collect();

        // Scaler statistics come from the training partition only; the
        // holdout and all future inference rows reuse them unchanged.
        let scaler = StandardScaler::fit(&train_rows);
        let scaled_train = scaler.transform_all(&train_rows);

        let forest = RiskForest::fit(
            &scaled_train,
            &train_labels,
            RiskLabel::COUNT,
            self.params.forest,
        )?;

        let holdout_expected: Vec<usize> = holdout_idx.iter().map(|i| labels[*i]).collect();
        let holdout_predicted: Vec<usize> = holdout_idx
            .iter()
            .map(|i| forest.predict(&scaler.transform(&rows[*i])))
            .collect();
        let accuracy = eval::accuracy(&holdout_expected, &holdout_predicted);

        let feature_importance: IndexMap<String, f64> = schema
            .columns()
            .iter()
            .cloned()
            .zip(forest.feature_importances())
            .collect();

        let report = TrainingReport {
            accuracy,
            feature_importance,
            samples: records.len(),
            trees: forest.tree_count(),
        };

        self.log(
            LogLevel::Info,
            "risk_training_complete",
            json!({ "accuracy": report.accuracy, "holdout": holdout_idx.len() }),
        );
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.event(
                "risk.training.completed",
                json!({ "accuracy": report.accuracy, "samples": report.samples, "trees": report.trees }),
            );
        }

        let artifact = ModelArtifact {
            forest,
            scaler,
            schema,
        };
        Ok((artifact, report))
    }

    fn log(&self, level: LogLevel, message: &str, fields: serde_json::Value) {
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.log(level, message, fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::generate;

    fn quick_params() -> TrainingParams {
        TrainingParams {
            cohort_size: 400,
            forest: ForestParams {
                trees: 25,
                ..ForestParams::default()
            },
            ..TrainingParams::default()
        }
    }

    #[test]
    fn trains_an_accurate_model_on_the_rule() {
        let trainer = RiskTrainer::new(quick_params());
        let (_, report) = trainer.run().unwrap();
        // The labels follow a deterministic rule over the features, so a
        // bagged forest should recover most of it.
        assert!(report.accuracy > 0.7, "accuracy {}", report.accuracy);
        assert_eq!(report.samples, 400);
        assert_eq!(report.trees, 25);
    }

    #[test]
    fn importance_map_follows_schema_order_and_sums_to_one() {
        let trainer = RiskTrainer::new(quick_params());
        let (artifact, report) = trainer.run().unwrap();
        let columns: Vec<&String> = report.feature_importance.keys().collect();
        assert_eq!(columns.len(), artifact.schema.len());
        assert_eq!(columns[0], "age");
        let sum: f64 = report.feature_importance.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn repeated_runs_are_comparable() {
        let trainer = RiskTrainer::new(quick_params());
        let (_, first) = trainer.run().unwrap();
        let (_, second) = trainer.run().unwrap();
        assert!((first.accuracy - second.accuracy).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_an_empty_cohort() {
        let trainer = RiskTrainer::new(quick_params());
        assert!(trainer.fit(&[]).is_err());
    }

    #[test]
    fn compound_risk_record_classifies_high() {
        let trainer = RiskTrainer::new(TrainingParams {
            cohort_size: 800,
            forest: ForestParams {
                trees: 40,
                ..ForestParams::default()
            },
            ..TrainingParams::default()
        });
        let (artifact, _) = trainer.run().unwrap();
        let record = HealthRecord {
            age: 70,
            gender: crate::cohort::Gender::Male,
            bmi: 32.0,
            activity_level: crate::cohort::ActivityLevel::Sedentary,
            smoking_status: crate::cohort::SmokingStatus::Current,
            family_history: crate::cohort::FamilyHistory::Both,
            systolic_bp: 150,
            diastolic_bp: 95,
        };
        let row = artifact
            .scaler
            .transform(&artifact.schema.encode(&FeatureInput::from(&record)));
        let probabilities = artifact.forest.probabilities(&row);
        assert_eq!(probabilities.len(), RiskLabel::COUNT);
        assert_eq!(artifact.forest.predict(&row), RiskLabel::High.index());
        assert!(probabilities[RiskLabel::High.index()] > 0.5);
    }

    #[test]
    fn fit_accepts_an_external_cohort() {
        let cohort = generate(300, 9);
        let trainer = RiskTrainer::new(quick_params());
        let (artifact, report) = trainer.fit(&cohort).unwrap();
        assert_eq!(report.samples, 300);
        assert!(!artifact.schema.is_empty());
    }
}
