use serde::{Deserialize, Serialize};

use crate::cohort::HealthRecord;

/// Numeric passthrough columns, always first in the schema.
pub const NUMERIC_COLUMNS: [&str; 4] = ["age", "bmi", "systolic_bp", "diastolic_bp"];

/// Raw fields of a single record in encoder-facing form.
///
/// Categorical fields are plain strings so that inference inputs with
/// levels unknown to the schema degrade to all-zero indicator blocks
/// instead of failing.
#[derive(Debug, Clone)]
pub struct FeatureInput {
    /// Age in years.
    pub age: f64,
    /// Body mass index.
    pub bmi: f64,
    /// Systolic blood pressure.
    pub systolic_bp: f64,
    /// Diastolic blood pressure.
    pub diastolic_bp: f64,
    /// Gender level name.
    pub gender: String,
    /// Activity level name.
    pub activity_level: String,
    /// Smoking status level name.
    pub smoking_status: String,
    /// Family history level name.
    pub family_history: String,
}

impl From<&HealthRecord> for FeatureInput {
    fn from(record: &HealthRecord) -> Self {
        Self {
            age: f64::from(record.age),
            bmi: record.bmi,
            systolic_bp: f64::from(record.systolic_bp),
            diastolic_bp: f64::from(record.diastolic_bp),
            gender: record.gender.as_str().to_string(),
            activity_level: record.activity_level.as_str().to_string(),
            smoking_status: record.smoking_status.as_str().to_string(),
            family_history: record.family_history.as_str().to_string(),
        }
    }
}

impl FeatureInput {
    fn indicator_names(&self) -> [String; 4] {
        [
            format!("gender_{}", self.gender),
            format!("activity_level_{}", self.activity_level),
            format!("smoking_status_{}", self.smoking_status),
            format!("family_history_{}", self.family_history),
        ]
    }
}

/// Ordered feature-column schema fixed at training time.
///
/// The column order is part of the persisted model artifact; inference
/// must reproduce it exactly and never refit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Establishes the schema from a training set: numeric passthroughs
    /// followed by one indicator column per observed (field, level) pair,
    /// fields in declaration order, levels in first-appearance order.
    #[must_use]
    pub fn fit(records: &[HealthRecord]) -> Self {
        let mut columns: Vec<String> = NUMERIC_COLUMNS.iter().map(ToString::to_string).collect();
        let fields: [(&str, Vec<&'static str>); 4] = [
            ("gender", observed_levels(records, |r| r.gender.as_str())),
            (
                "activity_level",
                observed_levels(records, |r| r.activity_level.as_str()),
            ),
            (
                "smoking_status",
                observed_levels(records, |r| r.smoking_status.as_str()),
            ),
            (
                "family_history",
                observed_levels(records, |r| r.family_history.as_str()),
            ),
        ];
        for (field, levels) in fields {
            for level in levels {
                columns.push(format!("{field}_{level}"));
            }
        }
        Self { columns }
    }

    /// Encodes one record against the fixed schema.
    ///
    /// Schema reconciliation: indicator columns the record does not
    /// activate are zero-filled, levels the schema does not know are
    /// dropped, and the output order always matches the schema.
    #[must_use]
    pub fn encode(&self, input: &FeatureInput) -> Vec<f64> {
        let indicators = input.indicator_names();
        self.columns
            .iter()
            .map(|column| match column.as_str() {
                "age" => input.age,
                "bmi" => input.bmi,
                "systolic_bp" => input.systolic_bp,
                "diastolic_bp" => input.diastolic_bp,
                other => {
                    if indicators.iter().any(|name| name == other) {
                        1.0
                    } else {
                        0.0
                    }
                }
            })
            .collect()
    }

    /// Column names in encoding order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn observed_levels<F>(records: &[HealthRecord], level: F) -> Vec<&'static str>
where
    F: Fn(&HealthRecord) -> &'static str,
{
    let mut seen = Vec::new();
    for record in records {
        let name = level(record);
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}
