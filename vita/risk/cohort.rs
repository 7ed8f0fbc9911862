use rand::{rngs::SmallRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Number of records generated for a default training run.
pub const DEFAULT_COHORT_SIZE: usize = 2000;

/// Seed used for the default training cohort.
pub const DEFAULT_COHORT_SEED: u64 = 42;

/// Gender of a subject.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
}

impl Gender {
    /// All levels, in declaration order.
    pub const ALL: [Self; 2] = [Self::Male, Self::Female];

    /// Wire name for the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }
}

/// Self-reported physical activity level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    /// Little to no regular exercise.
    Sedentary,
    /// Some weekly exercise.
    Moderate,
    /// Regular vigorous exercise.
    Active,
}

impl ActivityLevel {
    /// All levels, in declaration order.
    pub const ALL: [Self; 3] = [Self::Sedentary, Self::Moderate, Self::Active];

    /// Wire name for the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::Moderate => "moderate",
            Self::Active => "active",
        }
    }
}

/// Smoking history of a subject.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SmokingStatus {
    /// Never smoked.
    Never,
    /// Quit smoking.
    Former,
    /// Currently smokes.
    Current,
}

impl SmokingStatus {
    /// All levels, in declaration order.
    pub const ALL: [Self; 3] = [Self::Never, Self::Former, Self::Current];

    /// Wire name for the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Former => "former",
            Self::Current => "current",
        }
    }
}

/// Family history of chronic disease.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FamilyHistory {
    /// No known history.
    None,
    /// Diabetes in the family.
    Diabetes,
    /// Heart disease in the family.
    HeartDisease,
    /// Both diabetes and heart disease.
    Both,
}

impl FamilyHistory {
    /// All levels, in declaration order.
    pub const ALL: [Self; 4] = [Self::None, Self::Diabetes, Self::HeartDisease, Self::Both];

    /// Wire name for the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Diabetes => "diabetes",
            Self::HeartDisease => "heart_disease",
            Self::Both => "both",
        }
    }
}

/// Raw health record used for training and inference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthRecord {
    /// Age in years.
    pub age: u32,
    /// Gender.
    pub gender: Gender,
    /// Body mass index.
    pub bmi: f64,
    /// Activity level.
    pub activity_level: ActivityLevel,
    /// Smoking status.
    pub smoking_status: SmokingStatus,
    /// Family history.
    pub family_history: FamilyHistory,
    /// Systolic blood pressure (mmHg).
    pub systolic_bp: u32,
    /// Diastolic blood pressure (mmHg).
    pub diastolic_bp: u32,
}

/// Risk class assigned to a record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RiskLabel {
    /// Cumulative score of 2 or less.
    Low,
    /// Cumulative score of 3 to 5.
    Moderate,
    /// Cumulative score of 6 or more.
    High,
}

impl RiskLabel {
    /// All classes, in ascending severity.
    pub const ALL: [Self; 3] = [Self::Low, Self::Moderate, Self::High];

    /// Number of classes.
    pub const COUNT: usize = 3;

    /// Wire name for the class.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }

    /// Class index used by the classifier.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Moderate => 1,
            Self::High => 2,
        }
    }

    /// Buckets a cumulative risk score. Negative scores land in `Low`.
    #[must_use]
    pub fn from_score(score: i32) -> Self {
        match score {
            i32::MIN..=2 => Self::Low,
            3..=5 => Self::Moderate,
            _ => Self::High,
        }
    }
}

/// Additive risk score over the record's fields.
///
/// The activity and low-BMI branches can drive the total negative;
/// `RiskLabel::from_score` buckets negative totals as `Low`.
#[must_use]
pub fn risk_score(record: &HealthRecord) -> i32 {
    let mut score = 0;

    if record.bmi > 30.0 {
        score += 3;
    } else if record.bmi > 25.0 {
        score += 1;
    } else if record.bmi < 18.5 {
        score += 2;
    }

    if record.age > 65 {
        score += 2;
    } else if record.age > 45 {
        score += 1;
    }

    match record.activity_level {
        ActivityLevel::Sedentary => score += 1,
        ActivityLevel::Active => score -= 1,
        ActivityLevel::Moderate => {}
    }

    match record.smoking_status {
        SmokingStatus::Current => score += 2,
        SmokingStatus::Former => score += 1,
        SmokingStatus::Never => {}
    }

    match record.family_history {
        FamilyHistory::Both => score += 2,
        FamilyHistory::Diabetes | FamilyHistory::HeartDisease => score += 1,
        FamilyHistory::None => {}
    }

    if record.systolic_bp > 140 || record.diastolic_bp > 90 {
        score += 2;
    } else if record.systolic_bp > 130 || record.diastolic_bp > 80 {
        score += 1;
    }

    score
}

/// Generates a labeled synthetic cohort. Deterministic for a given seed.
#[must_use]
pub fn generate(count: usize, seed: u64) -> Vec<(HealthRecord, RiskLabel)> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let record = sample_record(&mut rng);
            let label = RiskLabel::from_score(risk_score(&record));
            (record, label)
        })
        .collect()
}

fn sample_record(rng: &mut SmallRng) -> HealthRecord {
    HealthRecord {
        age: rng.gen_range(18..80),
        gender: Gender::ALL[rng.gen_range(0..Gender::ALL.len())],
        bmi: gaussian(rng, 25.0, 5.0),
        activity_level: ActivityLevel::ALL[rng.gen_range(0..ActivityLevel::ALL.len())],
        smoking_status: SmokingStatus::ALL[rng.gen_range(0..SmokingStatus::ALL.len())],
        family_history: FamilyHistory::ALL[rng.gen_range(0..FamilyHistory::ALL.len())],
        systolic_bp: rng.gen_range(90..180),
        diastolic_bp: rng.gen_range(60..120),
    }
}

// Box-Muller from two uniforms; values are intentionally not clamped, the
// scoring rule covers the low-BMI tail.
fn gaussian(rng: &mut SmallRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}
