use std::{fs, path::Path};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors emitted by the profile store.
#[derive(Debug, Error)]
pub enum ProfileStoreError {
    /// Filesystem I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// New user profile fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    /// Age in years.
    pub age: u32,
    /// Gender level name.
    pub gender: String,
    /// Activity level name.
    pub activity_level: String,
    /// Smoking status level name.
    pub smoking_status: String,
    /// Family history level name.
    pub family_history: String,
}

/// One BMI measurement to append to a user's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BmiMeasurement {
    /// Body mass index.
    pub bmi: f64,
    /// Height in centimeters.
    pub height: f64,
    /// Weight in kilograms.
    pub weight: f64,
    /// Systolic blood pressure, defaulting to 120 when absent.
    #[serde(default = "default_systolic")]
    pub systolic_bp: u32,
    /// Diastolic blood pressure, defaulting to 80 when absent.
    #[serde(default = "default_diastolic")]
    pub diastolic_bp: u32,
}

fn default_systolic() -> u32 {
    120
}

fn default_diastolic() -> u32 {
    80
}

/// Stored user profile row.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    /// Row id.
    pub id: i64,
    /// Age in years.
    pub age: u32,
    /// Gender level name.
    pub gender: String,
    /// Activity level name.
    pub activity_level: String,
    /// Smoking status level name.
    pub smoking_status: String,
    /// Family history level name.
    pub family_history: String,
    /// Creation timestamp as stored by SQLite.
    pub created_at: String,
}

/// Stored BMI history row.
#[derive(Debug, Clone, Serialize)]
pub struct BmiRecord {
    /// Row id.
    pub id: i64,
    /// Owning user id.
    pub user_id: i64,
    /// Body mass index.
    pub bmi: f64,
    /// Height in centimeters.
    pub height: f64,
    /// Weight in kilograms.
    pub weight: f64,
    /// Systolic blood pressure.
    pub systolic_bp: u32,
    /// Diastolic blood pressure.
    pub diastolic_bp: u32,
    /// Measurement timestamp as stored by SQLite.
    pub recorded_at: String,
}

/// SQLite-backed profile store.
#[derive(Debug)]
pub struct ProfileStore {
    conn: Connection,
}

impl ProfileStore {
    /// Opens (or creates) the store at the given path and applies the
    /// schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ProfileStoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Opens an in-memory store, primarily for tests.
    pub fn open_in_memory() -> Result<Self, ProfileStoreError> {
        let conn = Connection::open_in_memory()?;
        Self::migrate(&conn)?;
        Ok(Self { conn })
    }

    fn migrate(conn: &Connection) -> Result<(), ProfileStoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA foreign_keys=ON;
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                age INTEGER,
                gender TEXT,
                activity_level TEXT,
                smoking_status TEXT,
                family_history TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS bmi_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER,
                bmi REAL,
                height REAL,
                weight REAL,
                blood_pressure_systolic INTEGER,
                blood_pressure_diastolic INTEGER,
                recorded_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users (id)
            );
            ",
        )?;
        Ok(())
    }

    /// Inserts a profile with its first BMI measurement in one
    /// transaction and returns the new user id.
    pub fn create_profile(
        &mut self,
        profile: &NewProfile,
        measurement: &BmiMeasurement,
    ) -> Result<i64, ProfileStoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO users (age, gender, activity_level, smoking_status, family_history)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                profile.age,
                profile.gender,
                profile.activity_level,
                profile.smoking_status,
                profile.family_history,
            ],
        )?;
        let user_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO bmi_history
                 (user_id, bmi, height, weight, blood_pressure_systolic, blood_pressure_diastolic)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                measurement.bmi,
                measurement.height,
                measurement.weight,
                measurement.systolic_bp,
                measurement.diastolic_bp,
            ],
        )?;
        tx.commit()?;
        Ok(user_id)
    }

    /// Appends a measurement to an existing user's history.
    pub fn record_measurement(
        &self,
        user_id: i64,
        measurement: &BmiMeasurement,
    ) -> Result<i64, ProfileStoreError> {
        self.conn.execute(
            "INSERT INTO bmi_history
                 (user_id, bmi, height, weight, blood_pressure_systolic, blood_pressure_diastolic)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user_id,
                measurement.bmi,
                measurement.height,
                measurement.weight,
                measurement.systolic_bp,
                measurement.diastolic_bp,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Fetches a stored profile by id.
    pub fn user(&self, user_id: i64) -> Result<Option<UserProfile>, ProfileStoreError> {
        let profile = self
            .conn
            .query_row(
                "SELECT id, age, gender, activity_level, smoking_status, family_history, created_at
                 FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok(UserProfile {
                        id: row.get(0)?,
                        age: row.get(1)?,
                        gender: row.get(2)?,
                        activity_level: row.get(3)?,
                        smoking_status: row.get(4)?,
                        family_history: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                },
            )
            .optional()?;
        Ok(profile)
    }

    /// Fetches a user's BMI history, oldest first.
    pub fn bmi_history(&self, user_id: i64) -> Result<Vec<BmiRecord>, ProfileStoreError> {
        let mut statement = self.conn.prepare(
            "SELECT id, user_id, bmi, height, weight,
                    blood_pressure_systolic, blood_pressure_diastolic, recorded_at
             FROM bmi_history WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = statement.query_map(params![user_id], |row| {
            Ok(BmiRecord {
                id: row.get(0)?,
                user_id: row.get(1)?,
                bmi: row.get(2)?,
                height: row.get(3)?,
                weight: row.get(4)?,
                systolic_bp: row.get(5)?,
                diastolic_bp: row.get(6)?,
                recorded_at: row.get(7)?,
            })
        })?;
        let mut history = Vec::new();
        for record in rows {
            history.push(record?);
        }
        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_profile() -> NewProfile {
        NewProfile {
            age: 34,
            gender: "female".into(),
            activity_level: "moderate".into(),
            smoking_status: "never".into(),
            family_history: "none".into(),
        }
    }

    fn sample_measurement() -> BmiMeasurement {
        BmiMeasurement {
            bmi: 23.4,
            height: 168.0,
            weight: 66.0,
            systolic_bp: 118,
            diastolic_bp: 76,
        }
    }

    #[test]
    fn creates_profile_with_first_measurement() {
        let mut store = ProfileStore::open_in_memory().unwrap();
        let user_id = store
            .create_profile(&sample_profile(), &sample_measurement())
            .unwrap();
        let profile = store.user(user_id).unwrap().expect("profile present");
        assert_eq!(profile.age, 34);
        assert_eq!(profile.gender, "female");
        let history = store.bmi_history(user_id).unwrap();
        assert_eq!(history.len(), 1);
        assert!((history[0].bmi - 23.4).abs() < f64::EPSILON);
        assert_eq!(history[0].systolic_bp, 118);
    }

    #[test]
    fn appends_measurements_in_order() {
        let mut store = ProfileStore::open_in_memory().unwrap();
        let user_id = store
            .create_profile(&sample_profile(), &sample_measurement())
            .unwrap();
        let mut next = sample_measurement();
        next.bmi = 22.9;
        store.record_measurement(user_id, &next).unwrap();
        let history = store.bmi_history(user_id).unwrap();
        assert_eq!(history.len(), 2);
        assert!((history[1].bmi - 22.9).abs() < f64::EPSILON);
    }

    #[test]
    fn measurement_pressure_defaults_apply_on_deserialize() {
        let measurement: BmiMeasurement = serde_json::from_str(
            r#"{ "bmi": 24.0, "height": 170.0, "weight": 70.0 }"#,
        )
        .unwrap();
        assert_eq!(measurement.systolic_bp, 120);
        assert_eq!(measurement.diastolic_bp, 80);
    }

    #[test]
    fn missing_user_yields_none() {
        let store = ProfileStore::open_in_memory().unwrap();
        assert!(store.user(99).unwrap().is_none());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("profiles.db");
        let user_id = {
            let mut store = ProfileStore::open(&path).unwrap();
            store
                .create_profile(&sample_profile(), &sample_measurement())
                .unwrap()
        };
        let store = ProfileStore::open(&path).unwrap();
        assert!(store.user(user_id).unwrap().is_some());
    }
}
