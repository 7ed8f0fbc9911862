use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::{forest::RiskForest, scaler::StandardScaler};
use crate::encoder::FeatureSchema;

/// File name of the persisted classifier blob.
pub const FOREST_FILE: &str = "forest.json";
/// File name of the persisted scaler blob.
pub const SCALER_FILE: &str = "scaler.json";
/// File name of the persisted feature-schema blob.
pub const SCHEMA_FILE: &str = "schema.json";

/// One trained model generation: classifier, scaler, and feature schema.
///
/// The three pieces are only ever valid together; replacing any of them
/// independently would pair a schema with statistics from another run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Trained classifier.
    pub forest: RiskForest,
    /// Fitted per-column scaler.
    pub scaler: StandardScaler,
    /// Ordered feature schema established at training time.
    pub schema: FeatureSchema,
}

/// Errors emitted by the artifact store.
#[derive(Debug, Error)]
pub enum ArtifactStoreError {
    /// Filesystem I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Directory-backed store for the artifact triple.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at the given directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Loads the persisted triple. Absence of any blob means "no model"
    /// and yields `None`; a present-but-unreadable blob is an error.
    pub fn load(&self) -> Result<Option<ModelArtifact>, ArtifactStoreError> {
        let forest_path = self.dir.join(FOREST_FILE);
        let scaler_path = self.dir.join(SCALER_FILE);
        let schema_path = self.dir.join(SCHEMA_FILE);
        if !(forest_path.exists() && scaler_path.exists() && schema_path.exists()) {
            return Ok(None);
        }
        let forest: RiskForest = serde_json::from_slice(&fs::read(forest_path)?)?;
        let scaler: StandardScaler = serde_json::from_slice(&fs::read(scaler_path)?)?;
        let schema: FeatureSchema = serde_json::from_slice(&fs::read(schema_path)?)?;
        Ok(Some(ModelArtifact {
            forest,
            scaler,
            schema,
        }))
    }

    /// Persists the triple, replacing any prior generation.
    ///
    /// All three blobs are fully written to temporary files before any
    /// rename, so a failed attempt leaves an existing triple intact.
    pub fn persist(&self, artifact: &ModelArtifact) -> Result<(), ArtifactStoreError> {
        fs::create_dir_all(&self.dir)?;
        let blobs = [
            (FOREST_FILE, serde_json::to_vec_pretty(&artifact.forest)?),
            (SCALER_FILE, serde_json::to_vec_pretty(&artifact.scaler)?),
            (SCHEMA_FILE, serde_json::to_vec_pretty(&artifact.schema)?),
        ];
        let mut staged = Vec::with_capacity(blobs.len());
        for (name, data) in &blobs {
            let tmp = self.dir.join(format!("{name}.tmp"));
            fs::write(&tmp, data)?;
            staged.push((tmp, self.dir.join(name)));
        }
        for (tmp, target) in staged {
            fs::rename(tmp, target)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::forest::ForestParams;
    use tempfile::tempdir;

    fn sample_artifact() -> ModelArtifact {
        let cohort = crate::cohort::generate(64, 5);
        let records: Vec<crate::cohort::HealthRecord> =
            cohort.iter().map(|(r, _)| r.clone()).collect();
        let labels: Vec<usize> = cohort.iter().map(|(_, l)| l.index()).collect();
        let schema = FeatureSchema::fit(&records);
        let rows: Vec<Vec<f64>> = records
            .iter()
            .map(|r| schema.encode(&crate::encoder::FeatureInput::from(r)))
            .collect();
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform_all(&rows);
        let params = ForestParams {
            trees: 5,
            ..ForestParams::default()
        };
        let forest = RiskForest::fit(&scaled, &labels, 3, params).unwrap();
        ModelArtifact {
            forest,
            scaler,
            schema,
        }
    }

    #[test]
    fn round_trips_the_triple() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let artifact = sample_artifact();
        store.persist(&artifact).unwrap();
        let loaded = store.load().unwrap().expect("triple present");
        assert_eq!(loaded.schema, artifact.schema);
        assert_eq!(loaded.scaler, artifact.scaler);
        assert_eq!(loaded.forest.tree_count(), artifact.forest.tree_count());
    }

    #[test]
    fn missing_blob_means_no_model() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.load().unwrap().is_none());

        let artifact = sample_artifact();
        store.persist(&artifact).unwrap();
        fs::remove_file(dir.path().join(SCALER_FILE)).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn persist_replaces_the_prior_generation() {
        let dir = tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let artifact = sample_artifact();
        store.persist(&artifact).unwrap();
        let mut second = artifact.clone();
        second.schema = FeatureSchema::fit(&[]);
        store.persist(&second).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.schema, second.schema);
    }
}
