use std::{env, path::PathBuf};

/// Gateway configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Listen port (`VITA_PORT`, default 5000).
    pub port: u16,
    /// Root directory for model artifacts and logs (`VITA_DATA_DIR`).
    pub data_dir: PathBuf,
    /// SQLite database path (`VITA_DB_PATH`).
    pub db_path: PathBuf,
}

impl Config {
    /// Reads configuration, falling back to local-development defaults.
    pub fn from_env() -> Self {
        let port = env::var("VITA_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(5000);
        let data_dir = env::var("VITA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        let db_path = env::var("VITA_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("health_data.db"));
        Self {
            port,
            data_dir,
            db_path,
        }
    }
}
