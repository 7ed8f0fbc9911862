use std::sync::Arc;

use parking_lot::Mutex;
use vita_profiles::ProfileStore;
use vita_risk::RiskRuntime;

/// Shared handles available to every route handler.
#[derive(Clone)]
pub struct AppState {
    /// Predictor runtime owning the model artifact.
    pub runtime: Arc<RiskRuntime>,
    /// Profile store; SQLite connections are not Sync, so access is
    /// serialized behind a mutex.
    pub profiles: Arc<Mutex<ProfileStore>>,
}
