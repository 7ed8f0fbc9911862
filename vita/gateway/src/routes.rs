use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use vita_profiles::{BmiMeasurement, NewProfile};
use vita_risk::{recommendations, runtime::REQUIRED_FIELDS, PredictionInput};

use crate::error::ApiError;
use crate::state::AppState;

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/train", post(train))
        .route("/predict", post(predict))
        .route("/user-profile", post(create_profile))
        .with_state(state)
}

async fn index() -> Json<Value> {
    Json(json!({
        "message": "Vita Health Risk Prediction API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/predict", "/train", "/user-profile", "/health"],
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn train(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let runtime = Arc::clone(&state.runtime);
    let report = tokio::task::spawn_blocking(move || runtime.train())
        .await
        .map_err(|err| ApiError::Internal(anyhow!(err)))??;
    Ok(Json(json!({
        "success": true,
        "message": "Model trained successfully",
        "results": report,
    })))
}

async fn predict(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let missing = missing_fields(&payload);
    if !missing.is_empty() {
        return Err(ApiError::MissingFields(missing));
    }
    let input: PredictionInput = serde_json::from_value(payload)
        .map_err(|err| ApiError::InvalidPayload(err.to_string()))?;

    let runtime = Arc::clone(&state.runtime);
    let request = input.clone();
    let prediction = tokio::task::spawn_blocking(move || runtime.predict(&request))
        .await
        .map_err(|err| ApiError::Internal(anyhow!(err)))??;

    let advisories = recommendations(prediction.risk_level, &input);
    Ok(Json(json!({
        "success": true,
        "prediction": prediction,
        "recommendations": advisories,
    })))
}

#[derive(Debug, Deserialize)]
struct ProfileRequest {
    #[serde(flatten)]
    profile: NewProfile,
    #[serde(flatten)]
    measurement: BmiMeasurement,
}

async fn create_profile(
    State(state): State<AppState>,
    Json(request): Json<ProfileRequest>,
) -> Result<Json<Value>, ApiError> {
    let profiles = Arc::clone(&state.profiles);
    let user_id = tokio::task::spawn_blocking(move || {
        profiles
            .lock()
            .create_profile(&request.profile, &request.measurement)
    })
    .await
    .map_err(|err| ApiError::Internal(anyhow!(err)))??;
    Ok(Json(json!({
        "success": true,
        "user_id": user_id,
        "message": "User profile created successfully",
    })))
}

/// Required prediction keys absent from the payload, in declaration order.
pub fn missing_fields(payload: &Value) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| payload.get(**field).is_none())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use vita_profiles::ProfileStore;
    use vita_risk::{ForestParams, RiskRuntime, TrainingParams};

    fn test_state(dir: &TempDir) -> AppState {
        let params = TrainingParams {
            cohort_size: 400,
            forest: ForestParams {
                trees: 25,
                ..ForestParams::default()
            },
            ..TrainingParams::default()
        };
        AppState {
            runtime: Arc::new(
                RiskRuntime::builder()
                    .artifact_dir(dir.path().join("model"))
                    .params(params)
                    .build(),
            ),
            profiles: Arc::new(Mutex::new(ProfileStore::open_in_memory().unwrap())),
        }
    }

    fn json_request(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn missing_fields_reports_in_declaration_order() {
        let payload = json!({ "age": 30, "bmi": 22.0 });
        assert_eq!(
            missing_fields(&payload),
            ["gender", "activity_level", "smoking_status", "family_history"]
        );
        let complete = json!({
            "age": 30, "gender": "male", "bmi": 22.0,
            "activity_level": "active", "smoking_status": "never",
            "family_history": "none"
        });
        assert!(missing_fields(&complete).is_empty());
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn predict_without_gender_names_the_missing_field() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir));
        let payload = json!({
            "age": 30, "bmi": 22.0, "activity_level": "active",
            "smoking_status": "never", "family_history": "none"
        });
        let response = app.oneshot(json_request("/predict", payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["missing"], json!(["gender"]));
    }

    #[tokio::test]
    async fn predict_returns_prediction_and_recommendations() {
        let dir = TempDir::new().unwrap();
        let app = router(test_state(&dir));
        let payload = json!({
            "age": 70, "gender": "male", "bmi": 32.0,
            "activity_level": "sedentary", "smoking_status": "current",
            "family_history": "both", "systolic_bp": 150, "diastolic_bp": 95
        });
        let response = app.oneshot(json_request("/predict", payload)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["prediction"]["risk_level"], "high");
        let advisories = body["recommendations"].as_array().unwrap();
        assert_eq!(advisories.len(), 5);
        assert!(advisories[0]
            .as_str()
            .unwrap()
            .starts_with("Consult with a healthcare professional"));
    }

    #[tokio::test]
    async fn user_profile_round_trips_through_the_store() {
        let dir = TempDir::new().unwrap();
        let state = test_state(&dir);
        let app = router(state.clone());
        let payload = json!({
            "age": 34, "gender": "female", "activity_level": "moderate",
            "smoking_status": "never", "family_history": "none",
            "bmi": 23.4, "height": 168.0, "weight": 66.0
        });
        let response = app
            .oneshot(json_request("/user-profile", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        let user_id = body["user_id"].as_i64().unwrap();
        let history = state.profiles.lock().bmi_history(user_id).unwrap();
        assert_eq!(history.len(), 1);
        // Pressure defaults applied when the request omits them.
        assert_eq!(history[0].systolic_bp, 120);
    }
}
