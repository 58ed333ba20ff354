//! Prediction Routes

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_validator::RawTransaction;
use inference_engine::ErrorKind;
use metrics::{counter, histogram};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::AppState;

/// Successful prediction
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    /// 1 for fraud, 0 for legitimate
    pub prediction: u8,
    pub probability: f64,
    pub status: &'static str,
}

/// Failed prediction
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub kind: ErrorKind,
    pub error: String,
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InputValidation => StatusCode::BAD_REQUEST,
        ErrorKind::ArtifactMissing => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::SchemaMismatch | ErrorKind::DegenerateTraining => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn failure(kind: ErrorKind, error: String) -> Response {
    counter!("fraud_prediction_errors_total", "kind" => kind.as_str()).increment(1);
    warn!(kind = kind.as_str(), %error, "Prediction failed");
    let body = ErrorResponse {
        status: "failed",
        kind,
        error,
    };
    (status_for(kind), Json(body)).into_response()
}

/// Score one transaction
pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawTransaction>, JsonRejection>,
) -> Response {
    let Json(raw) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return failure(ErrorKind::InputValidation, rejection.body_text()),
    };

    match state.engine.score(&raw) {
        Ok(result) => {
            let label = result.score.label;
            counter!("fraud_predictions_total", "label" => label.to_string()).increment(1);
            histogram!("fraud_prediction_latency_seconds")
                .record(result.latency_us as f64 / 1_000_000.0);
            debug!(
                prediction = label,
                probability = result.score.probability,
                latency_us = result.latency_us,
                "Prediction served"
            );
            Json(PredictResponse {
                prediction: label,
                probability: result.score.probability,
                status: "success",
            })
            .into_response()
        }
        Err(e) => failure(e.kind(), e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{ready_engine, request};
    use crate::{create_router, AppState};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use data_validator::Validator;
    use inference_engine::InferenceEngine;
    use serde_json::Value;
    use std::sync::Arc;
    use storage::ArtifactStore;
    use tower::ServiceExt;

    async fn post(engine: InferenceEngine, uri: &str, body: String) -> (StatusCode, Value) {
        let app = create_router(Arc::new(AppState::new(engine)), None);
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_predict_success() {
        let body = serde_json::to_string(&request(500.0, 2.0)).unwrap();
        let (status, json) = post(ready_engine(), "/api/v1/predict", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
        assert_eq!(json["prediction"], 1);
        let p = json["probability"].as_f64().unwrap();
        assert!(p > 0.5 && p <= 1.0);
    }

    #[tokio::test]
    async fn test_predict_alias_route() {
        let body = serde_json::to_string(&request(10.0, 14.0)).unwrap();
        let (status, json) = post(ready_engine(), "/predict", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["prediction"], 0);
    }

    #[tokio::test]
    async fn test_unknown_category_and_extra_fields() {
        let body = r#"{"amt": 500.0, "category": "unknown_category_xyz", "gender": "F",
            "state": "WA", "job": "Pilot", "age": 34, "hour": 2, "cc_num": 1234}"#;
        let (status, json) = post(ready_engine(), "/api/v1/predict", body.to_string()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "success");
    }

    #[tokio::test]
    async fn test_invalid_hour_is_bad_request() {
        let body = serde_json::to_string(&request(500.0, 24.0)).unwrap();
        let (status, json) = post(ready_engine(), "/api/v1/predict", body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "input_validation");
        assert!(json["error"].as_str().unwrap().contains("hour"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let (status, json) =
            post(ready_engine(), "/api/v1/predict", "{\"amt\": \"lots\"".to_string()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["kind"], "input_validation");
    }

    #[tokio::test]
    async fn test_missing_artifacts_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let engine = InferenceEngine::load(&ArtifactStore::new(dir.path()), Validator::default());

        let body = serde_json::to_string(&request(500.0, 2.0)).unwrap();
        let (status, json) = post(engine, "/api/v1/predict", body).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["kind"], "artifact_missing");
    }
}
