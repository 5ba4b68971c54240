//! HTTP API для предсказаний

use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::PipelineError;
use crate::predict::Predictor;
use crate::types::{Passenger, PredictResponse};

#[derive(Clone)]
struct AppState {
    predictor: Arc<Predictor>,
}

pub fn build_router(predictor: Arc<Predictor>) -> Router {
    let state = AppState { predictor };

    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/predict", post(predict))
        .layer(cors)
        .with_state(state)
}

fn error_response(err: PipelineError) -> (StatusCode, String) {
    let status = match err {
        PipelineError::MissingColumns(_)
        | PipelineError::DuplicateColumns(_)
        | PipelineError::ColumnNotFound(_)
        | PipelineError::DTypeMismatch { .. }
        | PipelineError::UnknownCategory { .. }
        | PipelineError::MissingValues { .. }
        | PipelineError::FeatureMismatch { .. }
        | PipelineError::EmptyData(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, format!("Prediction error: {}", err))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Titanic survival prediction API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn predict(
    State(state): State<AppState>,
    Json(passengers): Json<Vec<Passenger>>,
) -> Result<Json<PredictResponse>, (StatusCode, String)> {
    tracing::info!("Predict request: {} passengers", passengers.len());

    let predictions = state
        .predictor
        .predict_passengers(&passengers)
        .map_err(|e| {
            tracing::warn!("Prediction failed: {}", e);
            error_response(e)
        })?;

    Ok(Json(PredictResponse { predictions }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::training::fit_pipeline;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn record(id: i64, pclass: i64, name: &str, sex: &str, age: f64, fare: f64, survived: u8) -> Passenger {
        Passenger {
            passenger_id: id,
            pclass,
            name: name.to_string(),
            sex: sex.to_string(),
            age: Some(age),
            sib_sp: 0,
            parch: (id % 3 == 0) as i64,
            ticket: Some(format!("T{}", id % 5)),
            fare: Some(fare),
            cabin: None,
            embarked: Some(if id % 2 == 0 { "S" } else { "C" }.to_string()),
            survived: Some(survived),
        }
    }

    fn predictor() -> Arc<Predictor> {
        let passengers = vec![
            record(1, 3, "Braund, Mr. Owen Harris", "male", 22.0, 7.25, 0),
            record(2, 1, "Cumings, Mrs. John Bradley", "female", 38.0, 71.28, 1),
            record(3, 3, "Heikkinen, Miss. Laina", "female", 26.0, 7.92, 1),
            record(4, 1, "Futrelle, Mrs. Jacques Heath", "female", 35.0, 53.1, 1),
            record(5, 3, "Allen, Mr. William Henry", "male", 35.0, 8.05, 0),
            record(6, 2, "Moran, Mr. James", "male", 27.0, 8.46, 0),
            record(7, 1, "McCarthy, Mr. Timothy J", "male", 54.0, 51.86, 0),
            record(8, 3, "Palsson, Master. Gosta Leonard", "male", 2.0, 21.07, 0),
            record(9, 2, "Nasser, Mrs. Nicholas", "female", 14.0, 30.07, 1),
            record(10, 2, "Uruchurtu, Don. Manuel E", "male", 40.0, 27.72, 0),
        ];

        let mut config = AppConfig::default();
        config.model.n_estimators = 10;
        let frame = Passenger::to_frame(&passengers).unwrap();
        let (pipeline, model, _, _) = fit_pipeline(&config, frame).unwrap();
        Arc::new(Predictor::new(config.features, pipeline, model))
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(predictor());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_predict_returns_one_result_per_passenger() {
        let app = build_router(predictor());
        let body = serde_json::json!([
            {
                "PassengerId": 892, "Pclass": 2, "Name": "Braund, Mr. Owen Harris",
                "Sex": "male", "Age": 22.3, "SibSp": 1, "Parch": 0,
                "Ticket": "A/5 21171", "Fare": 7.25, "Cabin": null, "Embarked": "S"
            },
            {
                "PassengerId": 893, "Pclass": 1, "Name": "Wilkes, Mrs. James",
                "Sex": "female", "Age": 47.0, "SibSp": 0, "Parch": 0,
                "Ticket": "363272", "Fare": 60.0, "Embarked": "C"
            }
        ]);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/predict")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: PredictResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed.predictions.len(), 2);
        assert_eq!(parsed.predictions[0].passenger_id, 892);
        assert_eq!(parsed.predictions[1].passenger_id, 893);
        for p in &parsed.predictions {
            assert_eq!(p.survived, u8::from(p.probability > 0.5));
        }
    }

    #[tokio::test]
    async fn test_predict_rejects_unknown_port() {
        let app = build_router(predictor());
        let body = serde_json::json!([{
            "PassengerId": 1, "Pclass": 3, "Name": "Doe, Mr. John", "Sex": "male",
            "Age": 30.0, "SibSp": 0, "Parch": 0, "Ticket": "1", "Fare": 8.0, "Embarked": "X"
        }]);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/predict")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_predict_rejects_empty_batch() {
        let app = build_router(predictor());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/predict")
                    .header("content-type", "application/json")
                    .body(Body::from("[]"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
