//! HTTP adapter for the conditions pipeline.
//!
//! Exposes each pipeline operation as `POST /{operation}`; the request body
//! is the raw invocation payload. Errors are rendered as
//! `{ "kind": ..., "message": ... }`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{ConditionsError, ErrorKind};
use crate::pipeline::{Conditions, Operation};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    conditions: Conditions,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

/// HTTP status for an error kind.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::MalformedRequest | ErrorKind::InvalidQuery | ErrorKind::UnsupportedLatitude => {
            StatusCode::BAD_REQUEST
        }
        ErrorKind::NoMatch | ErrorKind::StationNotFound => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamError => StatusCode::BAD_GATEWAY,
        ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for ConditionsError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            warn!("{}: {}", kind.as_str(), self);
        }
        let body = ErrorBody {
            kind: kind.as_str(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the Axum router with all routes.
pub fn create_router(conditions: Conditions) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/{operation}", post(operation_handler))
        .with_state(AppState { conditions })
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or serving fails.
pub async fn run_server(config: ServerConfig, conditions: Conditions) -> anyhow::Result<()> {
    let app = create_router(conditions);

    let addr = format!("{}:{}", config.host, config.port);
    info!("🌊 riverwatch listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn operation_handler(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    body: String,
) -> Response {
    let operation: Operation = match operation.parse() {
        Ok(op) => op,
        Err(message) => {
            let body = ErrorBody {
                kind: "unknown_operation",
                message,
            };
            return (StatusCode::NOT_FOUND, Json(body)).into_response();
        }
    };

    let event: Value = if body.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        match serde_json::from_str(&body) {
            Ok(event) => event,
            Err(e) => {
                return ConditionsError::MalformedRequest(format!("body is not JSON: {e}"))
                    .into_response();
            }
        }
    };

    match state.conditions.dispatch(operation, &event).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn health_handler() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PipelineConfig, ProviderConfig};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::MalformedRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::InvalidQuery), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::UnsupportedLatitude), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NoMatch), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::StationNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::UpstreamError), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::UpstreamTimeout), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn test_error_body_shape() {
        let response = ConditionsError::NoMatch("00000".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "no_match");
        assert!(body["message"].as_str().unwrap().contains("00000"));
    }

    #[tokio::test]
    async fn test_timeout_is_gateway_timeout() {
        let response = ConditionsError::Timeout(Duration::from_secs(20)).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(response).await["kind"], "upstream_timeout");
    }

    #[tokio::test]
    async fn test_provider_error_body_stays_internal() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forward"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "latitude": 30.24, "longitude": -97.77, "label": "78704, Austin, TX, USA" }]
            })))
            .mount(&upstream)
            .await;
        Mock::given(method("GET"))
            .and(path("/data/3.0/onecall"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "cod": 401,
                "message": "Invalid API key. Please see https://openweathermap.org/faq#error401"
            })))
            .mount(&upstream)
            .await;

        let config = PipelineConfig {
            geocoder: ProviderConfig::new(upstream.uri(), None),
            water: ProviderConfig::new(upstream.uri(), None),
            weather: ProviderConfig::new(upstream.uri(), Some("bad-key".into())),
            ..PipelineConfig::default()
        };
        let err = Conditions::new(&config)
            .unwrap()
            .dispatch(Operation::Weather, &json!({ "zip": "78704" }))
            .await
            .unwrap_err();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["kind"], "upstream_error");
        assert_eq!(body["message"], "weather API error (HTTP 401)");
        let text = body.to_string();
        assert!(!text.contains("Invalid API key"));
        assert!(!text.contains("cod"));
        assert!(!text.contains("bad-key"));
    }

    #[tokio::test]
    async fn test_router_round_trip() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forward"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "latitude": 30.24, "longitude": -97.77, "label": "78704, Austin, TX, USA" }]
            })))
            .mount(&upstream)
            .await;

        let config = PipelineConfig {
            geocoder: ProviderConfig::new(upstream.uri(), None),
            water: ProviderConfig::new(upstream.uri(), None),
            weather: ProviderConfig::new(upstream.uri(), None),
            ..PipelineConfig::default()
        };
        let app = create_router(Conditions::new(&config).unwrap());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        let http = reqwest::Client::new();
        let ok: Value = http
            .post(format!("http://{addr}/geocode"))
            .body(r#"{"arguments":{"location":"78704"}}"#)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(ok["kind"], "single");
        assert_eq!(ok["coordinate"]["latitude"], 30.24);

        let malformed = http
            .post(format!("http://{addr}/stations"))
            .body(r#"{"body":{"postcode":"78704"}}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(malformed.status().as_u16(), 400);

        let unknown = http
            .post(format!("http://{addr}/forecast"))
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(unknown.status().as_u16(), 404);

        let health = http.get(format!("http://{addr}/health")).send().await.unwrap();
        assert_eq!(health.text().await.unwrap(), "OK");
    }
}
