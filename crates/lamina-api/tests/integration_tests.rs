//! # Integration Tests for lamina-api
//!
//! Exercises the assembled application: failure normalization, the
//! synthesized API description and its cache, the health probe, CORS gating,
//! the metrics endpoint, and the partition operation against stub backends.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use lamina_api::state::{AppConfig, AppState};
use lamina_core::{Element, PartitionError, PartitionRequest, Partitioner};

/// Backend stub that echoes one element per uploaded file.
struct StubPartitioner;

#[async_trait::async_trait]
impl Partitioner for StubPartitioner {
    async fn partition(&self, request: PartitionRequest) -> Result<Vec<Element>, PartitionError> {
        Ok(request
            .files
            .iter()
            .map(|f| Element {
                element_type: "NarrativeText".to_string(),
                element_id: f.filename.clone(),
                metadata: serde_json::json!({
                    "filename": f.filename,
                    "languages": request.params.languages,
                }),
                text: String::from_utf8_lossy(&f.data).into_owned(),
            })
            .collect())
    }
}

/// Backend stub that rejects every request with a fixed status.
struct RejectingPartitioner {
    status: u16,
    message: &'static str,
}

#[async_trait::async_trait]
impl Partitioner for RejectingPartitioner {
    async fn partition(&self, _request: PartitionRequest) -> Result<Vec<Element>, PartitionError> {
        Err(PartitionError::rejected(self.status, self.message))
    }
}

/// Backend stub that fails in an unforeseen way.
struct FailingPartitioner;

#[async_trait::async_trait]
impl Partitioner for FailingPartitioner {
    async fn partition(&self, _request: PartitionRequest) -> Result<Vec<Element>, PartitionError> {
        Err(PartitionError::backend("cannot reach inference service"))
    }
}

/// Helper: build the test app with default config and no backend.
fn test_app() -> axum::Router {
    lamina_api::app(AppState::new())
}

/// Helper: build the test app with a backend.
fn test_app_with(partitioner: Arc<dyn Partitioner>) -> axum::Router {
    lamina_api::app(AppState::with_config(AppConfig::default(), Some(partitioner)))
}

/// Helper: build the test app with an origin allow-list.
fn test_app_with_origins(origins: &[&str]) -> axum::Router {
    let config = AppConfig {
        allowed_origins: Some(origins.iter().map(|s| s.to_string()).collect()),
        ..AppConfig::default()
    };
    lamina_api::app(AppState::with_config(config, None))
}

/// Helper: read a response body as a string.
async fn body_string(response: axum::http::Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Helper: read a response body as JSON.
async fn body_json(response: axum::http::Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

const BOUNDARY: &str = "lamina-test-boundary";

/// Build a multipart body from (field name, optional filename, value) parts.
fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> (String, String) {
    let mut body = String::new();
    for (name, filename, value) in parts {
        body.push_str(&format!("--{BOUNDARY}\r\n"));
        match filename {
            Some(f) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"{f}\"\r\nContent-Type: text/plain\r\n\r\n"
            )),
            None => {
                body.push_str(&format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n"))
            }
        }
        body.push_str(value);
        body.push_str("\r\n");
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

fn partition_request(parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
    let (content_type, body) = multipart_body(parts);
    Request::builder()
        .method("POST")
        .uri("/general/v0/general")
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap()
}

// -- Health Probe -------------------------------------------------------------

#[tokio::test]
async fn test_healthcheck_returns_fixed_payload() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthcheck")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body,
        serde_json::json!({"healthcheck": "HEALTHCHECK STATUS: EVERYTHING OK!"})
    );
}

// -- API Description ----------------------------------------------------------

#[tokio::test]
async fn test_openapi_json_is_served() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/general/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["info"]["title"], "Lamina Partition API");
}

#[tokio::test]
async fn test_openapi_json_is_stable_across_requests() {
    let app = test_app();
    let first = body_json(
        app.clone()
            .oneshot(
                Request::builder()
                    .uri("/general/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap(),
    )
    .await;
    let second = body_json(
        app.oneshot(
            Request::builder()
                .uri("/general/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_openapi_excludes_operational_endpoints() {
    let app = test_app();
    let doc = body_json(
        app.oneshot(
            Request::builder()
                .uri("/general/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap(),
    )
    .await;
    let paths = doc["paths"].as_object().unwrap();
    assert!(paths.contains_key("/general/v0/general"));
    assert!(!paths.contains_key("/healthcheck"));
    assert!(!paths.contains_key("/metrics"));
}

#[tokio::test]
async fn test_openapi_carries_security_and_retry_metadata() {
    let app = test_app();
    let doc = body_json(
        app.oneshot(
            Request::builder()
                .uri("/general/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(doc["security"], serde_json::json!([{"ApiKeyAuth": []}]));
    assert_eq!(
        doc["components"]["securitySchemes"]["ApiKeyAuth"]["type"],
        "apiKey"
    );
    assert_eq!(doc["x-speakeasy-retries"]["strategy"], "backoff");
    assert_eq!(doc["x-speakeasy-retries"]["backoff"]["initialInterval"], 500);
}

#[tokio::test]
async fn test_openapi_partition_schemas_resolve_to_public_components() {
    let app = test_app();
    let doc = body_json(
        app.oneshot(
            Request::builder()
                .uri("/general/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap(),
    )
    .await;

    let operation = &doc["paths"]["/general/v0/general"]["post"];
    assert_eq!(
        operation["requestBody"]["content"]["multipart/form-data"]["schema"]["$ref"],
        "#/components/schemas/partition_parameters"
    );
    assert_eq!(
        operation["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/Elements"
    );

    let parameters = doc["components"]["schemas"]["partition_parameters"]["properties"]
        .as_object()
        .unwrap();
    for field in ["files", "strategy", "output_format", "chunking_strategy"] {
        assert!(parameters.contains_key(field), "missing {field}");
    }
    assert!(doc["components"]["schemas"]["Elements"].is_object());
}

#[tokio::test]
async fn test_docs_page_is_served() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/general/docs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("swagger-ui"));
    assert!(body.contains("/general/openapi.json"));
}

// -- Partition Operation ------------------------------------------------------

#[tokio::test]
async fn test_partition_returns_503_without_backend() {
    let app = test_app();
    let response = app
        .oneshot(partition_request(&[(
            "files",
            Some("report.txt"),
            "quarterly numbers",
        )]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "no partitioning backend is configured");
}

#[tokio::test]
async fn test_partition_returns_elements_from_backend() {
    let app = test_app_with(Arc::new(StubPartitioner));
    let response = app
        .oneshot(partition_request(&[
            ("files", Some("report.txt"), "quarterly numbers"),
            ("strategy", None, "fast"),
            ("languages", None, "eng"),
            ("languages", None, "deu"),
        ]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let elements = body.as_array().unwrap();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0]["type"], "NarrativeText");
    assert_eq!(elements[0]["element_id"], "report.txt");
    assert_eq!(elements[0]["text"], "quarterly numbers");
    assert_eq!(
        elements[0]["metadata"]["languages"],
        serde_json::json!(["eng", "deu"])
    );
}

#[tokio::test]
async fn test_partition_preserves_backend_rejection_status() {
    let app = test_app_with(Arc::new(RejectingPartitioner {
        status: 415,
        message: "File type application/x-iso9660-image is not supported",
    }));
    let response = app
        .oneshot(partition_request(&[(
            "files",
            Some("disk.iso"),
            "binary junk",
        )]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body = body_json(response).await;
    assert_eq!(
        body["detail"],
        "File type application/x-iso9660-image is not supported"
    );
}

#[tokio::test]
async fn test_partition_normalizes_unexpected_backend_failure_to_500() {
    let app = test_app_with(Arc::new(FailingPartitioner));
    let response = app
        .oneshot(partition_request(&[(
            "files",
            Some("report.txt"),
            "quarterly numbers",
        )]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["detail"], "cannot reach inference service");
}

#[tokio::test]
async fn test_partition_rejects_missing_file_with_422() {
    let app = test_app_with(Arc::new(StubPartitioner));
    let response = app
        .oneshot(partition_request(&[("strategy", None, "fast")]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("no file part"));
}

#[tokio::test]
async fn test_partition_rejects_bad_boolean_with_422() {
    let app = test_app_with(Arc::new(StubPartitioner));
    let response = app
        .oneshot(partition_request(&[
            ("files", Some("report.txt"), "quarterly numbers"),
            ("coordinates", None, "maybe"),
        ]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["detail"].as_str().unwrap().contains("coordinates"));
}

// -- Failure Normalization ----------------------------------------------------

#[tokio::test]
async fn test_unknown_path_returns_enveloped_404() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/general/v1/nonsense")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!({"detail": "Not Found"}));
}

// -- CORS Gate ----------------------------------------------------------------

#[tokio::test]
async fn test_no_cors_headers_without_allow_list() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthcheck")
                .header(header::ORIGIN, "https://a.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_preflight_allows_listed_origin() {
    let app = test_app_with_origins(&["https://a.com", "https://b.com"]);
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/general/v0/general")
                .header(header::ORIGIN, "https://a.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://a.com"
    );
    let methods = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("POST"));
    assert!(methods.contains("OPTIONS"));
    let headers = response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
        .unwrap()
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(headers.contains("content-type"));
}

#[tokio::test]
async fn test_preflight_ignores_unlisted_origin() {
    let app = test_app_with_origins(&["https://a.com", "https://b.com"]);
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/general/v0/general")
                .header(header::ORIGIN, "https://evil.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_cors_headers_on_actual_response_for_listed_origin() {
    let app = test_app_with_origins(&["https://a.com"]);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/general/v0/general")
                .header(header::ORIGIN, "https://a.com")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(&[]).1))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "https://a.com"
    );
}

// -- Metrics ------------------------------------------------------------------

#[tokio::test]
async fn test_metrics_endpoint_exposes_request_series() {
    let app = test_app();
    // Drive one request through the middleware so the counter has a sample.
    app.clone()
        .oneshot(
            Request::builder()
                .uri("/healthcheck")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
    let body = body_string(response).await;
    assert!(body.contains("lamina_http_requests_total"));
    assert!(body.contains("/healthcheck"));
}
