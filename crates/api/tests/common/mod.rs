//! Common test utilities for integration tests.
//!
//! The router is built over an in-memory geofence store and a mock geocoder,
//! so no backend or network is needed.

// Not every helper is used by every integration test binary.
#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use fake::faker::name::en::Name;
use fake::Fake;
use geofence_editor_api::{app::create_app, config::Config};
use domain::services::{Geocoder, GeofenceStore, MockGeocoder};
use persistence::InMemoryGeofenceStore;
use serde_json::{json, Value};
use tower::ServiceExt;

pub const TEST_ADDRESS: &str = "Shahrah-e-Faisal, Karachi";

/// Test configuration from embedded defaults.
pub fn test_config() -> Config {
    Config::load_for_test(&[]).expect("Failed to load test config")
}

/// Collaborators shared by a test router.
pub struct TestBackend {
    pub store: Arc<InMemoryGeofenceStore>,
    pub geocoder: Arc<MockGeocoder>,
}

impl TestBackend {
    pub fn new() -> Self {
        Self::with_store(InMemoryGeofenceStore::new())
    }

    pub fn with_store(store: InMemoryGeofenceStore) -> Self {
        Self {
            store: Arc::new(store),
            geocoder: Arc::new(MockGeocoder::with_address(TEST_ADDRESS)),
        }
    }

    pub fn app(&self, config: Config) -> Router {
        let store: Arc<dyn GeofenceStore> = self.store.clone();
        let geocoder: Arc<dyn Geocoder> = self.geocoder.clone();
        create_app(config, store, geocoder)
    }
}

/// Create a router over a fresh in-memory store.
pub fn create_test_app() -> Router {
    TestBackend::new().app(test_config())
}

/// Build a JSON request.
pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a request without a body.
pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Helper to parse JSON response body.
pub async fn parse_response_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}

/// Send a request and return status and JSON body.
pub async fn send(app: &Router, request: Request<Body>) -> (axum::http::StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

/// Open a session and return its id and view.
pub async fn open_session(app: &Router) -> (String, Value) {
    let (status, body) = send(app, json_request(Method::POST, "/api/v1/sessions", json!({}))).await;
    assert_eq!(status, axum::http::StatusCode::CREATED, "open failed: {}", body);
    let id = body["sessionId"].as_str().unwrap().to_string();
    (id, body)
}

/// Session scoped URI.
pub fn session_uri(session_id: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        format!("/api/v1/sessions/{}", session_id)
    } else {
        format!("/api/v1/sessions/{}/{}", session_id, suffix)
    }
}

/// Fill in valid metadata through the form.
pub async fn fill_metadata(app: &Router, session_id: &str) -> String {
    let name: String = Name().fake();
    for (field, value) in [("name", name.as_str()), ("contactNumber", "03001234567")] {
        let (status, body) = send(
            app,
            json_request(
                Method::POST,
                &session_uri(session_id, "form"),
                json!({ "field": field, "value": value }),
            ),
        )
        .await;
        assert_eq!(status, axum::http::StatusCode::OK, "form edit failed: {}", body);
    }
    name
}

/// Draw and place a circle at `(lat, lng)`.
pub async fn draw_circle(app: &Router, session_id: &str, lat: f64, lng: f64) -> Value {
    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            &session_uri(session_id, "draw"),
            json!({ "shapeType": "circle" }),
        ),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK, "draw failed: {}", body);

    let (status, body) = send(
        app,
        json_request(
            Method::POST,
            &session_uri(session_id, "place"),
            json!({ "lat": lat, "lng": lng }),
        ),
    )
    .await;
    assert_eq!(status, axum::http::StatusCode::OK, "place failed: {}", body);
    body
}

/// A stored polygon record in backend wire form.
pub fn polygon_record(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "mobileNumber": "03001234567",
        "isPublic": false,
        "isPrivate": true,
        "color": "#00AA00",
        "shapeType": "polygon",
        "geoCodeData": {
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [[0.0, 0.0], [0.0, 0.001], [0.001, 0.001], [0.001, 0.0]]
            }
        },
        "createdAt": "2024-05-01T10:00:00Z"
    })
}
