//! Integration tests for health and stateless geometry endpoints.

mod common;

use axum::http::{Method, StatusCode};
use common::{create_test_app, empty_request, json_request, send};
use serde_json::json;

#[tokio::test]
async fn test_health_reports_memory_backend() {
    let app = create_test_app();

    let (status, body) = send(&app, empty_request(Method::GET, "/api/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["backend"]["kind"], "memory");
    assert_eq!(body["backend"]["connected"], true);
    assert_eq!(body["active_sessions"], 0);
}

#[tokio::test]
async fn test_liveness() {
    let app = create_test_app();

    let (status, body) = send(&app, empty_request(Method::GET, "/api/health/live")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = create_test_app();
    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/api/health/live")
        .header("x-request-id", "geo-test-123")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();

    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "geo-test-123"
    );
}

#[tokio::test]
async fn test_circle_metrics() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/geometry/metrics",
            json!({ "type": "circle", "center": { "lat": 24.86, "lng": 67.0 }, "radiusMeters": 1000.0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let perimeter = body["perimeterMeters"].as_f64().unwrap();
    let area = body["areaSquareMeters"].as_f64().unwrap();
    assert!((perimeter - 6283.185).abs() < 0.01);
    assert!((area - 3_141_592.65).abs() < 1.0);
}

#[tokio::test]
async fn test_metrics_of_degenerate_polygon_are_zero() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/geometry/metrics",
            json!({ "type": "polygon", "vertices": [{ "lat": 0.0, "lng": 0.0 }] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["perimeterMeters"].as_f64(), Some(0.0));
    assert_eq!(body["areaSquareMeters"].as_f64(), Some(0.0));
}

#[tokio::test]
async fn test_encode_circle() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/geometry/encode",
            json!({ "type": "circle", "center": { "lat": 24.86, "lng": 67.0 }, "radiusMeters": 500.0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "Circle");
    assert_eq!(body["coordinates"], json!([24.86, 67.0]));
    assert_eq!(body["radius"].as_f64(), Some(500.0));
}

#[tokio::test]
async fn test_encode_rejects_invalid_shape() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/geometry/encode",
            json!({ "type": "circle", "center": { "lat": 24.86, "lng": 67.0 }, "radiusMeters": 0.0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn test_decode_polygon() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/geometry/decode",
            json!({
                "type": "Polygon",
                "coordinates": [[0.0, 0.0], [0.0, 0.001], [0.001, 0.001]]
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "polygon");
    assert_eq!(body["vertices"].as_array().unwrap().len(), 3);
    assert_eq!(body["vertices"][1], json!({ "lat": 0.0, "lng": 0.001 }));
}

#[tokio::test]
async fn test_decode_malformed_circle() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/geometry/decode",
            json!({ "type": "Circle", "coordinates": [1.0, 2.0, 3.0, 4.0], "radius": 10.0 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "decode_error");
}

#[tokio::test]
async fn test_decode_unknown_geometry_type() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/geometry/decode",
            json!({ "type": "Hexagon", "coordinates": [] }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "decode_error");
}

#[tokio::test]
async fn test_validate_endpoint() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/geometry/validate",
            json!({
                "type": "polygon",
                "vertices": [
                    { "lat": 0.0, "lng": 0.0 },
                    { "lat": 0.0, "lng": 0.001 },
                    { "lat": 0.001, "lng": 0.001 }
                ]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/geometry/validate",
            json!({
                "type": "polygon",
                "vertices": [{ "lat": 0.0, "lng": 0.0 }, { "lat": 0.0, "lng": 0.001 }]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}
