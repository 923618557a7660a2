//! REST client of the fleet backend geofence resource.

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use domain::error::PersistenceError;
use domain::models::{Geofence, GeofencePayload};
use domain::services::store::{GeofencePage, GeofenceStore};
use shared::pagination::{PageInfo, PageRequest};

use crate::client::{create_client, BackendConfig};
use crate::entities::{decode_records, GeofenceBody, GeofenceEntity};
use crate::error::StoreError;
use crate::metrics::RequestTimer;

const GEOFENCES_PATH: &str = "geofences";

/// Single-resource responses come either wrapped in `{ data }` or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    Wrapped { data: Value },
    Bare(Value),
}

impl Envelope {
    fn into_inner(self) -> Value {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(value) => value,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Paged {
        data: Vec<Value>,
        #[serde(default)]
        total: Option<u64>,
    },
    Bare(Vec<Value>),
}

/// Geofence store backed by the fleet backend REST API.
#[derive(Debug, Clone)]
pub struct HttpGeofenceStore {
    client: Client,
    config: BackendConfig,
    base_url: Url,
}

impl HttpGeofenceStore {
    pub fn new(config: BackendConfig) -> Result<Self, StoreError> {
        let base_url = config.base_url()?;
        let client = create_client(&config)?;
        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Url of the collection, or of one record. The id is percent-encoded
    /// into a single path segment.
    fn resource(&self, id: Option<&str>) -> Result<Url, StoreError> {
        // Dot segments are dropped on push and would address the collection.
        if let Some(id @ ("" | "." | "..")) = id {
            return Err(StoreError::NotFound(id.to_string()));
        }

        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                StoreError::Configuration(format!(
                    "backend url {} cannot carry a path",
                    self.config.url
                ))
            })?;
            segments.pop_if_empty().push(GEOFENCES_PATH);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    async fn execute(
        &self,
        operation: &str,
        request: RequestBuilder,
        id: Option<&str>,
    ) -> Result<Response, StoreError> {
        let timer = RequestTimer::new(operation);
        let result = request.send().await;
        timer.record();

        let response = result.map_err(|e| {
            if e.is_timeout() {
                StoreError::Timeout(self.config.timeout_ms)
            } else {
                StoreError::Http(e)
            }
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(StoreError::NotFound(id.to_string()));
            }
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                message,
            });
        }

        debug!(operation, status = status.as_u16(), "Backend request completed");
        Ok(response)
    }

    async fn read_geofence(response: Response) -> Result<Geofence, StoreError> {
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;
        parse_geofence(envelope.into_inner())
    }

    async fn create(&self, payload: &GeofencePayload) -> Result<Geofence, StoreError> {
        let request = self
            .client
            .post(self.resource(None)?)
            .json(&GeofenceBody::from(payload));
        let response = self.execute("create_geofence", request, None).await?;
        Self::read_geofence(response).await
    }

    async fn update(&self, id: &str, payload: &GeofencePayload) -> Result<Geofence, StoreError> {
        let request = self
            .client
            .put(self.resource(Some(id))?)
            .json(&GeofenceBody::from(payload));
        let response = self.execute("update_geofence", request, Some(id)).await?;
        Self::read_geofence(response).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let request = self.client.delete(self.resource(Some(id))?);
        self.execute("delete_geofence", request, Some(id)).await?;
        Ok(())
    }

    async fn list(
        &self,
        page: &PageRequest,
        search: Option<&str>,
    ) -> Result<GeofencePage, StoreError> {
        let mut query = vec![
            ("page", page.page.to_string()),
            ("limit", page.limit.to_string()),
        ];
        if let Some(text) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query.push(("searchText", text.to_string()));
        }

        let request = self.client.get(self.resource(None)?).query(&query);
        let response = self.execute("list_geofences", request, None).await?;
        let body: ListResponse = response
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        Ok(parse_page(body, page))
    }
}

fn parse_geofence(value: Value) -> Result<Geofence, StoreError> {
    let entity: GeofenceEntity = serde_json::from_value(value)?;
    Ok(Geofence::try_from(entity)?)
}

fn parse_page(body: ListResponse, page: &PageRequest) -> GeofencePage {
    let (records, total) = match body {
        ListResponse::Paged { data, total } => (data, total),
        ListResponse::Bare(data) => (data, None),
    };
    let total = total.unwrap_or(page.offset() as u64 + records.len() as u64);
    let (geofences, skipped) = decode_records(records);

    GeofencePage {
        geofences,
        skipped,
        pagination: PageInfo::new(page, total),
    }
}

#[async_trait::async_trait]
impl GeofenceStore for HttpGeofenceStore {
    async fn create_geofence(
        &self,
        payload: &GeofencePayload,
    ) -> Result<Geofence, PersistenceError> {
        Ok(self.create(payload).await?)
    }

    async fn update_geofence(
        &self,
        id: &str,
        payload: &GeofencePayload,
    ) -> Result<Geofence, PersistenceError> {
        Ok(self.update(id, payload).await?)
    }

    async fn delete_geofence(&self, id: &str) -> Result<(), PersistenceError> {
        Ok(self.delete(id).await?)
    }

    async fn list_geofences(
        &self,
        page: &PageRequest,
        search: Option<&str>,
    ) -> Result<GeofencePage, PersistenceError> {
        Ok(self.list(page, search).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use chrono::Utc;
    use domain::models::geofence::GeofenceMetadata;
    use domain::models::{Coordinate, Shape};
    use serde_json::json;

    fn config(url: &str) -> BackendConfig {
        BackendConfig {
            url: url.to_string(),
            api_token: None,
            timeout_ms: 2000,
        }
    }

    fn record(id: &str) -> Value {
        json!({
            "id": id,
            "name": "Depot",
            "mobileNumber": "03001234567",
            "isPublic": true,
            "isPrivate": false,
            "geoCodeData": {
                "type": "Feature",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[0.0, 0.0], [0.0, 0.001], [0.001, 0.001], [0.001, 0.0]]
                }
            }
        })
    }

    #[test]
    fn test_resource_urls() {
        let store = HttpGeofenceStore::new(config("http://backend/api/v1/")).unwrap();
        assert_eq!(
            store.resource(None).unwrap().as_str(),
            "http://backend/api/v1/geofences"
        );
        assert_eq!(
            store.resource(Some("abc")).unwrap().as_str(),
            "http://backend/api/v1/geofences/abc"
        );

        let bare = HttpGeofenceStore::new(config("http://backend")).unwrap();
        assert_eq!(
            bare.resource(None).unwrap().as_str(),
            "http://backend/geofences"
        );
    }

    #[test]
    fn test_resource_id_stays_one_segment() {
        let store = HttpGeofenceStore::new(config("http://backend/api/v1")).unwrap();

        let url = store.resource(Some("../users/7?admin=1#x")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://backend/api/v1/geofences/..%2Fusers%2F7%3Fadmin=1%23x"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.path_segments().unwrap().count(), 4);

        for id in ["", ".", ".."] {
            assert!(matches!(
                store.resource(Some(id)),
                Err(StoreError::NotFound(_))
            ));
        }
    }

    #[test]
    fn test_envelope_accepts_wrapped_and_bare() {
        let wrapped: Envelope = serde_json::from_value(json!({ "data": record("a") })).unwrap();
        let bare: Envelope = serde_json::from_value(record("b")).unwrap();

        assert_eq!(parse_geofence(wrapped.into_inner()).unwrap().id, "a");
        assert_eq!(parse_geofence(bare.into_inner()).unwrap().id, "b");
    }

    #[test]
    fn test_parse_page_with_total() {
        let body: ListResponse = serde_json::from_value(json!({
            "data": [record("a"), record("b")],
            "total": 12
        }))
        .unwrap();
        let page = parse_page(body, &PageRequest { page: 1, limit: 2 });

        assert_eq!(page.geofences.len(), 2);
        assert_eq!(page.pagination.total, 12);
        assert_eq!(page.pagination.total_pages, 6);
    }

    #[test]
    fn test_parse_bare_page_reports_skipped() {
        let mut broken = record("c");
        broken["geoCodeData"]["geometry"]["type"] = json!("Hexagon");
        let body: ListResponse = serde_json::from_value(json!([record("a"), broken])).unwrap();
        let page = parse_page(body, &PageRequest::default());

        assert_eq!(page.geofences.len(), 1);
        assert_eq!(page.skipped.len(), 1);
        assert_eq!(page.skipped[0].id.as_deref(), Some("c"));
        assert_eq!(page.pagination.total, 2);
    }

    #[test]
    fn test_parse_geofence_rejects_invalid_record() {
        let result = parse_geofence(json!({ "id": "x" }));
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        let store = HttpGeofenceStore::new(config("http://127.0.0.1:1")).unwrap();
        let result = store.list_geofences(&PageRequest::default(), None).await;
        assert!(matches!(result, Err(PersistenceError::Unavailable(_))));
    }

    fn payload() -> GeofencePayload {
        let metadata = GeofenceMetadata {
            name: "Depot".to_string(),
            contact_number: "03001234567".to_string(),
            ..GeofenceMetadata::default()
        };
        Geofence::new(
            "placeholder",
            metadata,
            Shape::circle(Coordinate::new(24.86, 67.0), 500.0),
            Utc::now(),
        )
        .to_payload()
    }

    async fn create_record() -> (StatusCode, Json<Value>) {
        (StatusCode::CREATED, Json(json!({ "data": record("created") })))
    }

    async fn update_record(Path(id): Path<String>) -> Response {
        match id.as_str() {
            "missing" => StatusCode::NOT_FOUND.into_response(),
            "locked" => (StatusCode::UNPROCESSABLE_ENTITY, "geofence is locked").into_response(),
            "garbled" => (StatusCode::OK, "not json").into_response(),
            _ => Json(record(&id)).into_response(),
        }
    }

    async fn delete_record(Path(id): Path<String>) -> StatusCode {
        if id == "missing" {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::NO_CONTENT
        }
    }

    async fn list_records(Query(params): Query<HashMap<String, String>>) -> Response {
        match params.get("searchText").map(String::as_str) {
            Some("outage") => {
                (StatusCode::INTERNAL_SERVER_ERROR, "database offline").into_response()
            }
            Some("moved") => StatusCode::NOT_FOUND.into_response(),
            _ => Json(json!({ "data": [record("a")], "total": 1 })).into_response(),
        }
    }

    /// Serves a fake fleet backend on an ephemeral port and returns its base url.
    async fn spawn_backend() -> String {
        let router = Router::new()
            .route("/api/v1/geofences", get(list_records).post(create_record))
            .route(
                "/api/v1/geofences/:id",
                put(update_record).delete(delete_record),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/api/v1", addr)
    }

    #[tokio::test]
    async fn test_create_reads_wrapped_record() {
        let store = HttpGeofenceStore::new(config(&spawn_backend().await)).unwrap();

        let created = store.create_geofence(&payload()).await.unwrap();
        assert_eq!(created.id, "created");
    }

    #[tokio::test]
    async fn test_update_reads_bare_record() {
        let store = HttpGeofenceStore::new(config(&spawn_backend().await)).unwrap();

        let updated = store.update_geofence("abc", &payload()).await.unwrap();
        assert_eq!(updated.id, "abc");
    }

    #[tokio::test]
    async fn test_update_id_with_path_characters_reaches_one_record() {
        let store = HttpGeofenceStore::new(config(&spawn_backend().await)).unwrap();

        let updated = store.update_geofence("a/b?c", &payload()).await.unwrap();
        assert_eq!(updated.id, "a/b?c");
    }

    #[tokio::test]
    async fn test_missing_record_is_not_found() {
        let store = HttpGeofenceStore::new(config(&spawn_backend().await)).unwrap();

        assert_eq!(
            store.update_geofence("missing", &payload()).await.unwrap_err(),
            PersistenceError::NotFound("missing".to_string())
        );
        assert_eq!(
            store.delete_geofence("missing").await.unwrap_err(),
            PersistenceError::NotFound("missing".to_string())
        );
        assert!(store.delete_geofence("present").await.is_ok());
    }

    #[tokio::test]
    async fn test_error_status_is_rejected_with_body() {
        let store = HttpGeofenceStore::new(config(&spawn_backend().await)).unwrap();

        assert_eq!(
            store.update_geofence("locked", &payload()).await.unwrap_err(),
            PersistenceError::Rejected {
                status: 422,
                message: "geofence is locked".to_string(),
            }
        );
        assert_eq!(
            store
                .list_geofences(&PageRequest::default(), Some("outage"))
                .await
                .unwrap_err(),
            PersistenceError::Rejected {
                status: 500,
                message: "database offline".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_collection_not_found_is_rejected() {
        let store = HttpGeofenceStore::new(config(&spawn_backend().await)).unwrap();

        let err = store
            .list_geofences(&PageRequest::default(), Some("moved"))
            .await
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Rejected { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_non_json_success_is_invalid_response() {
        let store = HttpGeofenceStore::new(config(&spawn_backend().await)).unwrap();

        let err = store.update_geofence("garbled", &payload()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_list_reads_paged_response() {
        let store = HttpGeofenceStore::new(config(&spawn_backend().await)).unwrap();

        let page = store
            .list_geofences(&PageRequest::default(), None)
            .await
            .unwrap();
        assert_eq!(page.geofences.len(), 1);
        assert_eq!(page.geofences[0].id, "a");
        assert_eq!(page.pagination.total, 1);
    }
}
