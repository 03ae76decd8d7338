//! Resolution API Server
//!
//! HTTP surface for nearest-outlet resolution and registry management.
//! Every response is JSON; expected domain failures map to 4xx and
//! upstream/storage failures to 5xx.

use crate::application::{Resolution, ResolutionService};
use crate::domain::entities::{Outlet, ServiceType};
use crate::domain::error::ResolveError;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::Instrument;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Nearest-outlet request body.
#[derive(Debug, Clone, Deserialize)]
pub struct NearestRequest {
    pub code: String,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
}

/// Nearest-outlet query for the point variant.
#[derive(Debug, Clone, Deserialize)]
pub struct NearestPointQuery {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub service_type: Option<ServiceType>,
}

/// Paging parameters for the outlet listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Outlet listing response.
#[derive(Debug, Serialize)]
pub struct OutletsListResponse {
    pub outlets: Vec<Outlet>,
    pub total: usize,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Domain errors carried across the HTTP boundary.
///
/// Validation problems are 400, absence is 404, provider outage is 502,
/// and registry storage failure is 500. Unexpected classes are logged
/// at error before leaving.
pub struct ApiError(ResolveError);

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ResolveError::InvalidCode { .. } | ResolveError::InvalidOutlet { .. } => {
                StatusCode::BAD_REQUEST
            }
            ResolveError::CodeNotFound { .. }
            | ResolveError::OutletNotFound(_)
            | ResolveError::NoCoverage => StatusCode::NOT_FOUND,
            ResolveError::Upstream { .. } => StatusCode::BAD_GATEWAY,
            ResolveError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if !self.0.is_expected() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({
            "error": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<ResolutionService>,
}

/// Build the router. Kept separate from `run` so tests can drive it
/// with `tower::ServiceExt::oneshot`.
pub fn build_router(service: Arc<ResolutionService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/nearest", post(nearest_handler))
        .route("/api/v1/nearest/point", get(nearest_point_handler))
        .route("/api/v1/outlets", get(list_outlets_handler))
        .route("/api/v1/outlets", post(upsert_outlet_handler))
        .route("/api/v1/outlets/:id", get(get_outlet_handler))
        .route("/api/v1/stats", get(stats_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ApiState { service })
}

/// Tag each request with an id, propagated in the `x-request-id`
/// response header and on the tracing span for the handler.
async fn request_id_middleware(request: Request<axum::body::Body>, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!("request", id = %request_id);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Resolution API server.
pub struct ApiServer {
    listen_addr: String,
    service: Arc<ResolutionService>,
}

impl ApiServer {
    pub fn new(listen_addr: String, service: Arc<ResolutionService>) -> Self {
        Self {
            listen_addr,
            service,
        }
    }

    /// Run the API server.
    ///
    /// The final Ok(()) is excluded from coverage since axum::serve runs forever.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run(&self) -> anyhow::Result<()> {
        let app = build_router(self.service.clone());
        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("Resolution API listening on {}", self.listen_addr);
        axum::serve(listener, app).await?;
        Ok(())
    }
}

// Handler functions

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn nearest_handler(
    State(state): State<ApiState>,
    Json(req): Json<NearestRequest>,
) -> Result<Json<Resolution>, ApiError> {
    let resolution = state
        .service
        .nearest_by_code(&req.code, req.service_type)
        .await?;
    Ok(Json(resolution))
}

async fn nearest_point_handler(
    State(state): State<ApiState>,
    Query(query): Query<NearestPointQuery>,
) -> Result<Json<Resolution>, ApiError> {
    let resolution = state
        .service
        .nearest_by_point(query.lat, query.lng, query.service_type)
        .await?;
    Ok(Json(resolution))
}

async fn list_outlets_handler(
    State(state): State<ApiState>,
    Query(query): Query<ListQuery>,
) -> impl IntoResponse {
    let all = state.service.list_outlets().await;
    let total = all.len();
    let outlets: Vec<Outlet> = all
        .into_iter()
        .skip(query.offset)
        .take(query.limit)
        .collect();
    Json(OutletsListResponse { outlets, total })
}

async fn upsert_outlet_handler(
    State(state): State<ApiState>,
    Json(outlet): Json<Outlet>,
) -> Result<(StatusCode, Json<Outlet>), ApiError> {
    let stored = state.service.upsert_outlet(outlet).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_outlet_handler(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<Outlet>, ApiError> {
    let outlet = state.service.outlet_by_id(&id).await?;
    Ok(Json(outlet))
}

async fn stats_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.service.stats())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::adapters::outbound::DashMapOutletRepository;
    use crate::application::PostalResolver;
    use crate::domain::entities::tests::outlet;
    use crate::domain::entities::{AddressRecord, ProviderTag};
    use crate::domain::ports::{OutletRepository, PostalProvider, ProviderError};
    use crate::domain::value_objects::PostalCode;
    use crate::infrastructure::stats::StatsRegistry;
    use crate::infrastructure::ttl_cache::TtlCache;
    use async_trait::async_trait;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct KnownCodes;

    #[async_trait]
    impl PostalProvider for KnownCodes {
        async fn fetch(&self, code: &PostalCode) -> Result<AddressRecord, ProviderError> {
            if code.as_str() != "01001000" {
                return Err(ProviderError::NotFound);
            }
            Ok(AddressRecord {
                code: code.as_str().to_string(),
                street: None,
                neighborhood: None,
                city: "São Paulo".into(),
                region: "SP".into(),
                ibge: None,
                provider: ProviderTag::BrasilApi,
                latitude: Some(-23.5505),
                longitude: Some(-46.6333),
            })
        }
    }

    struct NullGeocoder;

    #[async_trait]
    impl crate::domain::ports::Geocoder for NullGeocoder {
        async fn locate(
            &self,
            _address: &AddressRecord,
        ) -> Option<crate::domain::value_objects::Coordinates> {
            None
        }
    }

    async fn test_router(seed: Vec<crate::domain::entities::Outlet>) -> Router {
        let repo = Arc::new(DashMapOutletRepository::new());
        for o in seed {
            repo.upsert(o).await.unwrap();
        }
        let stats = Arc::new(StatsRegistry::new());
        let resolver = Arc::new(PostalResolver::new(
            TtlCache::new(),
            Arc::new(KnownCodes),
            Arc::new(KnownCodes),
            stats.clone(),
        ));
        let service = Arc::new(ResolutionService::new(
            repo,
            resolver,
            Arc::new(NullGeocoder),
            Arc::new(NullGeocoder),
            TtlCache::new(),
            stats,
        ));
        build_router(service)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_router(vec![]).await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_nearest_success() {
        let app = test_router(vec![outlet("12345678000195", "Sé", -23.55, -46.64)]).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/nearest")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"code": "01001-000"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["outlet"]["id"], "12345678000195");
        assert_eq!(json["origin"]["code"], "01001000");
    }

    #[tokio::test]
    async fn test_nearest_invalid_code_is_400() {
        let app = test_router(vec![]).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/nearest")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"code": "12"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_nearest_unknown_code_is_404() {
        let app = test_router(vec![outlet("12345678000195", "Sé", -23.55, -46.64)]).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/nearest")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"code": "99999999"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_nearest_no_coverage_is_404() {
        // Known code but empty registry.
        let app = test_router(vec![]).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/nearest")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"code": "01001000"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_nearest_by_point() {
        let app = test_router(vec![outlet("12345678000195", "Sé", -23.55, -46.64)]).await;
        let request = Request::builder()
            .uri("/api/v1/nearest/point?lat=-23.55&lng=-46.63")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["origin"]["source"], "request");
    }

    #[tokio::test]
    async fn test_upsert_then_get_outlet() {
        let app = test_router(vec![]).await;

        let new_outlet = serde_json::to_string(&outlet("12345678000195", "Sé", -23.55, -46.64))
            .unwrap();
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/outlets")
                    .header("content-type", "application/json")
                    .body(Body::from(new_outlet))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/outlets/12345678000195")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["name"], "Sé");
    }

    #[tokio::test]
    async fn test_upsert_invalid_outlet_is_400() {
        let app = test_router(vec![]).await;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/outlets")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"id": "123", "name": "Bad"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_missing_outlet_is_404() {
        let app = test_router(vec![]).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/outlets/99999999999999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_outlets_paging() {
        let app = test_router(vec![
            outlet("12345678000195", "A", -23.55, -46.64),
            outlet("98765432000188", "B", -23.56, -46.65),
        ])
        .await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/outlets?limit=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["total"], 2);
        assert_eq!(json["outlets"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stats_endpoint() {
        let app = test_router(vec![]).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["code_lookups"], 0);
        assert!(json["provider_errors"].is_object());
    }

    #[tokio::test]
    async fn test_request_id_header_echoed() {
        let app = test_router(vec![]).await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-42");
    }

    #[tokio::test]
    async fn test_request_id_generated_when_absent() {
        let app = test_router(vec![]).await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let id = response.headers()["x-request-id"].to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }
}
