//! `/api/chroma` proxy endpoint
//!
//! GET serves `heartbeat`, `collections` and `collections/{name}/documents`;
//! POST serves `collections/{name}/search` with a `{query, limit?}` body.
//! Connection settings travel with every request as query parameters.

use axum::{
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{error, warn};
use crate::models::{
    AppState, Collection, ConnectionConfig, ProxyParams, SearchRequest, StatusResponse,
    DEFAULT_DOCUMENT_LIMIT,
};
use crate::proxy::{self, Endpoint};
use crate::types::{AppError, AppResult};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/chroma", get(get_chroma).post(post_chroma))
        .with_state(state)
}

async fn get_chroma(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
) -> Response {
    respond(handle_get(&state, &params).await)
}

async fn post_chroma(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
    body: Bytes,
) -> Response {
    respond(handle_post(&state, &params, &body).await)
}

fn respond(result: AppResult<Response>) -> Response {
    match result {
        Ok(response) => response,
        Err(AppError::InvalidEndpoint) => {
            warn!("Rejected unknown proxy endpoint");
            AppError::InvalidEndpoint.into_response()
        }
        Err(e) => {
            error!("ChromaDB Error: {}", e);
            e.into_response()
        }
    }
}

fn endpoint(params: &ProxyParams) -> AppResult<Endpoint> {
    params
        .endpoint
        .as_deref()
        .and_then(Endpoint::parse)
        .ok_or(AppError::InvalidEndpoint)
}

fn parse_limit(raw: Option<&str>, default: usize) -> AppResult<usize> {
    match raw.filter(|v| !v.trim().is_empty()) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidRequest(format!("invalid limit '{}'", v))),
        None => Ok(default),
    }
}

async fn handle_get(state: &AppState, params: &ProxyParams) -> AppResult<Response> {
    let endpoint = endpoint(params)?;
    if !endpoint.is_read() {
        return Err(AppError::InvalidEndpoint);
    }

    let connection = ConnectionConfig::from_params(params)?;
    let api = state.connector.connect(&connection)?;

    match endpoint {
        Endpoint::Heartbeat => {
            proxy::heartbeat(api.as_ref()).await?;
            Ok(Json(StatusResponse {
                status: "ok".to_string(),
            })
            .into_response())
        }
        Endpoint::Collections => {
            let collections: Vec<Collection> = proxy::list_collections(api.as_ref())
                .await?
                .into_iter()
                .filter_map(|outcome| outcome.into_result().ok())
                .collect();
            Ok(Json(collections).into_response())
        }
        Endpoint::Documents(name) => {
            let limit = parse_limit(params.limit.as_deref(), DEFAULT_DOCUMENT_LIMIT)?;
            let documents = proxy::list_documents(api.as_ref(), &name, limit).await?;
            Ok(Json(documents).into_response())
        }
        Endpoint::Search(_) => Err(AppError::InvalidEndpoint),
    }
}

async fn handle_post(state: &AppState, params: &ProxyParams, body: &[u8]) -> AppResult<Response> {
    let name = match endpoint(params)? {
        Endpoint::Search(name) => name,
        _ => return Err(AppError::InvalidEndpoint),
    };

    let request: SearchRequest = serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidRequest(format!("invalid search body: {}", e)))?;

    let connection = ConnectionConfig::from_params(params)?;
    let api = state.connector.connect(&connection)?;

    let documents = proxy::search(api.as_ref(), &name, &request)
        .await?
        .into_result()
        .map_err(AppError::Internal)?;
    Ok(Json(documents).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::{FakeChroma, FakeConnector};
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app(chroma: FakeChroma) -> (Router, Arc<FakeConnector>) {
        let connector = Arc::new(FakeConnector::new(chroma));
        let state = AppState::new(Config::default(), connector.clone());
        (router(state), connector)
    }

    async fn call(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn recipes() -> FakeChroma {
        FakeChroma::reachable()
            .with_collection("c1", "recipes", Some(2))
            .with_collection("c2", "broken", None)
            .with_documents("recipes", &[("1", "apple pie"), ("2", "banana bread")])
    }

    #[tokio::test]
    async fn test_unknown_endpoint_is_bad_request() {
        for method in [Method::GET, Method::POST] {
            let (router, _) = app(recipes());
            let (status, body) = call(router, method, "/api/chroma?endpoint=bogus", None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body, json!({"error": "Invalid endpoint"}));
        }
    }

    #[tokio::test]
    async fn test_selector_method_mismatch_is_bad_request() {
        let (router, _) = app(recipes());
        let (status, _) = call(router, Method::GET, "/api/chroma?endpoint=collections/recipes/search", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (router, _) = app(recipes());
        let (status, _) = call(router, Method::POST, "/api/chroma?endpoint=collections", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_heartbeat_ok_and_failure() {
        let (router, connector) = app(recipes());
        let (status, body) = call(
            router,
            Method::GET,
            "/api/chroma?endpoint=heartbeat&url=https://db.local&port=8443&apiKey=tok",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok"}));

        let seen = connector.last_connection.lock().unwrap().clone().unwrap();
        assert_eq!(seen.base_url(), "https://db.local:8443");
        assert_eq!(seen.api_key.as_deref(), Some("tok"));

        let (router, _) = app(FakeChroma::unreachable());
        let (status, body) = call(router, Method::GET, "/api/chroma?endpoint=heartbeat", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("ChromaDB Error: "));
        assert!(message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_tenant_and_database_reach_the_connection() {
        let (router, connector) = app(recipes());
        let (status, _) = call(
            router,
            Method::GET,
            "/api/chroma?endpoint=collections&tenant=acme&database=prod",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let seen = connector.last_connection.lock().unwrap().clone().unwrap();
        assert_eq!(seen.tenant(), "acme");
        assert_eq!(seen.database(), "prod");
    }

    #[tokio::test]
    async fn test_collections_listing_degrades_counts() {
        let (router, _) = app(recipes());
        let (status, body) = call(router, Method::GET, "/api/chroma?endpoint=collections", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([
                {"id": "c1", "name": "recipes", "metadata": {}, "count": 2},
                {"id": "c2", "name": "broken", "metadata": {}, "count": 0}
            ])
        );
    }

    #[tokio::test]
    async fn test_documents_listing() {
        let (router, _) = app(recipes());
        let (status, body) = call(
            router,
            Method::GET,
            "/api/chroma?endpoint=collections/recipes/documents&limit=1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([{"id": "1", "document": "apple pie", "metadata": {}}]));
    }

    #[tokio::test]
    async fn test_search_fallback_over_http() {
        let (router, _) = app(recipes());
        let (status, body) = call(
            router,
            Method::POST,
            "/api/chroma?endpoint=collections/recipes/search",
            Some(json!({"query": "Apple"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"id": "1", "document": "apple pie", "metadata": {}, "distance": 0.0}])
        );
    }

    #[tokio::test]
    async fn test_malformed_search_body_is_server_error() {
        let (router, _) = app(recipes());
        let (status, body) = call(
            router,
            Method::POST,
            "/api/chroma?endpoint=collections/recipes/search",
            Some(json!({"limit": 3})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("invalid search body"));
    }

    #[tokio::test]
    async fn test_missing_collection_is_server_error() {
        let (router, _) = app(recipes());
        let (status, body) = call(
            router,
            Method::GET,
            "/api/chroma?endpoint=collections/nope/documents",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("does not exist"));
    }
}
