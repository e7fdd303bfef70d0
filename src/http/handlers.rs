//! HTTP verb handlers.
//!
//! Each handler binds its input with the stock axum extractors and hands
//! it to [`HttpService`](crate::service::HttpService). Body binding
//! failures use axum's default rejections (400/415/422); a missing query
//! parameter is a 400.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::model::{RequestData, ResponseData};

/// Query string as ordered key/value pairs.
pub type QueryPairs = Vec<(String, String)>;

/// A required query parameter was absent.
#[derive(Debug, thiserror::Error)]
#[error("Missing query parameter `{0}`")]
pub struct MissingParam(pub &'static str);

impl IntoResponse for MissingParam {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

/// Every value of `name` in order, joined with `,`.
pub fn joined_param(
    pairs: &[(String, String)],
    name: &'static str,
) -> Result<String, MissingParam> {
    let values: Vec<&str> = pairs
        .iter()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
        .collect();
    if values.is_empty() {
        return Err(MissingParam(name));
    }
    Ok(values.join(","))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

pub async fn get_example(
    State(state): State<AppState>,
    Query(pairs): Query<QueryPairs>,
) -> Result<Json<ResponseData>, MissingParam> {
    let param = joined_param(&pairs, "param")?;
    tracing::debug!(param = %param, "GET example");
    Ok(Json(state.service.handle_get(&param)))
}

pub async fn post_example(
    State(state): State<AppState>,
    Json(request): Json<RequestData>,
) -> Json<ResponseData> {
    tracing::debug!(value = %request.value, "POST example");
    Json(state.service.handle_post(&request))
}

pub async fn put_example(
    State(state): State<AppState>,
    Json(request): Json<RequestData>,
) -> Json<ResponseData> {
    tracing::debug!(value = %request.value, "PUT example");
    Json(state.service.handle_put(&request))
}

pub async fn patch_example(
    State(state): State<AppState>,
    Json(request): Json<RequestData>,
) -> Json<ResponseData> {
    tracing::debug!(value = %request.value, "PATCH example");
    Json(state.service.handle_patch(&request))
}

pub async fn delete_example(
    State(state): State<AppState>,
    Query(pairs): Query<QueryPairs>,
) -> Result<String, MissingParam> {
    let id = joined_param(&pairs, "id")?;
    tracing::debug!(id = %id, "DELETE example");
    Ok(state.service.handle_delete(&id))
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
