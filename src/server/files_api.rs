//! File editor routes over the gateway.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{blocking, require_admin, AppState};
use crate::error::{AppError, AppResult};
use crate::gateway::FileNode;

#[derive(Debug, Default, Deserialize)]
pub struct TreeQuery {
    /// Comma-separated extra exclusions.
    pub exclude: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

/// Body of `POST /files`. `content` is required: an omitted field never blanks a file.
#[derive(Debug, Deserialize)]
pub struct WriteBody {
    pub path: String,
    pub content: String,
}

/// Body of `POST /files/create`; a new file may start empty.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

fn bad_query(e: QueryRejection) -> AppError {
    AppError::invalid_input("invalid_query".to_string(), e.body_text())
}

fn bad_body(e: JsonRejection) -> AppError {
    AppError::invalid_input("invalid_body".to_string(), e.body_text())
}

fn ok() -> Json<Value> { Json(json!({"status": "ok"})) }

pub async fn list_tree(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<TreeQuery>, QueryRejection>,
) -> AppResult<Json<FileNode>> {
    require_admin(&state, &headers)?;
    let Query(q) = query.map_err(bad_query)?;
    let extra: Vec<String> = q.exclude.as_deref().unwrap_or("")
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let gateway = state.gateway.clone();
    let tree = blocking(move || gateway.list_tree(extra.as_slice())).await?;
    Ok(Json(tree))
}

pub async fn read_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let Query(PathQuery { path }) = query.map_err(bad_query)?;
    let gateway = state.gateway.clone();
    let p = path.clone();
    let content = blocking(move || gateway.read_file(&p)).await?;
    Ok(Json(json!({"status": "ok", "path": path, "content": content})))
}

pub async fn write_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<WriteBody>, JsonRejection>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let Json(WriteBody { path, content }) = body.map_err(bad_body)?;
    let gateway = state.gateway.clone();
    blocking(move || gateway.write_file(&path, &content)).await?;
    Ok(ok())
}

pub async fn create_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateBody>, JsonRejection>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let Json(CreateBody { path, content }) = body.map_err(bad_body)?;
    let gateway = state.gateway.clone();
    blocking(move || gateway.create_file(&path, &content)).await?;
    Ok(ok())
}

pub async fn delete_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> AppResult<Json<Value>> {
    require_admin(&state, &headers)?;
    let Query(PathQuery { path }) = query.map_err(bad_query)?;
    let gateway = state.gateway.clone();
    blocking(move || gateway.delete_file(&path)).await?;
    Ok(ok())
}
