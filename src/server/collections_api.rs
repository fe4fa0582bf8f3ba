//! Collection routes. Every successful call answers with the full item array and the
//! collection revision in `x-collection-revision`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use super::{blocking, require_admin, AppState, REVISION_HEADER};
use crate::collections::{Direction, JsonSnapshot, Mutation};
use crate::error::{AppError, AppResult};

#[derive(Debug, Default, Deserialize)]
pub struct RevisionQuery {
    pub revision: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderPayload {
    pub direction: Direction,
}

fn bad_body(e: JsonRejection) -> AppError {
    AppError::invalid_input("invalid_body".to_string(), e.body_text())
}

fn bad_query(e: QueryRejection) -> AppError {
    AppError::invalid_input("invalid_query".to_string(), e.body_text())
}

fn items_response(snap: JsonSnapshot) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(REVISION_HEADER, HeaderValue::from(snap.revision));
    (StatusCode::OK, headers, Json(snap.items)).into_response()
}

async fn run_mutation(
    state: AppState,
    name: &str,
    query: Result<Query<RevisionQuery>, QueryRejection>,
    mutation: Mutation,
) -> AppResult<Response> {
    let Query(q) = query.map_err(bad_query)?;
    let coll = state.collections.get(name)?;
    let snap = blocking(move || coll.apply_json(mutation, q.revision)).await?;
    Ok(items_response(snap))
}

pub async fn list_collections(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Json<Vec<String>>> {
    require_admin(&state, &headers)?;
    Ok(Json(state.collections.names()))
}

pub async fn list_items(State(state): State<AppState>, headers: HeaderMap, Path(name): Path<String>) -> AppResult<Response> {
    require_admin(&state, &headers)?;
    let coll = state.collections.get(&name)?;
    let snap = blocking(move || coll.snapshot_json()).await?;
    Ok(items_response(snap))
}

pub async fn add_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    query: Result<Query<RevisionQuery>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    require_admin(&state, &headers)?;
    let Json(payload) = body.map_err(bad_body)?;
    run_mutation(state, &name, query, Mutation::Add { payload }).await
}

pub async fn update_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((name, id)): Path<(String, String)>,
    query: Result<Query<RevisionQuery>, QueryRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    require_admin(&state, &headers)?;
    let Json(patch) = body.map_err(bad_body)?;
    let Value::Object(patch) = patch else {
        return Err(AppError::invalid_input("invalid_body".to_string(), "patch must be a JSON object".to_string()));
    };
    run_mutation(state, &name, query, Mutation::Update { id, patch }).await
}

pub async fn reorder_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((name, id)): Path<(String, String)>,
    query: Result<Query<RevisionQuery>, QueryRejection>,
    body: Result<Json<ReorderPayload>, JsonRejection>,
) -> AppResult<Response> {
    require_admin(&state, &headers)?;
    let Json(ReorderPayload { direction }) = body.map_err(bad_body)?;
    run_mutation(state, &name, query, Mutation::Reorder { id, direction }).await
}

pub async fn toggle_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((name, id)): Path<(String, String)>,
    query: Result<Query<RevisionQuery>, QueryRejection>,
) -> AppResult<Response> {
    require_admin(&state, &headers)?;
    run_mutation(state, &name, query, Mutation::ToggleVisibility { id }).await
}

pub async fn delete_item(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((name, id)): Path<(String, String)>,
    query: Result<Query<RevisionQuery>, QueryRejection>,
) -> AppResult<Response> {
    require_admin(&state, &headers)?;
    run_mutation(state, &name, query, Mutation::Delete { id }).await
}
