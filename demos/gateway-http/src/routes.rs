//! The HTTP surface specification §6 describes, wired directly to
//! [`filegate::provider::Provider`]. Route shape follows WaterButler's own
//! API: a provider-scoped resource path plus a small query-string
//! vocabulary (`meta`, `zip`, `versions`, `kind`/`name` for writes,
//! `conflict`), and a separate fixed endpoint for cross-provider copy/move
//! since those operate on two resources at once and don't fit the
//! single-path shape.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path as AxumPath, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use filegate::callback::CallbackAction;
use filegate::content_disposition::{content_disposition, resolve_content_type};
use filegate::metadata::Metadata;
use filegate::provider::{self, ConflictResolution};
use filegate::stream::RequestStreamReader;
use filegate::{Error, ErrorKind, Provider};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api_error::ApiError;
use crate::body::RequestBodyStream;
use crate::presentation;
use crate::state::AppState;

const DOWNLOAD_CHUNK: usize = 64 * 1024;

/// Builds the full Axum router over the per-provider resource surface plus
/// the cross-provider `/ops` endpoint, wrapped in request tracing and a
/// permissive CORS layer.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v1/resources/:rid/providers/:name/",
            get(get_entity_root).put(put_entity_root).delete(delete_entity_root),
        )
        .route(
            "/v1/resources/:rid/providers/:name/*path",
            get(get_entity).put(put_entity).delete(delete_entity),
        )
        .route("/v1/resources/:rid/ops", post(post_ops))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

fn resolve_provider(state: &AppState, name: &str) -> Result<Arc<dyn Provider>, ApiError> {
    state
        .registry
        .build(name, &state.gateway_settings, &Value::Null)
        .map_err(ApiError::from)
}

fn raw_materialized(raw_path: &str) -> String {
    if raw_path.is_empty() {
        "/".to_string()
    } else {
        format!("/{raw_path}")
    }
}

fn parse_conflict(params: &HashMap<String, String>) -> Result<ConflictResolution, ApiError> {
    match params.get("conflict").map(String::as_str) {
        None | Some("replace") => Ok(ConflictResolution::Replace),
        Some("warn") => Ok(ConflictResolution::Warn),
        Some("keep") => Ok(ConflictResolution::Keep),
        Some(other) => Err(ApiError(Error::new(
            ErrorKind::InvalidParameters,
            format!("unknown conflict resolution: {other}"),
        ))),
    }
}

fn log_unsupported_hints(params: &HashMap<String, String>) {
    for key in ["mode", "commitSha", "branch"] {
        if let Some(value) = params.get(key) {
            tracing::debug!(hint = key, %value, "backend hint accepted but not acted on by this core");
        }
    }
}

/// The `revision`/`version` query aliases (specification §6: "Query
/// overrides: ... `revision`/`version`/`commitSha`/`branch`").
fn resolve_revision(params: &HashMap<String, String>) -> Option<&str> {
    params.get("revision").or_else(|| params.get("version")).map(String::as_str)
}

async fn get_entity_root(
    state: State<AppState>,
    path: AxumPath<(String, String)>,
    query: Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (rid, name) = path.0;
    get_entity_inner(state.0, rid, name, String::new(), query.0, headers).await
}

async fn get_entity(
    state: State<AppState>,
    path: AxumPath<(String, String, String)>,
    query: Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let (rid, name, raw_path) = path.0;
    get_entity_inner(state.0, rid, name, raw_path, query.0, headers).await
}

async fn get_entity_inner(
    state: AppState,
    rid: String,
    name: String,
    raw_path: String,
    params: HashMap<String, String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    log_unsupported_hints(&params);
    let backend = resolve_provider(&state, &name)?;
    let resolved = backend.validate_path(&raw_materialized(&raw_path)).await?;

    if resolved.is_dir() {
        if params.contains_key("zip") {
            let stream = backend.zip(&resolved).await?;
            let file_name = if resolved.is_root() { "archive".to_string() } else { resolved.name().to_string() };
            let body = Body::from_stream(RequestStreamReader::new(stream, DOWNLOAD_CHUNK));
            let mut response = Response::new(body);
            response.headers_mut().insert(header::CONTENT_TYPE, "application/zip".parse().unwrap());
            response.headers_mut().insert(
                header::CONTENT_DISPOSITION,
                content_disposition(&format!("{file_name}.zip")).parse().unwrap(),
            );
            return Ok(response);
        }
        let listing = backend.list_folder(&resolved).await?;
        return Ok(Json(presentation::list_envelope(&rid, &listing)).into_response());
    }

    if params.contains_key("meta") {
        let meta = backend.metadata(&resolved).await?;
        return Ok(Json(meta.json_api_serialized(&rid)).into_response());
    }
    if params.contains_key("versions") || params.contains_key("revisions") {
        let revisions = backend.revisions(&resolved).await?;
        let entries: Vec<Metadata> = revisions.into_iter().map(Metadata::Revision).collect();
        return Ok(Json(presentation::list_envelope(&rid, &entries)).into_response());
    }

    let meta = backend.metadata(&resolved).await?;
    let Metadata::File(file_meta) = &meta else {
        return Err(ApiError(Error::new(ErrorKind::InvalidPath, "expected a file")));
    };
    let display_name = params.get("displayName").cloned().unwrap_or_else(|| file_meta.common.name.clone());

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let resolved_range = range_header.and_then(|value| presentation::parse_range(value, file_meta.size));

    let revision = resolve_revision(&params);
    let stream = backend.download(&resolved, revision, resolved_range).await?;
    let body = Body::from_stream(RequestStreamReader::new(stream, DOWNLOAD_CHUNK));
    let mut response = Response::new(body);
    let status = if resolved_range.is_some() { StatusCode::PARTIAL_CONTENT } else { StatusCode::OK };
    *response.status_mut() = status;
    let content_type = resolve_content_type(&display_name, file_meta.content_type.as_deref());
    response.headers_mut().insert(header::CONTENT_TYPE, content_type.parse().unwrap());
    response
        .headers_mut()
        .insert(header::CONTENT_DISPOSITION, content_disposition(&display_name).parse().unwrap());
    if let Some((start, end)) = resolved_range {
        response.headers_mut().insert(
            header::CONTENT_RANGE,
            presentation::content_range_header(start, end, file_meta.size).parse().unwrap(),
        );
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, (end - start).to_string().parse().unwrap());
    } else if let Some(size) = file_meta.size {
        response.headers_mut().insert(header::CONTENT_LENGTH, size.to_string().parse().unwrap());
    }
    Ok(response)
}

async fn put_entity_root(
    state: State<AppState>,
    path: AxumPath<(String, String)>,
    query: Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let (rid, name) = path.0;
    put_entity_inner(state.0, rid, name, String::new(), query.0, headers, body).await
}

async fn put_entity(
    state: State<AppState>,
    path: AxumPath<(String, String, String)>,
    query: Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let (rid, name, raw_path) = path.0;
    put_entity_inner(state.0, rid, name, raw_path, query.0, headers, body).await
}

async fn put_entity_inner(
    state: AppState,
    rid: String,
    name: String,
    raw_path: String,
    params: HashMap<String, String>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let backend = resolve_provider(&state, &name)?;
    let parent_raw = {
        let trimmed = raw_path.trim_end_matches('/');
        if trimmed.is_empty() { "/".to_string() } else { format!("/{trimmed}/") }
    };
    let parent = backend.validate_path(&parent_raw).await?;
    let child_name = params
        .get("name")
        .cloned()
        .ok_or_else(|| ApiError(Error::new(ErrorKind::InvalidParameters, "missing required `name` query parameter")))?;
    let conflict = parse_conflict(&params)?;
    let kind = params.get("kind").map(String::as_str).unwrap_or("file");

    let (meta, action) = if kind == "folder" {
        let child = parent.child(child_name, None, true);
        (backend.create_folder(&child, conflict).await?, CallbackAction::Create)
    } else {
        let child = parent.child(child_name, None, false);
        let existed_before = backend.metadata(&child).await.is_ok();
        let resolved = backend.handle_name_conflict(&child, conflict).await?;
        let content_length = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let stream = Box::new(RequestBodyStream::new(body, content_length));
        let meta = backend.upload(&resolved, stream).await?;
        let action = if existed_before { CallbackAction::Update } else { CallbackAction::Create };
        (meta, action)
    };

    log_callback(&state, action, &name, &meta);
    Ok(Json(meta.json_api_serialized(&rid)).into_response())
}

async fn delete_entity_root(
    state: State<AppState>,
    path: AxumPath<(String, String)>,
    query: Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let (rid, name) = path.0;
    delete_entity_inner(state.0, rid, name, String::new(), query.0).await
}

async fn delete_entity(
    state: State<AppState>,
    path: AxumPath<(String, String, String)>,
    query: Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let (rid, name, raw_path) = path.0;
    delete_entity_inner(state.0, rid, name, raw_path, query.0).await
}

async fn delete_entity_inner(
    state: AppState,
    _rid: String,
    name: String,
    raw_path: String,
    params: HashMap<String, String>,
) -> Result<Response, ApiError> {
    let backend = resolve_provider(&state, &name)?;
    let resolved = backend.validate_path(&raw_materialized(&raw_path)).await?;
    let confirm = params.get("confirmDelete").map(String::as_str) == Some("true");
    let meta_before = backend.metadata(&resolved).await.ok();
    backend.delete(&resolved, confirm).await?;
    if let Some(meta) = meta_before {
        log_callback(&state, CallbackAction::Delete, &name, &meta);
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[derive(Debug, Deserialize)]
struct OpsRequest {
    action: OpsAction,
    source: OpsEndpoint,
    destination: OpsEndpoint,
    rename: Option<String>,
    #[serde(default)]
    conflict: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum OpsAction {
    Copy,
    Move,
}

#[derive(Debug, Deserialize)]
struct OpsEndpoint {
    provider: String,
    path: String,
}

async fn post_ops(State(state): State<AppState>, Json(request): Json<OpsRequest>) -> Result<Response, ApiError> {
    let src_provider = resolve_provider(&state, &request.source.provider)?;
    let dest_provider = resolve_provider(&state, &request.destination.provider)?;
    let src_path = src_provider.validate_path(&request.source.path).await?;
    let mut dest_path = dest_provider.validate_path(&request.destination.path).await?;
    if let Some(rename) = request.rename {
        dest_path = dest_path.parent().child(rename, None, dest_path.is_dir());
    }
    let conflict = match request.conflict.as_deref() {
        None | Some("replace") => ConflictResolution::Replace,
        Some("warn") => ConflictResolution::Warn,
        Some("keep") => ConflictResolution::Keep,
        Some(other) => {
            return Err(ApiError(Error::new(ErrorKind::InvalidParameters, format!("unknown conflict resolution: {other}"))))
        }
    };

    let (meta, action) = match request.action {
        OpsAction::Copy => (
            provider::copy(src_provider.as_ref(), &src_path, dest_provider.as_ref(), &dest_path, conflict).await?,
            CallbackAction::Copy,
        ),
        OpsAction::Move => (
            provider::move_entity(src_provider.as_ref(), &src_path, dest_provider.as_ref(), &dest_path, conflict)
                .await?,
            CallbackAction::Move,
        ),
    };

    log_callback(&state, action, &request.destination.provider, &meta);
    Ok(Json(meta.json_api_serialized(&request.destination.provider)).into_response())
}

/// Builds and logs the HMAC-signed callback payload specification §6
/// describes. Actually delivering it (a `PUT` to the configured callback
/// URL) is the embedding application's job, same as [`filegate::callback`]
/// itself documents; this binary only proves the envelope is produced.
fn log_callback(state: &AppState, action: CallbackAction, provider_name: &str, meta: &Metadata) {
    let Some(signer) = state.signer.as_ref() else { return };
    let time = chrono::Utc::now().to_rfc3339();
    let metadata_json = meta.json_api_serialized(provider_name)["data"].clone();
    match signer.sign_entity(action, provider_name, &json!({}), &metadata_json, &time) {
        Ok(payload) => tracing::info!(%payload, "callback signed"),
        Err(err) => tracing::warn!(error = %err, "failed to sign callback payload"),
    }
}
