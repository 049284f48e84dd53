//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Script routes identify the caller from the `x-user-id` header (set by the
//! auth proxy in front of this service) and refuse to run without it.

use std::sync::Arc;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{response::IntoResponse, Json};
use tracing::{info, instrument};

use crate::error::CanvasError;
use crate::logic::*;
use crate::protocol::*;
use crate::state::AppState;

fn owner_from(headers: &HeaderMap) -> Result<String, CanvasError> {
  headers
    .get("x-user-id")
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
    .map(String::from)
    .ok_or_else(|| CanvasError::WriteDenied("missing x-user-id header".into()))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info")]
pub async fn http_get_catalog() -> impl IntoResponse { Json(catalog_out()) }

#[instrument(level = "info", skip(state, headers, body), fields(game_type = %body.game_type, regenerating = body.script_id.is_some()))]
pub async fn http_post_generate(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Json(body): Json<GenerateIn>,
) -> Result<Json<ScriptOut>, CanvasError> {
  let owner = owner_from(&headers)?;
  let rec = generate_script(&state, &owner, body.to_params(), body.script_id.clone()).await?;
  info!(target: "canvas", id = %rec.id.as_deref().unwrap_or(""), title = %rec.title, "HTTP generate served");
  Ok(Json(to_out(&rec)))
}

#[instrument(level = "info", skip(state, headers))]
pub async fn http_list_scripts(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
) -> Result<Json<Vec<ScriptOut>>, CanvasError> {
  let owner = owner_from(&headers)?;
  let scripts = list_scripts(&state, &owner).await?;
  info!(target: "canvas", count = scripts.len(), "HTTP scripts listed");
  Ok(Json(scripts.iter().map(to_out).collect()))
}

#[instrument(level = "info", skip(state, headers), fields(%id))]
pub async fn http_get_script(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(id): Path<String>,
) -> Result<Json<ScriptOut>, CanvasError> {
  let owner = owner_from(&headers)?;
  let rec = fetch_script(&state, &owner, &id).await?;
  Ok(Json(to_out(&rec)))
}

#[instrument(level = "info", skip(state, headers, body), fields(%id))]
pub async fn http_post_save(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(id): Path<String>,
  Json(body): Json<SaveIn>,
) -> Result<Json<ScriptOut>, CanvasError> {
  let owner = owner_from(&headers)?;
  let rec = save_edits(&state, &owner, &id, body.content).await?;
  info!(target: "canvas", %id, "HTTP save persisted");
  Ok(Json(to_out(&rec)))
}

#[instrument(level = "info", skip(state, headers, body), fields(%id))]
pub async fn http_post_quiz(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(id): Path<String>,
  Json(body): Json<QuizIn>,
) -> Result<Json<ScriptOut>, CanvasError> {
  let owner = owner_from(&headers)?;
  let rec = regenerate_quiz(&state, &owner, &id, body.count()).await?;
  info!(target: "canvas", %id, questions = rec.questions_count, "HTTP quiz regenerated");
  Ok(Json(to_out(&rec)))
}

#[instrument(level = "info", skip(state, headers), fields(%id))]
pub async fn http_post_trash(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(id): Path<String>,
) -> Result<Json<ScriptOut>, CanvasError> {
  let owner = owner_from(&headers)?;
  let rec = move_to_trash(&state, &owner, &id).await?;
  info!(target: "canvas", %id, "HTTP script trashed");
  Ok(Json(to_out(&rec)))
}

#[instrument(level = "info", skip(state, headers), fields(%id))]
pub async fn http_post_restore(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(id): Path<String>,
) -> Result<Json<ScriptOut>, CanvasError> {
  let owner = owner_from(&headers)?;
  let rec = restore_script(&state, &owner, &id).await?;
  info!(target: "canvas", %id, "HTTP script restored");
  Ok(Json(to_out(&rec)))
}

#[instrument(level = "info", skip(state, headers), fields(%id))]
pub async fn http_delete_script(
  State(state): State<Arc<AppState>>,
  headers: HeaderMap,
  Path(id): Path<String>,
) -> Result<StatusCode, CanvasError> {
  let owner = owner_from(&headers)?;
  delete_forever(&state, &owner, &id).await?;
  info!(target: "canvas", %id, "HTTP script deleted permanently");
  Ok(StatusCode::NO_CONTENT)
}
