//! CRUD endpoints over the saved-songs library.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::error::ApiError;
use super::metrics;
use super::state::{GuardedLibraryStore, ServerState};
use super::ServerConfig;
use crate::library::{EntryId, LibraryEntryPatch, NewLibraryEntry, OwnerId};

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct OwnerQuery {
    owner_id: Option<String>,
}

fn resolve_owner(raw: Option<&str>, config: &ServerConfig) -> Result<OwnerId, ApiError> {
    match raw {
        Some(raw) => Ok(OwnerId::parse(raw)?),
        None => Ok(config.default_owner_id.clone()),
    }
}

fn song_not_found() -> ApiError {
    ApiError::NotFound("Song not found".to_string())
}

async fn list_entries(
    State(config): State<ServerConfig>,
    State(store): State<GuardedLibraryStore>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let owner = resolve_owner(query.owner_id.as_deref(), &config)?;

    let entries = store.list(&owner)?;
    metrics::record_library_operation("list");
    Ok(Json(json!({
        "success": true,
        "count": entries.len(),
        "data": entries,
    }))
    .into_response())
}

async fn get_entry(
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: EntryId = id.parse()?;

    let entry = store.get(&id)?.ok_or_else(song_not_found)?;
    metrics::record_library_operation("get");
    Ok(Json(json!({ "success": true, "data": entry })).into_response())
}

async fn create_entry(
    State(config): State<ServerConfig>,
    State(store): State<GuardedLibraryStore>,
    body: Result<Json<NewLibraryEntry>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(new_entry) = body?;
    let owner = resolve_owner(new_entry.owner_id.as_deref(), &config)?;
    new_entry.validate()?;

    let entry = store.create(&owner, new_entry)?;
    metrics::record_library_operation("create");
    debug!("Saved \"{}\" to the library of {}", entry.song.title, owner);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Song saved to library",
            "data": entry,
        })),
    )
        .into_response())
}

async fn update_entry(
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
    body: Result<Json<LibraryEntryPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id: EntryId = id.parse()?;
    let Json(patch) = body?;
    patch.validate()?;

    let entry = store.update(&id, patch)?.ok_or_else(song_not_found)?;
    metrics::record_library_operation("update");
    Ok(Json(json!({
        "success": true,
        "message": "Song updated",
        "data": entry,
    }))
    .into_response())
}

async fn delete_entry(
    State(store): State<GuardedLibraryStore>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id: EntryId = id.parse()?;

    if !store.delete(&id)? {
        return Err(song_not_found());
    }
    metrics::record_library_operation("delete");
    Ok(Json(json!({
        "success": true,
        "message": "Song deleted from library",
    }))
    .into_response())
}

pub fn make_library_routes(state: ServerState) -> Router {
    Router::new()
        .route("/", get(list_entries).post(create_entry))
        .route(
            "/{id}",
            get(get_entry).put(update_entry).delete(delete_entry),
        )
        .with_state(state)
}
