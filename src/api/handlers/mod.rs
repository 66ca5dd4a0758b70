use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use hierarchy_core::{HierarchyError, RecordId, RecordRef};
use uuid::Uuid;

use crate::backlog::{Backlog, BacklogError};
use crate::models::*;

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side for debugging, but clients only
/// see a generic message to avoid leaking internal details.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Rejected hierarchy changes carry the violated rule in the body.
fn backlog_error(e: BacklogError) -> (StatusCode, String) {
    let status = match &e {
        BacklogError::NotFound(_) | BacklogError::ProjectNotFound(_) => Some(StatusCode::NOT_FOUND),
        BacklogError::Hierarchy(HierarchyError::Cycle { .. }) => Some(StatusCode::CONFLICT),
        BacklogError::Hierarchy(HierarchyError::ForeignRelation { .. })
        | BacklogError::Storage(_) => None,
        BacklogError::Hierarchy(_) | BacklogError::CrossProject { .. } => {
            Some(StatusCode::BAD_REQUEST)
        }
    };

    match status {
        Some(status) => {
            tracing::warn!("Rejected: {}", e);
            (status, e.to_string())
        }
        None => internal_error(e),
    }
}

/// Store errors naming a missing project or record become 404s.
fn store_error(e: anyhow::Error) -> (StatusCode, String) {
    backlog_error(e.into())
}

fn record_ref(type_name: String, id: RecordId) -> RecordRef {
    RecordRef::new(type_name, id)
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(State(backlog): State<Backlog>) -> ApiResult<Json<Vec<Project>>> {
    backlog
        .db()
        .get_all_projects()
        .map(Json)
        .map_err(internal_error)
}

pub async fn get_project(
    State(backlog): State<Backlog>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    backlog
        .db()
        .get_project(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn create_project(
    State(backlog): State<Backlog>,
    Json(input): Json<CreateProjectInput>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    backlog
        .db()
        .create_project(input)
        .map(|p| (StatusCode::CREATED, Json(p)))
        .map_err(internal_error)
}

pub async fn update_project(
    State(backlog): State<Backlog>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProjectInput>,
) -> ApiResult<Json<Project>> {
    backlog
        .db()
        .update_project(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn delete_project(
    State(backlog): State<Backlog>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if backlog.db().delete_project(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Project not found".to_string()))
    }
}

pub async fn list_project_records(
    State(backlog): State<Backlog>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<RecordSummary>>> {
    backlog
        .db()
        .get_records_by_project(id)
        .map(|records| Json(records.iter().map(Record::summary).collect()))
        .map_err(internal_error)
}

pub async fn get_hierarchy_tree(
    State(backlog): State<Backlog>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<HierarchyTreeNode>>> {
    backlog.tree(id).map(Json).map_err(backlog_error)
}

// ============================================================
// Record creation
// ============================================================

pub async fn create_epic(
    State(backlog): State<Backlog>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateEpicInput>,
) -> ApiResult<(StatusCode, Json<Epic>)> {
    backlog
        .db()
        .create_epic(project_id, input)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(store_error)
}

pub async fn create_feature(
    State(backlog): State<Backlog>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateFeatureInput>,
) -> ApiResult<(StatusCode, Json<Feature>)> {
    backlog
        .db()
        .create_feature(project_id, input)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(store_error)
}

pub async fn create_user_story(
    State(backlog): State<Backlog>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateUserStoryInput>,
) -> ApiResult<(StatusCode, Json<UserStory>)> {
    backlog
        .db()
        .create_user_story(project_id, input)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(store_error)
}

pub async fn create_item(
    State(backlog): State<Backlog>,
    Path(project_id): Path<Uuid>,
    Json(input): Json<CreateItemInput>,
) -> ApiResult<(StatusCode, Json<Item>)> {
    backlog
        .db()
        .create_item(project_id, input)
        .map(|r| (StatusCode::CREATED, Json(r)))
        .map_err(store_error)
}

// ============================================================
// Records (by type name and id)
// ============================================================

pub async fn get_record(
    State(backlog): State<Backlog>,
    Path((type_name, id)): Path<(String, RecordId)>,
) -> ApiResult<Json<Record>> {
    backlog
        .record(&record_ref(type_name, id))
        .map(Json)
        .map_err(backlog_error)
}

pub async fn update_record(
    State(backlog): State<Backlog>,
    Path((type_name, id)): Path<(String, RecordId)>,
    Json(input): Json<UpdateRecordInput>,
) -> ApiResult<Json<Record>> {
    backlog
        .db()
        .update_record(&record_ref(type_name, id), input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Record not found".to_string()))
}

pub async fn delete_record(
    State(backlog): State<Backlog>,
    Path((type_name, id)): Path<(String, RecordId)>,
) -> ApiResult<StatusCode> {
    backlog
        .delete(&record_ref(type_name, id))
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(backlog_error)
}

pub async fn get_parent(
    State(backlog): State<Backlog>,
    Path((type_name, id)): Path<(String, RecordId)>,
) -> ApiResult<Json<ParentLookup>> {
    backlog
        .parent_of(&record_ref(type_name, id))
        .map(Json)
        .map_err(backlog_error)
}

pub async fn set_parent(
    State(backlog): State<Backlog>,
    Path((type_name, id)): Path<(String, RecordId)>,
    Json(input): Json<SetParentInput>,
) -> ApiResult<Json<RecordSummary>> {
    backlog
        .set_parent(&record_ref(type_name, id), input.parent.as_ref())
        .map(|record| Json(record.summary()))
        .map_err(backlog_error)
}

pub async fn list_children(
    State(backlog): State<Backlog>,
    Path((type_name, id)): Path<(String, RecordId)>,
) -> ApiResult<Json<Vec<RecordSummary>>> {
    backlog
        .children_of(&record_ref(type_name, id))
        .map(|records| Json(records.iter().map(Record::summary).collect()))
        .map_err(backlog_error)
}

pub async fn list_types(State(backlog): State<Backlog>) -> impl IntoResponse {
    let registry = backlog.context().registry();
    let types: Vec<_> = registry
        .type_names()
        .into_iter()
        .filter_map(|name| registry.resolve_record_type(name).ok())
        .collect();
    Json(types)
}
