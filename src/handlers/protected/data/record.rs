use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use super::{parse_id, table_for, write_fields};
use crate::database::DataService;
use crate::middleware::auth::{AuthIdentity, RequireAdmin, RequireStaff};
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;

/// GET /api/data/:entity/:id
pub async fn get(
    State(state): State<AppState>,
    _identity: AuthIdentity,
    Path((entity, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let table = table_for(&entity)?;
    let id = parse_id(&id)?;

    let service = DataService::new(state.pool.clone(), table);
    let record = service.find_by_id(id).await?;
    Ok(ApiResponse::success(record))
}

/// PATCH /api/data/:entity/:id - partial update (staff only). Only the fields
/// present in the payload change; `updated_at` is refreshed by storage.
pub async fn patch(
    State(state): State<AppState>,
    RequireStaff(_identity): RequireStaff,
    Path((entity, id)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    let table = table_for(&entity)?;
    let id = parse_id(&id)?;
    let fields = write_fields(payload)?;

    let service = DataService::new(state.pool.clone(), table);
    let record = service.update(id, fields).await?;
    Ok(ApiResponse::success(record).with_message("record updated"))
}

/// DELETE /api/data/:entity/:id - hard delete (admin only). Idempotent:
/// deleting an id that is already gone succeeds with `deleted: false`.
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_identity): RequireAdmin,
    Path((entity, id)): Path<(String, String)>,
) -> ApiResult<Value> {
    let table = table_for(&entity)?;
    let id = parse_id(&id)?;

    let service = DataService::new(state.pool.clone(), table);
    let deleted = service.delete(id).await?;
    let message = if deleted { "record deleted" } else { "record already absent" };
    Ok(ApiResponse::success(json!({ "deleted": deleted })).with_message(message))
}
