use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

use super::{parse_i64, table_for, where_from_params, write_fields};
use crate::database::DataService;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::auth::{AuthIdentity, RequireStaff};
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{Page, Pagination};

/// GET /api/data/:entity - paginated, filtered list.
///
/// `page`, `limit`, and `order` control the window; `q` (with optional
/// `fields`) switches to substring search; any other query param becomes an
/// equality filter, so `?class_id=5&present=true` narrows conjunctively.
pub async fn list(
    State(state): State<AppState>,
    _identity: AuthIdentity,
    Path(entity): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Vec<Value>> {
    let table = table_for(&entity)?;
    let service = DataService::new(state.pool.clone(), table);

    let paging = &state.config.pagination;
    let page = Page::new(
        parse_i64(&params, "page").unwrap_or(1),
        parse_i64(&params, "limit").unwrap_or(paging.default_limit),
        paging.max_limit,
    );

    if let Some(term) = params.get("q") {
        let fields: Vec<&str> = match params.get("fields") {
            Some(requested) => {
                let requested: Vec<&str> = requested
                    .split(',')
                    .map(|f| f.trim())
                    .filter(|f| !f.is_empty())
                    .collect();
                for field in &requested {
                    if !table.search_fields.contains(field) {
                        return Err(ApiError::bad_request(format!(
                            "field '{}' is not searchable on {}",
                            field, table.name
                        )));
                    }
                }
                requested
            }
            None => table.search_fields.to_vec(),
        };
        let records = service.search(term, &fields, &page).await?;
        return Ok(ApiResponse::success(records));
    }

    let filter = FilterData {
        where_clause: where_from_params(&params),
        order: params.get("order").map(|o| Value::String(o.clone())),
        limit: Some(page.limit),
        offset: Some(page.offset()),
    };
    let (records, total) = service.find_all(filter).await?;
    Ok(ApiResponse::paginated(records, Pagination::new(&page, total)))
}

/// POST /api/data/:entity - create a record (staff only).
pub async fn create(
    State(state): State<AppState>,
    RequireStaff(_identity): RequireStaff,
    Path(entity): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<Value> {
    let table = table_for(&entity)?;
    let fields = write_fields(payload)?;

    let service = DataService::new(state.pool.clone(), table);
    let record = service.create(fields).await?;
    Ok(ApiResponse::created(record).with_message("record created"))
}
