use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::Value;

use crate::database::DataService;
use crate::filter::FilterData;
use crate::handlers::protected::data::table_for;
use crate::middleware::auth::AuthIdentity;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::types::{Page, Pagination};

/// POST /api/find/:entity - advanced filtered find.
///
/// The body is a full filter document: `where` (conjunctive conditions),
/// `order`, `limit`, `offset`. The limit is clamped to the configured
/// maximum; the response pagination reflects the filtered total.
pub async fn find_post(
    State(state): State<AppState>,
    _identity: AuthIdentity,
    Path(entity): Path<String>,
    Json(mut data): Json<FilterData>,
) -> ApiResult<Vec<Value>> {
    let table = table_for(&entity)?;

    let paging = &state.config.pagination;
    let limit = data
        .limit
        .unwrap_or(paging.default_limit)
        .clamp(1, paging.max_limit);
    let offset = data.offset.unwrap_or(0).max(0);
    data.limit = Some(limit);
    data.offset = Some(offset);

    let service = DataService::new(state.pool.clone(), table);
    let (records, total) = service.find_all(data).await?;

    let page = Page {
        page: offset / limit + 1,
        limit,
    };
    Ok(ApiResponse::paginated(records, Pagination::new(&page, total)))
}
