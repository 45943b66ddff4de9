use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use common::storage::types::collection::Collection;

use crate::{api_state::ApiState, error::ApiError};

/// Reports whether a collection exists as a status dictionary; a missing one is not an error.
pub async fn collection_status(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let status = Collection::check_exists(&name, &state.db).await?;
    Ok(Json(status))
}
