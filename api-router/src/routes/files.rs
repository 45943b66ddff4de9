use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use bytes::Bytes;
use common::{
    error::AppError,
    storage::types::{
        collection::{Collection, CollectionStatus},
        quiz_session::QuizSession,
    },
    utils::collection_name::prepare_collection_name,
};
use ingestion_pipeline::{utils::document_loader::ensure_supported, IndexOutcome};
use retrieval_pipeline::ClearOutcome;
use serde::Serialize;
use serde_json::json;
use tempfile::NamedTempFile;
use tracing::{error, info};

use crate::{api_state::ApiState, error::ApiError, routes::sessions::SessionView};

pub const UPLOADED_MESSAGE: &str =
    "File uploaded. Click \"Chat\" to start the conversation.";

#[derive(Debug, TryFromMultipart)]
pub struct UploadParams {
    #[form_data(limit = "unlimited")]
    pub file: FieldData<NamedTempFile>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_name: String,
    pub outcome: IndexOutcome,
    pub collection_status: CollectionStatus,
    pub message: &'static str,
    pub session: SessionView,
}

pub async fn list_files(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let files = state.documents.list_file_names().await?;
    Ok(Json(json!({ "files": files })))
}

pub async fn upload_file(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    TypedMultipart(input): TypedMultipart<UploadParams>,
) -> Result<impl IntoResponse, ApiError> {
    let mut session = QuizSession::get(&session_id, &state.db).await?;

    let file_name = input
        .file
        .metadata
        .file_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Uploaded file has no file name".into()))?;
    ensure_supported(&file_name)?;

    let bytes = tokio::fs::read(input.file.contents.path())
        .await
        .map_err(AppError::from)?;
    info!(
        session_id = %session.id,
        file_name = %file_name,
        size = bytes.len(),
        "Received upload"
    );

    state
        .documents
        .save_new(&file_name, Bytes::from(bytes))
        .await?;

    session.reset_for_upload(&file_name);
    let session = session.save(&state.db).await?;

    let outcome = match state.ingestion.index_document(&file_name).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(file_name = %file_name, error = %err, "Indexing failed, removing upload");
            state.documents.delete(&file_name).await?;
            return Err(err.into());
        }
    };
    let collection_status = Collection::check_exists(outcome.collection(), &state.db).await?;

    Ok(Json(UploadResponse {
        file_name,
        outcome,
        collection_status,
        message: UPLOADED_MESSAGE,
        session: SessionView::from(&session),
    }))
}

pub async fn start_chat(
    State(state): State<ApiState>,
    Path((session_id, file_name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let mut session = QuizSession::get(&session_id, &state.db).await?;
    if !state.documents.exists(&file_name).await? {
        return Err(ApiError::NotFound(format!("File {file_name} not found")));
    }

    let question = state.quiz.start(&mut session, &file_name).await?;
    let session = session.save(&state.db).await?;

    Ok(Json(json!({
        "question": question,
        "session": SessionView::from(&session),
    })))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    #[serde(flatten)]
    pub outcome: ClearOutcome,
    pub session: SessionView,
}

pub async fn clear_chat(
    State(state): State<ApiState>,
    Path((session_id, file_name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let mut session = QuizSession::get(&session_id, &state.db).await?;

    let outcome = state.quiz.clear_chat(&mut session, &file_name).await?;
    let session = if outcome.cleared {
        session.save(&state.db).await?
    } else {
        session
    };

    Ok(Json(ClearResponse {
        outcome,
        session: SessionView::from(&session),
    }))
}

pub async fn delete_file(
    State(state): State<ApiState>,
    Path((session_id, file_name)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let mut session = QuizSession::get(&session_id, &state.db).await?;
    if !session.is_current_file(&file_name) {
        return Err(AppError::NotCurrentSessionFile(file_name).into());
    }

    let collection = session
        .collection_name
        .clone()
        .unwrap_or_else(|| prepare_collection_name(&file_name));

    session.forget_file();
    let session = session.save(&state.db).await?;

    let file_deleted = state.documents.delete(&file_name).await?;
    let collection_deleted = Collection::delete(&collection, &state.db).await?;
    info!(
        file_name = %file_name,
        %collection,
        file_deleted,
        collection_deleted,
        "Collection deleted"
    );

    Ok(Json(json!({
        "file_name": file_name,
        "collection": collection,
        "file_deleted": file_deleted,
        "collection_deleted": collection_deleted,
        "session": SessionView::from(&session),
    })))
}
