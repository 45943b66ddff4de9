use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use common::storage::types::quiz_session::{ChatMessage, QuizSession};
use serde::Serialize;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

/// Client view of a session. The reference answer stays server-side.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: String,
    pub filename: Option<String>,
    pub collection_name: Option<String>,
    pub current_question: Option<String>,
    pub previous_questions: Vec<String>,
    pub chat_history: Vec<ChatMessage>,
}

impl From<&QuizSession> for SessionView {
    fn from(session: &QuizSession) -> Self {
        Self {
            id: session.id.clone(),
            filename: session.filename.clone(),
            collection_name: session.collection_name.clone(),
            current_question: session.current_question.clone(),
            previous_questions: session.previous_questions.clone(),
            chat_history: session.chat_history.clone(),
        }
    }
}

pub async fn create_session(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    let session = QuizSession::new().save(&state.db).await?;
    info!(session_id = %session.id, "Session created");

    Ok((StatusCode::CREATED, Json(SessionView::from(&session))))
}

pub async fn get_session(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = QuizSession::get(&session_id, &state.db).await?;

    Ok(Json(SessionView::from(&session)))
}
