use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use common::storage::types::quiz_session::QuizSession;
use retrieval_pipeline::AnswerTurn;
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError, routes::sessions::SessionView};

#[derive(Debug, Deserialize)]
pub struct AnswerParams {
    pub answer: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    #[serde(flatten)]
    pub turn: AnswerTurn,
    pub session: SessionView,
}

pub async fn submit_answer(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    Json(params): Json<AnswerParams>,
) -> Result<impl IntoResponse, ApiError> {
    let mut session = QuizSession::get(&session_id, &state.db).await?;

    let turn = state.quiz.answer(&mut session, &params.answer).await?;
    let session = session.save(&state.db).await?;

    Ok(Json(AnswerResponse {
        turn,
        session: SessionView::from(&session),
    }))
}
