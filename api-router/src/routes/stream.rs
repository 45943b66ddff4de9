use std::{pin::Pin, time::Duration};

use async_stream::stream;
use axum::{
    extract::{Path, Query, State},
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Response, Sse,
    },
};
use common::storage::types::quiz_session::{MessageRole, QuizSession};
use futures::{
    stream::{self, once},
    Stream, StreamExt,
};
use serde::Deserialize;
use tracing::error;

use crate::api_state::ApiState;

type EventStream = Pin<Box<dyn Stream<Item = Result<Event, axum::Error>> + Send>>;

#[derive(Debug, Deserialize)]
pub struct StreamParams {
    /// `last` (default) for the latest assistant message, or a chat history index.
    pub message: Option<String>,
}

fn create_error_stream(message: impl Into<String>) -> EventStream {
    let message = message.into();
    stream::once(async move { Ok(Event::default().event("error").data(message)) }).boxed()
}

/// Splits a reply into the word pieces sent by the typing effect.
pub fn typing_chunks(text: &str) -> Vec<String> {
    text.split_whitespace().map(|word| format!("{word} ")).collect()
}

/// Replays one assistant message word by word, paced like a typing reply.
///
/// Failures are reported as a single `error` event rather than an HTTP error status.
pub async fn stream_message(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    Query(params): Query<StreamParams>,
) -> Response {
    let session = match QuizSession::get(&session_id, &state.db).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to load session {}: {:?}", session_id, e);
            return Sse::new(create_error_stream("Session not found")).into_response();
        }
    };

    let selector = params.message.as_deref().unwrap_or("last");
    let content = if selector == "last" {
        session.last_assistant_message().map(|m| m.content.clone())
    } else {
        selector
            .parse::<usize>()
            .ok()
            .and_then(|index| session.chat_history.get(index))
            .filter(|m| m.role == MessageRole::Assistant)
            .map(|m| m.content.clone())
    };

    let Some(content) = content else {
        return Sse::new(create_error_stream("No assistant message to stream")).into_response();
    };

    let delay = Duration::from_millis(state.config.stream_word_delay_ms);
    let words = typing_chunks(&content);

    let event_stream = stream! {
        for word in words {
            yield Ok::<_, axum::Error>(Event::default().event("chat_message").data(word));
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
    .chain(once(async {
        Ok::<_, axum::Error>(Event::default()
            .event("close_stream")
            .data("Stream complete"))
    }));

    Sse::new(event_stream.boxed())
        .keep_alive(
            KeepAlive::new()
                .interval(Duration::from_secs(15))
                .text("keep-alive"),
        )
        .into_response()
}
