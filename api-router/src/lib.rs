use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{delete, get, post},
    Router,
};
use routes::{
    answers::submit_answer,
    collections::collection_status,
    files::{clear_chat, delete_file, list_files, start_chat, upload_file},
    health::{live, ready},
    sessions::{create_session, get_session},
    stream::stream_message,
};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated health endpoints for k8s/systemd
    let health = Router::new()
        .route("/ready", get(ready))
        .route("/live", get(live));

    let quiz = Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session))
        .route(
            "/sessions/{id}/files",
            post(upload_file).layer(DefaultBodyLimit::max(
                app_state.config.upload_max_body_bytes,
            )),
        )
        .route("/sessions/{id}/files/{filename}", delete(delete_file))
        .route("/sessions/{id}/files/{filename}/chat", post(start_chat))
        .route("/sessions/{id}/files/{filename}/clear", post(clear_chat))
        .route("/sessions/{id}/answers", post(submit_answer))
        .route("/sessions/{id}/stream", get(stream_message))
        .route("/files", get(list_files))
        .route("/collections/{name}", get(collection_status));

    health.merge(quiz)
}
