use api_router::{api_routes_v1, api_state::ApiState};
use axum::Router;
use common::{
    storage::{
        db::SurrealDbClient,
        store::{DocumentStore, StorageManager},
    },
    utils::{config::get_config, embedding::EmbeddingProvider},
};
use retrieval_pipeline::OpenAIChatModel;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config; a missing API key stops startup here
    let config = match get_config() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let db = Arc::new(SurrealDbClient::from_config(&config).await?);
    db.ensure_initialized().await?;

    let storage = StorageManager::new(&config).await?;
    info!(backend = ?storage.backend_kind(), "Document storage ready");
    let documents = DocumentStore::new(storage);

    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    let embedding_provider = Arc::new(EmbeddingProvider::from_config(
        &config,
        Arc::clone(&openai_client),
    ));
    info!(
        embedding_backend = embedding_provider.backend_label(),
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    let chat_model = Arc::new(OpenAIChatModel::new(openai_client, &config.chat_model));

    let api_state = ApiState::new(&config, db, documents, embedding_provider, chat_model);

    let app = Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .with_state(api_state);

    info!("Starting server listening on 0.0.0.0:{}", config.http_port);
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
    }

    Ok(())
}
