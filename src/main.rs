use meme_crud_api::{
    aws_clients::{create_dynamodb_client, create_sdk_config},
    config::{Config, StorageBackend},
    domain::{MemeRepository, UserRepository},
    errors::AppError,
    memory_store::InMemoryStore,
    repositories::DynamoDbStore,
    routes::create_router,
    seed, startup, AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize tracing (logging)
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "meme_crud_api=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(pid = std::process::id(), "Server starting");

    let config = Config::load()?;
    tracing::debug!(?config, "Configuration loaded");

    // --- Storage Backend ---
    let (memes, users): (Arc<dyn MemeRepository>, Arc<dyn UserRepository>) = match config.storage_backend {
        StorageBackend::Memory => {
            let store = Arc::new(InMemoryStore::new());
            (store.clone() as Arc<dyn MemeRepository>, store as Arc<dyn UserRepository>)
        }
        StorageBackend::DynamoDb => {
            tracing::info!("Initializing AWS DynamoDB client...");
            let sdk_config = create_sdk_config(&config).await;
            let client = create_dynamodb_client(&sdk_config);
            startup::init_resources(&client, &config.tables).await?;
            let store = Arc::new(DynamoDbStore::new(client, config.tables.clone()));
            (store.clone() as Arc<dyn MemeRepository>, store as Arc<dyn UserRepository>)
        }
    };

    if config.seed_on_start {
        tracing::info!("Seeding initial users and memes...");
        seed::run(memes.as_ref(), users.as_ref()).await?;
    }

    // --- Application State ---
    let state = Arc::new(AppState::new(memes, users));
    let app = create_router(state);

    // --- Server Startup ---
    tracing::info!("Server listening on http://{}", config.bind_address);

    let listener = tokio::net::TcpListener::bind(config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
