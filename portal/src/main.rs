// ./portal/src/main.rs
use std::sync::Arc;
use tracing::{error, info, level_filters::LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Import application layer components
use application::{DocumentService, RegistryService};
// Import infrastructure layer implementations
use infrastructure::{
    connect, ConnectionSettings, InMemorySchemaRegistry, MongoDocumentRepository,
};

// Application entry point: register the portal collections, then open the
// database connection. Exactly one connection attempt; a failure is logged
// and absorbed rather than crashing the process.
#[tokio::main]
async fn main() {
    // --- Logger Initialization ---
    let filter: EnvFilter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
    info!("Logger initialized successfully.");

    // --- Dependency Injection ---
    // 1. Create the schema registry and its service
    let schema_registry = Arc::new(InMemorySchemaRegistry::new());
    let registry_service = RegistryService::new(schema_registry.clone());

    // 2. Register the six portal collections in loader order
    match registry_service.register_all().await {
        Ok(registered) => {
            info!(
                collections = ?registered,
                "Registered {} portal collections.",
                registered.len()
            );
        }
        Err(e) => {
            error!("Collection registration failed: {}", e);
            std::process::exit(1);
        }
    }

    // --- Connection Bootstrap ---
    // One attempt, initiated last. The error is surfaced here and the portal
    // decides what to do with it: log it and stop, the process stays clean.
    let settings = ConnectionSettings::from_env();
    match connect(&settings).await {
        Ok(database) => {
            let document_repository = Arc::new(MongoDocumentRepository::new(database));
            let _document_service =
                DocumentService::new(schema_registry.clone(), document_repository);
            info!("Document service wired against the live database.");
        }
        Err(e) => {
            error!("MongoDB connection error: {}", e);
        }
    }
}
