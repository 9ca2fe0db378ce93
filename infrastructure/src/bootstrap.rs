// ./infrastructure/src/bootstrap.rs
use application::ApplicationError;
use bson::doc;
use mongodb::{options::ClientOptions, Client, Database};
use std::env;
use tracing::{error, info, warn};

/// Endpoint used when no override is supplied.
pub const DEFAULT_URI: &str = "mongodb://127.0.0.1:27017/e_learning_portal";
const DEFAULT_DATABASE: &str = "e_learning_portal";
const URI_ENV_VAR: &str = "MONGODB_URI";

/// Where and what to connect to. Constructed explicitly and handed to
/// `connect`; there is no process-wide connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub uri: String,
    pub database: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            uri: DEFAULT_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
        }
    }
}

impl ConnectionSettings {
    /// Reads the endpoint from `MONGODB_URI`, falling back to the default
    /// portal address. The database name is taken from the URI path.
    pub fn from_env() -> Self {
        match env::var(URI_ENV_VAR) {
            Ok(uri) => {
                info!("Using MongoDB endpoint from environment variable {}.", URI_ENV_VAR);
                let database = match database_name(&uri) {
                    Some(name) => name,
                    None => {
                        warn!(
                            "No database name in '{}'. Using default database '{}'.",
                            uri, DEFAULT_DATABASE
                        );
                        DEFAULT_DATABASE.to_string()
                    }
                };
                Self { uri, database }
            }
            Err(_) => {
                info!(
                    "{} environment variable not set. Using default endpoint {}.",
                    URI_ENV_VAR, DEFAULT_URI
                );
                Self::default()
            }
        }
    }
}

/// Extracts the database name from a MongoDB connection string path.
fn database_name(uri: &str) -> Option<String> {
    let (_, rest) = uri.split_once("://")?;
    let (rest, _query) = rest.split_once('?').unwrap_or((rest, ""));
    let (_, path) = rest.split_once('/')?;
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// Opens a connection to the configured endpoint and verifies it with a ping.
///
/// A single attempt, no retry. The error is returned to the caller, who
/// decides whether to log-and-continue or bail out.
pub async fn connect(settings: &ConnectionSettings) -> Result<Database, ApplicationError> {
    let options = ClientOptions::parse(&settings.uri).await.map_err(|e| {
        error!(uri = %settings.uri, "Invalid MongoDB connection string: {}", e);
        ApplicationError::InfrastructureError(format!("Invalid connection string: {}", e))
    })?;
    let client = Client::with_options(options).map_err(|e| {
        error!("Failed to construct MongoDB client: {}", e);
        ApplicationError::InfrastructureError(format!("Client construction failed: {}", e))
    })?;

    let database = client.database(&settings.database);
    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|e| {
            error!(uri = %settings.uri, "MongoDB connection error: {}", e);
            ApplicationError::InfrastructureError(format!("Connection failed: {}", e))
        })?;

    info!(uri = %settings.uri, database = %settings.database, "MongoDB connected successfully");
    Ok(database)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_use_portal_endpoint() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.uri, "mongodb://127.0.0.1:27017/e_learning_portal");
        assert_eq!(settings.database, "e_learning_portal");
    }

    #[test]
    fn database_name_comes_from_uri_path() {
        assert_eq!(
            database_name("mongodb://127.0.0.1:27017/e_learning_portal"),
            Some("e_learning_portal".to_string())
        );
        assert_eq!(
            database_name("mongodb://user:pw@host:27017/portal?authSource=admin"),
            Some("portal".to_string())
        );
        assert_eq!(database_name("mongodb://127.0.0.1:27017"), None);
        assert_eq!(database_name("mongodb://127.0.0.1:27017/"), None);
    }

    #[tokio::test]
    async fn connect_with_invalid_uri_returns_error_without_panicking() {
        let settings = ConnectionSettings {
            uri: "not-a-connection-string".to_string(),
            database: "test".to_string(),
        };
        let result = connect(&settings).await;
        assert!(matches!(
            result,
            Err(ApplicationError::InfrastructureError(msg)) if msg.contains("Invalid connection string")
        ));
    }
}
