// Module declarations
pub mod bootstrap;
pub mod persistence;

// Re-export all implementations
pub use bootstrap::{connect, ConnectionSettings};
pub use persistence::{
    InMemoryDocumentRepository, InMemorySchemaRegistry, MongoDocumentRepository,
};
