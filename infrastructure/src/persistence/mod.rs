pub mod in_memory;
pub mod mongo;

// Re-export the repository types
pub use in_memory::{InMemoryDocumentRepository, InMemorySchemaRegistry};
pub use mongo::MongoDocumentRepository;
