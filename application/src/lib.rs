use async_trait::async_trait;
use chrono::Utc;
use domain::{schemas, CollectionSchema, Document, DocumentId, DomainError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

// --- Application Errors ---
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    #[error("Collection already exists: {0}")]
    CollectionAlreadyExists(String),
    #[error("Document '{id}' not found in collection '{collection}'")]
    DocumentNotFound { collection: String, id: String },
    #[error(
        "Broken reference: field '{field}' points at '{id}' in collection '{target}', which does not exist"
    )]
    BrokenReference {
        field: String,
        target: String,
        id: String,
    },
    #[error("Registry operation failed: {0}")]
    RegistryError(String),
    #[error("Infrastructure error: {0}")]
    InfrastructureError(String),
    #[error("Domain validation error: {0}")]
    DomainError(#[from] DomainError), // Propagate domain errors cleanly
}

// --- Infrastructure Interfaces (Traits) ---

/// Interface for storing and retrieving collection schemas.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Saves (creates or updates) a collection schema.
    async fn save(&self, schema: &CollectionSchema) -> Result<(), ApplicationError>;
    /// Retrieves a schema by its collection name.
    async fn get(&self, name: &str) -> Result<Option<CollectionSchema>, ApplicationError>;
    /// Deletes a schema by its collection name. Returns true if deleted.
    async fn delete(&self, name: &str) -> Result<bool, ApplicationError>;
    /// Lists the names of all registered collections.
    async fn list(&self) -> Result<Vec<String>, ApplicationError>;
}

/// Interface for storing and retrieving documents. Identifier assignment
/// belongs to the implementation, the way a database driver assigns ids
/// at insert time.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Persists a new document from already-validated fields, assigning its
    /// identifier. Returns the stored document.
    async fn insert(
        &self,
        collection_name: &str,
        fields: HashMap<String, Value>,
    ) -> Result<Document, ApplicationError>;
    /// Retrieves a document by its ID from a specific collection.
    async fn get(
        &self,
        collection_name: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, ApplicationError>;
    /// Deletes a document by its ID from a specific collection.
    async fn delete(
        &self,
        collection_name: &str,
        id: &DocumentId,
    ) -> Result<bool, ApplicationError>;
    /// Checks whether a document with the given ID exists in a collection.
    async fn exists(
        &self,
        collection_name: &str,
        id: &DocumentId,
    ) -> Result<bool, ApplicationError> {
        // Default: fetch and discard. Implementations can do better.
        Ok(self.get(collection_name, id).await?.is_some())
    }
}

// --- Application Services (Use Cases) ---

/// Service for managing collection schemas.
pub struct RegistryService {
    registry: Arc<dyn SchemaRegistry>,
}

impl RegistryService {
    pub fn new(registry: Arc<dyn SchemaRegistry>) -> Self {
        Self { registry }
    }

    #[instrument(skip(self, schema_def))]
    pub async fn create_collection(
        &self,
        schema_def: CollectionSchema,
    ) -> Result<(), ApplicationError> {
        let collection_name = schema_def.name.clone();
        info!(collection = %collection_name, "Attempting to create collection");

        // Validate schema using domain logic (build)
        let schema = schema_def.build()?; // Propagates DomainError via From impl

        if self.registry.get(&schema.name).await?.is_some() {
            warn!(collection = %schema.name, "Creation failed: collection already exists");
            return Err(ApplicationError::CollectionAlreadyExists(schema.name));
        }

        self.registry.save(&schema).await.map_err(|e| {
            error!(collection = %schema.name, "Failed to save schema definition: {}", e);
            ApplicationError::RegistryError(format!("Failed to save schema: {}", e))
        })?;
        info!(collection = %schema.name, "Collection registered successfully");
        Ok(())
    }

    /// Registers the six portal collections in loader order:
    /// Student, Course, Enrollment, Assignment, Submission, QuizScore.
    #[instrument(skip(self))]
    pub async fn register_all(&self) -> Result<Vec<String>, ApplicationError> {
        let mut registered = Vec::new();
        for schema_def in schemas::all() {
            let name = schema_def.name.clone();
            self.create_collection(schema_def).await?;
            registered.push(name);
        }
        info!(count = registered.len(), "All portal collections registered");
        Ok(registered)
    }

    #[instrument(skip(self))]
    pub async fn get_collection(&self, name: &str) -> Result<CollectionSchema, ApplicationError> {
        debug!(collection = %name, "Retrieving collection schema");
        self.registry.get(name).await?.ok_or_else(|| {
            warn!(collection = %name, "Collection schema not found");
            ApplicationError::CollectionNotFound(name.to_string())
        })
    }

    #[instrument(skip(self))]
    pub async fn list_collections(&self) -> Result<Vec<String>, ApplicationError> {
        self.registry.list().await.map_err(|e| {
            error!("Failed to list collections from registry: {}", e);
            ApplicationError::RegistryError(format!("Failed to list schemas: {}", e))
        })
    }

    #[instrument(skip(self))]
    pub async fn delete_collection(&self, name: &str) -> Result<(), ApplicationError> {
        info!(collection = %name, "Attempting to delete collection");
        match self.registry.delete(name).await {
            Ok(true) => {
                info!(collection = %name, "Schema definition deleted successfully");
                Ok(())
            }
            Ok(false) => {
                warn!(collection = %name, "Deletion failed: collection not found");
                Err(ApplicationError::CollectionNotFound(name.to_string()))
            }
            Err(e) => {
                error!(collection = %name, "Failed to delete schema definition: {}", e);
                Err(ApplicationError::RegistryError(format!(
                    "Failed to delete schema: {}",
                    e
                )))
            }
        }
    }
}

/// Service responsible for inserting and retrieving documents.
///
/// Inserts apply schema defaults, validate the result, and verify that every
/// populated reference resolves to an existing document before persisting.
pub struct DocumentService {
    registry: Arc<dyn SchemaRegistry>, // Needed to validate documents
    doc_repo: Arc<dyn DocumentRepository>,
}

impl DocumentService {
    pub fn new(registry: Arc<dyn SchemaRegistry>, doc_repo: Arc<dyn DocumentRepository>) -> Self {
        Self { registry, doc_repo }
    }

    #[instrument(skip(self, fields), fields(collection = %collection_name))]
    pub async fn insert_document(
        &self,
        collection_name: &str,
        mut fields: HashMap<String, Value>,
    ) -> Result<Document, ApplicationError> {
        info!("Attempting to insert document");

        // 1. Get the schema for the collection
        let schema = self.registry.get(collection_name).await?.ok_or_else(|| {
            warn!(collection = %collection_name, "Insert failed: collection not found");
            ApplicationError::CollectionNotFound(collection_name.to_string())
        })?;

        // 2. Apply insert-time defaults, then validate the resulting shape
        schema.apply_defaults(&mut fields, Utc::now());
        schema.validate(&fields)?; // DomainError converts via From
        debug!(collection = %collection_name, "Fields validated against schema");

        // 3. Verify every populated reference resolves
        for reference in schema.populated_references(&fields) {
            if !self.doc_repo.exists(&reference.collection, &reference.id).await? {
                warn!(
                    collection = %collection_name,
                    field = %reference.field,
                    target = %reference.collection,
                    id = %reference.id.as_str(),
                    "Insert failed: broken reference"
                );
                return Err(ApplicationError::BrokenReference {
                    field: reference.field,
                    target: reference.collection,
                    id: reference.id.into(),
                });
            }
        }

        // 4. Persist; the repository assigns the identifier
        let document = self.doc_repo.insert(collection_name, fields).await.map_err(|e| {
            error!(collection = %collection_name, "Failed to insert document: {}", e);
            e
        })?;
        info!(collection = %collection_name, doc_id = %document.id().as_str(), "Document inserted successfully");
        Ok(document)
    }

    #[instrument(skip(self), fields(collection = %collection_name, doc_id = %id))]
    pub async fn get_document(
        &self,
        collection_name: &str,
        id: &str,
    ) -> Result<Document, ApplicationError> {
        let doc_id = DocumentId::new(id.to_string());
        self.doc_repo
            .get(collection_name, &doc_id)
            .await?
            .ok_or_else(|| ApplicationError::DocumentNotFound {
                collection: collection_name.to_string(),
                id: id.to_string(),
            })
    }

    #[instrument(skip(self), fields(collection = %collection_name, doc_id = %id))]
    pub async fn delete_document(
        &self,
        collection_name: &str,
        id: &str,
    ) -> Result<bool, ApplicationError> {
        info!("Attempting to delete document");
        let doc_id = DocumentId::new(id.to_string());
        let deleted = self.doc_repo.delete(collection_name, &doc_id).await?;
        if deleted {
            info!(collection = %collection_name, doc_id = %id, "Document deleted successfully");
        } else {
            info!(collection = %collection_name, doc_id = %id, "Document not found for deletion");
        }
        Ok(deleted)
    }

    /// Explicit existence check for a reference target, exposed so callers
    /// can verify a relationship before wiring it into a document.
    #[instrument(skip(self), fields(collection = %collection_name, doc_id = %id))]
    pub async fn reference_exists(
        &self,
        collection_name: &str,
        id: &str,
    ) -> Result<bool, ApplicationError> {
        if self.registry.get(collection_name).await?.is_none() {
            return Err(ApplicationError::CollectionNotFound(
                collection_name.to_string(),
            ));
        }
        let doc_id = DocumentId::new(id.to_string());
        self.doc_repo.exists(collection_name, &doc_id).await
    }
}
