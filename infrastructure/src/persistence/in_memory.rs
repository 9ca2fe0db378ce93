// ./infrastructure/src/persistence/in_memory.rs
use application::{ApplicationError, DocumentRepository, SchemaRegistry};
use async_trait::async_trait;
use bson::oid::ObjectId;
use dashmap::DashMap;
use domain::{CollectionSchema, Document, DocumentId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

// --- Schema Registry Implementation ---

#[derive(Debug, Clone, Default)]
pub struct InMemorySchemaRegistry {
    // Collection Name -> Schema
    schemas: Arc<DashMap<String, Arc<CollectionSchema>>>,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self {
            schemas: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl SchemaRegistry for InMemorySchemaRegistry {
    #[instrument(skip(self, schema))]
    async fn save(&self, schema: &CollectionSchema) -> Result<(), ApplicationError> {
        debug!(collection = %schema.name, "Saving schema definition to in-memory registry");
        self.schemas
            .insert(schema.name.clone(), Arc::new(schema.clone()));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get(&self, name: &str) -> Result<Option<CollectionSchema>, ApplicationError> {
        debug!(collection = %name, "Getting schema definition from in-memory registry");
        // Get returns a Ref, so we clone the Arc, then clone the schema inside
        let schema = self
            .schemas
            .get(name)
            .map(|schema_ref| (**schema_ref).clone());
        Ok(schema)
    }

    #[instrument(skip(self))]
    async fn delete(&self, name: &str) -> Result<bool, ApplicationError> {
        debug!(collection = %name, "Deleting schema definition from in-memory registry");
        Ok(self.schemas.remove(name).is_some())
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<String>, ApplicationError> {
        debug!("Listing all schemas from in-memory registry");
        let names = self
            .schemas
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        Ok(names)
    }
}

// --- Document Repository Implementation (Collection-Aware) ---

#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentRepository {
    // Collection Name -> (Document ID -> Document)
    store: Arc<DashMap<String, DashMap<DocumentId, Arc<Document>>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self {
            store: Arc::new(DashMap::new()),
        }
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    #[instrument(skip(self, fields))]
    async fn insert(
        &self,
        collection_name: &str,
        fields: HashMap<String, Value>,
    ) -> Result<Document, ApplicationError> {
        // Assign a driver-style identifier, as the database would at insert time
        let id = DocumentId::new(ObjectId::new().to_hex());
        debug!(collection = %collection_name, doc_id = %id.as_str(), "Inserting document into in-memory store");

        let document = Document::from_stored(id, fields);

        // Get or create the inner map for the collection
        let collection_store = self
            .store
            .entry(collection_name.to_string())
            .or_insert_with(DashMap::new); // Create if doesn't exist

        collection_store.insert(document.id().clone(), Arc::new(document.clone()));
        Ok(document)
    }

    #[instrument(skip(self))]
    async fn get(
        &self,
        collection_name: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, ApplicationError> {
        debug!(collection = %collection_name, doc_id = %id.as_str(), "Getting document from in-memory store");
        // Find the collection's map first
        if let Some(collection_store) = self.store.get(collection_name) {
            // Then find the document within that map
            let doc = collection_store.get(id).map(|doc_ref| (**doc_ref).clone());
            Ok(doc)
        } else {
            Ok(None) // Collection doesn't exist
        }
    }

    #[instrument(skip(self))]
    async fn delete(
        &self,
        collection_name: &str,
        id: &DocumentId,
    ) -> Result<bool, ApplicationError> {
        debug!(collection = %collection_name, doc_id = %id.as_str(), "Deleting document from in-memory store");
        if let Some(collection_store) = self.store.get(collection_name) {
            Ok(collection_store.remove(id).is_some())
        } else {
            Ok(false) // Collection or document doesn't exist
        }
    }

    #[instrument(skip(self))]
    async fn exists(
        &self,
        collection_name: &str,
        id: &DocumentId,
    ) -> Result<bool, ApplicationError> {
        if let Some(collection_store) = self.store.get(collection_name) {
            Ok(collection_store.contains_key(id))
        } else {
            Ok(false)
        }
    }
}
