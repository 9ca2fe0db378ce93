// ./infrastructure/src/persistence/mongo.rs
use application::{ApplicationError, DocumentRepository};
use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Bson, Document as BsonDocument};
use domain::{Document, DocumentId};
use mongodb::Database;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// `DocumentRepository` backed by a MongoDB database handle.
///
/// The handle is injected, not pulled from a process-wide global; whoever
/// runs the connection bootstrap owns the client and hands databases out.
#[derive(Debug, Clone)]
pub struct MongoDocumentRepository {
    database: Database,
}

impl MongoDocumentRepository {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    fn collection(&self, name: &str) -> mongodb::Collection<BsonDocument> {
        self.database.collection::<BsonDocument>(name)
    }
}

fn infra_error(context: &str, e: impl std::fmt::Display) -> ApplicationError {
    ApplicationError::InfrastructureError(format!("{}: {}", context, e))
}

/// Builds the stored BSON shape from validated field values.
fn to_bson_document(fields: &HashMap<String, Value>) -> Result<BsonDocument, ApplicationError> {
    let mut doc = BsonDocument::new();
    for (name, value) in fields {
        let bson_value =
            bson::to_bson(value).map_err(|e| infra_error("BSON conversion failed", e))?;
        doc.insert(name.clone(), bson_value);
    }
    Ok(doc)
}

/// Rebuilds the field map from a stored BSON document, dropping the driver's
/// `_id` which lives on `Document::id` instead.
fn from_bson_document(doc: BsonDocument) -> HashMap<String, Value> {
    doc.into_iter()
        .filter(|(name, _)| name != "_id")
        .map(|(name, value)| (name, value.into_relaxed_extjson()))
        .collect()
}

#[async_trait]
impl DocumentRepository for MongoDocumentRepository {
    #[instrument(skip(self, fields))]
    async fn insert(
        &self,
        collection_name: &str,
        fields: HashMap<String, Value>,
    ) -> Result<Document, ApplicationError> {
        debug!(collection = %collection_name, "Inserting document via driver");
        let bson_doc = to_bson_document(&fields)?;
        let result = self
            .collection(collection_name)
            .insert_one(bson_doc)
            .await
            .map_err(|e| infra_error("Driver insert failed", e))?;

        let id = match result.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            other => other.to_string(),
        };
        Ok(Document::from_stored(DocumentId::new(id), fields))
    }

    #[instrument(skip(self))]
    async fn get(
        &self,
        collection_name: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, ApplicationError> {
        debug!(collection = %collection_name, doc_id = %id.as_str(), "Fetching document via driver");
        // An id the driver could not have assigned cannot match anything
        let Ok(oid) = ObjectId::parse_str(id.as_str()) else {
            return Ok(None);
        };
        let found = self
            .collection(collection_name)
            .find_one(doc! { "_id": oid })
            .await
            .map_err(|e| infra_error("Driver find failed", e))?;
        Ok(found.map(|doc| Document::from_stored(id.clone(), from_bson_document(doc))))
    }

    #[instrument(skip(self))]
    async fn delete(
        &self,
        collection_name: &str,
        id: &DocumentId,
    ) -> Result<bool, ApplicationError> {
        debug!(collection = %collection_name, doc_id = %id.as_str(), "Deleting document via driver");
        let Ok(oid) = ObjectId::parse_str(id.as_str()) else {
            return Ok(false);
        };
        let result = self
            .collection(collection_name)
            .delete_one(doc! { "_id": oid })
            .await
            .map_err(|e| infra_error("Driver delete failed", e))?;
        Ok(result.deleted_count > 0)
    }

    #[instrument(skip(self))]
    async fn exists(
        &self,
        collection_name: &str,
        id: &DocumentId,
    ) -> Result<bool, ApplicationError> {
        let Ok(oid) = ObjectId::parse_str(id.as_str()) else {
            return Ok(false);
        };
        let count = self
            .collection(collection_name)
            .count_documents(doc! { "_id": oid })
            .await
            .map_err(|e| infra_error("Driver count failed", e))?;
        Ok(count > 0)
    }
}
