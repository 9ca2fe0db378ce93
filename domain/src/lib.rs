use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value; // To represent arbitrary document field values
use std::collections::{HashMap, HashSet};
use thiserror::Error; // For domain-specific errors

pub mod schemas;

// --- Domain Errors ---
#[derive(Error, Debug, PartialEq)]
pub enum DomainError {
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    #[error("Invalid field value for field '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },
    #[error("Field '{0}' not found in schema")]
    FieldNotFound(String),
    #[error("Missing required field '{0}'")]
    MissingField(String),
}

// --- Document ID ---
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: String) -> Self {
        Self(id)
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}
impl From<DocumentId> for String {
    fn from(doc_id: DocumentId) -> Self {
        doc_id.0
    }
}

// --- Schema Definition ---

/// Defines the type of a field in a collection schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")] // Allows "text", "number", "timestamp" in JSON
pub enum FieldType {
    Text,
    Number,
    /// RFC 3339 timestamp, stored as a string value.
    Timestamp,
    /// Closed set of allowed string values.
    Enumeration { allowed: Vec<String> },
    /// Identifier of a document in another collection.
    Reference { collection: String },
}

/// Default applied when a field is absent at insert time.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FieldDefault {
    /// The clock value at the moment of insertion. Only valid on timestamps.
    Now,
    /// A fixed literal value, type-checked against the field at build time.
    Value(Value),
}

/// Defines a single field within a collection schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(rename = "type")] // Map 'type' JSON key to 'field_type' field
    pub field_type: FieldType,
    /// Must this field be present? Fields are optional unless declared required.
    #[serde(default)]
    pub required: bool,
    /// Value substituted when the field is absent at insert time.
    #[serde(default)]
    pub default: Option<FieldDefault>,
}

impl FieldDefinition {
    /// Checks a concrete value against this field's declared type.
    fn check_value(&self, value: &Value) -> Result<(), DomainError> {
        let invalid = |reason: String| DomainError::InvalidFieldValue {
            field: self.name.clone(),
            reason,
        };
        match &self.field_type {
            FieldType::Text => {
                if !value.is_string() {
                    return Err(invalid(format!("Expected a text string, got {:?}", value)));
                }
            }
            FieldType::Number => {
                if !value.is_number() {
                    return Err(invalid(format!("Expected a number, got {:?}", value)));
                }
            }
            FieldType::Timestamp => {
                let parsed = value.as_str().map(DateTime::parse_from_rfc3339);
                if !matches!(parsed, Some(Ok(_))) {
                    return Err(invalid(format!(
                        "Expected an RFC 3339 timestamp string, got {:?}",
                        value
                    )));
                }
            }
            FieldType::Enumeration { allowed } => {
                let accepted = value
                    .as_str()
                    .is_some_and(|s| allowed.iter().any(|a| a == s));
                if !accepted {
                    return Err(invalid(format!(
                        "Expected one of {:?}, got {:?}",
                        allowed, value
                    )));
                }
            }
            FieldType::Reference { collection } => {
                let id_like = value.as_str().is_some_and(|s| !s.trim().is_empty());
                if !id_like {
                    return Err(invalid(format!(
                        "Expected the identifier of a '{}' document, got {:?}",
                        collection, value
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A reference value populated on a concrete document: which field points
/// at which document in which collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulatedReference {
    pub field: String,
    pub collection: String,
    pub id: DocumentId,
}

/// Represents the schema for a collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CollectionSchema {
    /// The unique name of the collection (e.g. "Course").
    pub name: String,
    pub fields: Vec<FieldDefinition>,

    // Internal cache for faster lookups
    #[serde(skip)] // Don't serialize/deserialize this helper field
    field_lookup: Option<HashMap<String, FieldDefinition>>,
}

impl CollectionSchema {
    /// Declares a schema. Call `build()` to validate it before use.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        CollectionSchema {
            name: name.into(),
            fields,
            field_lookup: None,
        }
    }

    /// Validates the schema and precomputes the lookup map.
    ///
    /// An empty field list is legal: it declares a collection whose documents
    /// carry nothing beyond their generated identifier.
    pub fn build(mut self) -> Result<Self, DomainError> {
        if self.name.trim().is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(DomainError::InvalidSchema(
                "Collection name must be non-empty and contain only ASCII alphanumeric characters or underscores.".to_string()
            ));
        }

        let mut field_names = HashSet::new();
        let mut lookup = HashMap::new();
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(DomainError::InvalidSchema(
                    "Field names cannot be empty.".to_string(),
                ));
            }
            if !field_names.insert(field.name.clone()) {
                return Err(DomainError::InvalidSchema(format!(
                    "Duplicate field name found: '{}'",
                    field.name
                )));
            }
            // Ensure 'id' field is not defined manually (reserved)
            if field.name == "id" {
                return Err(DomainError::InvalidSchema(
                    "'id' is a reserved field name and cannot be defined in the schema."
                        .to_string(),
                ));
            }
            if let FieldType::Enumeration { allowed } = &field.field_type {
                if allowed.is_empty() {
                    return Err(DomainError::InvalidSchema(format!(
                        "Enumeration field '{}' must allow at least one value.",
                        field.name
                    )));
                }
            }
            if let FieldType::Reference { collection } = &field.field_type {
                if collection.trim().is_empty() {
                    return Err(DomainError::InvalidSchema(format!(
                        "Reference field '{}' must name a target collection.",
                        field.name
                    )));
                }
            }
            // Defaults must themselves satisfy the field's type.
            match &field.default {
                Some(FieldDefault::Now) if field.field_type != FieldType::Timestamp => {
                    return Err(DomainError::InvalidSchema(format!(
                        "Field '{}' declares a 'now' default but is not a timestamp.",
                        field.name
                    )));
                }
                Some(FieldDefault::Value(v)) => field.check_value(v).map_err(|e| {
                    DomainError::InvalidSchema(format!(
                        "Default for field '{}' is invalid: {}",
                        field.name, e
                    ))
                })?,
                _ => {}
            }
            lookup.insert(field.name.clone(), field.clone());
        }

        self.field_lookup = Some(lookup);
        Ok(self)
    }

    /// Gets a field definition by name. Uses the precomputed lookup.
    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.field_lookup
            .as_ref()
            .and_then(|lookup| lookup.get(name))
    }

    /// Validates a field map against this schema: every provided field must
    /// be declared and type-correct, every required field must be present.
    pub fn validate(&self, fields: &HashMap<String, Value>) -> Result<(), DomainError> {
        let schema_lookup = self.lookup();

        for (name, value) in fields {
            match schema_lookup.get(name) {
                Some(field_def) => field_def.check_value(value)?,
                None => return Err(DomainError::FieldNotFound(name.clone())),
            }
        }

        for (name, field_def) in schema_lookup {
            if field_def.required && !fields.contains_key(name) {
                return Err(DomainError::MissingField(name.clone()));
            }
        }
        Ok(())
    }

    /// Lists every reference field populated in the given field map, paired
    /// with the collection this schema declares it points into.
    pub fn populated_references(&self, fields: &HashMap<String, Value>) -> Vec<PopulatedReference> {
        let mut refs = Vec::new();
        for field in &self.fields {
            let FieldType::Reference { collection } = &field.field_type else {
                continue;
            };
            if let Some(id) = fields.get(&field.name).and_then(Value::as_str) {
                refs.push(PopulatedReference {
                    field: field.name.clone(),
                    collection: collection.clone(),
                    id: DocumentId::new(id.to_string()),
                });
            }
        }
        refs
    }

    /// Fills in declared defaults for fields absent from the given map,
    /// using `now` for clock defaults.
    pub fn apply_defaults(&self, fields: &mut HashMap<String, Value>, now: DateTime<Utc>) {
        for field in &self.fields {
            if fields.contains_key(&field.name) {
                continue;
            }
            match &field.default {
                Some(FieldDefault::Now) => {
                    fields.insert(field.name.clone(), Value::String(now.to_rfc3339()));
                }
                Some(FieldDefault::Value(v)) => {
                    fields.insert(field.name.clone(), v.clone());
                }
                None => {}
            }
        }
    }

    /// Provides access to the internal field lookup map. Panics if build() wasn't called.
    fn lookup(&self) -> &HashMap<String, FieldDefinition> {
        self.field_lookup
            .as_ref()
            .expect("Schema lookup not built. Call build() first.")
    }
}

// --- Document Structure ---

/// Represents a document with arbitrary fields, conforming to a schema.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Document {
    id: DocumentId,
    /// Document data stored as field name -> JSON Value pairs.
    fields: HashMap<String, Value>,
}

impl Document {
    /// Creates a new document, validating fields against the provided schema.
    pub fn new(
        id: DocumentId,
        fields: HashMap<String, Value>,
        schema: &CollectionSchema,
    ) -> Result<Self, DomainError> {
        schema.validate(&fields)?;
        Ok(Self { id, fields })
    }

    /// Reconstructs a document from stored parts without re-validating.
    /// For repository implementations rehydrating data that was validated
    /// at insert time.
    pub fn from_stored(id: DocumentId, fields: HashMap<String, Value>) -> Self {
        Self { id, fields }
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    pub fn fields(&self) -> &HashMap<String, Value> {
        &self.fields
    }

    /// Gets a specific field's value.
    pub fn get_field_value(&self, field_name: &str) -> Option<&Value> {
        self.fields.get(field_name)
    }

    /// Lists every reference field populated on this document, paired with
    /// the collection the schema declares it points into.
    pub fn references(&self, schema: &CollectionSchema) -> Vec<PopulatedReference> {
        schema.populated_references(&self.fields)
    }
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_test_schema() -> CollectionSchema {
        CollectionSchema::new(
            "Submission",
            vec![
                FieldDefinition {
                    name: "assignmentId".to_string(),
                    field_type: FieldType::Reference {
                        collection: "Assignment".to_string(),
                    },
                    required: true,
                    default: None,
                },
                FieldDefinition {
                    name: "status".to_string(),
                    field_type: FieldType::Enumeration {
                        allowed: vec!["Pending".to_string(), "Completed".to_string()],
                    },
                    required: false,
                    default: Some(FieldDefault::Value(json!("Pending"))),
                },
                FieldDefinition {
                    name: "submittedAt".to_string(),
                    field_type: FieldType::Timestamp,
                    required: false,
                    default: None,
                },
                FieldDefinition {
                    name: "grade".to_string(),
                    field_type: FieldType::Number,
                    required: false,
                    default: None,
                },
            ],
        )
        .build()
        .expect("Failed to build test schema")
    }

    #[test]
    fn schema_build_success() {
        let schema = create_test_schema();
        assert_eq!(schema.name, "Submission");
        assert!(schema.get_field("assignmentId").is_some());
        assert!(schema.get_field("status").is_some());
        assert!(schema.get_field("nonexistent").is_none());
        assert!(schema.get_field("assignmentId").unwrap().required);
        assert!(!schema.get_field("status").unwrap().required);
    }

    #[test]
    fn schema_build_allows_empty_field_list() {
        // Collections like Student declare no fields beyond the identifier.
        let schema = CollectionSchema::new("Student", vec![]).build();
        assert!(schema.is_ok());
    }

    #[test]
    fn schema_build_fails_duplicate_field() {
        let result = CollectionSchema::new(
            "test",
            vec![
                FieldDefinition {
                    name: "field1".to_string(),
                    field_type: FieldType::Text,
                    required: false,
                    default: None,
                },
                FieldDefinition {
                    name: "field1".to_string(),
                    field_type: FieldType::Number,
                    required: false,
                    default: None,
                },
            ],
        )
        .build();
        assert!(
            matches!(result, Err(DomainError::InvalidSchema(msg)) if msg.contains("Duplicate field name"))
        );
    }

    #[test]
    fn schema_build_fails_invalid_name() {
        let result = CollectionSchema::new("invalid-name!", vec![]).build();
        assert!(
            matches!(result, Err(DomainError::InvalidSchema(msg)) if msg.contains("Collection name"))
        );
    }

    #[test]
    fn schema_build_fails_reserved_id_field() {
        let result = CollectionSchema::new(
            "test",
            vec![FieldDefinition {
                name: "id".to_string(),
                field_type: FieldType::Text,
                required: false,
                default: None,
            }],
        )
        .build();
        assert!(
            matches!(result, Err(DomainError::InvalidSchema(msg)) if msg.contains("'id' is a reserved"))
        );
    }

    #[test]
    fn schema_build_fails_now_default_on_text_field() {
        let result = CollectionSchema::new(
            "test",
            vec![FieldDefinition {
                name: "label".to_string(),
                field_type: FieldType::Text,
                required: false,
                default: Some(FieldDefault::Now),
            }],
        )
        .build();
        assert!(
            matches!(result, Err(DomainError::InvalidSchema(msg)) if msg.contains("not a timestamp"))
        );
    }

    #[test]
    fn schema_build_fails_default_outside_enumeration() {
        let result = CollectionSchema::new(
            "test",
            vec![FieldDefinition {
                name: "status".to_string(),
                field_type: FieldType::Enumeration {
                    allowed: vec!["Pending".to_string(), "Completed".to_string()],
                },
                required: false,
                default: Some(FieldDefault::Value(json!("Graded"))),
            }],
        )
        .build();
        assert!(
            matches!(result, Err(DomainError::InvalidSchema(msg)) if msg.contains("Default for field"))
        );
    }

    #[test]
    fn document_creation_success() {
        let schema = create_test_schema();
        let id = DocumentId::new("sub1".to_string());
        let fields: HashMap<String, Value> = [
            ("assignmentId".to_string(), json!("assign1")),
            ("status".to_string(), json!("Completed")),
            ("submittedAt".to_string(), json!("2026-08-28T10:00:00+00:00")),
        ]
        .into_iter()
        .collect();

        let doc = Document::new(id.clone(), fields, &schema).expect("document should validate");
        assert_eq!(doc.id(), &id);
        assert_eq!(doc.fields().len(), 3);
        assert_eq!(doc.get_field_value("status").unwrap(), &json!("Completed"));
    }

    #[test]
    fn document_creation_fails_missing_required_field() {
        let schema = create_test_schema();
        let id = DocumentId::new("sub2".to_string());
        // Missing required "assignmentId" field
        let fields: HashMap<String, Value> = [("status".to_string(), json!("Pending"))]
            .into_iter()
            .collect();

        let result = Document::new(id, fields, &schema);
        assert!(matches!(result, Err(DomainError::MissingField(f)) if f == "assignmentId"));
    }

    #[test]
    fn document_creation_fails_value_outside_enumeration() {
        let schema = create_test_schema();
        let id = DocumentId::new("sub3".to_string());
        let fields: HashMap<String, Value> = [
            ("assignmentId".to_string(), json!("assign1")),
            ("status".to_string(), json!("Graded")), // Not an allowed status
        ]
        .into_iter()
        .collect();

        let result = Document::new(id, fields, &schema);
        assert!(
            matches!(result, Err(DomainError::InvalidFieldValue { field, .. }) if field == "status")
        );
    }

    #[test]
    fn document_creation_fails_unparseable_timestamp() {
        let schema = create_test_schema();
        let id = DocumentId::new("sub4".to_string());
        let fields: HashMap<String, Value> = [
            ("assignmentId".to_string(), json!("assign1")),
            ("submittedAt".to_string(), json!("yesterday")),
        ]
        .into_iter()
        .collect();

        let result = Document::new(id, fields, &schema);
        assert!(
            matches!(result, Err(DomainError::InvalidFieldValue { field, .. }) if field == "submittedAt")
        );
    }

    #[test]
    fn document_creation_fails_field_not_in_schema() {
        let schema = create_test_schema();
        let id = DocumentId::new("sub5".to_string());
        let fields: HashMap<String, Value> = [
            ("assignmentId".to_string(), json!("assign1")),
            ("extra_field".to_string(), json!("not allowed")), // Not in schema
        ]
        .into_iter()
        .collect();

        let result = Document::new(id, fields, &schema);
        assert!(matches!(result, Err(DomainError::FieldNotFound(f)) if f == "extra_field"));
    }

    #[test]
    fn apply_defaults_fills_absent_fields_only() {
        let schema = create_test_schema();
        let now = Utc::now();

        let mut fields: HashMap<String, Value> = [("assignmentId".to_string(), json!("assign1"))]
            .into_iter()
            .collect();
        schema.apply_defaults(&mut fields, now);
        assert_eq!(fields.get("status"), Some(&json!("Pending")));
        // submittedAt has no default and stays absent
        assert!(!fields.contains_key("submittedAt"));

        let mut fields: HashMap<String, Value> = [
            ("assignmentId".to_string(), json!("assign1")),
            ("status".to_string(), json!("Completed")),
        ]
        .into_iter()
        .collect();
        schema.apply_defaults(&mut fields, now);
        assert_eq!(fields.get("status"), Some(&json!("Completed")));
    }

    #[test]
    fn apply_defaults_uses_clock_for_now_defaults() {
        let schema = schemas::course().build().expect("course schema builds");
        let now = Utc::now();
        let mut fields = HashMap::new();
        schema.apply_defaults(&mut fields, now);
        assert_eq!(
            fields.get("createdAt"),
            Some(&Value::String(now.to_rfc3339()))
        );
    }

    #[test]
    fn references_lists_populated_reference_fields() {
        let schema = create_test_schema();
        let fields: HashMap<String, Value> = [("assignmentId".to_string(), json!("assign1"))]
            .into_iter()
            .collect();
        let doc = Document::new(DocumentId::new("sub6".to_string()), fields, &schema)
            .expect("document should validate");

        let refs = doc.references(&schema);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].field, "assignmentId");
        assert_eq!(refs[0].collection, "Assignment");
        assert_eq!(refs[0].id.as_str(), "assign1");
    }
}
