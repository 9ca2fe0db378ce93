//! The e-learning portal collection schemas, in registration order.
//!
//! Student and Enrollment come from source material that never spells their
//! shape out: Student declares no fields beyond the generated identifier, and
//! Enrollment carries only its two references.

use crate::{CollectionSchema, FieldDefault, FieldDefinition, FieldType};
use serde_json::json;

/// The order in which the portal loader registers collections.
pub const REGISTRATION_ORDER: [&str; 6] = [
    "Student",
    "Course",
    "Enrollment",
    "Assignment",
    "Submission",
    "QuizScore",
];

fn text(name: &str) -> FieldDefinition {
    FieldDefinition {
        name: name.to_string(),
        field_type: FieldType::Text,
        required: false,
        default: None,
    }
}

fn number(name: &str) -> FieldDefinition {
    FieldDefinition {
        name: name.to_string(),
        field_type: FieldType::Number,
        required: false,
        default: None,
    }
}

fn timestamp(name: &str) -> FieldDefinition {
    FieldDefinition {
        name: name.to_string(),
        field_type: FieldType::Timestamp,
        required: false,
        default: None,
    }
}

fn created_at() -> FieldDefinition {
    FieldDefinition {
        default: Some(FieldDefault::Now),
        ..timestamp("createdAt")
    }
}

fn reference(name: &str, target: &str) -> FieldDefinition {
    FieldDefinition {
        name: name.to_string(),
        field_type: FieldType::Reference {
            collection: target.to_string(),
        },
        required: false,
        default: None,
    }
}

pub fn student() -> CollectionSchema {
    CollectionSchema::new("Student", vec![])
}

pub fn course() -> CollectionSchema {
    CollectionSchema::new(
        "Course",
        vec![text("courseName"), text("category"), created_at()],
    )
}

pub fn enrollment() -> CollectionSchema {
    CollectionSchema::new(
        "Enrollment",
        vec![
            reference("studentId", "Student"),
            reference("courseId", "Course"),
        ],
    )
}

pub fn assignment() -> CollectionSchema {
    CollectionSchema::new(
        "Assignment",
        vec![
            text("title"),
            reference("courseId", "Course"),
            timestamp("dueDate"),
            created_at(),
        ],
    )
}

pub fn submission() -> CollectionSchema {
    CollectionSchema::new(
        "Submission",
        vec![
            reference("assignmentId", "Assignment"),
            reference("studentId", "Student"),
            FieldDefinition {
                name: "status".to_string(),
                field_type: FieldType::Enumeration {
                    allowed: vec!["Pending".to_string(), "Completed".to_string()],
                },
                required: false,
                default: Some(FieldDefault::Value(json!("Pending"))),
            },
            timestamp("submittedAt"),
        ],
    )
}

pub fn quiz_score() -> CollectionSchema {
    CollectionSchema::new(
        "QuizScore",
        vec![
            reference("studentId", "Student"),
            text("quizName"),
            number("score"),
            created_at(),
        ],
    )
}

/// All six schemas, in the loader's registration order.
pub fn all() -> Vec<CollectionSchema> {
    vec![
        student(),
        course(),
        enrollment(),
        assignment(),
        submission(),
        quiz_score(),
    ]
}
