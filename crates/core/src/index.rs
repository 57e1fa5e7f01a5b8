//! Declarative description of the server-side search index.
//!
//! The index over patient documents is external configuration: the store's
//! search plugin runs an indexing function over every document and the
//! repository only depends on the resulting field names. Rather than embedding
//! that function as a script literal, this module describes the extracted
//! fields declaratively; each connector renders or interprets the descriptor
//! in its own way (the CouchDB connector renders JavaScript, the in-memory
//! connector evaluates it directly).

use serde::{Deserialize, Serialize};

/// How an indexed field's value is typed by the search engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Plain text, matched exactly or by the engine's text semantics.
    Text,
    /// Calendar date, supporting bracketed range queries.
    Date,
}

/// Where an indexed field's value is read from in the stored document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// A top-level document property.
    Document { property: String },
    /// A property of each element of the document's `addresses` list.
    ///
    /// Known limitation: the couchdb-lucene backend does not reliably index
    /// repeated nested fields; only the in-memory connector guarantees this
    /// source works.
    NestedAddress { property: String },
}

/// One field extracted into the search index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedField {
    /// Name the field is queried under.
    pub field: String,
    /// Where the value comes from.
    pub source: FieldSource,
    /// How the value is typed.
    pub kind: FieldKind,
}

impl IndexedField {
    fn document(field: &str, kind: FieldKind) -> Self {
        Self {
            field: field.to_owned(),
            source: FieldSource::Document {
                property: field.to_owned(),
            },
            kind,
        }
    }

    fn nested_address(field: &str) -> Self {
        Self {
            field: field.to_owned(),
            source: FieldSource::NestedAddress {
                property: field.to_owned(),
            },
            kind: FieldKind::Text,
        }
    }
}

/// The full index definition: index name, query function name, and the fields
/// the indexing function extracts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    /// Name of the index (the design document on CouchDB).
    pub name: String,
    /// Name of the query function within the index.
    pub function: String,
    /// Fields extracted from each document.
    pub fields: Vec<IndexedField>,
}

impl IndexDescriptor {
    /// The patient index: name, age, dob (date-typed), district, patientId,
    /// and per-address state and city.
    pub fn patient() -> Self {
        Self {
            name: "Patient".to_owned(),
            function: "findByCriteria".to_owned(),
            fields: vec![
                IndexedField::document("name", FieldKind::Text),
                IndexedField::document("age", FieldKind::Text),
                IndexedField::document("dob", FieldKind::Date),
                IndexedField::document("district", FieldKind::Text),
                IndexedField::document("patientId", FieldKind::Text),
                IndexedField::nested_address("state"),
                IndexedField::nested_address("city"),
            ],
        }
    }

    /// Fields queried under `name`, in declaration order.
    pub fn fields_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a IndexedField> {
        self.fields.iter().filter(move |f| f.field == name)
    }
}
