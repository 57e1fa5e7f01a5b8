//! Rendering of the server-side indexing function.
//!
//! couchdb-lucene runs a JavaScript function over every stored document to
//! extract indexable fields. The function is derived from the declarative
//! [`IndexDescriptor`] rather than kept as a script literal, so the field
//! list lives in one place.

use pdr_core::{FieldKind, FieldSource, IndexDescriptor};
use std::fmt::Write as _;

/// Renders the couchdb-lucene indexing function for `descriptor`.
pub fn render(descriptor: &IndexDescriptor) -> String {
    let mut js = String::from("function(doc) { var index = new Document(); ");

    let mut nested: Vec<(&str, &str)> = Vec::new();
    for indexed in &descriptor.fields {
        match &indexed.source {
            FieldSource::Document { property } => {
                let _ = write!(
                    js,
                    "index.add(doc.{property}, {{field: '{}'{}}}); ",
                    indexed.field,
                    type_option(indexed.kind)
                );
            }
            FieldSource::NestedAddress { property } => {
                nested.push((property.as_str(), indexed.field.as_str()));
            }
        }
    }

    if !nested.is_empty() {
        js.push_str(
            "if (doc.addresses !== undefined) { \
             for (var i = 0; i < doc.addresses.length; i++) { ",
        );
        for (property, field) in nested {
            let _ = write!(
                js,
                "index.add(doc.addresses[i].{property}, {{field: '{field}'}}); "
            );
        }
        js.push_str("} } ");
    }

    js.push_str("return index; }");
    js
}

fn type_option(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::Text => "",
        FieldKind::Date => ", type: 'date'",
    }
}
