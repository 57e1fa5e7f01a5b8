//! In-memory connector.
//!
//! Implements both ports over a process-local document map, evaluating built
//! query strings against the fields named by the installed
//! [`IndexDescriptor`]. Used by the repository tests and for local development
//! without a running store; unlike the remote backend it fully supports
//! repeated nested-address fields.
//!
//! Result order is insertion order and is stable across calls when no writes
//! happen in between.

use crate::criteria::DATE_SUFFIX;
use crate::error::{RepositoryError, RepositoryResult};
use crate::index::{FieldSource, IndexDescriptor};
use crate::ports::{DocumentMeta, DocumentStore, SearchIndex, SearchPage, SearchRequest, SearchRow};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct State {
    docs: HashMap<String, Value>,
    order: Vec<String>,
    descriptor: Option<IndexDescriptor>,
}

/// A process-local document store with a synchronously maintained index.
#[derive(Default)]
pub struct MemoryConnector {
    state: Mutex<State>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentStore for MemoryConnector {
    fn put(&self, doc: &Value) -> RepositoryResult<DocumentMeta> {
        let fields = doc.as_object().ok_or_else(|| {
            RepositoryError::InvalidInput("document must be a JSON object".into())
        })?;

        let mut state = self.state();
        let id = match fields.get("_id").and_then(Value::as_str) {
            Some(id) => id.to_owned(),
            None => Uuid::new_v4().simple().to_string(),
        };
        if state.docs.contains_key(&id) {
            return Err(RepositoryError::Conflict { id });
        }

        let revision = format!("1-{}", Uuid::new_v4().simple());
        let mut stored = fields.clone();
        stored.insert("_id".into(), Value::String(id.clone()));
        stored.insert("_rev".into(), Value::String(revision.clone()));

        state.order.push(id.clone());
        state.docs.insert(id.clone(), Value::Object(stored));

        Ok(DocumentMeta { id, revision })
    }

    fn get(&self, id: &str) -> RepositoryResult<Value> {
        self.state()
            .docs
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_owned() })
    }

    fn delete(&self, id: &str, revision: &str) -> RepositoryResult<()> {
        let mut state = self.state();
        let current = state
            .docs
            .get(id)
            .ok_or_else(|| RepositoryError::NotFound { id: id.to_owned() })?;

        if current.get("_rev").and_then(Value::as_str) != Some(revision) {
            return Err(RepositoryError::Conflict { id: id.to_owned() });
        }

        state.docs.remove(id);
        state.order.retain(|stored_id| stored_id != id);
        Ok(())
    }

    fn all_docs(&self) -> RepositoryResult<Vec<Value>> {
        let state = self.state();
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.docs.get(id).cloned())
            .collect())
    }
}

impl SearchIndex for MemoryConnector {
    fn ensure_index(&self, descriptor: &IndexDescriptor) -> RepositoryResult<()> {
        self.state().descriptor = Some(descriptor.clone());
        Ok(())
    }

    fn search(&self, request: &SearchRequest<'_>) -> RepositoryResult<SearchPage> {
        let state = self.state();
        let descriptor = state.descriptor.as_ref().ok_or_else(|| {
            RepositoryError::InvalidInput(format!("no index installed: {}", request.index))
        })?;

        let clauses = parse_query(&request.query)?;

        let mut matches: Vec<&Value> = state
            .order
            .iter()
            .filter_map(|id| state.docs.get(id))
            .filter(|doc| clauses.iter().all(|clause| clause.matches(descriptor, doc)))
            .collect();

        if let Some(sort) = request.sort.as_deref() {
            sort_matches(&mut matches, descriptor, sort);
        }

        let total_rows = matches.len();
        let skip = request.skip.unwrap_or(0);
        let limit = request.limit.unwrap_or(usize::MAX);

        let rows = matches
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| SearchRow {
                id: doc
                    .get("_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
                score: 1.0,
                doc: request.include_docs.then(|| doc.clone()),
            })
            .collect();

        Ok(SearchPage { total_rows, rows })
    }
}

/// One parsed `field:value` clause.
struct Clause {
    field: String,
    value: String,
    date_typed: bool,
}

impl Clause {
    /// True when any indexed value of `field` in `doc` satisfies the clause.
    fn matches(&self, descriptor: &IndexDescriptor, doc: &Value) -> bool {
        let values: Vec<String> = descriptor
            .fields_named(&self.field)
            .flat_map(|indexed| extract(&indexed.source, doc))
            .collect();

        if self.date_typed {
            if let Some((from, to)) = parse_date_range(&self.value) {
                return values
                    .iter()
                    .filter_map(|v| v.parse::<NaiveDate>().ok())
                    .any(|date| from <= date && date <= to);
            }
        }

        values.iter().any(|value| value == &self.value)
    }
}

fn parse_query(query: &str) -> RepositoryResult<Vec<Clause>> {
    query
        .split(" AND ")
        .map(|clause| {
            let (field, value) = clause.split_once(':').ok_or_else(|| {
                RepositoryError::InvalidInput(format!("malformed query clause: {clause}"))
            })?;
            let (field, date_typed) = match field.strip_suffix(DATE_SUFFIX) {
                Some(stripped) => (stripped, true),
                None => (field, false),
            };
            Ok(Clause {
                field: field.to_owned(),
                value: value.to_owned(),
                date_typed,
            })
        })
        .collect()
}

/// Parses a bracketed inclusive range expression, `[2010-02-01 TO 2010-04-30]`.
fn parse_date_range(expression: &str) -> Option<(NaiveDate, NaiveDate)> {
    let inner = expression.strip_prefix('[')?.strip_suffix(']')?;
    let (from, to) = inner.split_once(" TO ")?;
    Some((from.trim().parse().ok()?, to.trim().parse().ok()?))
}

/// Reads the indexable values for one field source out of a document.
fn extract(source: &FieldSource, doc: &Value) -> Vec<String> {
    match source {
        FieldSource::Document { property } => {
            doc.get(property).and_then(scalar_to_string).into_iter().collect()
        }
        FieldSource::NestedAddress { property } => doc
            .get("addresses")
            .and_then(Value::as_array)
            .map(|addresses| {
                addresses
                    .iter()
                    .filter_map(|address| address.get(property).and_then(scalar_to_string))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Sorts matches by an index-side sort expression: a field name, optionally
/// prefixed with `-` for descending and optionally carrying the `<date>` type
/// suffix. Date-typed sorts compare chronologically, others lexicographically.
fn sort_matches(matches: &mut [&Value], descriptor: &IndexDescriptor, sort: &str) {
    let (field, descending) = match sort.strip_prefix('-') {
        Some(stripped) => (stripped, true),
        None => (sort, false),
    };
    let (field, date_typed) = match field.strip_suffix(DATE_SUFFIX) {
        Some(stripped) => (stripped, true),
        None => (field, false),
    };

    let key = |doc: &Value| -> Option<String> {
        descriptor
            .fields_named(field)
            .flat_map(|indexed| extract(&indexed.source, doc))
            .next()
    };

    matches.sort_by(|a, b| {
        let (ka, kb) = (key(a), key(b));
        let ordering = if date_typed {
            let parse = |k: &Option<String>| {
                k.as_deref().and_then(|v| v.parse::<NaiveDate>().ok())
            };
            parse(&ka).cmp(&parse(&kb))
        } else {
            ka.cmp(&kb)
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connector_with_index() -> MemoryConnector {
        let connector = MemoryConnector::new();
        connector.ensure_index(&IndexDescriptor::patient()).unwrap();
        connector
    }

    fn request(query: &str) -> SearchRequest<'static> {
        SearchRequest {
            index: "Patient",
            function: "findByCriteria",
            query: query.to_owned(),
            include_docs: true,
            sort: None,
            limit: None,
            skip: None,
        }
    }

    #[test]
    fn test_put_assigns_id_and_revision() {
        let connector = MemoryConnector::new();
        let meta = connector.put(&json!({"name": "n"})).unwrap();

        assert!(!meta.id.is_empty());
        assert!(meta.revision.starts_with("1-"));

        let stored = connector.get(&meta.id).unwrap();
        assert_eq!(stored["_rev"], meta.revision.as_str());
    }

    #[test]
    fn test_get_unknown_id_is_not_found() {
        let connector = MemoryConnector::new();
        let result = connector.get("missing");
        assert!(matches!(result, Err(RepositoryError::NotFound { .. })));
    }

    #[test]
    fn test_delete_with_stale_revision_conflicts() {
        let connector = MemoryConnector::new();
        let meta = connector.put(&json!({"name": "n"})).unwrap();

        let result = connector.delete(&meta.id, "1-stale");
        assert!(matches!(result, Err(RepositoryError::Conflict { .. })));

        connector.delete(&meta.id, &meta.revision).unwrap();
        assert!(connector.get(&meta.id).is_err());
    }

    #[test]
    fn test_all_docs_preserves_insertion_order() {
        let connector = MemoryConnector::new();
        for n in 0..3 {
            connector.put(&json!({"patientId": n.to_string()})).unwrap();
        }

        let patient_ids: Vec<String> = connector
            .all_docs()
            .unwrap()
            .iter()
            .map(|doc| doc["patientId"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(patient_ids, ["0", "1", "2"]);
    }

    #[test]
    fn test_search_without_index_is_an_error() {
        let connector = MemoryConnector::new();
        let result = connector.search(&request("name:n"));
        assert!(matches!(result, Err(RepositoryError::InvalidInput(_))));
    }

    #[test]
    fn test_malformed_clause_is_an_error() {
        let connector = connector_with_index();
        let result = connector.search(&request("no-colon-here"));
        assert!(matches!(result, Err(RepositoryError::InvalidInput(_))));
    }

    #[test]
    fn test_numbers_match_their_string_form() {
        let connector = connector_with_index();
        connector.put(&json!({"name": "n", "age": 22})).unwrap();

        let page = connector.search(&request("age:22")).unwrap();
        assert_eq!(page.total_rows, 1);
    }

    #[test]
    fn test_unindexed_field_matches_nothing() {
        let connector = connector_with_index();
        connector
            .put(&json!({"name": "n", "phoneNumber": "0123"}))
            .unwrap();

        // phoneNumber is stored but not part of the index descriptor.
        let page = connector.search(&request("phoneNumber:0123")).unwrap();
        assert_eq!(page.total_rows, 0);
    }

    #[test]
    fn test_date_range_is_inclusive_of_both_bounds() {
        let connector = connector_with_index();
        for dob in ["2010-01-31", "2010-02-01", "2010-04-30", "2010-05-01"] {
            connector.put(&json!({"dob": dob})).unwrap();
        }

        let page = connector
            .search(&request("dob<date>:[2010-02-01 TO 2010-04-30]"))
            .unwrap();
        assert_eq!(page.total_rows, 2);
    }

    #[test]
    fn test_rows_exclude_docs_when_not_requested() {
        let connector = connector_with_index();
        connector.put(&json!({"name": "n"})).unwrap();

        let mut req = request("name:n");
        req.include_docs = false;
        let page = connector.search(&req).unwrap();

        assert_eq!(page.total_rows, 1);
        assert!(page.rows[0].doc.is_none());
    }
}
