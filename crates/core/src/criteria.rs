//! Search criteria and query-string construction.
//!
//! This module translates an ordered mapping of field-name→value constraints
//! into the boolean field-query syntax understood by the search index:
//!
//! ```text
//! field1:value1 AND field2:value2 AND ...
//! ```
//!
//! Insertion order is preserved in the output. Field names are not validated
//! against the indexed schema; a mistyped field silently matches nothing.

use crate::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;

/// Suffix marking a date-typed field in the index's query syntax.
///
/// A key carrying this suffix has its value passed through verbatim (for
/// example a bracketed range expression), letting the index's own syntax
/// handle range semantics.
pub const DATE_SUFFIX: &str = "<date>";

/// An ordered set of field→value constraints.
///
/// Built up with the chaining constructors and turned into a query string with
/// [`build`](Criteria::build). Backed by a `Vec` rather than a map so the
/// emitted clause order matches insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Criteria {
    clauses: Vec<(String, String)>,
}

impl Criteria {
    /// Creates an empty criteria set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an exact-match constraint on `field`.
    pub fn field(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// Adds a date-typed constraint on `field`.
    ///
    /// The field name is suffixed with [`DATE_SUFFIX`] and `expression` is
    /// passed through verbatim, so it may be a single date or a bracketed
    /// range such as `[2010-02-01 TO 2010-04-30]`.
    pub fn date(mut self, field: impl Into<String>, expression: impl Into<String>) -> Self {
        self.clauses
            .push((format!("{}{DATE_SUFFIX}", field.into()), expression.into()));
        self
    }

    /// Adds an inclusive date-range constraint on `field`.
    pub fn date_range(self, field: impl Into<String>, from: NaiveDate, to: NaiveDate) -> Self {
        self.date(field, format!("[{from} TO {to}]"))
    }

    /// Returns `true` when no constraints have been added.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Builds the query string, joining clauses with ` AND `.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::EmptyCriteria`] when no constraints have
    /// been added; there is no valid clause to emit.
    pub fn build(&self) -> RepositoryResult<String> {
        if self.clauses.is_empty() {
            return Err(RepositoryError::EmptyCriteria);
        }

        let clauses: Vec<String> = self
            .clauses
            .iter()
            .map(|(field, value)| format!("{field}:{value}"))
            .collect();

        Ok(clauses.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_constraint_has_no_operator() {
        let query = Criteria::new().field("patientId", "1").build().unwrap();
        assert_eq!(query, "patientId:1");
    }

    #[test]
    fn test_clauses_join_with_and_in_insertion_order() {
        let query = Criteria::new()
            .field("age", "22")
            .field("name", "name3")
            .field("district", "Jehanabad")
            .build()
            .unwrap();

        assert_eq!(query, "age:22 AND name:name3 AND district:Jehanabad");
    }

    #[test]
    fn test_no_leading_or_trailing_operator() {
        let query = Criteria::new()
            .field("a", "1")
            .field("b", "2")
            .build()
            .unwrap();

        assert!(!query.starts_with("AND"));
        assert!(!query.ends_with("AND"));
        assert_eq!(query.matches(" AND ").count(), 1);
    }

    #[test]
    fn test_date_expression_passes_through_verbatim() {
        let query = Criteria::new()
            .field("age", "22")
            .date("dob", "[2010-02-01 TO 2010-04-30]")
            .build()
            .unwrap();

        assert_eq!(query, "age:22 AND dob<date>:[2010-02-01 TO 2010-04-30]");
    }

    #[test]
    fn test_date_range_formats_inclusive_brackets() {
        let from = NaiveDate::from_ymd_opt(2010, 2, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2010, 4, 30).unwrap();
        let query = Criteria::new().date_range("dob", from, to).build().unwrap();

        assert_eq!(query, "dob<date>:[2010-02-01 TO 2010-04-30]");
    }

    #[test]
    fn test_empty_criteria_is_an_explicit_error() {
        let result = Criteria::new().build();
        assert!(matches!(result, Err(RepositoryError::EmptyCriteria)));
    }

    #[test]
    fn test_one_clause_per_constraint() {
        let criteria = Criteria::new()
            .field("a", "1")
            .field("b", "2")
            .field("c", "3");
        let query = criteria.build().unwrap();

        assert_eq!(query.split(" AND ").count(), criteria.len());
    }
}
