//! Patient repository.
//!
//! This module provides the data-access service for patient documents:
//!
//! - Write/read path (add, get, remove, get_all) delegated to the
//!   [`DocumentStore`] port
//! - Search path (find, find_sorted, count) delegated to the [`SearchIndex`]
//!   port, with the query string built from [`Criteria`]
//!
//! Construction bootstraps the server-side index from the
//! [`IndexDescriptor`] and fails fast when that cannot be done.
//!
//! ## Concurrency
//!
//! No client-side concurrency control: every operation is a single blocking
//! call on the connector. The store's revision token is round-tripped, never
//! interpreted; a stale token surfaces as
//! [`RepositoryError::Conflict`](crate::RepositoryError::Conflict) for the
//! caller to retry or surface. No retry policy is applied here.

use crate::criteria::Criteria;
use crate::error::{RepositoryError, RepositoryResult};
use crate::index::IndexDescriptor;
use crate::ports::{DocumentStore, SearchIndex, SearchPage, SearchRequest};
use pdr_domain::Patient;
use serde_json::Value;

/// Repository mapping [`Patient`] objects onto a document store with a
/// secondary full-text index.
///
/// Generic over the connector `C`, which implements both ports over the same
/// store connection. Use [`MemoryConnector`](crate::MemoryConnector) for
/// tests and local development, or a remote connector for a live store.
pub struct PatientRepository<C> {
    connector: C,
    descriptor: IndexDescriptor,
}

impl<C> PatientRepository<C>
where
    C: DocumentStore + SearchIndex,
{
    /// Creates a repository over `connector` with the standard patient index.
    ///
    /// # Errors
    ///
    /// Fails when the index cannot be installed or refreshed.
    pub fn new(connector: C) -> RepositoryResult<Self> {
        Self::with_descriptor(connector, IndexDescriptor::patient())
    }

    /// Creates a repository with a custom index descriptor.
    ///
    /// Bootstraps the server-side index before returning: the descriptor is
    /// (re-)installed when missing or changed.
    pub fn with_descriptor(connector: C, descriptor: IndexDescriptor) -> RepositoryResult<Self> {
        connector.ensure_index(&descriptor)?;
        tracing::debug!(index = %descriptor.name, "search index bootstrapped");
        Ok(Self {
            connector,
            descriptor,
        })
    }

    /// Persists a new patient document.
    ///
    /// The store assigns an id and revision token, both written back onto
    /// `patient`, so an added patient compares equal to the stored document.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` when the patient cannot be converted to a
    /// document, or any store error unchanged.
    pub fn add(&self, patient: &mut Patient) -> RepositoryResult<()> {
        let doc = serde_json::to_value(&*patient).map_err(RepositoryError::Serialization)?;
        let meta = self.connector.put(&doc)?;

        tracing::debug!(id = %meta.id, "patient added");
        patient.id = Some(meta.id);
        patient.revision = Some(meta.revision);
        Ok(())
    }

    /// Fetches a patient by its store-assigned document id.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] when no document has that id.
    pub fn get(&self, id: &str) -> RepositoryResult<Patient> {
        hydrate(self.connector.get(id)?)
    }

    /// Deletes a patient document.
    ///
    /// The patient must carry its current id and revision token.
    ///
    /// # Errors
    ///
    /// - [`RepositoryError::InvalidInput`] when `patient` was never persisted
    ///   (no id or no revision)
    /// - [`RepositoryError::Conflict`] when the revision token is stale
    /// - [`RepositoryError::NotFound`] when the document no longer exists
    pub fn remove(&self, patient: &Patient) -> RepositoryResult<()> {
        let id = patient.id.as_deref().ok_or_else(|| {
            RepositoryError::InvalidInput("cannot remove a patient without a document id".into())
        })?;
        let revision = patient.revision.as_deref().ok_or_else(|| {
            RepositoryError::InvalidInput("cannot remove a patient without a revision token".into())
        })?;

        self.connector.delete(id, revision)
    }

    /// Returns every stored patient. Intended for bulk cleanup in tests.
    pub fn get_all(&self) -> RepositoryResult<Vec<Patient>> {
        self.connector.all_docs()?.into_iter().map(hydrate).collect()
    }

    /// Finds patients matching `criteria`, in the index's ranking order.
    ///
    /// `limit` caps the rows returned and `skip` offsets into the full ranked
    /// result set; a `skip` beyond the result size yields an empty page, not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::EmptyCriteria`] for an empty constraint
    /// set; search errors propagate unchanged.
    pub fn find(
        &self,
        criteria: &Criteria,
        limit: Option<usize>,
        skip: Option<usize>,
    ) -> RepositoryResult<Vec<Patient>> {
        self.find_sorted(criteria, None, limit, skip)
    }

    /// Finds patients with an index-side sort expression applied.
    ///
    /// The sort expression is passed through to the index verbatim (for
    /// example `dob<date>`, or `-name` for descending).
    pub fn find_sorted(
        &self,
        criteria: &Criteria,
        sort: Option<&str>,
        limit: Option<usize>,
        skip: Option<usize>,
    ) -> RepositoryResult<Vec<Patient>> {
        let page = self.execute(criteria, sort, limit, skip, true)?;

        page.rows
            .into_iter()
            .map(|row| {
                let doc = row.doc.ok_or_else(|| {
                    RepositoryError::MalformedResponse(format!(
                        "search row {} carries no document",
                        row.id
                    ))
                })?;
                hydrate(doc)
            })
            .collect()
    }

    /// Counts all documents matching `criteria`, regardless of paging.
    ///
    /// This is the index's total row count and may exceed any page size.
    pub fn count(&self, criteria: &Criteria) -> RepositoryResult<usize> {
        let page = self.execute(criteria, None, None, None, false)?;
        Ok(page.total_rows)
    }

    fn execute(
        &self,
        criteria: &Criteria,
        sort: Option<&str>,
        limit: Option<usize>,
        skip: Option<usize>,
        include_docs: bool,
    ) -> RepositoryResult<SearchPage> {
        let query = criteria.build()?;
        tracing::debug!(index = %self.descriptor.name, %query, "executing search");

        self.connector.search(&SearchRequest {
            index: &self.descriptor.name,
            function: &self.descriptor.function,
            query,
            include_docs,
            sort: sort.map(str::to_owned),
            limit,
            skip,
        })
    }
}

fn hydrate(doc: Value) -> RepositoryResult<Patient> {
    serde_json::from_value(doc).map_err(RepositoryError::Deserialization)
}
