//! Capability ports for the document store and its search plugin.
//!
//! The repository never talks to the network itself; it is handed a connector
//! implementing these two traits. Documents cross the ports as raw JSON so the
//! ports stay schema-less, matching the store they model; hydration into
//! domain types happens in the repository.

use crate::error::RepositoryResult;
use crate::index::IndexDescriptor;
use serde_json::Value;

/// Identity assigned to a document by the store: the document id plus the
/// current revision token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentMeta {
    pub id: String,
    pub revision: String,
}

/// A search execution request.
///
/// Mirrors what the search plugin accepts: index name, named query function,
/// query string, include-docs flag, optional sort expression, and paging.
#[derive(Clone, Debug)]
pub struct SearchRequest<'a> {
    /// Index (design document) name.
    pub index: &'a str,
    /// Named query function within the index.
    pub function: &'a str,
    /// Boolean field-query string.
    pub query: String,
    /// Whether matched documents are returned alongside their scores.
    pub include_docs: bool,
    /// Index-side sort expression, passed through verbatim.
    pub sort: Option<String>,
    /// Maximum rows returned.
    pub limit: Option<usize>,
    /// Offset into the ranked result set.
    pub skip: Option<usize>,
}

/// One row of a search result page.
#[derive(Clone, Debug)]
pub struct SearchRow {
    /// Id of the matched document.
    pub id: String,
    /// Relevance score reported by the index.
    pub score: f32,
    /// The document itself, present when the request set `include_docs`.
    pub doc: Option<Value>,
}

/// A page of search results.
#[derive(Clone, Debug)]
pub struct SearchPage {
    /// Total matching rows across the whole result set, which may exceed the
    /// number of rows in this page.
    pub total_rows: usize,
    /// The requested page, in the index's ranking order.
    pub rows: Vec<SearchRow>,
}

/// Port onto the document store: schema-less JSON records addressed by id and
/// revision token.
pub trait DocumentStore {
    /// Persists a new document, returning the store-assigned id and revision.
    fn put(&self, doc: &Value) -> RepositoryResult<DocumentMeta>;

    /// Fetches a document by id.
    ///
    /// # Errors
    ///
    /// `NotFound` when no document has that id.
    fn get(&self, id: &str) -> RepositoryResult<Value>;

    /// Deletes a document by id and current revision.
    ///
    /// # Errors
    ///
    /// `Conflict` when `revision` is stale; `NotFound` when the id is absent.
    fn delete(&self, id: &str, revision: &str) -> RepositoryResult<()>;

    /// Returns every stored document.
    fn all_docs(&self) -> RepositoryResult<Vec<Value>>;
}

/// Port onto the search plugin reachable through the same store connection.
pub trait SearchIndex {
    /// Installs or refreshes the server-side index for `descriptor`, doing
    /// nothing when the installed definition already matches.
    fn ensure_index(&self, descriptor: &IndexDescriptor) -> RepositoryResult<()>;

    /// Executes a query against the index.
    fn search(&self, request: &SearchRequest<'_>) -> RepositoryResult<SearchPage>;
}
