//! # PDR Core
//!
//! Data-access layer mapping [`Patient`](pdr_domain::Patient) documents onto a
//! document store with a secondary full-text search index.
//!
//! This crate contains the repository and everything it needs:
//! - [`Criteria`]: ordered field→value constraints and query-string building
//! - [`IndexDescriptor`]: declarative description of the server-side index
//! - [`DocumentStore`] / [`SearchIndex`]: capability ports onto the store and
//!   its search plugin
//! - [`PatientRepository`]: CRUD and search over a connector implementing
//!   both ports
//! - [`MemoryConnector`]: process-local connector for tests and development
//!
//! **No transport concerns**: HTTP connectors for real stores belong in
//! `pdr-couch`.

pub mod criteria;
pub mod error;
pub mod index;
pub mod memory;
pub mod ports;
pub mod repository;

pub use criteria::{Criteria, DATE_SUFFIX};
pub use error::{RepositoryError, RepositoryResult};
pub use index::{FieldKind, FieldSource, IndexDescriptor, IndexedField};
pub use memory::MemoryConnector;
pub use ports::{DocumentMeta, DocumentStore, SearchIndex, SearchPage, SearchRequest, SearchRow};
pub use repository::PatientRepository;
