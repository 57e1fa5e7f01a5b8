//! # PDR CouchDB connector
//!
//! HTTP transport for the patient document repository: implements the
//! `pdr-core` storage and search ports against CouchDB with the
//! couchdb-lucene plugin.
//!
//! This crate focuses on:
//! - blocking HTTP access to the store (create-database-if-missing, CRUD by
//!   id and revision)
//! - rendering the declarative index descriptor into the plugin's JavaScript
//!   indexing function and uploading it when missing or changed
//! - executing field queries through the plugin's `_fti` endpoint
//!
//! The repository and query logic live in `pdr-core`; nothing here interprets
//! query strings or revision tokens.

pub mod config;
pub mod connector;
pub mod index_fn;

pub use config::{CouchConfig, Credentials};
pub use connector::CouchConnector;
