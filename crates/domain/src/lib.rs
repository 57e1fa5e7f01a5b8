//! Domain model for the patient document repository.
//!
//! This crate provides **wire models** for patient documents stored in a
//! CouchDB-style document database:
//! - `Patient`: the stored document, carrying the store-assigned id and
//!   revision token alongside the business fields
//! - `Address`: an embedded value object serialised inline with its patient
//!
//! This crate focuses on:
//! - plain data holders (no repository or transport concerns)
//! - serialisation/deserialisation in the store's wire format (`_id`/`_rev`,
//!   camelCase field names)
//!
//! Persistence and search belong in `pdr-core`; HTTP transport belongs in
//! `pdr-couch`.

pub mod address;
pub mod patient;

pub use address::Address;
pub use patient::Patient;
