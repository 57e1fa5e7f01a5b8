//! Blocking CouchDB connector.
//!
//! Implements both repository ports over HTTP: documents through CouchDB's
//! own API, queries through the couchdb-lucene plugin reachable on the same
//! connection under `_fti`. Every operation is a single blocking call; there
//! is no retry policy, pooling or timeout handling here beyond what the HTTP
//! client provides.

use crate::config::CouchConfig;
use crate::index_fn;
use pdr_core::{
    DocumentMeta, DocumentStore, IndexDescriptor, RepositoryError, RepositoryResult, SearchIndex,
    SearchPage, SearchRequest, SearchRow,
};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use url::Url;

/// Mount point of the couchdb-lucene proxy on the store connection.
const FTI_MOUNT: [&str; 2] = ["_fti", "local"];

/// Connector for CouchDB with the couchdb-lucene search plugin.
pub struct CouchConnector {
    http: Client,
    config: CouchConfig,
}

#[derive(Deserialize)]
struct WriteResponse {
    id: String,
    rev: String,
}

#[derive(Deserialize)]
struct AllDocsResponse {
    rows: Vec<AllDocsRow>,
}

#[derive(Deserialize)]
struct AllDocsRow {
    id: String,
    doc: Option<Value>,
}

#[derive(Deserialize)]
struct FulltextResponse {
    total_rows: usize,
    #[serde(default)]
    rows: Vec<FulltextRow>,
}

#[derive(Deserialize)]
struct FulltextRow {
    id: String,
    #[serde(default)]
    score: f32,
    doc: Option<Value>,
}

#[derive(Deserialize)]
struct DesignDocument {
    #[serde(rename = "_rev")]
    rev: String,
    #[serde(default)]
    fulltext: BTreeMap<String, FulltextFunction>,
}

#[derive(Deserialize)]
struct FulltextFunction {
    index: String,
}

impl CouchConnector {
    /// Connects to the configured store, creating the database if missing.
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built or the database cannot be
    /// created or reached.
    pub fn connect(config: CouchConfig) -> RepositoryResult<Self> {
        let http = Client::builder().build().map_err(transport)?;
        let connector = Self { http, config };
        connector.ensure_database()?;
        Ok(connector)
    }

    /// Creates the database when it does not exist yet.
    fn ensure_database(&self) -> RepositoryResult<()> {
        let url = self.url(&[self.config.database()])?;
        let response = self.request(Method::PUT, url).send().map_err(transport)?;

        match response.status() {
            StatusCode::CREATED => {
                tracing::info!(database = %self.config.database(), "database created");
                Ok(())
            }
            StatusCode::PRECONDITION_FAILED => Ok(()),
            status => Err(unexpected_status("database creation", status)),
        }
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match self.config.credentials() {
            Some(credentials) => {
                builder.basic_auth(&credentials.username, Some(&credentials.password))
            }
            None => builder,
        }
    }

    /// Builds a URL under the store's base from path segments, percent-
    /// encoding each segment.
    fn url(&self, segments: &[&str]) -> RepositoryResult<Url> {
        let mut url = self.config.base_url().clone();
        url.path_segments_mut()
            .map_err(|()| {
                RepositoryError::InvalidInput("store base URL cannot hold a path".into())
            })?
            .extend(segments);
        Ok(url)
    }

    fn design_doc_id(descriptor: &IndexDescriptor) -> String {
        format!("_design/{}", descriptor.name)
    }

    /// Fetches the current design document, or `None` when absent.
    fn fetch_design_doc(
        &self,
        descriptor: &IndexDescriptor,
    ) -> RepositoryResult<Option<DesignDocument>> {
        let url = self.url(&[self.config.database(), "_design", &descriptor.name])?;
        let response = self.request(Method::GET, url).send().map_err(transport)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                Ok(Some(response.json().map_err(transport)?))
            }
            status => Err(unexpected_status("design document fetch", status)),
        }
    }
}

impl DocumentStore for CouchConnector {
    fn put(&self, doc: &Value) -> RepositoryResult<DocumentMeta> {
        let url = self.url(&[self.config.database()])?;
        let response = self
            .request(Method::POST, url)
            .json(doc)
            .send()
            .map_err(transport)?;

        match response.status() {
            status if status.is_success() => {
                let written: WriteResponse = response.json().map_err(transport)?;
                Ok(DocumentMeta {
                    id: written.id,
                    revision: written.rev,
                })
            }
            StatusCode::CONFLICT => Err(RepositoryError::Conflict {
                id: doc
                    .get("_id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            }),
            status => Err(unexpected_status("document write", status)),
        }
    }

    fn get(&self, id: &str) -> RepositoryResult<Value> {
        let url = self.url(&[self.config.database(), id])?;
        let response = self.request(Method::GET, url).send().map_err(transport)?;

        match response.status() {
            status if status.is_success() => response.json().map_err(transport),
            StatusCode::NOT_FOUND => Err(RepositoryError::NotFound { id: id.to_owned() }),
            status => Err(unexpected_status("document fetch", status)),
        }
    }

    fn delete(&self, id: &str, revision: &str) -> RepositoryResult<()> {
        let mut url = self.url(&[self.config.database(), id])?;
        url.query_pairs_mut().append_pair("rev", revision);
        let response = self.request(Method::DELETE, url).send().map_err(transport)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(RepositoryError::NotFound { id: id.to_owned() }),
            StatusCode::CONFLICT => Err(RepositoryError::Conflict { id: id.to_owned() }),
            status => Err(unexpected_status("document delete", status)),
        }
    }

    fn all_docs(&self) -> RepositoryResult<Vec<Value>> {
        let mut url = self.url(&[self.config.database(), "_all_docs"])?;
        url.query_pairs_mut().append_pair("include_docs", "true");
        let response = self.request(Method::GET, url).send().map_err(transport)?;

        if !response.status().is_success() {
            return Err(unexpected_status("all-docs fetch", response.status()));
        }

        let listing: AllDocsResponse = response.json().map_err(transport)?;
        listing
            .rows
            .into_iter()
            .filter(|row| !row.id.starts_with("_design/"))
            .map(|row| {
                row.doc.ok_or_else(|| {
                    RepositoryError::MalformedResponse(format!(
                        "all-docs row {} carries no document",
                        row.id
                    ))
                })
            })
            .collect()
    }
}

impl SearchIndex for CouchConnector {
    fn ensure_index(&self, descriptor: &IndexDescriptor) -> RepositoryResult<()> {
        let rendered = index_fn::render(descriptor);
        let existing = self.fetch_design_doc(descriptor)?;

        if let Some(design_doc) = &existing {
            let installed = design_doc
                .fulltext
                .get(&descriptor.function)
                .map(|function| function.index.as_str());
            if installed == Some(rendered.as_str()) {
                tracing::debug!(index = %descriptor.name, "search function already current");
                return Ok(());
            }
        }

        // Preserve unrelated query functions living in the same design doc.
        let mut fulltext: BTreeMap<String, Value> = existing
            .as_ref()
            .map(|doc| {
                doc.fulltext
                    .iter()
                    .map(|(name, function)| (name.clone(), json!({ "index": function.index })))
                    .collect()
            })
            .unwrap_or_default();
        fulltext.insert(descriptor.function.clone(), json!({ "index": rendered }));

        let mut body = json!({
            "_id": Self::design_doc_id(descriptor),
            "fulltext": fulltext,
        });
        if let Some(design_doc) = &existing {
            body["_rev"] = Value::String(design_doc.rev.clone());
        }

        let url = self.url(&[self.config.database(), "_design", &descriptor.name])?;
        let response = self
            .request(Method::PUT, url)
            .json(&body)
            .send()
            .map_err(transport)?;

        match response.status() {
            status if status.is_success() => {
                tracing::info!(index = %descriptor.name, function = %descriptor.function,
                    "search function uploaded");
                Ok(())
            }
            StatusCode::CONFLICT => Err(RepositoryError::Conflict {
                id: Self::design_doc_id(descriptor),
            }),
            status => Err(unexpected_status("design document upload", status)),
        }
    }

    fn search(&self, request: &SearchRequest<'_>) -> RepositoryResult<SearchPage> {
        let mut url = self.url(&[
            FTI_MOUNT[0],
            FTI_MOUNT[1],
            self.config.database(),
            "_design",
            request.index,
            request.function,
        ])?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", &request.query);
            pairs.append_pair("include_docs", if request.include_docs { "true" } else { "false" });
            if let Some(sort) = &request.sort {
                pairs.append_pair("sort", sort);
            }
            if let Some(limit) = request.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            if let Some(skip) = request.skip {
                pairs.append_pair("skip", &skip.to_string());
            }
        }

        let response = self.request(Method::GET, url).send().map_err(transport)?;
        if !response.status().is_success() {
            return Err(unexpected_status("search", response.status()));
        }

        let result: FulltextResponse = response.json().map_err(transport)?;
        Ok(SearchPage {
            total_rows: result.total_rows,
            rows: result
                .rows
                .into_iter()
                .map(|row| SearchRow {
                    id: row.id,
                    score: row.score,
                    doc: row.doc,
                })
                .collect(),
        })
    }
}

fn transport(err: reqwest::Error) -> RepositoryError {
    RepositoryError::Transport(Box::new(err))
}

fn unexpected_status(operation: &str, status: StatusCode) -> RepositoryError {
    RepositoryError::Transport(format!("{operation} failed with status {status}").into())
}
