//! Failures of the CouchDB content store.

use reqwest::StatusCode;
use thiserror::Error;

pub type CouchResult<T> = Result<T, CouchDaoError>;

#[derive(Debug, Error)]
pub enum CouchDaoError {
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// `COUCH_BASE_URL` is not an absolute http(s) URL.
    #[error("invalid CouchDB base URL `{url}`")]
    InvalidBaseUrl { url: String },
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// Checking or creating the content database answered an unexpected status.
    #[error("CouchDB database `{database}` is not usable (status {status})")]
    Database { database: String, status: StatusCode },
    #[error("failed to create CouchDB index `{index}` (status {status})")]
    EnsureIndex { index: &'static str, status: StatusCode },
    #[error("failed to send CouchDB request to `{path}`")]
    RequestSend {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected CouchDB response status {status} for `{path}`")]
    RequestStatus { path: String, status: StatusCode },
    /// The connection broke while the response body was being read.
    #[error("failed to read CouchDB response body for `{path}`")]
    ReadBody {
        path: String,
        #[source]
        source: reqwest::Error,
    },
    /// The body arrived but does not decode into the stored model.
    #[error("CouchDB document at `{path}` does not match its model")]
    DecodeDocument {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
