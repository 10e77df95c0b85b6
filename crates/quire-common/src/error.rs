//! Error types shared between the editor and the query service.

use miette::Diagnostic;
use thiserror::Error;

/// Failures talking to the warehouse query service.
///
/// The editor never propagates these as a hard failure: a pending placeholder
/// whose query fails is rendered as an inline error block instead.
#[derive(Debug, Error, Diagnostic)]
pub enum QueryError {
    #[error("request to {url} failed")]
    #[diagnostic(code(query::http))]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("query service returned {status}: {message}")]
    #[diagnostic(code(query::status))]
    Status { status: u16, message: String },

    #[error("query service reported failure: {0}")]
    #[diagnostic(code(query::envelope))]
    Envelope(String),

    #[error("failed to decode query service response")]
    #[diagnostic(code(query::decode))]
    Decode {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid query service URL: {0}")]
    #[diagnostic(code(query::url), help("the base URL must be absolute, e.g. http://localhost:3001/api/warehouse"))]
    Url(String),
}

/// Collaboration frame encoding failures.
#[derive(Debug, Error, Diagnostic)]
pub enum FrameError {
    #[error("failed to encode collaboration frame")]
    #[diagnostic(code(collab::encode))]
    Encode(#[source] postcard::Error),

    #[error("failed to decode collaboration frame")]
    #[diagnostic(code(collab::decode))]
    Decode(#[source] postcard::Error),
}
