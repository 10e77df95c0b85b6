use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::counter;
use miette::Diagnostic;
use quire_common::query::{Envelope, ErrorPayload};
use thiserror::Error;
use tracing::error;

/// Server startup and lifecycle errors
#[derive(Debug, Error, Diagnostic)]
pub enum ServerError {
    #[error("invalid listen address {addr}")]
    #[diagnostic(code(server::address), help("check QUIRE_HOST and PORT"))]
    Address { addr: String },

    #[error("invalid warehouse URL {url}: {message}")]
    #[diagnostic(code(server::warehouse_url))]
    WarehouseUrl { url: String, message: String },

    #[error("failed to bind to {addr}")]
    #[diagnostic(code(server::bind))]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server terminated unexpectedly")]
    #[diagnostic(code(server::serve))]
    Serve {
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the warehouse collaborator
#[derive(Debug, Error, Diagnostic)]
pub enum WarehouseError {
    #[error("warehouse is not configured")]
    #[diagnostic(
        code(warehouse::not_configured),
        help("set WAREHOUSE_ACCOUNT and WAREHOUSE_TOKEN")
    )]
    NotConfigured,

    #[error("warehouse request failed")]
    #[diagnostic(code(warehouse::http))]
    Http(#[source] reqwest::Error),

    #[error("warehouse rejected the statement ({status}): {message}")]
    #[diagnostic(code(warehouse::statement))]
    Statement { status: u16, message: String },

    #[error("unexpected warehouse response: {0}")]
    #[diagnostic(code(warehouse::response))]
    Response(String),
}

impl WarehouseError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured => "not_configured",
            Self::Http(_) => "http",
            Self::Statement { .. } => "statement",
            Self::Response(_) => "response",
        }
    }
}

/// Errors returned by the HTTP handlers, rendered as the
/// `{success: false, error, timestamp}` envelope.
#[derive(Debug, Error, Diagnostic)]
pub enum ApiError {
    #[error("잘못된 요청 본문입니다.")]
    #[diagnostic(code(api::body))]
    InvalidJsonBody(#[from] JsonRejection),

    #[error("잘못된 요청 본문입니다.")]
    #[diagnostic(code(api::body))]
    MalformedBody(#[from] serde_json::Error),

    #[error("SQL 쿼리가 필요합니다.")]
    #[diagnostic(code(api::missing_query))]
    MissingQuery,

    #[error("템플릿 '{name}'을 찾을 수 없습니다.")]
    #[diagnostic(code(api::unknown_template))]
    UnknownTemplate {
        name: String,
        available: Vec<String>,
    },

    #[error("{source}")]
    #[diagnostic(code(api::warehouse))]
    Warehouse {
        template: Option<String>,
        #[source]
        source: WarehouseError,
    },

    #[error("경로를 찾을 수 없습니다")]
    #[diagnostic(code(api::not_found))]
    NotFound { path: String },
}

impl From<WarehouseError> for ApiError {
    fn from(source: WarehouseError) -> Self {
        ApiError::Warehouse {
            template: None,
            source,
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidJsonBody(_) | ApiError::MalformedBody(_) | ApiError::MissingQuery => {
                StatusCode::BAD_REQUEST
            }
            ApiError::UnknownTemplate { .. } | ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Warehouse {
                source: WarehouseError::NotConfigured,
                ..
            } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Warehouse { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::InvalidJsonBody(rejection) => error!(%status, body = %rejection.body_text()),
            ApiError::Warehouse { template, source } => {
                counter!("quire_warehouse_failures_total", "kind" => source.kind()).increment(1);
                error!(%status, ?template, %source)
            }
            other => error!(%status, "{other}"),
        }

        let mut envelope = Envelope::error(self.to_string());
        envelope.payload = match self {
            ApiError::UnknownTemplate { name, available } => ErrorPayload {
                template_name: Some(name),
                available_templates: Some(available),
                ..envelope.payload
            },
            ApiError::Warehouse {
                template: Some(name),
                ..
            } => ErrorPayload {
                template_name: Some(name),
                ..envelope.payload
            },
            ApiError::NotFound { path } => ErrorPayload {
                path: Some(path),
                ..envelope.payload
            },
            _ => envelope.payload,
        };

        (status, Json(envelope)).into_response()
    }
}
