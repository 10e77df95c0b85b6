//! Client for the warehouse query service.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::QueryError;
use crate::query::{
    Envelope, Parameters, QueryPayload, QueryRequest, QueryResult, StatusPayload,
    TemplateInfo, TemplatePayload, TemplateRequest, TemplatesPayload,
};

/// Request/response view of the query service, as consumed by the editor.
///
/// Implemented by [`HttpQueryClient`] for the real backend; tests provide
/// in-memory fakes.
pub trait QueryService: Send + Sync {
    /// Execute an ad-hoc statement.
    fn query(
        &self,
        query: &str,
        parameters: Parameters,
    ) -> impl Future<Output = Result<QueryResult, QueryError>> + Send;

    /// Execute a named server-side template.
    fn template(
        &self,
        name: &str,
        parameters: Parameters,
    ) -> impl Future<Output = Result<QueryResult, QueryError>> + Send;

    /// List the templates the server knows about.
    fn templates(&self) -> impl Future<Output = Result<Vec<TemplateInfo>, QueryError>> + Send;

    /// Whether the server currently holds a live warehouse connection.
    fn status(&self) -> impl Future<Output = Result<bool, QueryError>> + Send;
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api/warehouse".to_owned(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// `reqwest`-backed [`QueryService`].
#[derive(Debug, Clone)]
pub struct HttpQueryClient {
    client: reqwest::Client,
    base: Url,
    timeout: Duration,
}

impl HttpQueryClient {
    pub fn new(config: ClientConfig) -> Result<Self, QueryError> {
        // Url::join drops the last segment unless the base ends in '/'.
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base = Url::parse(&base).map_err(|e| QueryError::Url(format!("{base}: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base,
            timeout: config.timeout,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, QueryError> {
        self.base
            .join(path)
            .map_err(|e| QueryError::Url(format!("{path}: {e}")))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, QueryError> {
        let url = self.endpoint(path)?;
        debug!(%url, "query service GET");
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| QueryError::Http {
                url: url.to_string(),
                source,
            })?;
        Self::decode(url, response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, QueryError> {
        let url = self.endpoint(path)?;
        debug!(%url, "query service POST");
        let response = self
            .client
            .post(url.clone())
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|source| QueryError::Http {
                url: url.to_string(),
                source,
            })?;
        Self::decode(url, response).await
    }

    /// Unwrap the `{success, ...}` envelope.
    async fn decode<T: DeserializeOwned>(
        url: Url,
        response: reqwest::Response,
    ) -> Result<T, QueryError> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(|source| QueryError::Http {
            url: url.to_string(),
            source,
        })?;

        let value: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(source) if status.is_success() => return Err(QueryError::Decode { source }),
            Err(_) => {
                return Err(QueryError::Status {
                    status: status.as_u16(),
                    message: String::from_utf8_lossy(&bytes).into_owned(),
                });
            }
        };

        let success = value.get("success").and_then(Value::as_bool).unwrap_or(false);
        if !status.is_success() || !success {
            let message = value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_owned();
            warn!(%url, status = status.as_u16(), %message, "query service error");
            return Err(if status.is_success() {
                QueryError::Envelope(message)
            } else {
                QueryError::Status {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        serde_json::from_value::<Envelope<T>>(value)
            .map(|envelope| envelope.payload)
            .map_err(|source| QueryError::Decode { source })
    }
}

impl QueryService for HttpQueryClient {
    async fn query(&self, query: &str, parameters: Parameters) -> Result<QueryResult, QueryError> {
        let body = QueryRequest {
            query: query.to_owned(),
            parameters,
        };
        let payload: QueryPayload = self.post("query", &body).await?;
        Ok(payload.data)
    }

    async fn template(&self, name: &str, parameters: Parameters) -> Result<QueryResult, QueryError> {
        let body = TemplateRequest { parameters };
        let payload: TemplatePayload = self.post(&format!("template/{name}"), &body).await?;
        Ok(payload.data)
    }

    async fn templates(&self) -> Result<Vec<TemplateInfo>, QueryError> {
        let payload: TemplatesPayload = self.get("templates").await?;
        Ok(payload.templates)
    }

    async fn status(&self) -> Result<bool, QueryError> {
        let payload: StatusPayload = self.get("status").await?;
        Ok(payload.connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::{get, post}};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn serve(router: Router) -> HttpQueryClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        HttpQueryClient::new(ClientConfig {
            base_url: format!("http://{addr}/api/warehouse"),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn template_payload_is_unwrapped() {
        let router = Router::new().route(
            "/api/warehouse/template/{name}",
            post(|| async {
                Json(json!({
                    "success": true,
                    "templateName": "salesDashboard",
                    "description": "sales",
                    "data": {"columns": ["month"], "rows": [{"month": "2024-01"}], "rowCount": 1}
                }))
            }),
        );
        let client = serve(router).await;
        let data = client
            .template("salesDashboard", Parameters::default())
            .await
            .unwrap();
        assert_eq!(data.row_count, 1);
        assert_eq!(data.columns, vec!["month"]);
    }

    #[tokio::test]
    async fn error_envelope_becomes_status_error() {
        let router = Router::new().route(
            "/api/warehouse/status",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"success": false, "error": "not connected"})),
                )
            }),
        );
        let client = serve(router).await;
        match client.status().await {
            Err(QueryError::Status { status, message }) => {
                assert_eq!(status, 500);
                assert_eq!(message, "not connected");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
