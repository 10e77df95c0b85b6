//! Types shared by the quire editor and its backend: query service wire
//! format and client, collaboration frames, and tracing setup.

pub mod client;
pub mod error;
pub mod query;
#[cfg(feature = "telemetry")]
pub mod telemetry;
pub mod transport;

pub use crate::client::{ClientConfig, HttpQueryClient, QueryService};
pub use crate::error::{FrameError, QueryError};
pub use crate::query::{Parameters, QueryResult, Row, Summary, TableData, TemplateInfo};
pub use crate::transport::CollabFrame;
