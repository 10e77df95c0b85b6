pub mod collab;
pub mod config;
pub mod error;
pub mod server;
pub mod warehouse;

pub use config::Config;
pub use error::{ApiError, ServerError, WarehouseError};
pub use server::{AppState, router, run};
pub use warehouse::{SqlApiWarehouse, UnconfiguredWarehouse, Warehouse};
