//! Adapter implementations of the ports

pub mod duckdb;
pub mod http_executor;

pub use self::duckdb::DuckDbRegistry;
pub use http_executor::{HttpExecutorFactory, HttpSchemaExecutor};
