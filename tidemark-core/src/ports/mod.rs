//! Port definitions for external dependencies

pub mod executor;
pub mod registry;

pub use executor::{ExecutorError, ExecutorFactory, SchemaExecutor};
pub use registry::TenantRegistry;
