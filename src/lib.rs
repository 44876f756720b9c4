pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::memory_store::{Fixtures, InMemoryStore};
pub use config::toml_config::ApiConfig;
pub use core::{
    ApiManager, ApiManagerFactory, ErrorStore, Operation, Request, Response, ServiceContainer,
    ServiceFactory,
};
pub use utils::error::{ApiError, Result};
