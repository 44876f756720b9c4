pub mod error_store;
pub mod factory;
pub mod manager;
pub mod query;
pub mod reconcile;
pub mod representation;
pub mod request;
pub mod resource;

pub use error_store::ErrorStore;
pub use factory::{ApiManagerFactory, ServiceContainer, ServiceFactory};
pub use manager::{AdapterContext, AdapterRegistry, ApiManager};
pub use request::{Operation, Request, Response};
