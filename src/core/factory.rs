use crate::adapters::memory_store::InMemoryStore;
use crate::config::toml_config::ApiConfig;
use crate::core::manager::ApiManager;
use crate::domain::ports::EntityStore;
use crate::utils::error::{ApiError, Result};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub const CONFIG_SERVICE: &str = "Config";
pub const STORE_SERVICE: &str = "EntityStore";

pub type SharedStore = Arc<RwLock<dyn EntityStore>>;

/// Services shared by the API layer: the merged configuration and the entity store.
pub struct ServiceContainer {
    config: Option<ApiConfig>,
    store: SharedStore,
}

impl std::fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ServiceContainer {
    pub fn new(store: SharedStore) -> Self {
        Self {
            config: None,
            store,
        }
    }

    pub fn in_memory(store: InMemoryStore) -> Self {
        let store: SharedStore = Arc::new(RwLock::new(store));
        Self::new(store)
    }

    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn has(&self, name: &str) -> bool {
        match name {
            CONFIG_SERVICE => self.config.is_some(),
            STORE_SERVICE => true,
            _ => false,
        }
    }

    pub fn config(&self) -> Result<&ApiConfig> {
        self.config.as_ref().ok_or_else(|| ApiError::ServiceNotFound {
            name: CONFIG_SERVICE.to_string(),
        })
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn read_store(&self) -> Result<RwLockReadGuard<'_, dyn EntityStore + 'static>> {
        self.store.read().map_err(|_| ApiError::StoreUnavailable)
    }

    pub fn write_store(&self) -> Result<RwLockWriteGuard<'_, dyn EntityStore + 'static>> {
        self.store.write().map_err(|_| ApiError::StoreUnavailable)
    }
}

/// Builds a service out of the container's other services.
pub trait ServiceFactory {
    type Service;

    fn create_service(&self, container: Arc<ServiceContainer>) -> Result<Self::Service>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ApiManagerFactory;

impl ServiceFactory for ApiManagerFactory {
    type Service = ApiManager;

    /// 建立 API manager：沒有 `api_resources` 設定時直接失敗
    fn create_service(&self, container: Arc<ServiceContainer>) -> Result<ApiManager> {
        let resources = container
            .config()?
            .api_resources
            .clone()
            .ok_or_else(|| ApiError::config("The configuration has no registered API resources."))?;

        let mut manager = ApiManager::new(container)?;
        manager.register_resources(&resources)?;

        tracing::info!(
            "API manager ready with {} resource(s): {}",
            manager.registry().len(),
            manager.registry().names().collect::<Vec<_>>().join(", ")
        );
        Ok(manager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::ApiConfig;

    fn container(config: Option<ApiConfig>) -> Arc<ServiceContainer> {
        let mut container = ServiceContainer::in_memory(InMemoryStore::new());
        if let Some(config) = config {
            container = container.with_config(config);
        }
        Arc::new(container)
    }

    #[test]
    fn test_missing_config_service() {
        let err = ApiManagerFactory.create_service(container(None)).unwrap_err();
        assert!(matches!(err, ApiError::ServiceNotFound { ref name } if name == "Config"));
    }

    #[test]
    fn test_missing_api_resources() {
        let err = ApiManagerFactory
            .create_service(container(Some(ApiConfig::default())))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: The configuration has no registered API resources."
        );
    }

    #[test]
    fn test_registers_configured_resources() {
        let config = ApiConfig::from_toml_str(
            r#"
[api_resources]
items = "item"
item_sets = "item_set"
media = "media"
"#,
        )
        .unwrap();

        let manager = ApiManagerFactory.create_service(container(Some(config))).unwrap();

        assert!(manager.is_registered("items"));
        assert!(manager.is_registered("media"));
        assert_eq!(manager.registry().len(), 3);
    }

    #[test]
    fn test_container_reports_services() {
        let container = container(None);
        assert!(!container.has(CONFIG_SERVICE));
        assert!(container.has(STORE_SERVICE));
        assert!(!container.has("Logger"));
    }

    #[test]
    fn test_store_guards_share_one_store() {
        use crate::domain::model::{Entity, EntityKind, ItemSet};

        let container = container(None);
        let stored = container
            .write_store()
            .unwrap()
            .persist(Entity::ItemSet(ItemSet::default()))
            .unwrap();

        let id = stored.id().unwrap();
        assert!(container.read_store().unwrap().exists(EntityKind::ItemSet, id));
    }
}
