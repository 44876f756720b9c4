use crate::core::error_store::ErrorStore;
use crate::core::factory::ServiceContainer;
use crate::core::query::QueryBuilder;
use crate::core::representation::RepresentationContext;
use crate::core::request::{Operation, Request, Response};
use crate::domain::model::{Entity, EntityId};
use crate::domain::ports::{EntityStore, ResourceAdapter};
use crate::utils::error::{ApiError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Resource name -> adapter.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn ResourceAdapter>>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.adapters.keys()).finish()
    }
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `adapter` under `name`; the adapter must answer to that name.
    pub fn register(&mut self, name: &str, adapter: Arc<dyn ResourceAdapter>) -> Result<()> {
        if adapter.resource_name() != name {
            return Err(ApiError::config(format!(
                "Resource '{}' is mapped to an adapter for '{}'",
                name,
                adapter.resource_name()
            )));
        }
        if self.adapters.insert(name.to_string(), adapter).is_some() {
            tracing::debug!("Replaced adapter for resource '{}'", name);
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&dyn ResourceAdapter> {
        self.adapters
            .get(name)
            .map(|adapter| adapter.as_ref())
            .ok_or_else(|| ApiError::UnknownResource {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// What an adapter can reach while hydrating: other adapters and the store.
pub struct AdapterContext<'a> {
    registry: &'a AdapterRegistry,
    store: &'a dyn EntityStore,
}

impl<'a> AdapterContext<'a> {
    pub fn new(registry: &'a AdapterRegistry, store: &'a dyn EntityStore) -> Self {
        Self { registry, store }
    }

    pub fn adapter(&self, name: &str) -> Result<&'a dyn ResourceAdapter> {
        self.registry.get(name)
    }

    pub fn store(&self) -> &'a dyn EntityStore {
        self.store
    }

    /// Loads the record `id` of the resource registered as `resource_name`.
    pub fn find_entity(&self, resource_name: &str, id: EntityId) -> Result<Entity> {
        let adapter = self.adapter(resource_name)?;
        self.store
            .find(adapter.entity_kind(), id)
            .ok_or_else(|| ApiError::not_found(adapter.entity_class(), id))
    }
}

/// Dispatches API requests to the registered resource adapters.
pub struct ApiManager {
    container: Arc<ServiceContainer>,
    registry: AdapterRegistry,
    representation: RepresentationContext,
    per_page: usize,
}

impl std::fmt::Debug for ApiManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiManager")
            .field("resources", &self.registry)
            .field("per_page", &self.per_page)
            .finish()
    }
}

impl ApiManager {
    pub fn new(container: Arc<ServiceContainer>) -> Result<Self> {
        let config = container.config()?;
        let representation = RepresentationContext::new(config.base_url())?;
        let per_page = config.per_page();
        Ok(Self {
            container,
            registry: AdapterRegistry::new(),
            representation,
            per_page,
        })
    }

    pub fn container(&self) -> &Arc<ServiceContainer> {
        &self.container
    }

    /// 依設定的 resource -> adapter class 對照表註冊 adapter
    pub fn register_resources(&mut self, resources: &BTreeMap<String, String>) -> Result<()> {
        for (name, class) in resources {
            let adapter = crate::app::resources::adapter_for_class(class).ok_or_else(|| {
                ApiError::config(format!(
                    "Unknown adapter class '{}' for resource '{}'",
                    class, name
                ))
            })?;
            self.registry.register(name, adapter)?;
            tracing::debug!("Registered API resource '{}' ({})", name, class);
        }
        Ok(())
    }

    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    pub fn adapter(&self, name: &str) -> Result<&dyn ResourceAdapter> {
        self.registry.get(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn execute(&self, request: &Request) -> Result<Response> {
        let adapter = self.registry.get(&request.resource)?;

        tracing::info!(
            "API {} on '{}'{}",
            request.operation,
            request.resource,
            request.id.map(|id| format!(" #{}", id)).unwrap_or_default()
        );

        match request.operation {
            Operation::Search => self.search(adapter, request),
            Operation::Create => self.create(adapter, request),
            Operation::Read => self.read(adapter, request),
            Operation::Update => self.update(adapter, request),
            Operation::Delete => self.delete(adapter, request),
        }
    }

    pub fn search(&self, adapter: &dyn ResourceAdapter, request: &Request) -> Result<Response> {
        let mut qb = QueryBuilder::new(self.per_page);
        adapter.build_query(&mut qb, &request.content);

        let candidates = self.container.read_store()?.all(adapter.entity_kind());
        let (page, total) = qb.apply(candidates);

        let content = page
            .iter()
            .map(|entity| adapter.represent(&self.representation, entity))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Search on '{}' matched {} record(s)", request.resource, total);
        Ok(Response::new(request.operation, &request.resource, Value::Array(content))
            .with_total_results(total))
    }

    pub fn create(&self, adapter: &dyn ResourceAdapter, request: &Request) -> Result<Response> {
        let mut store = self.container.write_store()?;
        let mut entity = adapter.new_entity();

        self.hydrate_and_validate(adapter, request, &mut entity, &*store)?;

        let stored = store.persist(entity)?;
        tracing::info!(
            "Created {} #{}",
            adapter.entity_class(),
            stored.id().unwrap_or_default()
        );
        let content = adapter.represent(&self.representation, &stored)?;
        Ok(Response::new(request.operation, &request.resource, content))
    }

    pub fn read(&self, adapter: &dyn ResourceAdapter, request: &Request) -> Result<Response> {
        let id = require_id(request)?;
        let store = self.container.read_store()?;
        let entity = store
            .find(adapter.entity_kind(), id)
            .ok_or_else(|| ApiError::not_found(adapter.entity_class(), id))?;

        let content = adapter.represent(&self.representation, &entity)?;
        Ok(Response::new(request.operation, &request.resource, content))
    }

    pub fn update(&self, adapter: &dyn ResourceAdapter, request: &Request) -> Result<Response> {
        let id = require_id(request)?;
        let mut store = self.container.write_store()?;
        let mut entity = store
            .find(adapter.entity_kind(), id)
            .ok_or_else(|| ApiError::not_found(adapter.entity_class(), id))?;

        self.hydrate_and_validate(adapter, request, &mut entity, &*store)?;

        let stored = store.persist(entity)?;
        tracing::info!("Updated {} #{}", adapter.entity_class(), id);
        let content = adapter.represent(&self.representation, &stored)?;
        Ok(Response::new(request.operation, &request.resource, content))
    }

    pub fn delete(&self, adapter: &dyn ResourceAdapter, request: &Request) -> Result<Response> {
        let id = require_id(request)?;
        let removed = self
            .container
            .write_store()?
            .remove(adapter.entity_kind(), id)?;

        tracing::info!("Deleted {} #{}", adapter.entity_class(), id);
        let content = adapter.represent(&self.representation, &removed)?;
        Ok(Response::new(request.operation, &request.resource, content))
    }

    /// validate -> hydrate -> validate entity; rejects when any field error was recorded.
    fn hydrate_and_validate(
        &self,
        adapter: &dyn ResourceAdapter,
        request: &Request,
        entity: &mut Entity,
        store: &dyn EntityStore,
    ) -> Result<()> {
        let ctx = AdapterContext::new(&self.registry, store);
        let mut errors = ErrorStore::new();

        adapter.hydrate_entity(&ctx, request, entity, &mut errors)?;
        adapter.validate_entity(&ctx, entity, &mut errors)?;

        if errors.has_errors() {
            tracing::warn!(
                "Rejected {} on '{}': {}",
                request.operation,
                request.resource,
                errors
            );
            return Err(ApiError::ValidationError { errors });
        }
        Ok(())
    }
}

fn require_id(request: &Request) -> Result<EntityId> {
    request.id.ok_or_else(|| {
        ApiError::bad_request(format!(
            "The {} operation requires a resource id",
            request.operation
        ))
    })
}
