use crate::core::error_store::ErrorStore;
use crate::core::manager::AdapterContext;
use crate::core::query::{QueryBuilder, SortField};
use crate::core::representation::RepresentationContext;
use crate::core::request::Request;
use crate::core::resource::DEFAULT_SORT_FIELDS;
use crate::domain::model::{mismatch, Entity, EntityId, EntityKind, EntityRecord};
use crate::utils::error::Result;
use serde_json::{Map, Value};

/// Persistence for API entities, keyed by kind and identifier.
pub trait EntityStore: Send + Sync {
    fn find(&self, kind: EntityKind, id: EntityId) -> Option<Entity>;

    fn exists(&self, kind: EntityKind, id: EntityId) -> bool {
        self.find(kind, id).is_some()
    }

    fn all(&self, kind: EntityKind) -> Vec<Entity>;

    /// Stores the entity, assigning identifiers and timestamps, and returns the stored copy.
    fn persist(&mut self, entity: Entity) -> Result<Entity>;

    fn remove(&mut self, kind: EntityKind, id: EntityId) -> Result<Entity>;
}

/// A resource adapter written against one concrete entity type.
///
/// Every `EntityAdapter` is usable as a [`ResourceAdapter`] trait object, which
/// is what the registry stores and what other adapters resolve by name.
pub trait EntityAdapter: Send + Sync + 'static {
    type Entity: EntityRecord + Default;

    fn resource_name(&self) -> &'static str;

    fn representation_class(&self) -> &'static str;

    fn entity_class(&self) -> &'static str {
        <Self::Entity as EntityRecord>::KIND.entity_class()
    }

    fn sort_fields(&self) -> &'static [(&'static str, SortField)] {
        DEFAULT_SORT_FIELDS
    }

    fn validate_request(&self, _request: &Request, _errors: &mut ErrorStore) {}

    fn hydrate(
        &self,
        ctx: &AdapterContext<'_>,
        request: &Request,
        entity: &mut Self::Entity,
        errors: &mut ErrorStore,
    ) -> Result<()>;

    fn validate_entity(
        &self,
        _ctx: &AdapterContext<'_>,
        _entity: &Self::Entity,
        _errors: &mut ErrorStore,
    ) {
    }

    fn build_query(&self, _qb: &mut QueryBuilder, _query: &Map<String, Value>) {}

    fn represent(&self, ctx: &RepresentationContext, entity: &Self::Entity) -> Result<Value>;
}

/// Object-safe view of an adapter, as stored in the registry.
pub trait ResourceAdapter: Send + Sync {
    fn resource_name(&self) -> &'static str;
    fn representation_class(&self) -> &'static str;
    fn entity_class(&self) -> &'static str;
    fn entity_kind(&self) -> EntityKind;
    fn new_entity(&self) -> Entity;
    fn validate_request(&self, request: &Request, errors: &mut ErrorStore);

    /// Validates the request and, when that added no errors, hydrates `entity`.
    fn hydrate_entity(
        &self,
        ctx: &AdapterContext<'_>,
        request: &Request,
        entity: &mut Entity,
        errors: &mut ErrorStore,
    ) -> Result<()>;

    fn validate_entity(
        &self,
        ctx: &AdapterContext<'_>,
        entity: &Entity,
        errors: &mut ErrorStore,
    ) -> Result<()>;

    fn build_query(&self, qb: &mut QueryBuilder, query: &Map<String, Value>);
    fn represent(&self, ctx: &RepresentationContext, entity: &Entity) -> Result<Value>;
}

impl<A: EntityAdapter> ResourceAdapter for A {
    fn resource_name(&self) -> &'static str {
        EntityAdapter::resource_name(self)
    }

    fn representation_class(&self) -> &'static str {
        EntityAdapter::representation_class(self)
    }

    fn entity_class(&self) -> &'static str {
        EntityAdapter::entity_class(self)
    }

    fn entity_kind(&self) -> EntityKind {
        <A::Entity as EntityRecord>::KIND
    }

    fn new_entity(&self) -> Entity {
        A::Entity::default().into()
    }

    fn validate_request(&self, request: &Request, errors: &mut ErrorStore) {
        EntityAdapter::validate_request(self, request, errors)
    }

    fn hydrate_entity(
        &self,
        ctx: &AdapterContext<'_>,
        request: &Request,
        entity: &mut Entity,
        errors: &mut ErrorStore,
    ) -> Result<()> {
        let kind = <A::Entity as EntityRecord>::KIND;
        let found = entity.kind();
        let record = A::Entity::downcast_mut(entity).ok_or_else(|| mismatch(kind, found))?;

        let before = errors.len();
        EntityAdapter::validate_request(self, request, errors);
        if errors.len() > before {
            tracing::debug!(
                "Skipping hydration of {}: request has {} new error(s)",
                kind,
                errors.len() - before
            );
            return Ok(());
        }

        self.hydrate(ctx, request, record, errors)
    }

    fn validate_entity(
        &self,
        ctx: &AdapterContext<'_>,
        entity: &Entity,
        errors: &mut ErrorStore,
    ) -> Result<()> {
        let record = A::Entity::downcast_ref(entity)
            .ok_or_else(|| mismatch(<A::Entity as EntityRecord>::KIND, entity.kind()))?;
        EntityAdapter::validate_entity(self, ctx, record, errors);
        Ok(())
    }

    fn build_query(&self, qb: &mut QueryBuilder, query: &Map<String, Value>) {
        EntityAdapter::build_query(self, qb, query)
    }

    fn represent(&self, ctx: &RepresentationContext, entity: &Entity) -> Result<Value> {
        let record = A::Entity::downcast_ref(entity)
            .ok_or_else(|| mismatch(<A::Entity as EntityRecord>::KIND, entity.kind()))?;
        EntityAdapter::represent(self, ctx, record)
    }
}
