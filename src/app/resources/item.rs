use crate::app::resources::media::ITEM_KEY;
use crate::core::error_store::ErrorStore;
use crate::core::manager::AdapterContext;
use crate::core::query::{Constraint, QueryBuilder};
use crate::core::reconcile::{reconcile_membership, reconcile_owned};
use crate::core::representation::RepresentationContext;
use crate::core::request::{Operation, Request};
use crate::core::resource::{build_resource_query, hydrate_resource, validate_resource_request};
use crate::domain::model::{Entity, EntityId, EntityRecord, Item, Media};
use crate::domain::ports::EntityAdapter;
use crate::utils::error::Result;
use crate::utils::validation::numeric_id;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

use super::{ITEMS, ITEM_SETS, MEDIA};

pub const ITEM_SET_KEY: &str = "o:item_set";
pub const MEDIA_KEY: &str = "o:media";

/// Items: resources grouped into item sets and owning their media.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemAdapter;

impl ItemAdapter {
    /// Aligns item-set membership with the `o:item_set` references.
    fn hydrate_item_sets(
        &self,
        ctx: &AdapterContext<'_>,
        request: &Request,
        item: &mut Item,
    ) -> Result<()> {
        let entries = request.array_value(ITEM_SET_KEY);
        let summary = reconcile_membership(&mut item.item_sets, entries, |id| {
            ctx.find_entity(ITEM_SETS, id).map(|_| ())
        })?;

        tracing::debug!(
            "Item {:?} item sets: added {:?}, retained {:?}, removed {:?}",
            item.id(),
            summary.added,
            summary.retained,
            summary.removed
        );
        Ok(())
    }

    /// Creates media for entries without `o:id`, keeps referenced media untouched
    /// and unlinks every other media of the item.
    fn hydrate_media(
        &self,
        ctx: &AdapterContext<'_>,
        request: &Request,
        item: &mut Item,
        errors: &mut ErrorStore,
    ) -> Result<()> {
        let adapter = ctx.adapter(MEDIA)?;
        let mut retained_ids: BTreeSet<EntityId> = BTreeSet::new();
        let mut created = Vec::new();

        for (index, entry) in request.array_value(MEDIA_KEY).iter().enumerate() {
            let Value::Object(media_data) = entry else {
                continue;
            };

            match media_data.get("o:id") {
                Some(id) if !id.is_null() => {
                    // 既有的媒體不在這裡更新
                    if let Some(id) = numeric_id(id) {
                        retained_ids.insert(id);
                    }
                }
                _ => {
                    // 巢狀媒體的擁有者就是這個項目
                    let mut content = media_data.clone();
                    content.remove(ITEM_KEY);

                    let mut media: Entity = Media::owned_by(item.id()).into();
                    let subrequest = request.subrequest(Operation::Create, MEDIA, content);
                    let mut nested_errors = ErrorStore::new();

                    adapter.hydrate_entity(ctx, &subrequest, &mut media, &mut nested_errors)?;
                    errors.merge_nested(&format!("{}[{}]", MEDIA_KEY, index), nested_errors);

                    created.push(Media::from_entity(media)?);
                }
            }
        }

        let summary = reconcile_owned(&mut item.media, &retained_ids, created, Media::id);
        tracing::debug!(
            "Item {:?} media: created {}, retained {:?}, removed {:?}",
            item.id(),
            summary.created,
            summary.retained,
            summary.removed
        );
        Ok(())
    }
}

impl EntityAdapter for ItemAdapter {
    type Entity = Item;

    fn resource_name(&self) -> &'static str {
        ITEMS
    }

    fn representation_class(&self) -> &'static str {
        "o:Item"
    }

    fn validate_request(&self, request: &Request, errors: &mut ErrorStore) {
        validate_resource_request(request, errors);

        if let Some(item_sets) = request.value(ITEM_SET_KEY) {
            if !item_sets.is_array() {
                errors.add_error(ITEM_SET_KEY, "Item sets must be an array");
            }
        }

        if let Some(media) = request.value(MEDIA_KEY) {
            if !media.is_array() {
                errors.add_error(MEDIA_KEY, "Media must be an array");
            }
        }
    }

    fn hydrate(
        &self,
        ctx: &AdapterContext<'_>,
        request: &Request,
        item: &mut Item,
        errors: &mut ErrorStore,
    ) -> Result<()> {
        hydrate_resource(request, &mut item.resource);

        if request.should_hydrate(ITEM_SET_KEY) {
            self.hydrate_item_sets(ctx, request, item)?;
        }

        if request.should_hydrate(MEDIA_KEY) {
            self.hydrate_media(ctx, request, item, errors)?;
        }

        Ok(())
    }

    fn build_query(&self, qb: &mut QueryBuilder, query: &Map<String, Value>) {
        build_resource_query(qb, query, self.sort_fields());

        if let Some(item_set_id) = query.get("item_set_id").and_then(numeric_id) {
            qb.and_where(Constraint::InItemSet(item_set_id));
        }
    }

    fn represent(&self, ctx: &RepresentationContext, item: &Item) -> Result<Value> {
        let mut doc = ctx.resource_document(ITEMS, self.representation_class(), &item.resource);

        let item_sets = item
            .item_sets
            .iter()
            .map(|id| ctx.reference(ITEM_SETS, *id))
            .collect();
        doc.insert(ITEM_SET_KEY.to_string(), Value::Array(item_sets));

        let media = item
            .media
            .iter()
            .filter_map(Media::id)
            .map(|id| ctx.reference(MEDIA, id))
            .collect();
        doc.insert(MEDIA_KEY.to_string(), Value::Array(media));

        Ok(Value::Object(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_store::{Fixtures, InMemoryStore};
    use crate::app::resources::{ItemSetAdapter, MediaAdapter};
    use crate::core::manager::AdapterRegistry;
    use crate::domain::model::EntityKind;
    use crate::domain::ports::{EntityStore, ResourceAdapter};
    use crate::utils::error::ApiError;
    use serde_json::json;
    use std::sync::Arc;

    const FIXTURES: &str = r#"{
        "item_sets": [{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}, {"id": 5}],
        "items": [
            {
                "id": 20,
                "item_sets": [1, 2, 3],
                "media": [
                    {"id": 10, "ingester": "html"},
                    {"id": 11, "ingester": "html"}
                ]
            },
            {"id": 21, "item_sets": [5]}
        ]
    }"#;

    fn registry() -> AdapterRegistry {
        let mut registry = AdapterRegistry::new();
        registry.register(ITEMS, Arc::new(ItemAdapter)).unwrap();
        registry.register(ITEM_SETS, Arc::new(ItemSetAdapter)).unwrap();
        registry.register(MEDIA, Arc::new(MediaAdapter)).unwrap();
        registry
    }

    fn store() -> InMemoryStore {
        InMemoryStore::from_fixtures(Fixtures::from_json_str(FIXTURES).unwrap()).unwrap()
    }

    fn update(content: Value) -> Request {
        Request::new(Operation::Update, ITEMS)
            .with_id(20)
            .with_content(content)
    }

    /// Hydrates item 20 through the registered adapter, as the manager does.
    fn hydrate(request: &Request) -> (Result<()>, Item, ErrorStore) {
        let registry = registry();
        let store = store();
        let ctx = AdapterContext::new(&registry, &store);
        let mut entity = store.find(EntityKind::Item, 20).unwrap();
        let mut errors = ErrorStore::new();

        let result = registry
            .get(ITEMS)
            .unwrap()
            .hydrate_entity(&ctx, request, &mut entity, &mut errors);
        (result, Item::from_entity(entity).unwrap(), errors)
    }

    fn validate(content: Value) -> ErrorStore {
        let mut errors = ErrorStore::new();
        EntityAdapter::validate_request(&ItemAdapter, &update(content), &mut errors);
        errors
    }

    #[test]
    fn test_item_sets_must_be_array() {
        let errors = validate(json!({"o:item_set": "1"}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors_for(ITEM_SET_KEY), ["Item sets must be an array"]);
    }

    #[test]
    fn test_media_must_be_array() {
        let errors = validate(json!({"o:media": {"o:id": 10}}));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors_for(MEDIA_KEY), ["Media must be an array"]);
        assert!(errors.errors_for(ITEM_SET_KEY).is_empty());
    }

    #[test]
    fn test_arrays_pass_validation() {
        assert!(validate(json!({"o:item_set": [], "o:media": []})).is_empty());
    }

    #[test]
    fn test_invalid_request_is_not_hydrated() {
        let (result, item, errors) = hydrate(&update(json!({"o:item_set": 4})));
        assert!(result.is_ok());
        assert_eq!(errors.len(), 1);
        assert_eq!(item.item_sets, BTreeSet::from([1, 2, 3]));
    }

    #[test]
    fn test_item_set_reconciliation() {
        let request = update(json!({"o:item_set": [{"o:id": 2}, 4], "o:media": []}));
        let (result, item, errors) = hydrate(&request);

        result.unwrap();
        assert!(errors.is_empty());
        assert_eq!(item.item_sets, BTreeSet::from([2, 4]));
    }

    #[test]
    fn test_missing_item_set_is_not_found() {
        let (result, _, _) = hydrate(&update(json!({"o:item_set": [{"o:id": 2}, 9]})));
        let err = result.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { id: 9, .. }));
        assert_eq!(err.to_string(), "ItemSet entity with ID 9 not found");
    }

    #[test]
    fn test_duplicate_references_are_idempotent() {
        let request = update(json!({"o:item_set": [4, {"o:id": 4}, "4", 1, 1]}));
        let (result, item, errors) = hydrate(&request);

        result.unwrap();
        assert!(errors.is_empty());
        assert_eq!(item.item_sets, BTreeSet::from([1, 4]));
    }

    #[test]
    fn test_unusable_references_are_skipped() {
        let request = update(json!({"o:item_set": [{"o:id": "x"}, null, -3, 2.5, 2]}));
        let (result, item, _) = hydrate(&request);

        result.unwrap();
        assert_eq!(item.item_sets, BTreeSet::from([2]));
    }

    #[test]
    fn test_media_reconciliation() {
        let request = update(json!({
            "o:media": [
                {"o:id": 10},
                {"o:ingester": "html", "html": "<p>new</p>", "title": "new"}
            ]
        }));
        let (result, item, errors) = hydrate(&request);

        result.unwrap();
        assert!(errors.is_empty());
        assert_eq!(item.media.len(), 2);
        assert_eq!(item.media[0].id(), Some(10));
        assert_eq!(item.media[1].id(), None);
        assert_eq!(item.media[1].item_id, Some(20));
        assert_eq!(item.media[1].ingester.as_deref(), Some("html"));
        assert!(!item.media_ids().contains(&11));
    }

    #[test]
    fn test_nested_media_errors_are_attributed() {
        let request = update(json!({"o:media": [{"o:id": 10}, {"title": "new"}]}));
        let (result, item, errors) = hydrate(&request);

        result.unwrap();
        assert_eq!(item.media.len(), 2);
        assert_eq!(item.media[0].id(), Some(10));
        assert_eq!(
            errors.errors_for("o:media[1].o:ingester"),
            ["Media must have an ingester"]
        );
    }

    #[test]
    fn test_non_numeric_media_id_creates_nothing() {
        let request = update(json!({"o:media": [{"o:id": "ten"}, "11", {"o:id": 11}]}));
        let (result, item, errors) = hydrate(&request);

        result.unwrap();
        assert!(errors.is_empty());
        assert_eq!(item.media_ids(), vec![11]);
    }

    #[test]
    fn test_partial_update_skips_absent_relations() {
        let request = update(json!({"o:is_public": false})).partial(true);
        let (result, item, _) = hydrate(&request);

        result.unwrap();
        assert!(!item.resource.is_public);
        assert_eq!(item.item_sets, BTreeSet::from([1, 2, 3]));
        assert_eq!(item.media_ids(), vec![10, 11]);
    }

    #[test]
    fn test_full_update_clears_absent_relations() {
        let (result, item, _) = hydrate(&update(json!({})));

        result.unwrap();
        assert!(item.item_sets.is_empty());
        assert!(item.media.is_empty());
    }

    #[test]
    fn test_item_set_id_query() {
        let store = store();
        let query = json!({"item_set_id": 5});
        let mut qb = QueryBuilder::default();
        EntityAdapter::build_query(&ItemAdapter, &mut qb, query.as_object().unwrap());

        let (items, total) = qb.apply(store.all(EntityKind::Item));
        assert_eq!(total, 1);
        assert_eq!(items[0].id(), Some(21));

        let query = json!({"item_set_id": "five"});
        let mut qb = QueryBuilder::default();
        EntityAdapter::build_query(&ItemAdapter, &mut qb, query.as_object().unwrap());
        assert!(!qb
            .constraints()
            .iter()
            .any(|c| matches!(c, Constraint::InItemSet(_))));
        assert_eq!(qb.apply(store.all(EntityKind::Item)).1, 2);
    }

    #[test]
    fn test_represent_lists_relations() {
        let ctx = RepresentationContext::new(Some("http://localhost/api/")).unwrap();
        let item = store().item(20).cloned().unwrap();
        let doc = EntityAdapter::represent(&ItemAdapter, &ctx, &item).unwrap();

        assert_eq!(doc["@type"], "o:Item");
        assert_eq!(doc["o:item_set"].as_array().map(Vec::len), Some(3));
        assert_eq!(doc["o:media"][1]["@id"], "http://localhost/api/media/11");
    }

    #[test]
    fn test_nested_media_ignores_foreign_owner() {
        let request = update(json!({
            "o:media": [
                {"o:ingester": "html", "html": "<p/>", "o:item": {"o:id": 999}},
                {"o:ingester": "html", "html": "<p/>"}
            ]
        }));
        let (result, item, errors) = hydrate(&request);

        result.unwrap();
        assert!(errors.is_empty());
        assert_eq!(item.media.len(), 2);
        assert!(item.media.iter().all(|media| media.item_id == Some(20)));
    }
}
