use crate::core::error_store::ErrorStore;
use crate::core::manager::AdapterContext;
use crate::core::representation::RepresentationContext;
use crate::core::request::Request;
use crate::core::resource::{hydrate_resource, validate_resource_request};
use crate::domain::model::ItemSet;
use crate::domain::ports::EntityAdapter;
use crate::utils::error::Result;
use serde_json::{json, Value};

use super::{ITEMS, ITEM_SETS};

pub const IS_OPEN_KEY: &str = "o:is_open";

/// Item sets group items; membership itself lives on the item.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemSetAdapter;

impl EntityAdapter for ItemSetAdapter {
    type Entity = ItemSet;

    fn resource_name(&self) -> &'static str {
        ITEM_SETS
    }

    fn representation_class(&self) -> &'static str {
        "o:ItemSet"
    }

    fn validate_request(&self, request: &Request, errors: &mut ErrorStore) {
        validate_resource_request(request, errors);

        if let Some(is_open) = request.value(IS_OPEN_KEY) {
            if !is_open.is_boolean() {
                errors.add_error(IS_OPEN_KEY, "Openness must be a boolean");
            }
        }
    }

    fn hydrate(
        &self,
        _ctx: &AdapterContext<'_>,
        request: &Request,
        item_set: &mut ItemSet,
        _errors: &mut ErrorStore,
    ) -> Result<()> {
        hydrate_resource(request, &mut item_set.resource);

        if request.should_hydrate(IS_OPEN_KEY) {
            if let Some(is_open) = request.value(IS_OPEN_KEY).and_then(Value::as_bool) {
                item_set.is_open = is_open;
            }
        }
        Ok(())
    }

    fn represent(&self, ctx: &RepresentationContext, item_set: &ItemSet) -> Result<Value> {
        let mut doc =
            ctx.resource_document(ITEM_SETS, self.representation_class(), &item_set.resource);
        doc.insert(IS_OPEN_KEY.to_string(), json!(item_set.is_open));

        if let Some(url) = item_set
            .id()
            .and_then(|id| ctx.search_url(ITEMS, "item_set_id", id))
        {
            doc.insert("o:items".to_string(), json!({ "@id": url }));
        }

        Ok(Value::Object(doc))
    }
}
