use crate::core::error_store::ErrorStore;
use crate::core::manager::AdapterContext;
use crate::core::query::{Constraint, QueryBuilder};
use crate::core::reconcile::reference_id;
use crate::core::representation::RepresentationContext;
use crate::core::request::{Operation, Request};
use crate::core::resource::{
    build_resource_query, hydrate_resource, is_property_term, validate_resource_request,
};
use crate::domain::model::Media;
use crate::domain::ports::EntityAdapter;
use crate::utils::error::Result;
use crate::utils::validation::{numeric_id, validate_url};
use serde_json::{json, Map, Value};
use std::fmt;

use super::{ITEMS, MEDIA};

pub const ITEM_KEY: &str = "o:item";
pub const INGESTER_KEY: &str = "o:ingester";
pub const FILE_INDEX_KEY: &str = "file_index";
pub const INGEST_URL_KEY: &str = "ingest_url";
pub const HTML_KEY: &str = "html";

/// How a media record gets its content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingester {
    /// A file sent along with the request, picked by `file_index`.
    Upload,
    /// A remote http(s) resource named by `ingest_url`.
    Url,
    /// Inline markup in `html`.
    Html,
}

impl Ingester {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "upload" => Some(Ingester::Upload),
            "url" => Some(Ingester::Url),
            "html" => Some(Ingester::Html),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Ingester::Upload => "upload",
            Ingester::Url => "url",
            Ingester::Html => "html",
        }
    }

    fn validate(&self, request: &Request, errors: &mut ErrorStore) {
        match self {
            Ingester::Upload => match request.value(FILE_INDEX_KEY).and_then(index_key) {
                None => errors.add_error(FILE_INDEX_KEY, "No file index was specified"),
                Some(index) if request.file(&index).is_none() => errors.add_error(
                    FILE_INDEX_KEY,
                    format!("No file was uploaded for index '{}'", index),
                ),
                Some(_) => {}
            },
            Ingester::Url => match request.value(INGEST_URL_KEY).and_then(Value::as_str) {
                None => errors.add_error(INGEST_URL_KEY, "No ingest URL was specified"),
                Some(url) => {
                    if let Err(e) = validate_url(INGEST_URL_KEY, url) {
                        errors.add_error(INGEST_URL_KEY, e.to_string());
                    }
                }
            },
            Ingester::Html => {
                if !request.value(HTML_KEY).is_some_and(Value::is_string) {
                    errors.add_error(HTML_KEY, "Media HTML must be a string");
                }
            }
        }
    }

    /// Source and original filename recorded for the new media.
    fn source(&self, request: &Request) -> (Option<String>, Option<String>) {
        match self {
            Ingester::Upload => {
                let file = request
                    .value(FILE_INDEX_KEY)
                    .and_then(index_key)
                    .and_then(|index| request.file(&index));
                let name = file.map(|f| f.name.clone());
                (name.clone(), name)
            }
            Ingester::Url => {
                let url = request
                    .value(INGEST_URL_KEY)
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let filename = url
                    .as_deref()
                    .and_then(|u| u.rsplit('/').next())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                (url, filename)
            }
            Ingester::Html => (None, None),
        }
    }
}

impl fmt::Display for Ingester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `file_index` may be sent as a string or a number.
fn index_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        other => numeric_id(other).map(|n| n.to_string()),
    }
}

/// Payload keys kept verbatim on the media: everything outside the reserved
/// `o:` namespace that is not a property term.
fn extra_data(content: &Map<String, Value>) -> Map<String, Value> {
    content
        .iter()
        .filter(|(key, _)| !key.starts_with("o:") && !key.starts_with('@'))
        .filter(|(key, _)| !is_property_term(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Media belong to exactly one item; ingester and source are fixed at creation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaAdapter;

impl EntityAdapter for MediaAdapter {
    type Entity = Media;

    fn resource_name(&self) -> &'static str {
        MEDIA
    }

    fn representation_class(&self) -> &'static str {
        "o:Media"
    }

    fn validate_request(&self, request: &Request, errors: &mut ErrorStore) {
        validate_resource_request(request, errors);

        if request.operation != Operation::Create {
            return;
        }

        if let Some(item) = request.value(ITEM_KEY) {
            if reference_id(item).is_none() {
                errors.add_error(ITEM_KEY, "Media item must be a reference to an item");
            }
        }

        match request.value(INGESTER_KEY).and_then(Value::as_str) {
            None => errors.add_error(INGESTER_KEY, "Media must have an ingester"),
            Some(name) => match Ingester::from_name(name) {
                Some(ingester) => ingester.validate(request, errors),
                None => errors.add_error(INGESTER_KEY, format!("Unknown ingester '{}'", name)),
            },
        }
    }

    fn hydrate(
        &self,
        ctx: &AdapterContext<'_>,
        request: &Request,
        media: &mut Media,
        _errors: &mut ErrorStore,
    ) -> Result<()> {
        hydrate_resource(request, &mut media.resource);

        if request.operation != Operation::Create {
            return Ok(());
        }

        if media.item_id.is_none() {
            if let Some(item_id) = request.value(ITEM_KEY).and_then(reference_id) {
                ctx.find_entity(ITEMS, item_id)?;
                media.item_id = Some(item_id);
            }
        }

        if let Some(ingester) = request
            .value(INGESTER_KEY)
            .and_then(Value::as_str)
            .and_then(Ingester::from_name)
        {
            let (source, filename) = ingester.source(request);
            media.ingester = Some(ingester.name().to_string());
            media.source = source;
            media.filename = filename;
        }
        media.data = extra_data(&request.content);

        tracing::debug!(
            "Hydrated new {} media for item {:?}",
            media.ingester.as_deref().unwrap_or("unknown"),
            media.item_id
        );
        Ok(())
    }

    fn validate_entity(&self, _ctx: &AdapterContext<'_>, media: &Media, errors: &mut ErrorStore) {
        if media.item_id.is_none() {
            errors.add_error(ITEM_KEY, "Media must belong to an item");
        }
    }

    fn build_query(&self, qb: &mut QueryBuilder, query: &Map<String, Value>) {
        build_resource_query(qb, query, self.sort_fields());

        if let Some(item_id) = query.get("item_id").and_then(numeric_id) {
            qb.and_where(Constraint::OwnedBy(item_id));
        }
    }

    fn represent(&self, ctx: &RepresentationContext, media: &Media) -> Result<Value> {
        let mut doc = ctx.resource_document(MEDIA, self.representation_class(), &media.resource);

        doc.insert(
            ITEM_KEY.to_string(),
            media
                .item_id
                .map(|id| ctx.reference(ITEMS, id))
                .unwrap_or(Value::Null),
        );
        doc.insert(INGESTER_KEY.to_string(), json!(media.ingester));
        doc.insert("o:source".to_string(), json!(media.source));
        doc.insert("o:filename".to_string(), json!(media.filename));
        if !media.data.is_empty() {
            doc.insert("data".to_string(), Value::Object(media.data.clone()));
        }

        Ok(Value::Object(doc))
    }
}
