use crate::domain::model::{EntityId, Resource};
use crate::utils::error::Result;
use serde_json::{json, Map, Value};
use url::Url;

/// Settings shared by every adapter when rendering JSON-LD documents.
#[derive(Debug, Clone, Default)]
pub struct RepresentationContext {
    base_url: Option<Url>,
}

impl RepresentationContext {
    pub fn new(base_url: Option<&str>) -> Result<Self> {
        let base_url = match base_url {
            Some(raw) => {
                let mut url = Url::parse(raw)?;
                // join() drops the last path segment unless it ends with a slash
                if !url.path().ends_with('/') {
                    let path = format!("{}/", url.path());
                    url.set_path(&path);
                }
                Some(url)
            }
            None => None,
        };
        Ok(Self { base_url })
    }

    pub fn resource_url(&self, resource_name: &str, id: EntityId) -> Option<String> {
        let base = self.base_url.as_ref()?;
        base.join(&format!("{}/{}", resource_name, id))
            .ok()
            .map(String::from)
    }

    pub fn search_url(&self, resource_name: &str, key: &str, id: EntityId) -> Option<String> {
        let base = self.base_url.as_ref()?;
        let mut url = base.join(resource_name).ok()?;
        url.query_pairs_mut().append_pair(key, &id.to_string());
        Some(url.into())
    }

    /// A `{"@id": .., "o:id": ..}` pointer to another resource.
    pub fn reference(&self, resource_name: &str, id: EntityId) -> Value {
        let mut reference = Map::new();
        if let Some(url) = self.resource_url(resource_name, id) {
            reference.insert("@id".to_string(), Value::String(url));
        }
        reference.insert("o:id".to_string(), json!(id));
        Value::Object(reference)
    }

    /// Common JSON-LD fields of a resource: identity, visibility, timestamps, values.
    pub fn resource_document(
        &self,
        resource_name: &str,
        representation_class: &str,
        resource: &Resource,
    ) -> Map<String, Value> {
        let mut doc = Map::new();
        if let Some(url) = resource
            .id
            .and_then(|id| self.resource_url(resource_name, id))
        {
            doc.insert("@id".to_string(), Value::String(url));
        }
        doc.insert("@type".to_string(), json!(representation_class));
        doc.insert("o:id".to_string(), json!(resource.id));
        doc.insert("o:is_public".to_string(), json!(resource.is_public));
        doc.insert(
            "o:created".to_string(),
            json!(resource.created.map(|t| t.to_rfc3339())),
        );
        doc.insert(
            "o:modified".to_string(),
            json!(resource.modified.map(|t| t.to_rfc3339())),
        );
        for (term, values) in &resource.values {
            doc.insert(term.clone(), json!(values));
        }
        doc
    }
}
