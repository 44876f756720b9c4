use crate::domain::model::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Search,
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Search => "search",
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// An uploaded file attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub name: String,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub size: u64,
}

/// Uploaded files keyed by their form index (`file_index` in media payloads).
pub type FileData = BTreeMap<String, UploadedFile>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub operation: Operation,
    pub resource: String,
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub content: Map<String, Value>,
    #[serde(default)]
    pub file_data: Option<FileData>,
    #[serde(default)]
    pub partial: bool,
}

impl Request {
    pub fn new(operation: Operation, resource: impl Into<String>) -> Self {
        Self {
            operation,
            resource: resource.into(),
            id: None,
            content: Map::new(),
            file_data: None,
            partial: false,
        }
    }

    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = Some(id);
        self
    }

    /// Non-object content is treated as an empty payload.
    pub fn with_content(mut self, content: Value) -> Self {
        self.content = match content {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self
    }

    pub fn with_file_data(mut self, file_data: Option<FileData>) -> Self {
        self.file_data = file_data;
        self
    }

    pub fn partial(mut self, partial: bool) -> Self {
        self.partial = partial;
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.content.get(key)
    }

    /// The array stored under `key`, or an empty slice when absent or not an array.
    pub fn array_value(&self, key: &str) -> &[Value] {
        match self.content.get(key) {
            Some(Value::Array(values)) => values,
            _ => &[],
        }
    }

    pub fn file(&self, index: &str) -> Option<&UploadedFile> {
        self.file_data.as_ref().and_then(|files| files.get(index))
    }

    /// 部分更新時只處理請求中帶有的欄位
    pub fn should_hydrate(&self, key: &str) -> bool {
        if self.operation == Operation::Update && self.partial {
            return self.content.contains_key(key);
        }
        true
    }

    /// Builds a nested request that inherits this request's file data.
    pub fn subrequest(
        &self,
        operation: Operation,
        resource: impl Into<String>,
        content: Map<String, Value>,
    ) -> Request {
        Request {
            operation,
            resource: resource.into(),
            id: None,
            content,
            file_data: self.file_data.clone(),
            partial: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub operation: Operation,
    pub resource: String,
    pub content: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_results: Option<usize>,
}

impl Response {
    pub fn new(operation: Operation, resource: impl Into<String>, content: Value) -> Self {
        Self {
            operation,
            resource: resource.into(),
            content,
            total_results: None,
        }
    }

    pub fn with_total_results(mut self, total: usize) -> Self {
        self.total_results = Some(total);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_should_hydrate_on_partial_update() {
        let request = Request::new(Operation::Update, "items")
            .with_id(1)
            .with_content(json!({"o:is_public": false}))
            .partial(true);

        assert!(request.should_hydrate("o:is_public"));
        assert!(!request.should_hydrate("o:item_set"));
    }

    #[test]
    fn test_should_hydrate_on_full_requests() {
        let create = Request::new(Operation::Create, "items");
        assert!(create.should_hydrate("o:item_set"));

        // partial 只影響 update
        let partial_create = Request::new(Operation::Create, "items").partial(true);
        assert!(partial_create.should_hydrate("o:media"));
    }

    #[test]
    fn test_subrequest_inherits_file_data() {
        let mut files = FileData::new();
        files.insert(
            "0".to_string(),
            UploadedFile {
                name: "photo.jpg".to_string(),
                media_type: Some("image/jpeg".to_string()),
                size: 1024,
            },
        );
        let request = Request::new(Operation::Update, "items").with_file_data(Some(files));
        let mut content = Map::new();
        content.insert("o:ingester".to_string(), json!("upload"));

        let sub = request.subrequest(Operation::Create, "media", content);
        assert_eq!(sub.operation, Operation::Create);
        assert_eq!(sub.resource, "media");
        assert_eq!(sub.file("0").map(|f| f.name.as_str()), Some("photo.jpg"));
    }

    #[test]
    fn test_request_from_json() {
        let request: Request = serde_json::from_value(json!({
            "operation": "update",
            "resource": "items",
            "id": 5,
            "content": {"o:item_set": [1, 2]},
            "partial": true
        }))
        .unwrap();

        assert_eq!(request.operation, Operation::Update);
        assert_eq!(request.id, Some(5));
        assert_eq!(request.array_value("o:item_set").len(), 2);
        assert!(request.array_value("o:media").is_empty());
    }
}
