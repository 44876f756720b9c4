use crate::adapters::memory_store::{Fixtures, InMemoryStore};
use crate::core::request::Request;
use crate::utils::error::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Deserialize)]
#[serde(untagged)]
enum RequestDocument {
    Many(Vec<Request>),
    One(Box<Request>),
}

/// 讀取請求檔：可以是單一請求或請求陣列
pub async fn load_requests<P: AsRef<Path>>(path: P) -> Result<Vec<Request>> {
    let content = tokio::fs::read_to_string(path).await?;
    parse_requests(&content)
}

pub fn parse_requests(content: &str) -> Result<Vec<Request>> {
    let requests = match serde_json::from_str(content)? {
        RequestDocument::Many(requests) => requests,
        RequestDocument::One(request) => vec![*request],
    };
    Ok(requests)
}

/// Builds the store from an optional fixtures file; no file means an empty store.
pub async fn load_store<P: AsRef<Path>>(fixtures: Option<P>) -> Result<InMemoryStore> {
    match fixtures {
        Some(path) => {
            let content = tokio::fs::read_to_string(path).await?;
            InMemoryStore::from_fixtures(Fixtures::from_json_str(&content)?)
        }
        None => Ok(InMemoryStore::new()),
    }
}
