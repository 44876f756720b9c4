use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Collects field-level validation errors for a single request.
///
/// Adapters never fail on bad input; they record the problem here and the
/// caller rejects the request when the store is not empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorStore {
    errors: BTreeMap<String, Vec<String>>,
}

impl ErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(key.into())
            .or_default()
            .push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Total number of messages across all fields.
    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn errors_for(&self, key: &str) -> &[String] {
        self.errors.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.errors.keys().map(String::as_str)
    }

    /// 合併子請求的錯誤，欄位名稱加上前綴，例如 `o:media[1].o:ingester`
    pub fn merge_nested(&mut self, prefix: &str, nested: ErrorStore) {
        for (key, messages) in nested.errors {
            self.errors
                .entry(format!("{}.{}", prefix, key))
                .or_default()
                .extend(messages);
        }
    }
}

impl fmt::Display for ErrorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, messages) in &self.errors {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", key, message)?;
                first = false;
            }
        }
        Ok(())
    }
}
