//! Per-request session mapping.
//!
//! The cookie is the storage: a [`Session`] is decoded from the inbound
//! cookie, lives for one request, and is written back only if it differs from
//! the snapshot taken when it was loaded.

use std::fmt;

use serde_json::{Map, Value};

/// Reserved key holding the one-shot flash value.
pub const FLASH_KEY: &str = ":flash";

/// String keys to JSON values, plus the snapshot it was loaded from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    data: Map<String, Value>,
    initial: Map<String, Value>,
}

impl Session {
    /// An empty, unmodified session.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session whose snapshot is `data`.
    pub fn from_map(data: Map<String, Value>) -> Self {
        Self { initial: data.clone(), data }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// String value of `key`, if it holds a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pops the flash value. Readable exactly once.
    pub fn take_flash(&mut self) -> Option<Value> {
        self.data.remove(FLASH_KEY)
    }

    pub fn set_flash(&mut self, value: impl Into<Value>) {
        self.data.insert(FLASH_KEY.to_owned(), value.into());
    }

    /// `true` when the content differs structurally from the snapshot.
    pub fn is_modified(&self) -> bool {
        self.data != self.initial
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }
}

/// Renders as compact JSON.
impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Value::Object(self.data.clone()))
    }
}
