//! Per-request view of external session state.
//!
//! Session storage itself lives elsewhere; the issuance policy only needs a
//! key-value lookup over whatever the store resolved for the current request.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Session data as resolved by an external store for one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier
    pub id: String,

    /// Session data as key-value pairs
    pub data: HashMap<String, serde_json::Value>,
}

impl Session {
    /// Create an empty session with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: HashMap::new(),
        }
    }

    /// Typed lookup of a session value. A stored value of a different
    /// shape than `T` reads as absent.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in the session data.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.data.insert(key.to_string(), value);
        Ok(())
    }

    /// Remove a value from the session data.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Check if a key exists in the session data.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}
