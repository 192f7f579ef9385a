//! Correlation types and the caller-owned validation context
//!
//! The validator never interprets the contents of a [`ValidationContext`];
//! it only forwards it and stamps log events with the request id.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a single validation request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new random RequestId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (for deserialization)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trace identifier linking several validation requests together
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a new random TraceId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque pass-through bag handed to `validate_object` / `validate_recursive`
///
/// Callers put whatever cross-cutting data they need into `values`; the
/// validator carries it through untouched. `request_id` and `trace_id` are
/// only copied into log events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationContext {
    pub request_id: Option<RequestId>,
    pub trace_id: Option<TraceId>,
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
}

impl ValidationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a fresh RequestId
    pub fn with_new_request() -> Self {
        Self {
            request_id: Some(RequestId::new()),
            ..Self::default()
        }
    }

    /// Add a TraceId to the context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Store a caller-defined value under `key`
    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.values.insert(key.into(), value);
    }

    /// Look up a caller-defined value
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// Request id rendered for log fields ("-" when absent)
    pub fn request_id_str(&self) -> &str {
        self.request_id.as_ref().map(RequestId::as_str).unwrap_or("-")
    }

    /// Trace id rendered for log fields ("-" when absent)
    pub fn trace_id_str(&self) -> &str {
        self.trace_id.as_ref().map(TraceId::as_str).unwrap_or("-")
    }
}
