//! The seam between the reconciliation engine and the remote API

use serde_json::Value;

use crate::Result;

/// Header that selects the tenant on every call
pub const TENANT_HEADER: &str = "Fineract-Platform-TenantId";

/// Blocking JSON calls against the admin API.
///
/// Paths are relative to the API base, e.g. `offices` or `glaccounts/12`.
/// Implementations never panic on remote failure; every problem is
/// returned as a [`crate::Error`].
pub trait Remote {
    fn get(&self, path: &str) -> Result<Value>;

    fn post(&self, path: &str, body: &Value) -> Result<Value>;

    fn put(&self, path: &str, body: &Value) -> Result<Value>;
}

impl<R: Remote + ?Sized> Remote for &R {
    fn get(&self, path: &str) -> Result<Value> {
        (**self).get(path)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        (**self).post(path, body)
    }

    fn put(&self, path: &str, body: &Value) -> Result<Value> {
        (**self).put(path, body)
    }
}

/// Items of a listing response.
///
/// Listings come back either as a bare array or as `{"pageItems": [...]}`;
/// anything else is treated as an empty listing.
pub fn list_items(response: Value) -> Vec<Value> {
    match response {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("pageItems") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// `resourceId` of a create response, if present
pub fn resource_id(response: &Value) -> Option<i64> {
    response.get("resourceId").and_then(Value::as_i64)
}
