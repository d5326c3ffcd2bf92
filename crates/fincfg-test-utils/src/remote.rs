//! [`FakeRemote`]: an in-memory stand-in for the admin API.
//!
//! Collections are keyed by their endpoint (`offices`, `glaccounts`, ...).
//! Ids are assigned per collection starting at 1, the same way a fresh
//! tenant hands them out.
//!
//! Supported calls:
//!
//! - `GET coll` and `GET coll?query`: the whole collection as an array
//!   (queries are ignored, callers filter client-side)
//! - `GET coll/id`: one entity, or a 404
//! - `POST coll`: stores the body, returns `{"resourceId": id}`
//! - `PUT coll/id`: merges the body, returns `{"resourceId": id, "changes": body}`
//!
//! Stored entities are kept exactly as posted, so kinds whose remote shape
//! differs from their payload shape will not look unchanged on a re-run.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use fincfg_transport::{Error, Remote, Result};
use serde_json::{Value, json};

#[derive(Default)]
struct State {
    collections: BTreeMap<String, Vec<Value>>,
    next_ids: HashMap<String, i64>,
    failures: HashMap<String, u16>,
    auth_failure: bool,
    omit_resource_id: bool,
    calls: Vec<String>,
}

impl State {
    fn next_id(&mut self, collection: &str) -> i64 {
        let next = self.next_ids.entry(collection.to_string()).or_insert(1);
        let id = *next;
        *next += 1;
        id
    }

    fn store(&mut self, collection: &str, mut entity: Value) -> i64 {
        let id = self.next_id(collection);
        if let Some(map) = entity.as_object_mut() {
            map.insert("id".into(), json!(id));
        }
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(entity);
        id
    }

    fn find_mut(&mut self, collection: &str, id: i64) -> Option<&mut Value> {
        self.collections
            .get_mut(collection)?
            .iter_mut()
            .find(|entity| entity["id"].as_i64() == Some(id))
    }

    /// Record the call and apply injected failures
    fn enter(&mut self, method: &str, path: &str) -> Result<()> {
        self.calls.push(format!("{method} {path}"));
        if self.auth_failure {
            return Err(Error::auth("token rejected"));
        }
        if let Some(status) = self.failures.get(strip_query(path)) {
            return Err(status_error(method, path, *status, "injected failure"));
        }
        Ok(())
    }
}

/// In-memory admin API implementing [`Remote`]
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<State>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity directly, bypassing call accounting.
    ///
    /// Returns the assigned id.
    pub fn seed(&self, collection: &str, entity: Value) -> i64 {
        self.state.lock().unwrap().store(collection, entity)
    }

    /// Current contents of one collection
    pub fn entities(&self, collection: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every call to `path` (query stripped) fail with `status`
    pub fn fail_path(&self, path: &str, status: u16) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(path.to_string(), status);
    }

    /// Make every subsequent call fail authentication
    pub fn fail_auth(&self) {
        self.state.lock().unwrap().auth_failure = true;
    }

    /// Answer creates with `{}` and store nothing
    pub fn omit_resource_id(&self) {
        self.state.lock().unwrap().omit_resource_id = true;
    }

    /// Every call received, as `"METHOD path"`, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn gets(&self) -> usize {
        self.count("GET")
    }

    pub fn posts(&self) -> usize {
        self.count("POST")
    }

    pub fn puts(&self) -> usize {
        self.count("PUT")
    }

    fn count(&self, method: &str) -> usize {
        let prefix = format!("{method} ");
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| call.starts_with(&prefix))
            .count()
    }
}

impl Remote for FakeRemote {
    fn get(&self, path: &str) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.enter("GET", path)?;

        match split_path(path) {
            (collection, None) => Ok(Value::Array(
                state.collections.get(collection).cloned().unwrap_or_default(),
            )),
            (collection, Some(id)) => state
                .find_mut(collection, id)
                .map(|entity| entity.clone())
                .ok_or_else(|| status_error("GET", path, 404, "not found")),
        }
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.enter("POST", path)?;

        if state.omit_resource_id {
            return Ok(json!({}));
        }
        let (collection, _) = split_path(path);
        let id = state.store(collection, body.clone());
        Ok(json!({ "resourceId": id }))
    }

    fn put(&self, path: &str, body: &Value) -> Result<Value> {
        let mut state = self.state.lock().unwrap();
        state.enter("PUT", path)?;

        let (collection, Some(id)) = split_path(path) else {
            return Err(status_error("PUT", path, 405, "method not allowed"));
        };
        let entity = state
            .find_mut(collection, id)
            .ok_or_else(|| status_error("PUT", path, 404, "not found"))?;
        if let (Some(target), Some(changes)) = (entity.as_object_mut(), body.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(json!({ "resourceId": id, "changes": body }))
    }
}

fn strip_query(path: &str) -> &str {
    path.split_once('?').map_or(path, |(base, _)| base)
}

/// `coll/12` becomes `("coll", Some(12))`; anything after a non-numeric
/// segment is ignored
fn split_path(path: &str) -> (&str, Option<i64>) {
    let base = strip_query(path);
    match base.rsplit_once('/') {
        Some((collection, last)) => match last.parse() {
            Ok(id) => (collection, Some(id)),
            Err(_) => (base, None),
        },
        None => (base, None),
    }
}

fn status_error(method: &str, path: &str, status: u16, body: &str) -> Error {
    Error::Status {
        method: method.to_string(),
        url: format!("fake://{path}"),
        status,
        body: body.to_string(),
    }
}
