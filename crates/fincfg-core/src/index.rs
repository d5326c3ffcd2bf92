//! Index of the entities declared in the current run

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Natural keys and every other name of each declared entity, per kind.
///
/// Used to translate references (`metadata.name`, external ID, short name,
/// account name...) to natural keys and to decide whether an unresolved
/// reference may still appear later in the run (defer) or never will
/// (fail).
#[derive(Debug, Default, Clone)]
pub struct DeclaredIndex {
    keys: HashMap<String, HashSet<String>>,
    /// Alias to natural key; `None` once two entities claim the alias
    aliases: HashMap<String, HashMap<String, Option<String>>>,
    pending: HashSet<(String, String)>,
}

impl DeclaredIndex {
    /// Register a declared entity by natural key and document name
    pub fn insert(&mut self, kind: &str, key: &str, name: &str) {
        self.keys
            .entry(kind.to_string())
            .or_default()
            .insert(key.to_string());
        self.alias(kind, key, name);
        self.pending.insert((kind.to_string(), key.to_string()));
    }

    /// Register another value a reference may use for the entity `key`
    pub fn alias(&mut self, kind: &str, key: &str, alias: &str) {
        let aliases = self.aliases.entry(kind.to_string()).or_default();
        match aliases.entry(alias.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Some(key.to_string()));
            }
            Entry::Occupied(mut slot) => {
                if slot.get().as_deref() != Some(key) {
                    tracing::warn!("{} alias '{}' names more than one declared entity", kind, alias);
                    slot.insert(None);
                }
            }
        }
    }

    /// True if `key` is a declared natural key of `kind`
    pub fn contains(&self, kind: &str, key: &str) -> bool {
        self.keys.get(kind).is_some_and(|keys| keys.contains(key))
    }

    /// Natural key for a reference that may be a natural key or any alias.
    /// Natural keys win; shared aliases are left as given.
    pub fn canonical(&self, kind: &str, reference: &str) -> String {
        if self.contains(kind, reference) {
            return reference.to_string();
        }
        self.aliases
            .get(kind)
            .and_then(|aliases| aliases.get(reference))
            .and_then(Clone::clone)
            .unwrap_or_else(|| reference.to_string())
    }

    /// True while the entity may still be created in this run
    pub fn is_pending(&self, kind: &str, key: &str) -> bool {
        self.pending.contains(&(kind.to_string(), key.to_string()))
    }

    /// Mark an entity as terminally failed
    pub fn retire(&mut self, kind: &str, key: &str) {
        self.pending.remove(&(kind.to_string(), key.to_string()));
    }
}
