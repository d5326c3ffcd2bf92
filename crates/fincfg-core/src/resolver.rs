//! Reference resolution against the remote API
//!
//! Each kind is listed once, in bulk, and every reference variant of every
//! remote entity (name, code, external ID...) is indexed in that pass. A
//! key that is still missing after the first listing triggers one more
//! live listing before the reference is declared unresolved, so entities
//! created moments ago by the same run are found.

use std::collections::{HashMap, HashSet};

use fincfg_docs::{lookup, value_text};
use fincfg_transport::{Remote, list_items};
use serde_json::Value;
use tracing::debug;

use crate::kinds::{KindConfig, KindTable};
use crate::mapper::{Payload, ResolveReference, Resolution};

/// Placeholder ID for entities a dry run would have created
pub const PLANNED_ID: i64 = 0;

type KeyIndex = HashMap<String, Vec<i64>>;

/// Caching resolver owned by one run
pub struct ReferenceResolver<'a> {
    remote: &'a dyn Remote,
    kinds: &'a KindTable,
    cache: HashMap<String, KeyIndex>,
    planned: HashMap<(String, String), i64>,
    listings: usize,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(remote: &'a dyn Remote, kinds: &'a KindTable) -> Self {
        Self {
            remote,
            kinds,
            cache: HashMap::new(),
            planned: HashMap::new(),
            listings: 0,
        }
    }

    /// Drop and repopulate the cache for one kind
    pub fn refresh(&mut self, kind: &str) -> fincfg_transport::Result<()> {
        self.cache.remove(kind);
        if let Some(config) = self.kinds.get(kind).copied() {
            self.populate(&config)?;
        }
        Ok(())
    }

    /// Remember a just-created entity under every reference key its payload
    /// carries. Kinds not listed yet are left alone; their first listing
    /// will include the entity.
    pub fn record(&mut self, config: &KindConfig, payload: &Payload, id: i64) {
        let Some(index) = self.cache.get_mut(config.kind) else {
            return;
        };
        for key in payload_keys(config, payload) {
            let ids = index.entry(key).or_default();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    /// Remember an entity a dry run would have created
    pub fn remember_planned(&mut self, config: &KindConfig, payload: &Payload) {
        for key in payload_keys(config, payload) {
            self.planned.insert((config.kind.to_string(), key), PLANNED_ID);
        }
    }

    /// Number of bulk listings issued so far
    pub fn listings(&self) -> usize {
        self.listings
    }

    fn populate(&mut self, config: &KindConfig) -> fincfg_transport::Result<()> {
        let items = list_items(self.remote.get(config.endpoint)?);
        self.listings += 1;

        let mut index = KeyIndex::new();
        for item in &items {
            let Some(id) = item.get("id").and_then(Value::as_i64) else {
                continue;
            };
            for field in config.reference_fields {
                if let Some(key) = lookup(item, field).and_then(value_text) {
                    let ids = index.entry(key).or_default();
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }

        debug!(
            kind = config.kind,
            entities = items.len(),
            keys = index.len(),
            "Populated reference cache"
        );
        self.cache.insert(config.kind.to_string(), index);
        Ok(())
    }

    fn cached(&self, kind: &str, key: &str) -> Option<&[i64]> {
        self.cache
            .get(kind)
            .and_then(|index| index.get(key))
            .map(Vec::as_slice)
    }
}

impl ResolveReference for ReferenceResolver<'_> {
    fn resolve(&mut self, kind: &str, key: &str) -> fincfg_transport::Result<Resolution> {
        let Some(config) = self.kinds.get(kind).copied() else {
            return Ok(Resolution::Unresolved);
        };

        if !self.cache.contains_key(kind) {
            self.populate(&config)?;
        }

        // A miss always earns one more live listing, even straight after
        // the first one.
        if self.cached(kind, key).is_none() {
            debug!(kind, key, "Reference not cached, listing again");
            self.populate(&config)?;
        }

        match self.cached(kind, key) {
            Some([id]) => Ok(Resolution::Found(*id)),
            Some(ids) if !ids.is_empty() => {
                let mut ids = ids.to_vec();
                ids.sort_unstable();
                Ok(Resolution::Ambiguous(ids))
            }
            _ => Ok(self
                .planned
                .get(&(kind.to_string(), key.to_string()))
                .map(|id| Resolution::Found(*id))
                .unwrap_or(Resolution::Unresolved)),
        }
    }
}

fn payload_keys(config: &KindConfig, payload: &Payload) -> HashSet<String> {
    config
        .reference_fields
        .iter()
        .filter_map(|field| payload.get(*field).and_then(value_text))
        .collect()
}
