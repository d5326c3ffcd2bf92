//! Dependency-ordered loading
//!
//! Entities are reconciled in kind-table order, then by source path.
//! Entities whose parent is of their own kind (sub-offices, child ledger
//! accounts) wait for a later pass, as do entities deferred because a
//! reference was declared but not yet created. Each later pass retries the
//! carried set until it is empty, stops shrinking, or the pass budget runs
//! out; whatever is left fails as an unresolved dependency.

use std::collections::{BTreeSet, HashMap};

use fincfg_docs::{Corpus, DeclaredEntity, InvalidDocument, normalize};
use fincfg_transport::Remote;
use uuid::Uuid;

use crate::Result;
use crate::index::DeclaredIndex;
use crate::kinds::KindTable;
use crate::outcome::{FailureReason, Outcome};
use crate::reconciler::Reconciler;
use crate::summary::{EntityResult, IgnoredDocument, Summary};

/// Default pass budget, pass 0 included
pub const DEFAULT_MAX_PASSES: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    pub max_passes: usize,
    pub dry_run: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            dry_run: false,
        }
    }
}

/// A validated entity ready for reconciliation
pub(crate) struct Planned {
    pub(crate) entity: DeclaredEntity,
    pub(crate) key: String,
}

/// Multi-pass loader over one reconciler
pub struct Loader<'a> {
    reconciler: Reconciler<'a>,
    kinds: &'a KindTable,
    options: LoaderOptions,
    run_id: Uuid,
}

impl<'a> Loader<'a> {
    pub fn new(remote: &'a dyn Remote, kinds: &'a KindTable, options: LoaderOptions) -> Self {
        Self {
            reconciler: Reconciler::new(remote, kinds, options.dry_run),
            kinds,
            options,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    /// Load a whole corpus; unparseable documents count as failures.
    ///
    /// # Errors
    ///
    /// Returns an error only for run-fatal conditions (authentication).
    pub fn load_corpus(&mut self, corpus: &Corpus) -> Result<Summary> {
        let mut summary = self.load_all(corpus.entities())?;
        let invalid = corpus.invalid().iter().map(invalid_result);
        summary.results.splice(0..0, invalid);
        Ok(summary)
    }

    /// Reconcile a set of declared entities in dependency order.
    ///
    /// # Errors
    ///
    /// Returns an error only for run-fatal conditions (authentication).
    pub fn load_all(&mut self, entities: &[DeclaredEntity]) -> Result<Summary> {
        let span = tracing::info_span!("apply", run_id = %self.run_id);
        let _guard = span.enter();

        let mut summary = Summary::new(self.run_id, self.options.dry_run);
        let (planned, mut index) = prepare(self.kinds, entities, &mut summary);

        let (first, mut carried): (Vec<usize>, Vec<usize>) = (0..planned.len()).partition(|&i| {
            self.kinds
                .get(&planned[i].entity.kind)
                .and_then(|config| config.parent_of(&planned[i].entity))
                .is_none()
        });

        let mut waiting_on: HashMap<usize, String> = carried
            .iter()
            .filter_map(|&i| {
                let entity = &planned[i].entity;
                let config = self.kinds.get(&entity.kind)?;
                let parent = config.parent_of(entity)?;
                Some((i, format!("{} '{}'", entity.kind, index.canonical(&entity.kind, &parent))))
            })
            .collect();

        let max_passes = self.options.max_passes.max(1);
        let mut created_last: BTreeSet<String> = BTreeSet::new();
        let mut batch = first;

        for pass in 0..max_passes {
            if pass > 0 {
                if carried.is_empty() {
                    break;
                }
                for kind in std::mem::take(&mut created_last) {
                    if let Err(err) = self.reconciler.resolver_mut().refresh(&kind) {
                        if err.is_auth() {
                            return Err(err.into());
                        }
                        tracing::warn!("Could not refresh {} references: {}", kind, err);
                    }
                }
                batch = std::mem::take(&mut carried);
                batch.sort_unstable();
            }

            tracing::info!("=> Pass {} ({} entities)", pass, batch.len());
            summary.passes = pass + 1;

            let attempted = batch.len();
            let mut deferred = Vec::new();
            for i in batch.drain(..) {
                let item = &planned[i];
                let outcome = self.reconciler.reconcile(&item.entity, &index)?;
                match outcome {
                    Outcome::Deferred { reference } => {
                        waiting_on.insert(i, reference);
                        deferred.push(i);
                    }
                    outcome => {
                        if outcome.is_failed() {
                            index.retire(&item.entity.kind, &item.key);
                        }
                        if matches!(outcome, Outcome::Created { dry_run: false, .. }) {
                            created_last.insert(item.entity.kind.clone());
                        }
                        summary.results.push(result(item, outcome, pass));
                    }
                }
            }

            if pass == 0 {
                carried.extend(deferred);
                continue;
            }

            let stalled = deferred.len() == attempted;
            carried = deferred;
            if stalled {
                tracing::warn!("No progress in pass {}, {} entities unresolved", pass, carried.len());
                break;
            }
        }

        carried.sort_unstable();
        for i in carried {
            let item = &planned[i];
            let reference = waiting_on
                .remove(&i)
                .unwrap_or_else(|| format!("{} '{}'", item.entity.kind, item.key));
            tracing::error!(
                "{} '{}' failed: unresolved dependency {}",
                item.entity.kind,
                item.key,
                reference
            );
            index.retire(&item.entity.kind, &item.key);
            summary.results.push(result(
                item,
                Outcome::failed(FailureReason::UnresolvedDependency { reference }),
                summary.passes.saturating_sub(1),
            ));
        }

        let kinds = self.kinds;
        summary
            .results
            .sort_by_key(|r| (kinds.position(&r.kind).unwrap_or(usize::MAX), r.source.clone()));

        let counts = summary.counts();
        tracing::info!(
            created = counts.created,
            updated = counts.updated,
            unchanged = counts.unchanged,
            failed = counts.failed,
            passes = summary.passes,
            "Load finished"
        );
        Ok(summary)
    }
}

fn result(item: &Planned, outcome: Outcome, pass: usize) -> EntityResult {
    EntityResult {
        kind: item.entity.kind.clone(),
        key: item.key.clone(),
        source: item.entity.source.clone(),
        outcome,
        pass,
    }
}

/// Order, validate and de-duplicate the declared entities, then index
/// their keys.
///
/// Invalid and duplicate declarations are recorded as failures on
/// `summary`.
pub(crate) fn prepare(
    kinds: &KindTable,
    entities: &[DeclaredEntity],
    summary: &mut Summary,
) -> (Vec<Planned>, DeclaredIndex) {
    let mut known: Vec<(usize, &DeclaredEntity)> = Vec::new();
    for entity in entities {
        match kinds.position(&entity.kind) {
            Some(position) => known.push((position, entity)),
            None => {
                tracing::warn!("Ignoring {} '{}': unknown kind", entity.kind, entity.name);
                summary.ignored.push(IgnoredDocument {
                    kind: entity.kind.clone(),
                    name: entity.name.clone(),
                    source: entity.source.clone(),
                });
            }
        }
    }
    // Stable, so documents sharing a file keep their order
    known.sort_by(|(a, x), (b, y)| (a, &x.source).cmp(&(b, &y.source)));

    let mut planned = Vec::new();
    let mut first_source: HashMap<(String, String), String> = HashMap::new();

    for (_, entity) in known {
        let Some(config) = kinds.get(&entity.kind) else {
            continue;
        };

        let normalized = match normalize(entity, config.fields) {
            Ok(normalized) => normalized,
            Err(violations) => {
                let messages: Vec<String> = violations.iter().map(ToString::to_string).collect();
                tracing::error!("{} is invalid: {}", entity.source_ref(), messages.join("; "));
                summary.results.push(EntityResult {
                    kind: entity.kind.clone(),
                    key: entity.name.clone(),
                    source: entity.source.clone(),
                    outcome: Outcome::failed(FailureReason::Invalid { messages }),
                    pass: 0,
                });
                continue;
            }
        };

        // Every schema requires its key, so this only falls back in theory
        let key = config.key_of(&normalized).unwrap_or_else(|| entity.name.clone());
        let slot = (entity.kind.clone(), key.clone());
        if let Some(first) = first_source.get(&slot) {
            tracing::error!(
                "{} '{}' is declared twice ({} and {})",
                entity.kind,
                key,
                first,
                entity.source_ref()
            );
            summary.results.push(EntityResult {
                kind: entity.kind.clone(),
                key: key.clone(),
                source: entity.source.clone(),
                outcome: Outcome::failed(FailureReason::DuplicateKey {
                    key,
                    first: first.clone(),
                }),
                pass: 0,
            });
            continue;
        }
        first_source.insert(slot, entity.source_ref());

        planned.push(Planned {
            entity: normalized,
            key,
        });
    }

    let mut index = DeclaredIndex::default();
    for item in &planned {
        index.insert(&item.entity.kind, &item.key, &item.entity.name);
        if let Some(config) = kinds.get(&item.entity.kind) {
            for alias in config.aliases_of(&item.entity) {
                index.alias(&item.entity.kind, &item.key, &alias);
            }
        }
    }
    (planned, index)
}

pub(crate) fn invalid_result(doc: &InvalidDocument) -> EntityResult {
    EntityResult {
        kind: doc.kind.clone().unwrap_or_else(|| "?".to_string()),
        key: doc
            .name
            .clone()
            .unwrap_or_else(|| doc.source.display().to_string()),
        source: doc.source.clone(),
        outcome: Outcome::failed(FailureReason::Invalid {
            messages: doc.reasons.clone(),
        }),
        pass: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fincfg_test_utils::FakeRemote;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn office(name: &str, display: &str, parent: Option<&str>) -> DeclaredEntity {
        let mut spec = json!({ "name": display });
        if let Some(parent) = parent {
            spec["parentOffice"] = json!(parent);
        }
        DeclaredEntity::new("Office", name, spec).with_source(format!("offices/{}.yaml", name))
    }

    #[test]
    fn test_kind_order_beats_file_order() {
        let remote = FakeRemote::new();
        let kinds = KindTable::builtin();
        let mut loader = Loader::new(&remote, &kinds, LoaderOptions::default());

        let entities = vec![
            DeclaredEntity::new("Role", "teller", json!({ "name": "Teller" })).with_source("a/teller.yaml"),
            office("head-office", "Head Office", None),
        ];
        let summary = loader.load_all(&entities).unwrap();

        let posted: Vec<String> = remote
            .calls()
            .into_iter()
            .filter(|call| call.starts_with("POST"))
            .collect();
        assert_eq!(posted, vec!["POST offices", "POST roles"]);
        assert_eq!(summary.passes, 1);
        assert_eq!(summary.counts().created, 2);
    }

    #[test]
    fn test_parent_cycle_fails_both() {
        let remote = FakeRemote::new();
        let kinds = KindTable::builtin();
        let mut loader = Loader::new(&remote, &kinds, LoaderOptions::default());

        let entities = vec![
            office("a", "A", Some("b")),
            office("b", "B", Some("a")),
        ];
        let summary = loader.load_all(&entities).unwrap();

        assert_eq!(summary.counts().failed, 2);
        for result in &summary.results {
            assert!(matches!(
                result.outcome,
                Outcome::Failed {
                    reason: FailureReason::UnresolvedDependency { .. }
                }
            ));
        }
        assert_eq!(remote.posts(), 0);
        assert_eq!(summary.passes, 2);
    }

    #[test]
    fn test_failed_parent_fails_children_without_waiting() {
        let remote = FakeRemote::new();
        remote.omit_resource_id();
        let kinds = KindTable::builtin();
        let mut loader = Loader::new(&remote, &kinds, LoaderOptions::default());

        let entities = vec![
            office("head-office", "Head Office", None),
            office("branch", "Branch", Some("head-office")),
        ];
        let summary = loader.load_all(&entities).unwrap();

        let branch = summary.result("Office", "Branch").unwrap();
        assert!(matches!(
            branch.outcome,
            Outcome::Failed {
                reason: FailureReason::Mapping { .. }
            }
        ));
        assert_eq!(branch.pass, 1);
    }

    #[test]
    fn test_invalid_and_duplicate_and_unknown_documents() {
        let remote = FakeRemote::new();
        let kinds = KindTable::builtin();
        let mut loader = Loader::new(&remote, &kinds, LoaderOptions::default());

        let entities = vec![
            office("one", "Head Office", None),
            office("two", "Head Office", None),
            DeclaredEntity::new("Office", "nameless", json!({ "externalId": "X" })),
            DeclaredEntity::new("Client", "someone", json!({ "name": "Someone" })),
        ];
        let summary = loader.load_all(&entities).unwrap();

        assert_eq!(summary.ignored.len(), 1);
        assert_eq!(summary.counts().created, 1);
        assert_eq!(summary.counts().failed, 2);
        assert!(summary.results.iter().any(|r| matches!(
            r.outcome,
            Outcome::Failed {
                reason: FailureReason::DuplicateKey { .. }
            }
        )));
        assert_eq!(remote.posts(), 1);
    }

    #[test]
    fn test_pass_budget_is_enforced() {
        let remote = FakeRemote::new();
        let kinds = KindTable::builtin();
        let options = LoaderOptions {
            max_passes: 2,
            dry_run: false,
        };
        let mut loader = Loader::new(&remote, &kinds, options);

        // b sorts after c, so each pass settles one level
        let entities = vec![
            office("a", "A", None),
            office("b", "B", Some("a")),
            office("c", "C", Some("b")),
        ];
        let mut entities = entities;
        entities[1].source = "offices/z-b.yaml".into();
        let summary = loader.load_all(&entities).unwrap();

        assert_eq!(summary.passes, 2);
        assert!(summary.result("Office", "B").unwrap().outcome.is_created());
        assert!(matches!(
            summary.result("Office", "C").unwrap().outcome,
            Outcome::Failed {
                reason: FailureReason::UnresolvedDependency { ref reference }
            } if reference == "Office 'B'"
        ));
    }

    #[test]
    fn test_dry_run_plans_dependents() {
        let remote = FakeRemote::new();
        let kinds = KindTable::builtin();
        let options = LoaderOptions {
            max_passes: 5,
            dry_run: true,
        };
        let mut loader = Loader::new(&remote, &kinds, options);

        let entities = vec![
            office("head-office", "Head Office", None),
            office("branch", "Branch", Some("head-office")),
        ];
        let summary = loader.load_all(&entities).unwrap();

        assert_eq!(summary.counts().created, 2);
        assert!(summary.dry_run);
        assert_eq!(remote.posts(), 0);
    }
}
