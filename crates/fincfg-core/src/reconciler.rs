//! Reconciler: one declared entity against the remote API
//!
//! For a single entity the reconciler:
//!
//! 1. maps the declaration to a payload, resolving references,
//! 2. checks whether the entity exists remotely (natural key first, then
//!    fallback keys so renamed entities are updated, not duplicated),
//! 3. creates it, or fetches it, diffs it and updates it only when a field
//!    differs.
//!
//! At most one mutating call is issued per entity, and none in a dry run.

use fincfg_docs::{DeclaredEntity, lookup, value_text};
use fincfg_transport::{Remote, list_items, resource_id};
use serde_json::Value;

use crate::compare::diff_payload;
use crate::index::DeclaredIndex;
use crate::kinds::{KindConfig, KindTable};
use crate::mapper::{MapContext, MappingError, Payload};
use crate::outcome::{FailureReason, Outcome};
use crate::resolver::ReferenceResolver;
use crate::{Error, Result};

/// Generic reconciler driven by the kind table
pub struct Reconciler<'a> {
    remote: &'a dyn Remote,
    kinds: &'a KindTable,
    resolver: ReferenceResolver<'a>,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(remote: &'a dyn Remote, kinds: &'a KindTable, dry_run: bool) -> Self {
        Self {
            remote,
            kinds,
            resolver: ReferenceResolver::new(remote, kinds),
            dry_run,
        }
    }

    pub fn resolver_mut(&mut self) -> &mut ReferenceResolver<'a> {
        &mut self.resolver
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Bring one declared entity in line with the remote.
    ///
    /// # Errors
    ///
    /// Only run-fatal problems are errors: an unknown kind or an
    /// authentication failure. Everything else is a [`Outcome::Failed`].
    pub fn reconcile(&mut self, entity: &DeclaredEntity, index: &DeclaredIndex) -> Result<Outcome> {
        let config = self
            .kinds
            .get(&entity.kind)
            .copied()
            .ok_or_else(|| Error::UnknownKind {
                kind: entity.kind.clone(),
            })?;
        let key = config.key_of(entity).unwrap_or_else(|| entity.name.clone());

        match self.reconcile_kind(&config, entity, &key, index) {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_auth() => Err(err.into()),
            Err(err) => {
                tracing::error!(kind = config.kind, key = %key, "Remote call failed: {}", err);
                Ok(Outcome::failed(FailureReason::Transport {
                    message: err.to_string(),
                }))
            }
        }
    }

    fn reconcile_kind(
        &mut self,
        config: &KindConfig,
        entity: &DeclaredEntity,
        key: &str,
        index: &DeclaredIndex,
    ) -> fincfg_transport::Result<Outcome> {
        let mapped = {
            let mut ctx = MapContext::new(&mut self.resolver, index);
            (config.to_payload)(entity, &mut ctx)
        };
        let payload = match mapped {
            Ok(payload) => payload,
            Err(err) => return mapping_outcome(config, key, err, index),
        };

        match self.find_existing(config, entity)? {
            None => self.create(config, key, payload),
            Some(id) => self.update(config, key, id, payload),
        }
    }

    /// Remote ID of the entity, looked up by natural key then fallback keys
    fn find_existing(
        &self,
        config: &KindConfig,
        entity: &DeclaredEntity,
    ) -> fincfg_transport::Result<Option<i64>> {
        for key_field in std::iter::once(&config.identity).chain(config.fallback_keys) {
            let Some(value) = entity.text(key_field.declared) else {
                continue;
            };
            let encoded: String = url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
            let path = format!("{}?{}={}", config.endpoint, key_field.remote, encoded);

            let ids: Vec<i64> = list_items(self.remote.get(&path)?)
                .iter()
                .filter(|item| lookup(item, key_field.remote).and_then(value_text).as_deref() == Some(value.as_str()))
                .filter_map(|item| item.get("id").and_then(Value::as_i64))
                .collect();

            match ids.as_slice() {
                [] => continue,
                [id] => return Ok(Some(*id)),
                [id, ..] => {
                    tracing::warn!(
                        kind = config.kind,
                        "{} remote entities match {} '{}', using ID {}",
                        ids.len(),
                        key_field.remote,
                        value,
                        id
                    );
                    return Ok(Some(*id));
                }
            }
        }
        Ok(None)
    }

    fn create(&mut self, config: &KindConfig, key: &str, payload: Payload) -> fincfg_transport::Result<Outcome> {
        if self.dry_run {
            tracing::info!("[dry-run] Would create {} '{}'", config.kind, key);
            self.resolver.remember_planned(config, &payload);
            return Ok(Outcome::Created { id: None, dry_run: true });
        }

        let body = Value::Object(payload);
        let response = self.remote.post(config.endpoint, &body)?;
        let Some(id) = resource_id(&response) else {
            tracing::error!("Create of {} '{}' returned no resourceId", config.kind, key);
            return Ok(Outcome::failed(FailureReason::MissingResourceId));
        };

        if let Value::Object(payload) = &body {
            self.resolver.record(config, payload, id);
        }
        tracing::info!("Created {} '{}' (ID: {})", config.kind, key, id);
        Ok(Outcome::Created {
            id: Some(id),
            dry_run: false,
        })
    }

    fn update(
        &mut self,
        config: &KindConfig,
        key: &str,
        id: i64,
        payload: Payload,
    ) -> fincfg_transport::Result<Outcome> {
        let path = format!("{}/{}", config.endpoint, id);
        let remote = self.remote.get(&path)?;
        let changes = diff_payload(&payload, &remote, config);

        if changes.is_empty() {
            tracing::info!("No changes: {} '{}' (ID: {})", config.kind, key, id);
            return Ok(Outcome::SkippedUnchanged { id });
        }
        for change in &changes {
            tracing::debug!(
                kind = config.kind,
                key,
                field = %change.field,
                declared = %change.declared,
                remote = %change.remote,
                "Field differs"
            );
        }

        if self.dry_run {
            tracing::info!(
                "[dry-run] Would update {} '{}' (ID: {}): {} field(s)",
                config.kind,
                key,
                id,
                changes.len()
            );
            return Ok(Outcome::Updated {
                id,
                fields: changes,
                dry_run: true,
            });
        }

        self.remote.put(&path, &Value::Object(payload))?;
        tracing::info!("Updated {} '{}' (ID: {}): {} field(s)", config.kind, key, id, changes.len());
        Ok(Outcome::Updated {
            id,
            fields: changes,
            dry_run: false,
        })
    }
}

/// Outcome for an entity whose payload could not be built
fn mapping_outcome(
    config: &KindConfig,
    key: &str,
    err: MappingError,
    index: &DeclaredIndex,
) -> fincfg_transport::Result<Outcome> {
    match err {
        MappingError::UnresolvedReference { kind, key: target, .. } if index.is_pending(&kind, &target) => {
            let reference = format!("{} '{}'", kind, target);
            tracing::debug!("{} '{}' deferred until {} exists", config.kind, key, reference);
            Ok(Outcome::Deferred { reference })
        }
        MappingError::Lookup { source, .. } if source.is_auth() => Err(source),
        err => {
            tracing::error!("Cannot map {} '{}': {}", config.kind, key, err);
            Ok(Outcome::failed(FailureReason::Mapping {
                message: err.to_string(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::FieldChange;
    use fincfg_test_utils::FakeRemote;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn office(name: &str, spec: Value) -> DeclaredEntity {
        DeclaredEntity::new("Office", name, spec)
    }

    fn charge(amount: f64) -> DeclaredEntity {
        DeclaredEntity::new(
            "Charge",
            "processing-fee",
            json!({ "name": "Processing Fee", "currency": "XAF", "amount": amount }),
        )
    }

    fn seeded_charge(remote: &FakeRemote) -> i64 {
        remote.seed(
            "charges",
            json!({
                "name": "Processing Fee",
                "currency": { "code": "XAF", "decimalPlaces": 0 },
                "amount": 15.0,
                "chargeAppliesTo": { "id": 1, "code": "chargeAppliesTo.loan" },
                "chargeTimeType": { "id": 1 },
                "chargeCalculationType": { "id": 1 },
                "chargePaymentMode": { "id": 0 },
                "active": true,
                "penalty": false
            }),
        )
    }

    #[test]
    fn test_missing_entity_is_created() {
        let remote = FakeRemote::new();
        let kinds = KindTable::builtin();
        let mut reconciler = Reconciler::new(&remote, &kinds, false);

        let outcome = reconciler
            .reconcile(&office("head-office", json!({ "name": "Head Office" })), &DeclaredIndex::default())
            .unwrap();

        assert_eq!(outcome, Outcome::Created { id: Some(1), dry_run: false });
        assert_eq!(remote.posts(), 1);
        assert_eq!(remote.entities("offices")[0]["name"], json!("Head Office"));
    }

    #[test]
    fn test_values_within_epsilon_are_skipped() {
        let remote = FakeRemote::new();
        let id = seeded_charge(&remote);
        let kinds = KindTable::builtin();
        let mut reconciler = Reconciler::new(&remote, &kinds, false);

        let outcome = reconciler.reconcile(&charge(15.00001), &DeclaredIndex::default()).unwrap();

        assert_eq!(outcome, Outcome::SkippedUnchanged { id });
        assert_eq!(remote.posts() + remote.puts(), 0);
    }

    #[test]
    fn test_changed_field_triggers_one_put() {
        let remote = FakeRemote::new();
        let id = seeded_charge(&remote);
        let kinds = KindTable::builtin();
        let mut reconciler = Reconciler::new(&remote, &kinds, false);

        let outcome = reconciler.reconcile(&charge(20.0), &DeclaredIndex::default()).unwrap();

        assert_eq!(
            outcome,
            Outcome::Updated {
                id,
                fields: vec![FieldChange {
                    field: "amount".into(),
                    declared: json!(20.0),
                    remote: json!(15.0),
                }],
                dry_run: false,
            }
        );
        assert_eq!(remote.puts(), 1);
        assert_eq!(remote.posts(), 0);
    }

    #[test]
    fn test_dry_run_never_mutates() {
        let remote = FakeRemote::new();
        seeded_charge(&remote);
        let kinds = KindTable::builtin();
        let mut reconciler = Reconciler::new(&remote, &kinds, true);
        let index = DeclaredIndex::default();

        let updated = reconciler.reconcile(&charge(20.0), &index).unwrap();
        let created = reconciler
            .reconcile(&office("head-office", json!({ "name": "Head Office" })), &index)
            .unwrap();

        assert!(matches!(updated, Outcome::Updated { dry_run: true, .. }));
        assert_eq!(created, Outcome::Created { id: None, dry_run: true });
        assert_eq!(remote.posts() + remote.puts(), 0);
    }

    #[test]
    fn test_renamed_office_found_by_external_id() {
        let remote = FakeRemote::new();
        let id = remote.seed("offices", json!({ "name": "Nairobi", "externalId": "BR-NAI-001" }));
        let kinds = KindTable::builtin();
        let mut reconciler = Reconciler::new(&remote, &kinds, false);

        let outcome = reconciler
            .reconcile(
                &office("nairobi", json!({ "name": "Nairobi Branch", "externalId": "BR-NAI-001" })),
                &DeclaredIndex::default(),
            )
            .unwrap();

        assert!(matches!(outcome, Outcome::Updated { id: updated, .. } if updated == id));
        assert_eq!(remote.posts(), 0);
    }

    #[test]
    fn test_pending_reference_defers_unknown_reference_fails() {
        let remote = FakeRemote::new();
        let kinds = KindTable::builtin();
        let mut reconciler = Reconciler::new(&remote, &kinds, false);
        let mut index = DeclaredIndex::default();
        index.insert("Office", "Head Office", "head-office");

        let branch = office("branch", json!({ "name": "Branch", "parentOffice": "head-office" }));
        let deferred = reconciler.reconcile(&branch, &index).unwrap();
        assert_eq!(
            deferred,
            Outcome::Deferred {
                reference: "Office 'Head Office'".into()
            }
        );

        let orphan = office("orphan", json!({ "name": "Orphan", "parentOffice": "Nowhere" }));
        let failed = reconciler.reconcile(&orphan, &index).unwrap();
        assert!(matches!(
            failed,
            Outcome::Failed { reason: FailureReason::Mapping { .. } }
        ));
        assert_eq!(remote.posts(), 0);
    }

    #[test]
    fn test_missing_resource_id_fails() {
        let remote = FakeRemote::new();
        remote.omit_resource_id();
        let kinds = KindTable::builtin();
        let mut reconciler = Reconciler::new(&remote, &kinds, false);

        let outcome = reconciler
            .reconcile(&office("head-office", json!({ "name": "Head Office" })), &DeclaredIndex::default())
            .unwrap();

        assert_eq!(outcome, Outcome::failed(FailureReason::MissingResourceId));
    }

    #[test]
    fn test_transport_failure_is_per_entity_but_auth_aborts() {
        let remote = FakeRemote::new();
        remote.fail_path("offices", 500);
        let kinds = KindTable::builtin();
        let mut reconciler = Reconciler::new(&remote, &kinds, false);
        let entity = office("head-office", json!({ "name": "Head Office" }));

        let outcome = reconciler.reconcile(&entity, &DeclaredIndex::default()).unwrap();
        assert!(matches!(
            outcome,
            Outcome::Failed { reason: FailureReason::Transport { .. } }
        ));

        remote.fail_auth();
        let err = reconciler.reconcile(&entity, &DeclaredIndex::default()).unwrap_err();
        assert!(matches!(err, Error::Transport(ref e) if e.is_auth()));
    }
}
