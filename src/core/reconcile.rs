//! Add/retain/remove reconciliation of a record's relations against a payload.

use crate::domain::model::EntityId;
use crate::utils::error::Result;
use crate::utils::validation::numeric_id;
use serde_json::Value;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: Vec<EntityId>,
    pub retained: Vec<EntityId>,
    pub removed: Vec<EntityId>,
    /// Newly created records that have no identifier yet.
    pub created: usize,
}

/// Identifier of a payload reference: `{"o:id": N}` or a bare `N`.
pub fn reference_id(entry: &Value) -> Option<EntityId> {
    match entry {
        Value::Object(map) => map.get("o:id").and_then(numeric_id),
        other => numeric_id(other),
    }
}

/// Reconciles a many-to-many membership set with the references in `entries`.
///
/// Ids not yet in `members` are resolved through `fetch` before being added;
/// the first failing fetch aborts. Entries without a usable id are skipped.
/// Members that the payload does not reference are removed.
pub fn reconcile_membership<F>(
    members: &mut BTreeSet<EntityId>,
    entries: &[Value],
    mut fetch: F,
) -> Result<ReconcileSummary>
where
    F: FnMut(EntityId) -> Result<()>,
{
    let mut summary = ReconcileSummary::default();
    let mut to_retain = BTreeSet::new();

    for id in entries.iter().filter_map(reference_id) {
        if !members.contains(&id) {
            fetch(id)?;
            members.insert(id);
            summary.added.push(id);
        } else if !to_retain.contains(&id) {
            summary.retained.push(id);
        }
        to_retain.insert(id);
    }

    summary.removed = members.difference(&to_retain).copied().collect();
    members.retain(|id| to_retain.contains(id));

    Ok(summary)
}

/// Reconciles an owned has-many collection.
///
/// Existing records survive only when their id is in `retained_ids`; records
/// without an id that were not created in this pass are dropped. The `created`
/// records are appended after the survivors.
pub fn reconcile_owned<T, F>(
    current: &mut Vec<T>,
    retained_ids: &BTreeSet<EntityId>,
    created: Vec<T>,
    id_of: F,
) -> ReconcileSummary
where
    F: Fn(&T) -> Option<EntityId>,
{
    let mut summary = ReconcileSummary::default();

    current.retain(|record| match id_of(record) {
        Some(id) if retained_ids.contains(&id) => {
            summary.retained.push(id);
            true
        }
        Some(id) => {
            summary.removed.push(id);
            false
        }
        None => false,
    });

    summary.created = created.len();
    current.extend(created);

    summary
}
