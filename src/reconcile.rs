//! Policy set reconciliation.
//!
//! Two policies are the same logical policy when both carry an id and the ids match, or,
//! when either lacks an id, when their subjects, actions and objects match ignoring
//! order. Matched pairs are then compared field by field.

use itertools::Itertools;
use serde::Serialize;
use strum_macros::{Display, EnumString};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::types::{ActionInfo, Object, PolicyInfo, PolicySet, Subject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DifKind {
    Equal,
    Added,
    Removed,
    Changed,
}

/// The parts of a policy a `changed` entry can name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    ToSchema,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PolicyField {
    Id,
    Meta,
    Subject,
    Actions,
    Object,
    Condition,
}

/// One classified policy. `index` points into the source set, or into the compare set for
/// `added` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDif {
    index: usize,
    kind: DifKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    field_diffs: Vec<PolicyField>,
    report: String,
}

impl PolicyDif {
    fn new(
        index: usize,
        kind: DifKind,
        policy: &PolicyInfo,
        field_diffs: Vec<PolicyField>,
    ) -> Self {
        let label = policy.label(index);
        let report = match kind {
            DifKind::Equal => format!("Equal: policy {label} is unchanged"),
            DifKind::Added => format!("Added: policy {label} is new"),
            DifKind::Removed => format!("Removed: policy {label} is no longer present"),
            DifKind::Changed => format!(
                "Changed: policy {label} differs in {}",
                field_diffs.iter().join(", ")
            ),
        };
        PolicyDif {
            index,
            kind,
            field_diffs,
            report,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> DifKind {
        self.kind
    }

    pub fn field_diffs(&self) -> &[PolicyField] {
        &self.field_diffs
    }

    pub fn report(&self) -> &str {
        &self.report
    }
}

#[derive(PartialEq, Eq)]
struct StructuralKey {
    subject: Subject,
    actions: Vec<ActionInfo>,
    object: Option<Object>,
}

fn sorted_actions(policy: &PolicyInfo) -> Vec<ActionInfo> {
    policy.actions.iter().cloned().sorted().collect()
}

fn structural_key(policy: &PolicyInfo) -> StructuralKey {
    StructuralKey {
        subject: policy.subject.normalized(),
        actions: sorted_actions(policy),
        object: policy.object.clone(),
    }
}

fn same_policy(source: &PolicyInfo, compare: &PolicyInfo) -> bool {
    match (&source.id, &compare.id) {
        (Some(a), Some(b)) => a == b,
        _ => structural_key(source) == structural_key(compare),
    }
}

fn field_diffs(source: &PolicyInfo, compare: &PolicyInfo) -> Vec<PolicyField> {
    let mut diffs = Vec::new();
    if source.id != compare.id {
        diffs.push(PolicyField::Id);
    }
    if source.meta != compare.meta {
        diffs.push(PolicyField::Meta);
    }
    if source.subject.normalized() != compare.subject.normalized() {
        diffs.push(PolicyField::Subject);
    }
    if sorted_actions(source) != sorted_actions(compare) {
        diffs.push(PolicyField::Actions);
    }
    if source.object != compare.object {
        diffs.push(PolicyField::Object);
    }
    if source.condition != compare.condition {
        diffs.push(PolicyField::Condition);
    }
    diffs
}

/// Classify every policy of `source` against `compare`.
///
/// Source entries come first in source order, then `added` entries in compare order. With
/// `diff_only`, `equal` entries are left out.
pub fn reconcile_policies(
    source: &PolicySet,
    compare: &PolicySet,
    diff_only: bool,
) -> Vec<PolicyDif> {
    let compare = compare.policies();
    let mut used = vec![false; compare.len()];
    let mut difs = Vec::with_capacity(source.len() + compare.len());

    for (index, policy) in source.iter().enumerate() {
        let candidates: Vec<usize> = compare
            .iter()
            .enumerate()
            .filter(|(i, other)| !used[*i] && same_policy(policy, other))
            .map(|(i, _)| i)
            .collect();
        let chosen = candidates
            .iter()
            .copied()
            .find(|&i| field_diffs(policy, &compare[i]).is_empty())
            .or_else(|| candidates.first().copied());

        let dif = match chosen {
            Some(i) => {
                used[i] = true;
                let diffs = field_diffs(policy, &compare[i]);
                if diffs.is_empty() {
                    PolicyDif::new(index, DifKind::Equal, policy, diffs)
                } else {
                    PolicyDif::new(index, DifKind::Changed, policy, diffs)
                }
            }
            None => PolicyDif::new(index, DifKind::Removed, policy, Vec::new()),
        };
        debug!(event = "Reconcile", phase = "Classify", kind = %dif.kind, report = dif.report);
        difs.push(dif);
    }

    for (index, policy) in compare.iter().enumerate().filter(|(i, _)| !used[*i]) {
        let dif = PolicyDif::new(index, DifKind::Added, policy, Vec::new());
        debug!(event = "Reconcile", phase = "Classify", kind = %dif.kind, report = dif.report);
        difs.push(dif);
    }

    let count = |kind: DifKind| difs.iter().filter(|d| d.kind == kind).count();
    info!(
        event = "Reconcile",
        phase = "Summary",
        equal = count(DifKind::Equal),
        changed = count(DifKind::Changed),
        removed = count(DifKind::Removed),
        added = count(DifKind::Added)
    );

    if diff_only {
        difs.retain(|d| d.kind != DifKind::Equal);
    }
    difs
}

impl PolicySet {
    /// Reconcile this set (the source) against `compare`. See [`reconcile_policies`].
    pub fn reconcile(&self, compare: &PolicySet, diff_only: bool) -> Vec<PolicyDif> {
        reconcile_policies(self, compare, diff_only)
    }
}
