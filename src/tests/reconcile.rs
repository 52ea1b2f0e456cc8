use crate::reconcile::DifKind;
use crate::types::{Condition, ConditionAction, PolicyInfo, PolicySet};

use super::data;

fn edited() -> PolicySet {
    let mut policies = data().into_inner();
    policies.retain(|p| p.id.as_deref() != Some("frontend"));
    if let Some(orders) = policies.iter_mut().find(|p| p.id.as_deref() == Some("orders")) {
        orders.condition = Some(Condition::new("req.ip sw 10.0.", ConditionAction::Allow));
    }
    let mut audit = policies[0].clone();
    audit.id = Some("audit".to_string());
    audit.subject.members = vec!["user:auditor@example.com".to_string()];
    policies.push(audit);
    PolicySet::new(policies)
}

#[test]
fn test_reconcile_edited_data() {
    let difs = data().reconcile(&edited(), false);
    let kinds: Vec<DifKind> = difs.iter().map(|d| d.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            DifKind::Equal,
            DifKind::Equal,
            DifKind::Removed,
            DifKind::Changed,
            DifKind::Added,
        ]
    );
}

#[test]
fn test_reconcile_report_json() {
    let difs = data().reconcile(&edited(), true);
    insta::assert_json_snapshot!(difs, @r#"
    [
      {
        "index": 2,
        "kind": "removed",
        "report": "Removed: policy 'frontend' is no longer present"
      },
      {
        "index": 3,
        "kind": "changed",
        "fieldDiffs": [
          "condition"
        ],
        "report": "Changed: policy 'orders' differs in condition"
      },
      {
        "index": 3,
        "kind": "added",
        "report": "Added: policy 'audit' is new"
      }
    ]
    "#);
}

#[test]
fn test_regenerated_bindings_lose_ids() {
    let mapper = crate::bindings::GcpBindMapper::default();
    let assignments = mapper.map_policies_to_bindings(&data()).unwrap();
    let regenerated = mapper.map_binding_assignments_to_policy(&assignments).unwrap();
    let difs = data().reconcile(&regenerated, true);
    assert!(difs.iter().all(|d| d.kind() != DifKind::Equal));
    assert!(regenerated.iter().all(|p: &PolicyInfo| p.id.is_none()));
}
