use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::MapperError;
use crate::types::{ActionInfo, ConditionAction, Object, PolicyInfo, PolicySet, Subject};

use super::binding::BindAssignment;
use super::role_table::RoleTable;

/// Maps IDQL policies to GCP-style role bindings and back.
///
/// Forward, policies are grouped by the resource their object names; every included
/// action contributes the policy's members to the role the action maps to. Reverse,
/// every `(role, member)` pair of a resource becomes one policy.
#[derive(Debug, Clone)]
pub struct GcpBindMapper {
    roles: RoleTable,
}

impl Default for GcpBindMapper {
    fn default() -> Self {
        GcpBindMapper::new(RoleTable::gcp())
    }
}

impl GcpBindMapper {
    pub fn new(roles: RoleTable) -> Self {
        GcpBindMapper { roles }
    }

    pub fn role_table(&self) -> &RoleTable {
        &self.roles
    }

    /// Group policies into one assignment per resource, in first-encounter order.
    ///
    /// Roles within an assignment are unique and keep first-encounter order, as do the
    /// members of each role. Policies that only exclude actions, deny on a condition or
    /// name no resource produce no binding; see [`GcpBindMapper::unmappable_policies`].
    pub fn map_policies_to_bindings(
        &self,
        policies: &PolicySet,
    ) -> Result<Vec<BindAssignment>, MapperError> {
        let mut assignments: Vec<BindAssignment> = Vec::new();

        for (index, policy) in policies.iter().enumerate() {
            if let Some(reason) = unrepresentable(policy) {
                warn!(
                    event = "BindMap",
                    phase = "Dropped",
                    policy = policy.label(index),
                    reason,
                    "policy cannot be expressed as role bindings"
                );
                continue;
            }
            if let Some(condition) = &policy.condition {
                warn!(
                    event = "BindMap",
                    phase = "InformationLoss",
                    policy = policy.label(index),
                    rule = condition.rule,
                    "condition is not carried into role bindings"
                );
            }
            for action in policy.excluded_actions() {
                warn!(
                    event = "BindMap",
                    phase = "InformationLoss",
                    policy = policy.label(index),
                    action = action.identifier(),
                    "excluded action is not carried into role bindings"
                );
            }

            let mut roles: Vec<String> = Vec::new();
            for action in policy.included_actions() {
                let role = self
                    .roles
                    .role_for_action(action.identifier())
                    .ok_or_else(|| MapperError::UnmappedAction(action.identifier().to_string()))?;
                if !roles.contains(&role) {
                    roles.push(role);
                }
            }
            if roles.is_empty() {
                continue;
            }

            let resource_id = policy.resource_id();
            let position = match assignments.iter().position(|a| a.resource_id == resource_id) {
                Some(position) => position,
                None => {
                    assignments.push(BindAssignment::new(resource_id));
                    assignments.len() - 1
                }
            };
            let assignment = &mut assignments[position];

            for role in &roles {
                let binding = assignment.binding_mut(role);
                for member in &policy.subject.members {
                    binding.add_member(member);
                }
            }
        }

        for assignment in &assignments {
            debug!(
                event = "BindMap",
                phase = "Assignment",
                resource = assignment.resource_id,
                roles = assignment.bindings.len()
            );
        }
        Ok(assignments)
    }

    /// Expand assignments into one policy per distinct `(role, member)` pair of each resource.
    ///
    /// Fails with `UnknownRole` when a role has no action mapping.
    pub fn map_binding_assignments_to_policy(
        &self,
        assignments: &[BindAssignment],
    ) -> Result<PolicySet, MapperError> {
        let mut policies = Vec::new();

        for assignment in assignments {
            let object = (!assignment.resource_id.is_empty())
                .then(|| Object::with_asset(assignment.resource_id.as_str()));
            let mut seen: HashSet<(&str, &str)> = HashSet::new();

            for binding in &assignment.bindings {
                let actions: Vec<ActionInfo> = self
                    .roles
                    .actions_for_role(&binding.role)?
                    .into_iter()
                    .map(|action| ActionInfo::new(binding.role.as_str(), action))
                    .collect();

                for member in &binding.members {
                    if !seen.insert((binding.role.as_str(), member.as_str())) {
                        continue;
                    }
                    policies.push(PolicyInfo {
                        subject: Subject::new([member.as_str()]),
                        actions: actions.clone(),
                        object: object.clone(),
                        ..Default::default()
                    });
                }
            }
            debug!(
                event = "BindMap",
                phase = "Expanded",
                resource = assignment.resource_id,
                policies = policies.len()
            );
        }

        Ok(PolicySet::new(policies))
    }

    /// Policies the binding model cannot represent at all. Integrations should report
    /// these to the operator before pushing bindings.
    pub fn unmappable_policies<'a>(&self, policies: &'a PolicySet) -> Vec<&'a PolicyInfo> {
        policies
            .iter()
            .filter(|p| unrepresentable(p).is_some())
            .collect()
    }
}

/// Why a policy has no role-binding form, if it has none.
///
/// A binding only grants, so a denying condition would be dropped into a grant.
fn unrepresentable(policy: &PolicyInfo) -> Option<&'static str> {
    if policy.is_wholly_excluded() {
        Some("only excludes actions")
    } else if policy
        .condition
        .as_ref()
        .is_some_and(|c| c.action == ConditionAction::Deny)
    {
        Some("denies on a condition")
    } else if policy.resource_id().is_empty() {
        Some("names no resource")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::role_table::GCP_ACTION_PREFIX;
    use crate::types::Condition;
    use yare::parameterized;

    const ACCESSOR: &str = "roles/iap.httpsResourceAccessor";
    const ADMIN: &str = "roles/iap.admin";

    fn policy(member: &str, action_uris: &[impl AsRef<str>], resource: &str) -> PolicyInfo {
        PolicyInfo {
            subject: Subject::new([member]),
            actions: action_uris
                .iter()
                .map(|uri| ActionInfo::new("access", uri.as_ref()))
                .collect(),
            object: Some(Object::with_asset(resource)),
            ..Default::default()
        }
    }

    fn gcp(role: &str) -> String {
        format!("{GCP_ACTION_PREFIX}{role}")
    }

    fn four_on_one_resource() -> PolicySet {
        PolicySet::new(vec![
            policy("user:alice@example.com", &[gcp(ACCESSOR)], "backend-1"),
            policy("user:bob@example.com", &[gcp(ACCESSOR)], "backend-1"),
            policy("user:carol@example.com", &[gcp(ADMIN)], "backend-1"),
            policy("group:ops@example.com", &[gcp(ACCESSOR)], "backend-1"),
        ])
    }

    #[test]
    fn test_four_policies_one_resource() {
        let mapper = GcpBindMapper::default();
        let assignments = mapper.map_policies_to_bindings(&four_on_one_resource()).unwrap();

        assert_eq!(assignments.len(), 1);
        let assignment = &assignments[0];
        assert_eq!(assignment.resource_id, "backend-1");
        let roles: Vec<&str> = assignment.bindings.iter().map(|b| b.role.as_str()).collect();
        assert_eq!(roles, vec![ACCESSOR, ADMIN]);
        assert_eq!(
            assignment.binding(ACCESSOR).unwrap().members,
            vec!["user:alice@example.com", "user:bob@example.com", "group:ops@example.com"]
        );

        let back = mapper.map_binding_assignments_to_policy(&assignments).unwrap();
        assert_eq!(back.len(), 4);
        for p in &back {
            assert_eq!(p.resource_id(), "backend-1");
            assert_eq!(p.subject.members.len(), 1);
        }
    }

    #[test]
    fn test_resources_in_first_encounter_order() {
        let policies = PolicySet::new(vec![
            policy("user:a", &[gcp(ACCESSOR)], "backend-2"),
            policy("user:b", &[gcp(ACCESSOR)], "backend-1"),
            policy("user:c", &[gcp(ACCESSOR)], "backend-2"),
        ]);
        let assignments = GcpBindMapper::default()
            .map_policies_to_bindings(&policies)
            .unwrap();
        let resources: Vec<&str> = assignments.iter().map(|a| a.resource_id.as_str()).collect();
        assert_eq!(resources, vec!["backend-2", "backend-1"]);
        assert_eq!(assignments[0].bindings[0].members, vec!["user:a", "user:c"]);
    }

    #[test]
    fn test_duplicate_members_are_merged() {
        let policies = PolicySet::new(vec![
            policy("user:a", &[gcp(ACCESSOR)], "backend-1"),
            policy("user:a", &[gcp(ACCESSOR)], "backend-1"),
        ]);
        let mapper = GcpBindMapper::default();
        let assignments = mapper.map_policies_to_bindings(&policies).unwrap();
        assert_eq!(assignments[0].bindings.len(), 1);
        assert_eq!(assignments[0].bindings[0].members, vec!["user:a"]);
        assert_eq!(mapper.map_binding_assignments_to_policy(&assignments).unwrap().len(), 1);
    }

    #[test]
    fn test_wholly_excluded_policy_produces_no_assignment() {
        let mut denied = policy("user:a", &[gcp(ACCESSOR)], "backend-9");
        denied.actions = denied.actions.into_iter().map(ActionInfo::excluded).collect();
        let policies =
            PolicySet::new(vec![denied, policy("user:b", &[gcp(ADMIN)], "backend-1")]);

        let mapper = GcpBindMapper::default();
        let assignments = mapper.map_policies_to_bindings(&policies).unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].resource_id, "backend-1");

        let unmappable = mapper.unmappable_policies(&policies);
        assert_eq!(unmappable.len(), 1);
        assert_eq!(unmappable[0].resource_id(), "backend-9");
    }

    #[test]
    fn test_partially_excluded_policy_keeps_included_roles() {
        let mut p = policy("user:a", &[gcp(ACCESSOR), gcp(ADMIN)], "backend-1");
        p.actions[1].exclude = true;
        p.condition = Some(Condition::new("req.ip sw 10.", ConditionAction::Audit));
        let assignments = GcpBindMapper::default()
            .map_policies_to_bindings(&PolicySet::new(vec![p]))
            .unwrap();
        let roles: Vec<&str> = assignments[0].bindings.iter().map(|b| b.role.as_str()).collect();
        assert_eq!(roles, vec![ACCESSOR]);
    }

    #[parameterized(
        deny_condition = { Some(ConditionAction::Deny), Some(Object::with_asset("backend-9")) },
        no_object = { None, None },
        object_without_asset = { None, Some(Object::default()) },
        allow_condition_without_resource = { Some(ConditionAction::Allow), None },
    )]
    fn test_unbindable_policy_is_dropped(
        condition: Option<ConditionAction>,
        object: Option<Object>,
    ) {
        let mut dropped = policy("user:mallory", &[gcp(ACCESSOR)], "unused");
        dropped.condition = condition.map(|action| Condition::new("req.ip sw 10.", action));
        dropped.object = object;
        let policies =
            PolicySet::new(vec![dropped, policy("user:b", &[gcp(ADMIN)], "backend-1")]);

        let mapper = GcpBindMapper::default();
        let assignments = mapper.map_policies_to_bindings(&policies).unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].resource_id, "backend-1");
        assert!(
            assignments
                .iter()
                .flat_map(|a| &a.bindings)
                .all(|b| !b.members.iter().any(|m| m == "user:mallory"))
        );

        let unmappable = mapper.unmappable_policies(&policies);
        assert_eq!(unmappable.len(), 1);
        assert_eq!(unmappable[0].subject.members, vec!["user:mallory"]);
    }

    #[test]
    fn test_allowing_condition_keeps_binding() {
        let mut p = policy("user:a", &[gcp(ACCESSOR)], "backend-1");
        p.condition = Some(Condition::new("req.ip sw 10.", ConditionAction::Allow));
        let mapper = GcpBindMapper::default();
        let policies = PolicySet::new(vec![p]);
        let assignments = mapper.map_policies_to_bindings(&policies).unwrap();
        assert_eq!(assignments[0].bindings[0].members, vec!["user:a"]);
        assert!(mapper.unmappable_policies(&policies).is_empty());
    }

    #[test]
    fn test_empty_member_set_is_emitted() {
        let mut p = policy("user:a", &[gcp(ACCESSOR)], "backend-1");
        p.subject = Subject::default();
        let mapper = GcpBindMapper::default();
        let assignments = mapper.map_policies_to_bindings(&PolicySet::new(vec![p])).unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].bindings[0].role, ACCESSOR);
        assert!(assignments[0].bindings[0].members.is_empty());

        let back = mapper.map_binding_assignments_to_policy(&assignments).unwrap();
        assert!(back.is_empty());
    }

    #[test]
    fn test_unmapped_action() {
        let policies = PolicySet::new(vec![policy("user:a", &["http:GET"], "backend-1")]);
        let result = GcpBindMapper::default().map_policies_to_bindings(&policies);
        assert_eq!(result, Err(MapperError::UnmappedAction("http:GET".to_string())));
    }

    #[test]
    fn test_table_roles_expand_to_all_actions() {
        let table =
            RoleTable::new([("http:GET", "roles/viewer"), ("http:HEAD", "roles/viewer")]).unwrap();
        let mapper = GcpBindMapper::new(table);
        let policies = PolicySet::new(vec![policy(
            "user:a",
            &["http:GET", "http:HEAD"],
            "backend-1",
        )]);

        let assignments = mapper.map_policies_to_bindings(&policies).unwrap();
        assert_eq!(assignments[0].bindings.len(), 1);

        let back = mapper.map_binding_assignments_to_policy(&assignments).unwrap();
        assert_eq!(back.len(), 1);
        let uris: Vec<&str> = back.policies()[0]
            .actions
            .iter()
            .map(|a| a.action_uri.as_str())
            .collect();
        assert_eq!(uris, vec!["http:GET", "http:HEAD"]);
    }

    #[test]
    fn test_reverse_unknown_role() {
        let mapper = GcpBindMapper::new(RoleTable::default());
        let mut assignment = BindAssignment::new("backend-1");
        assignment.binding_mut("roles/owner").add_member("user:a");
        assert_eq!(
            mapper.map_binding_assignments_to_policy(&[assignment]),
            Err(MapperError::UnknownRole("roles/owner".to_string()))
        );
    }

    #[test]
    fn test_reverse_lone_binding_has_no_object() {
        let mut assignment = BindAssignment::new("");
        assignment.binding_mut(ACCESSOR).add_member("user:a");
        let back = GcpBindMapper::default()
            .map_binding_assignments_to_policy(&[assignment])
            .unwrap();
        assert_eq!(back.len(), 1);
        assert!(back.policies()[0].object.is_none());
        assert_eq!(back.policies()[0].actions[0].action_uri, gcp(ACCESSOR));
    }

    #[test]
    fn test_reverse_merges_repeated_roles() {
        let assignment = BindAssignment {
            resource_id: "backend-1".to_string(),
            bindings: vec![
                crate::bindings::Binding {
                    role: ACCESSOR.to_string(),
                    members: vec!["user:a".to_string(), "user:b".to_string()],
                },
                crate::bindings::Binding {
                    role: ACCESSOR.to_string(),
                    members: vec!["user:b".to_string()],
                },
            ],
        };
        let back = GcpBindMapper::default()
            .map_binding_assignments_to_policy(&[assignment])
            .unwrap();
        assert_eq!(back.len(), 2);
    }
}
