use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::entity::{EntityUid, qualify};
use super::entity_type::CedarType;
use super::policy::{CedarPolicy, ConditionKind, Effect};
use super::scope::Scope;
use crate::error::MapperError;
use crate::types::{ActionInfo, Condition, ConditionAction, Object, PolicyInfo, PolicySet};

static MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>[A-Za-z]+):(?P<id>.+)$").expect("member pattern")
});

const ANY: &str = "any";
const ANY_AUTHENTICATED: &str = "anyAuthenticated";
/// Marks a `forbid` produced from excluded actions.
const EXCLUDE: &str = "exclude";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CedarMapperConfig {
    /// Prefixed to every entity type (`PhotoApp::User`).
    pub namespace: Option<String>,
    /// Entity type of policy objects.
    pub resource_type: String,
}

impl Default for CedarMapperConfig {
    fn default() -> Self {
        CedarMapperConfig {
            namespace: None,
            resource_type: "Resource".to_string(),
        }
    }
}

/// Maps IDQL policies to Cedar policy trees and back.
///
/// One IDQL policy becomes one Cedar policy per subject member and effect. Everything
/// Cedar scopes cannot hold travels in annotations, so the reverse direction can fold
/// the split policies back together by their `id` annotation.
#[derive(Debug, Clone, Default)]
pub struct CedarMapper {
    config: CedarMapperConfig,
}

impl CedarMapper {
    pub fn new(config: CedarMapperConfig) -> Self {
        CedarMapper { config }
    }

    pub fn config(&self) -> &CedarMapperConfig {
        &self.config
    }

    fn qualify(&self, entity_type: &str) -> String {
        qualify(self.config.namespace.as_deref(), entity_type)
    }

    fn unqualify<'a>(&self, entity_type: &'a str) -> Option<&'a str> {
        match self.config.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => entity_type.strip_prefix(ns)?.strip_prefix("::"),
            _ => Some(entity_type),
        }
    }

    pub fn map_policies_to_cedar(
        &self,
        policies: &PolicySet,
    ) -> Result<Vec<CedarPolicy>, MapperError> {
        let mut out = Vec::new();
        for (index, policy) in policies.iter().enumerate() {
            let mapped = self.map_policy(policy)?;
            debug!(
                event = "CedarMap",
                phase = "Split",
                policy = policy.label(index),
                cedar_policies = mapped.len()
            );
            out.extend(mapped);
        }
        Ok(out)
    }

    fn map_policy(&self, policy: &PolicyInfo) -> Result<Vec<CedarPolicy>, MapperError> {
        let principals: Vec<Scope> = if policy.subject.members.is_empty() {
            vec![Scope::All]
        } else {
            policy
                .subject
                .members
                .iter()
                .map(|member| self.member_scope(member))
                .collect::<Result<_, _>>()?
        };

        let resource = match policy.object.as_ref().and_then(|o| o.asset_id.as_deref()) {
            Some(asset) => Scope::Eq(
                EntityUid::parse_literal(asset).unwrap_or_else(|| {
                    EntityUid::new(self.qualify(&self.config.resource_type), asset)
                }),
            ),
            None => Scope::All,
        };

        let deny = policy
            .condition
            .as_ref()
            .is_some_and(|c| c.action == ConditionAction::Deny);
        let included: Vec<&ActionInfo> = policy.included_actions().collect();
        let excluded: Vec<&ActionInfo> = policy.excluded_actions().collect();

        let mut groups: Vec<(Effect, Scope, bool)> = Vec::new();
        if !included.is_empty() || excluded.is_empty() {
            groups.push((Effect::from_permit(!deny), self.action_scope(&included), false));
        }
        if !excluded.is_empty() {
            groups.push((Effect::Forbid, self.action_scope(&excluded), true));
        }

        let annotations = annotations_for(policy);
        let mut out = Vec::with_capacity(principals.len() * groups.len());
        for principal in &principals {
            for (effect, action, exclusion) in &groups {
                let mut cedar =
                    CedarPolicy::new(*effect, principal.clone(), action.clone(), resource.clone());
                cedar.annotations = annotations.clone();
                if *exclusion {
                    cedar.annotate(EXCLUDE, "true");
                }
                out.push(cedar);
            }
        }
        Ok(out)
    }

    fn member_scope(&self, member: &str) -> Result<Scope, MapperError> {
        match member {
            ANY => return Ok(Scope::All),
            ANY_AUTHENTICATED => return Ok(Scope::Is(self.qualify(CedarType::User.as_ref()))),
            _ => {}
        }
        let captures = MEMBER.captures(member).ok_or_else(|| {
            MapperError::InvalidFormat(format!("member '{member}' has no type prefix"))
        })?;
        let cedar_type = CedarType::from_member_prefix(&captures["prefix"]).ok_or_else(|| {
            MapperError::InvalidFormat(format!(
                "member '{member}' has unknown type '{}'",
                &captures["prefix"]
            ))
        })?;
        let uid = EntityUid::new(self.qualify(cedar_type.as_ref()), &captures["id"]);
        Ok(if cedar_type.is_container() {
            Scope::In(uid)
        } else {
            Scope::Eq(uid)
        })
    }

    fn action_scope(&self, actions: &[&ActionInfo]) -> Scope {
        let action_type = self.qualify(CedarType::Action.as_ref());
        let mut uids = actions
            .iter()
            .map(|a| EntityUid::new(action_type.as_str(), a.identifier()))
            .collect::<Vec<_>>();
        match uids.len() {
            0 => Scope::All,
            1 => Scope::Eq(uids.remove(0)),
            _ => Scope::InSet(uids),
        }
    }

    /// Inverse of [`CedarMapper::map_policies_to_cedar`].
    ///
    /// Policies sharing an `id` annotation merge into one IDQL policy, unioning members
    /// and actions in first-encounter order. They must agree on everything else, and no
    /// action may be both granted and excluded; otherwise the merge fails with
    /// `MappingAmbiguity`.
    pub fn map_cedar_to_policies(
        &self,
        policies: &[CedarPolicy],
    ) -> Result<PolicySet, MapperError> {
        let mut out: Vec<PolicyInfo> = Vec::new();
        for cedar in policies {
            let info = self.policy_from_cedar(cedar)?;
            let existing = info
                .id
                .as_ref()
                .and_then(|id| out.iter_mut().find(|p| p.id.as_ref() == Some(id)));
            match existing {
                Some(existing) => merge(existing, info)?,
                None => out.push(info),
            }
        }
        debug!(
            event = "CedarMap",
            phase = "Merge",
            cedar_policies = policies.len(),
            policies = out.len()
        );
        Ok(PolicySet::new(out))
    }

    fn policy_from_cedar(&self, cedar: &CedarPolicy) -> Result<PolicyInfo, MapperError> {
        let mut info = PolicyInfo::default();
        let mut rule = None;
        let mut condition_action = None;
        let mut path_spec = None;
        let mut exclusion = false;

        for (key, value) in &cedar.annotations {
            match key.as_str() {
                "id" => info.id = Some(value.clone()),
                "subjectType" => info.subject.subject_type = Some(value.clone()),
                "providerId" => info.subject.provider_id = Some(value.clone()),
                "pathSpec" => path_spec = Some(value.clone()),
                "condition" => rule = Some(value.clone()),
                "conditionAction" => {
                    condition_action = Some(value.parse::<ConditionAction>().map_err(|_| {
                        MapperError::InvalidFormat(format!("condition action '{value}'"))
                    })?)
                }
                EXCLUDE => exclusion = value == "true",
                other => {
                    if !info.meta.set_field(other, value.as_str()) {
                        debug!(event = "CedarMap", phase = "Annotation", key = other, "ignored");
                    }
                }
            }
        }

        info.subject.members.push(self.scope_member(&cedar.principal)?);

        let exclude = cedar.effect == Effect::Forbid
            && (exclusion || condition_action != Some(ConditionAction::Deny));
        info.actions = self
            .scope_actions(&cedar.action)?
            .into_iter()
            .map(|id| {
                let action = ActionInfo::new(id.as_str(), id.as_str());
                if exclude { action.excluded() } else { action }
            })
            .collect();

        let asset_id = self.scope_asset(&cedar.resource)?;
        if asset_id.is_some() || path_spec.is_some() {
            info.object = Some(Object { asset_id, path_spec });
        }

        let rule = rule.or_else(|| render_conditions(cedar));
        info.condition =
            rule.map(|rule| Condition::new(rule, condition_action.unwrap_or_default()));
        Ok(info)
    }

    /// `All` reads back as `any`, so a policy with no members returns with `any`.
    ///
    /// Groups and domains are only accepted under `in`, other members only under `==`.
    fn scope_member(&self, scope: &Scope) -> Result<String, MapperError> {
        let (uid, membership) = match scope {
            Scope::All => return Ok(ANY.to_string()),
            Scope::Is(entity_type)
                if self.unqualify(entity_type) == Some(CedarType::User.as_ref()) =>
            {
                return Ok(ANY_AUTHENTICATED.to_string());
            }
            Scope::Eq(uid) => (uid, false),
            Scope::In(uid) => (uid, true),
            other => {
                return Err(MapperError::InvalidFormat(format!(
                    "principal scope {} has no member form",
                    other.to_json()
                )));
            }
        };
        let (cedar_type, prefix) = self
            .unqualify(uid.entity_type())
            .and_then(|t| t.parse::<CedarType>().ok())
            .and_then(|t| t.member_prefix().map(|prefix| (t, prefix)))
            .ok_or_else(|| {
                MapperError::InvalidFormat(format!("principal {uid} has no member type"))
            })?;
        if cedar_type.is_container() != membership {
            let op = if membership { "in" } else { "==" };
            return Err(MapperError::InvalidFormat(format!(
                "principal {op} {uid} has no member form"
            )));
        }
        Ok(format!("{prefix}:{}", uid.id()))
    }

    fn scope_actions(&self, scope: &Scope) -> Result<Vec<String>, MapperError> {
        let uids = match scope {
            Scope::All => return Ok(Vec::new()),
            Scope::Eq(uid) => std::slice::from_ref(uid),
            Scope::InSet(uids) => uids.as_slice(),
            other => {
                return Err(MapperError::InvalidFormat(format!(
                    "action scope {} has no action form",
                    other.to_json()
                )));
            }
        };
        uids.iter()
            .map(|uid| {
                if self.unqualify(uid.entity_type()) == Some(CedarType::Action.as_ref()) {
                    Ok(uid.id().to_string())
                } else {
                    Err(MapperError::InvalidFormat(format!("{uid} is not an action")))
                }
            })
            .collect()
    }

    /// Objects of the configured resource type keep their bare id; other types keep the
    /// full `Type::"id"` literal so the forward direction can restore them. A resource
    /// hierarchy (`resource in ...`) has no object form.
    fn scope_asset(&self, scope: &Scope) -> Result<Option<String>, MapperError> {
        match scope {
            Scope::All => Ok(None),
            Scope::Eq(uid) => {
                if uid.entity_type() == self.qualify(&self.config.resource_type) {
                    Ok(Some(uid.id().to_string()))
                } else {
                    Ok(Some(uid.to_string()))
                }
            }
            other => Err(MapperError::InvalidFormat(format!(
                "resource scope {} has no object form",
                other.to_json()
            ))),
        }
    }
}

fn annotations_for(policy: &PolicyInfo) -> Vec<(String, String)> {
    let mut annotations = Vec::new();
    let mut push =
        |key: &str, value: &str| annotations.push((key.to_string(), value.to_string()));
    if let Some(id) = &policy.id {
        push("id", id.as_str());
    }
    for (key, value) in policy.meta.fields() {
        push(key, value);
    }
    if let Some(subject_type) = &policy.subject.subject_type {
        push("subjectType", subject_type.as_str());
    }
    if let Some(provider_id) = &policy.subject.provider_id {
        push("providerId", provider_id.as_str());
    }
    if let Some(path_spec) = policy.object.as_ref().and_then(|o| o.path_spec.as_deref()) {
        push("pathSpec", path_spec);
    }
    if let Some(condition) = &policy.condition {
        push("condition", condition.rule.as_str());
        push("conditionAction", condition.action.to_string().as_str());
    }
    annotations
}

fn render_conditions(cedar: &CedarPolicy) -> Option<String> {
    let rendered: Vec<String> = cedar
        .conditions
        .iter()
        .map(|c| match c.kind {
            ConditionKind::When => c.body.to_string(),
            ConditionKind::Unless => format!("!({})", c.body),
        })
        .collect();
    match rendered.len() {
        0 => None,
        1 => rendered.into_iter().next(),
        _ => Some(rendered.iter().map(|r| format!("({r})")).join(" && ")),
    }
}

fn merge(existing: &mut PolicyInfo, other: PolicyInfo) -> Result<(), MapperError> {
    let id = existing.id.as_deref().unwrap_or_default();
    let disagrees = |field: &str| {
        MapperError::MappingAmbiguity(format!("policies with id '{id}' disagree on {field}"))
    };
    if existing.meta != other.meta {
        return Err(disagrees("meta"));
    }
    if existing.subject.subject_type != other.subject.subject_type
        || existing.subject.provider_id != other.subject.provider_id
    {
        return Err(disagrees("subject"));
    }
    if existing.object != other.object {
        return Err(disagrees("object"));
    }
    if existing.condition != other.condition {
        return Err(disagrees("condition"));
    }
    if let Some(action) = other.actions.iter().find(|a| {
        existing
            .actions
            .iter()
            .any(|e| e.identifier() == a.identifier() && e.exclude != a.exclude)
    }) {
        return Err(disagrees(&format!(
            "whether '{}' is granted",
            action.identifier()
        )));
    }

    for member in other.subject.members {
        if !existing.subject.members.contains(&member) {
            existing.subject.members.push(member);
        }
    }
    for action in other.actions {
        if !existing.actions.contains(&action) {
            existing.actions.push(action);
        }
    }
    Ok(())
}
