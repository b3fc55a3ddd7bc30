//! Group membership resource.
//!
//! Fields: `group`, `member`, `type` (`user`, `group` or `service`,
//! default `user`) and `manager`. The identifier is `group:member`. Every
//! field is fixed at creation; a change means delete and create.

use super::{
    absent_on_not_found, collect_invalid, Diagnostic, Diagnostics, Reconciler, ResourceData,
    ResourceKind,
};
use crate::freeipa::api_client::IpaClient;
use crate::freeipa::error::{IpaError, IpaResult};
use crate::freeipa::types::{GroupMember, MemberKind, MemberOutcome};
use crate::freeipa::validation;
use log::warn;
use serde_json::json;

pub const GROUP: &str = "group";
pub const MEMBER: &str = "member";
pub const TYPE: &str = "type";
pub const MANAGER: &str = "manager";

const FIELDS: [&str; 4] = [GROUP, MEMBER, TYPE, MANAGER];

pub struct GroupMembershipResource;

pub fn membership_id(group: &str, member: &str) -> String {
    format!("{}:{}", group, member)
}

impl GroupMembershipResource {
    /// Member type, `user` when unset.
    pub fn member_kind(data: &ResourceData) -> IpaResult<MemberKind> {
        match data.get_str(TYPE).as_str() {
            "" => Ok(MemberKind::User),
            other => other.parse(),
        }
    }

    pub fn member(data: &ResourceData) -> IpaResult<GroupMember> {
        Ok(GroupMember::new(Self::member_kind(data)?, data.get_str(MEMBER)))
    }
}

fn check_outcome(group: &str, outcome: MemberOutcome) -> IpaResult<()> {
    if outcome.is_rejected() {
        return Err(IpaError::MembershipRejected {
            group: group.to_string(),
            reasons: outcome.reasons(),
        });
    }
    Ok(())
}

#[async_trait::async_trait]
impl Reconciler for GroupMembershipResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::GroupMembership
    }

    fn validate(&self, data: &ResourceData) -> Diagnostics {
        let mut results = vec![
            validation::not_whitespace(GROUP, &data.get_str(GROUP)),
            validation::not_whitespace(MEMBER, &data.get_str(MEMBER)),
        ];
        let kind = data.get_str(TYPE);
        if !kind.is_empty() {
            results.push(validation::member_type(TYPE, &kind));
        }
        let mut diagnostics = collect_invalid(results);
        if data.get_bool(MANAGER) && kind == MemberKind::Service.as_str() {
            diagnostics.push(Diagnostic::error(
                "Invalid group membership",
                "A service cannot be a manager of a group",
            ));
        }
        diagnostics
    }

    /// `group:member`, with the member type defaulting to `user`.
    fn import(&self, id: &str) -> IpaResult<ResourceData> {
        let (group, member) = id
            .split_once(':')
            .filter(|(g, m)| !g.is_empty() && !m.is_empty())
            .ok_or_else(|| {
                IpaError::InvalidArgument(format!(
                    "membership id '{}' must look like group:member",
                    id
                ))
            })?;

        let mut data = ResourceData::import(id);
        data.set(GROUP, json!(group));
        data.set(MEMBER, json!(member));
        data.set(TYPE, json!(MemberKind::User.as_str()));
        data.set(MANAGER, json!(false));
        Ok(data)
    }

    async fn create(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        let group = data.get_str(GROUP);
        let member = Self::member(data)?;

        let outcome = if data.get_bool(MANAGER) {
            client.group_add_member_manager(&group, &member).await?
        } else {
            client.group_add_member(&group, &member).await?
        };
        check_outcome(&group, outcome)?;

        data.set_id(membership_id(&group, member.id()));
        data.record_desired(&FIELDS);
        Ok(Diagnostics::new())
    }

    /// Only user memberships can be verified: the API lists the groups of
    /// a user but offers no such lookup for groups or services.
    async fn read(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        let kind = Self::member_kind(data)?;
        if kind != MemberKind::User {
            warn!(
                "Cannot verify membership of {} '{}' in group '{}'",
                kind,
                data.get_str(MEMBER),
                data.get_str(GROUP)
            );
            return Ok(vec![Diagnostic::warning(
                "Cannot check group membership",
                "The group membership cannot be checked for non-user members, \
                 you may need to manually check it",
            )]);
        }

        let result = client.get_groups(&data.get_str(MEMBER), kind).await;
        let Some(memberships) = absent_on_not_found(data, result)? else {
            return Ok(Diagnostics::new());
        };

        let group = data.get_str(GROUP);
        if memberships.groups.iter().any(|g| *g == group) {
            data.record_desired(&FIELDS);
        } else {
            data.clear_id();
        }
        Ok(Diagnostics::new())
    }

    async fn update(&self, _client: &IpaClient, _data: &mut ResourceData) -> IpaResult<Diagnostics> {
        Err(IpaError::InvalidArgument(
            "group membership cannot be changed in place; delete and recreate it".into(),
        ))
    }

    async fn delete(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        let group = data.get_str(GROUP);
        let member = Self::member(data)?;

        let outcome = if data.get_bool(MANAGER) {
            client.group_remove_member_manager(&group, &member).await?
        } else {
            client.group_remove_member(&group, &member).await?
        };
        check_outcome(&group, outcome)?;

        data.clear_id();
        Ok(Diagnostics::new())
    }
}
