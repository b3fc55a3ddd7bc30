//! Groups: CRUD, membership and member managers, cross-entity lookup.

use crate::freeipa::api_client::{require_identifier, IpaClient};
use crate::freeipa::error::{IpaError, IpaResult};
use crate::freeipa::types::*;
use log::{info, warn};
use serde_json::Value;

impl IpaClient {
    pub async fn group_add(&self, cn: &str, options: &GroupOptions) -> IpaResult<Group> {
        require_identifier("cn", cn)?;
        let group: Group = self.call("group_add", options.to_options(), &[cn]).await?;
        info!("Created FreeIPA group {}", cn);
        Ok(group)
    }

    pub async fn group_del(&self, cn: &str, options: &DeleteOptions) -> IpaResult<Ack> {
        require_identifier("cn", cn)?;
        let ack = self.delete_entry("group_del", cn, options).await?;
        info!("Deleted FreeIPA group {}", cn);
        Ok(ack)
    }

    pub async fn group_mod(&self, cn: &str, options: &GroupOptions) -> IpaResult<Group> {
        require_identifier("cn", cn)?;
        self.call("group_mod", options.to_options(), &[cn]).await
    }

    pub async fn group_show(&self, cn: &str, options: &QueryOptions) -> IpaResult<Group> {
        require_identifier("cn", cn)?;
        self.call("group_show", options.to_options(), &[cn]).await
    }

    pub async fn group_find(&self, criteria: &str, options: &QueryOptions) -> IpaResult<Vec<Group>> {
        self.find_entries("group_find", criteria, options).await
    }

    // ── Members ─────────────────────────────────────────────────────

    pub async fn group_add_member(&self, cn: &str, member: &GroupMember) -> IpaResult<MemberOutcome> {
        self.member_call("group_add_member", cn, member).await
    }

    pub async fn group_remove_member(
        &self,
        cn: &str,
        member: &GroupMember,
    ) -> IpaResult<MemberOutcome> {
        self.member_call("group_remove_member", cn, member).await
    }

    /// Services cannot manage groups; that combination is refused locally.
    pub async fn group_add_member_manager(
        &self,
        cn: &str,
        member: &GroupMember,
    ) -> IpaResult<MemberOutcome> {
        reject_service_manager(member)?;
        self.member_call("group_add_member_manager", cn, member).await
    }

    pub async fn group_remove_member_manager(
        &self,
        cn: &str,
        member: &GroupMember,
    ) -> IpaResult<MemberOutcome> {
        reject_service_manager(member)?;
        self.member_call("group_remove_member_manager", cn, member).await
    }

    async fn member_call(
        &self,
        method: &str,
        cn: &str,
        member: &GroupMember,
    ) -> IpaResult<MemberOutcome> {
        require_identifier("cn", cn)?;
        require_identifier("member", member.id())?;

        let r = self
            .invoke::<Value, Value>(method, member.to_options(), &[cn])
            .await?;
        let outcome = MemberOutcome::from_parts(r.completed, r.failed.as_ref());
        if !outcome.failures.is_empty() {
            warn!(
                "{} on {}: {} completed, failures: {}",
                method,
                cn,
                outcome.completed,
                outcome.reasons()
            );
        }
        Ok(outcome)
    }

    // ── Cross-entity lookup ─────────────────────────────────────────

    /// Groups the entity `id` of the given kind directly belongs to.
    pub async fn get_groups(&self, id: &str, kind: MemberKind) -> IpaResult<GroupMemberships> {
        require_identifier("id", id)?;
        self.call(kind.show_method(), Options::new(), &[id]).await
    }

    /// [`get_groups`](Self::get_groups) with the kind given as a string.
    pub async fn get_groups_by_type(&self, id: &str, kind: &str) -> IpaResult<GroupMemberships> {
        let kind: MemberKind = kind.parse()?;
        self.get_groups(id, kind).await
    }
}

fn reject_service_manager(member: &GroupMember) -> IpaResult<()> {
    if member.kind() == MemberKind::Service {
        return Err(IpaError::InvalidArgument(
            "a service cannot be a manager of a group".into(),
        ));
    }
    Ok(())
}
