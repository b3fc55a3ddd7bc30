//! Group resource: `cn` (identifier) and `description`.

use super::{
    absent_on_not_found, canonical, collect_invalid, first_or_default, require_same_identifier,
    Diagnostics, Reconciler, ResourceData, ResourceKind,
};
use crate::freeipa::api_client::IpaClient;
use crate::freeipa::error::IpaResult;
use crate::freeipa::types::{DeleteOptions, Group, GroupOptions, QueryOptions};
use crate::freeipa::validation;
use serde_json::{json, Map, Value};

pub const CN: &str = "cn";
pub const DESCRIPTION: &str = "description";

pub struct GroupResource;

pub fn flatten_group(group: &Group) -> IpaResult<Map<String, Value>> {
    let mut flat = Map::new();
    flat.insert(CN.into(), json!(canonical(CN, &group.cn)?));
    flat.insert(DESCRIPTION.into(), json!(first_or_default(&group.description)));
    Ok(flat)
}

impl GroupResource {
    /// `group_add` always carries a description, empty when unset.
    pub fn create_options(data: &ResourceData) -> GroupOptions {
        GroupOptions {
            description: Some(data.get_str(DESCRIPTION)),
            rename: None,
        }
    }

    /// Changed fields only; `None` when there is nothing to send.
    pub fn update_options(data: &ResourceData) -> Option<GroupOptions> {
        let mut options = GroupOptions::default();
        if data.has_change_or(DESCRIPTION, json!("")) {
            options.description = Some(data.desired_str(DESCRIPTION));
        }
        (!options.is_empty()).then_some(options)
    }
}

#[async_trait::async_trait]
impl Reconciler for GroupResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Group
    }

    fn validate(&self, data: &ResourceData) -> Diagnostics {
        collect_invalid(vec![validation::identifier(CN, &data.get_str(CN))])
    }

    async fn create(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        let group = client
            .group_add(&data.get_str(CN), &Self::create_options(data))
            .await?;

        let cn = canonical(CN, &group.cn)?;
        data.set_id(cn);
        data.set(CN, json!(cn));
        data.set(DESCRIPTION, json!(data.get_str(DESCRIPTION)));
        Ok(Diagnostics::new())
    }

    async fn read(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        let result = client.group_show(data.id(), &QueryOptions::default()).await;
        if let Some(group) = absent_on_not_found(data, result)? {
            data.set_all(flatten_group(&group)?);
        }
        Ok(Diagnostics::new())
    }

    async fn update(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        require_same_identifier(data, CN, self.kind())?;
        if let Some(options) = Self::update_options(data) {
            client.group_mod(data.id(), &options).await?;
        }
        self.read(client, data).await
    }

    async fn delete(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        client.group_del(data.id(), &DeleteOptions::default()).await?;
        data.clear_id();
        Ok(Diagnostics::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed(config: Value, state: Value) -> ResourceData {
        let mut data = ResourceData::new(config.as_object().cloned().unwrap_or_default());
        data.set_id("engineers");
        data.set_all(state.as_object().cloned().unwrap_or_default());
        data
    }

    #[test]
    fn test_create_options_default_description() {
        let data = ResourceData::new(json!({"cn": "engineers"}).as_object().cloned().unwrap());
        assert_eq!(
            Value::Object(GroupResource::create_options(&data).to_options()),
            json!({"description": ""})
        );
    }

    #[test]
    fn test_update_sends_only_description() {
        let data = observed(
            json!({"cn": "engineers", "description": "Platform team"}),
            json!({"cn": "engineers", "description": "Engineers"}),
        );
        let options = GroupResource::update_options(&data).unwrap();
        assert_eq!(
            Value::Object(options.to_options()),
            json!({"description": "Platform team"})
        );
    }

    #[test]
    fn test_update_nothing_changed() {
        let data = observed(
            json!({"cn": "engineers", "description": "Engineers"}),
            json!({"cn": "engineers", "description": "Engineers"}),
        );
        assert!(GroupResource::update_options(&data).is_none());
    }

    #[test]
    fn test_update_clears_removed_description() {
        let data = observed(
            json!({"cn": "engineers"}),
            json!({"cn": "engineers", "description": "Engineers"}),
        );
        let options = GroupResource::update_options(&data).unwrap();
        assert_eq!(options.description.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_update_changed_cn_is_rejected() {
        let client = IpaClient::unauthenticated("http://127.0.0.1:9", "2.251");
        let mut data = observed(
            json!({"cn": "platform", "description": "Engineers"}),
            json!({"cn": "engineers", "description": "Engineers"}),
        );

        let err = GroupResource.update(&client, &mut data).await.unwrap_err();
        assert!(
            matches!(err, crate::freeipa::error::IpaError::InvalidArgument(ref m) if m.contains("recreate"))
        );
        assert_eq!(data.state()[CN], json!("engineers"));
    }

    #[test]
    fn test_flatten_group() {
        let group: Group = serde_json::from_value(json!({
            "cn": ["engineers"],
            "gidnumber": ["1234"],
            "member_user": ["alice"]
        }))
        .unwrap();
        let flat = flatten_group(&group).unwrap();
        assert_eq!(Value::Object(flat), json!({"cn": "engineers", "description": ""}));
    }

    #[test]
    fn test_validate_cn() {
        let bad = ResourceData::new(json!({"cn": "Engineers"}).as_object().cloned().unwrap());
        assert_eq!(GroupResource.validate(&bad).len(), 1);
    }
}
