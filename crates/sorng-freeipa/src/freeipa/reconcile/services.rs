//! Service resource: a single immutable `krbcanonicalname`.

use super::{
    absent_on_not_found, canonical, collect_invalid, Diagnostics, Reconciler, ResourceData,
    ResourceKind,
};
use crate::freeipa::api_client::IpaClient;
use crate::freeipa::error::{IpaError, IpaResult};
use crate::freeipa::types::{DeleteOptions, QueryOptions, Service, ServiceOptions};
use crate::freeipa::validation;
use serde_json::{json, Map, Value};

pub const CANONICAL_NAME: &str = "krbcanonicalname";

pub struct ServiceResource;

pub fn flatten_service(service: &Service) -> IpaResult<Map<String, Value>> {
    let mut flat = Map::new();
    flat.insert(
        CANONICAL_NAME.into(),
        json!(canonical(CANONICAL_NAME, &service.krbcanonicalname)?),
    );
    Ok(flat)
}

/// Whether two principal names name the same service. The server appends
/// the realm to the canonical name, so a desired name without one matches
/// any realm.
pub fn same_principal(desired: &str, observed: &str) -> bool {
    if desired.contains('@') {
        return desired == observed;
    }
    observed.split('@').next() == Some(desired)
}

#[async_trait::async_trait]
impl Reconciler for ServiceResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Service
    }

    fn validate(&self, data: &ResourceData) -> Diagnostics {
        collect_invalid(vec![validation::service_name(
            CANONICAL_NAME,
            &data.get_str(CANONICAL_NAME),
        )])
    }

    async fn create(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        let service = client
            .service_add(&data.get_str(CANONICAL_NAME), &ServiceOptions::default())
            .await?;

        data.set_id(canonical(CANONICAL_NAME, &service.krbcanonicalname)?);
        data.record_desired(&[CANONICAL_NAME]);
        Ok(Diagnostics::new())
    }

    async fn read(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        let result = client.service_show(data.id(), &QueryOptions::default()).await;
        if let Some(service) = absent_on_not_found(data, result)? {
            data.set_all(flatten_service(&service)?);
        }
        Ok(Diagnostics::new())
    }

    /// Nothing on a service changes in place. A different principal is
    /// refused; otherwise this only refreshes state.
    async fn update(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        let desired = data.desired_str(CANONICAL_NAME);
        let observed = data
            .state()
            .get(CANONICAL_NAME)
            .and_then(Value::as_str)
            .unwrap_or_default();
        if !desired.is_empty() && !observed.is_empty() && !same_principal(&desired, observed) {
            return Err(IpaError::InvalidArgument(format!(
                "\"{}\" of service '{}' cannot change in place; delete and recreate it",
                CANONICAL_NAME,
                data.id()
            )));
        }
        self.read(client, data).await
    }

    async fn delete(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        client.service_del(data.id(), &DeleteOptions::default()).await?;
        data.clear_id();
        Ok(Diagnostics::new())
    }
}
