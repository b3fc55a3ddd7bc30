//! Kerberos services.
//!
//! Services are keyed by their canonical principal `service/host_fqdn`;
//! the realm suffix is optional on input.

use crate::freeipa::api_client::{require_identifier, IpaClient};
use crate::freeipa::error::IpaResult;
use crate::freeipa::types::*;
use log::info;

impl IpaClient {
    pub async fn service_add(&self, name: &str, options: &ServiceOptions) -> IpaResult<Service> {
        require_identifier("krbcanonicalname", name)?;
        let service: Service = self.call("service_add", options.to_options(), &[name]).await?;
        info!("Created FreeIPA service {}", name);
        Ok(service)
    }

    pub async fn service_del(&self, name: &str, options: &DeleteOptions) -> IpaResult<Ack> {
        require_identifier("krbcanonicalname", name)?;
        let ack = self.delete_entry("service_del", name, options).await?;
        info!("Deleted FreeIPA service {}", name);
        Ok(ack)
    }

    pub async fn service_mod(&self, name: &str, options: &ServiceOptions) -> IpaResult<Service> {
        require_identifier("krbcanonicalname", name)?;
        self.call("service_mod", options.to_options(), &[name]).await
    }

    pub async fn service_show(&self, name: &str, options: &QueryOptions) -> IpaResult<Service> {
        require_identifier("krbcanonicalname", name)?;
        self.call("service_show", options.to_options(), &[name]).await
    }

    pub async fn service_find(
        &self,
        criteria: &str,
        options: &QueryOptions,
    ) -> IpaResult<Vec<Service>> {
        self.find_entries("service_find", criteria, options).await
    }
}
