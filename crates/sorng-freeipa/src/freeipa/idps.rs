//! External identity providers (OAuth2 / OIDC references).

use crate::freeipa::api_client::{require_identifier, IpaClient};
use crate::freeipa::error::IpaResult;
use crate::freeipa::types::*;
use log::info;

impl IpaClient {
    /// Low-level add; prefer [`idp_add_generic`](Self::idp_add_generic),
    /// which makes the required endpoints explicit.
    pub async fn idp_add(
        &self,
        cn: &str,
        options: &IdentityProviderOptions,
    ) -> IpaResult<IdentityProvider> {
        require_identifier("cn", cn)?;
        let idp: IdentityProvider = self.call("idp_add", options.to_options(), &[cn]).await?;
        info!("Created FreeIPA identity provider {}", cn);
        Ok(idp)
    }

    pub async fn idp_add_generic(
        &self,
        cn: &str,
        endpoints: IdpEndpoints,
        mut options: IdentityProviderOptions,
    ) -> IpaResult<IdentityProvider> {
        endpoints.apply(&mut options);
        self.idp_add(cn, &options).await
    }

    pub async fn idp_del(&self, cn: &str, options: &DeleteOptions) -> IpaResult<Ack> {
        require_identifier("cn", cn)?;
        let ack = self.delete_entry("idp_del", cn, options).await?;
        info!("Deleted FreeIPA identity provider {}", cn);
        Ok(ack)
    }

    /// Partial update. Set `options.rename` to change the provider's name.
    pub async fn idp_mod(
        &self,
        cn: &str,
        options: &IdentityProviderOptions,
    ) -> IpaResult<IdentityProvider> {
        require_identifier("cn", cn)?;
        self.call("idp_mod", options.to_options(), &[cn]).await
    }

    /// The client secret is only part of the result with
    /// [`QueryOptions::all`].
    pub async fn idp_show(&self, cn: &str, options: &QueryOptions) -> IpaResult<IdentityProvider> {
        require_identifier("cn", cn)?;
        self.call("idp_show", options.to_options(), &[cn]).await
    }

    pub async fn idp_find(
        &self,
        criteria: &str,
        options: &QueryOptions,
    ) -> IpaResult<Vec<IdentityProvider>> {
        self.find_entries("idp_find", criteria, options).await
    }
}
