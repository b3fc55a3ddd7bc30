//! Identity provider resource.
//!
//! Required: `cn`, `clientid`, `clientsecret` and the five endpoints.
//! Optional: `issuerurl`, `scope`, `sub`. Renaming goes through the
//! `rename` option and the resource adopts the new name as identifier.

use super::{
    absent_on_not_found, canonical, collect_invalid, first_or_default, Diagnostics, Reconciler,
    ResourceData, ResourceKind,
};
use crate::freeipa::api_client::IpaClient;
use crate::freeipa::error::IpaResult;
use crate::freeipa::types::{
    DeleteOptions, IdentityProvider, IdentityProviderOptions, IdpEndpoints, QueryOptions,
};
use crate::freeipa::validation;
use serde_json::{json, Map, Value};

pub const CN: &str = "cn";
pub const CLIENT_ID: &str = "clientid";
pub const CLIENT_SECRET: &str = "clientsecret";
pub const AUTH_ENDPOINT: &str = "authendpoint";
pub const DEV_AUTH_ENDPOINT: &str = "devauthendpoint";
pub const TOKEN_ENDPOINT: &str = "tokenendpoint";
pub const USER_INFO_ENDPOINT: &str = "userinfoendpoint";
pub const KEYS_ENDPOINT: &str = "keysendpoint";
pub const ISSUER_URL: &str = "issuerurl";
pub const SCOPE: &str = "scope";
pub const SUB: &str = "sub";

const ENDPOINTS: [&str; 5] = [
    AUTH_ENDPOINT,
    DEV_AUTH_ENDPOINT,
    TOKEN_ENDPOINT,
    USER_INFO_ENDPOINT,
    KEYS_ENDPOINT,
];

const FIELDS: [&str; 11] = [
    CN,
    CLIENT_ID,
    CLIENT_SECRET,
    AUTH_ENDPOINT,
    DEV_AUTH_ENDPOINT,
    TOKEN_ENDPOINT,
    USER_INFO_ENDPOINT,
    KEYS_ENDPOINT,
    ISSUER_URL,
    SCOPE,
    SUB,
];

pub struct IdentityProviderResource;

/// Flatten an identity provider fetched with all attributes; the client
/// secret is decoded to plaintext.
pub fn flatten_idp(idp: &IdentityProvider) -> IpaResult<Map<String, Value>> {
    let mut flat = Map::new();
    flat.insert(CN.into(), json!(canonical(CN, &idp.cn)?));
    flat.insert(CLIENT_ID.into(), json!(first_or_default(&idp.client_id)));
    flat.insert(
        CLIENT_SECRET.into(),
        json!(first_or_default(&idp.client_secret).decode()),
    );
    flat.insert(AUTH_ENDPOINT.into(), json!(first_or_default(&idp.auth_endpoint)));
    flat.insert(
        DEV_AUTH_ENDPOINT.into(),
        json!(first_or_default(&idp.dev_auth_endpoint)),
    );
    flat.insert(TOKEN_ENDPOINT.into(), json!(first_or_default(&idp.token_endpoint)));
    flat.insert(
        USER_INFO_ENDPOINT.into(),
        json!(first_or_default(&idp.user_info_endpoint)),
    );
    flat.insert(KEYS_ENDPOINT.into(), json!(first_or_default(&idp.keys_endpoint)));
    flat.insert(ISSUER_URL.into(), json!(first_or_default(&idp.issuer_url)));
    flat.insert(SCOPE.into(), json!(first_or_default(&idp.scope)));
    flat.insert(SUB.into(), json!(first_or_default(&idp.sub)));
    Ok(flat)
}

fn optional(data: &ResourceData, key: &str) -> Option<String> {
    data.get_ok(key).and_then(Value::as_str).map(str::to_string)
}

impl IdentityProviderResource {
    pub fn endpoints(data: &ResourceData) -> IdpEndpoints {
        IdpEndpoints {
            client_id: data.get_str(CLIENT_ID),
            client_secret: data.get_str(CLIENT_SECRET),
            auth_endpoint: data.get_str(AUTH_ENDPOINT),
            dev_auth_endpoint: data.get_str(DEV_AUTH_ENDPOINT),
            token_endpoint: data.get_str(TOKEN_ENDPOINT),
            user_info_endpoint: data.get_str(USER_INFO_ENDPOINT),
            keys_endpoint: data.get_str(KEYS_ENDPOINT),
        }
    }

    /// Optional settings sent on create; unset ones are omitted.
    pub fn create_options(data: &ResourceData) -> IdentityProviderOptions {
        IdentityProviderOptions {
            issuer_url: optional(data, ISSUER_URL),
            scope: optional(data, SCOPE),
            sub: optional(data, SUB),
            ..Default::default()
        }
    }

    /// Changed fields only. A changed `cn` becomes `rename`.
    pub fn update_options(data: &ResourceData) -> Option<IdentityProviderOptions> {
        let changed = |key: &str| data.has_change(key).then(|| data.desired_str(key));
        let changed_optional =
            |key: &str| data.has_change_or(key, json!("")).then(|| data.desired_str(key));

        let options = IdentityProviderOptions {
            rename: changed(CN),
            client_id: changed(CLIENT_ID),
            client_secret: changed(CLIENT_SECRET),
            auth_endpoint: changed(AUTH_ENDPOINT),
            dev_auth_endpoint: changed(DEV_AUTH_ENDPOINT),
            token_endpoint: changed(TOKEN_ENDPOINT),
            user_info_endpoint: changed(USER_INFO_ENDPOINT),
            keys_endpoint: changed(KEYS_ENDPOINT),
            issuer_url: changed_optional(ISSUER_URL),
            scope: changed_optional(SCOPE),
            sub: changed_optional(SUB),
        };
        (!options.is_empty()).then_some(options)
    }
}

#[async_trait::async_trait]
impl Reconciler for IdentityProviderResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::IdentityProvider
    }

    fn validate(&self, data: &ResourceData) -> Diagnostics {
        let mut results = vec![
            validation::not_whitespace(CN, &data.get_str(CN)),
            validation::not_whitespace(CLIENT_ID, &data.get_str(CLIENT_ID)),
            validation::not_whitespace(CLIENT_SECRET, &data.get_str(CLIENT_SECRET)),
        ];
        for key in ENDPOINTS {
            results.push(validation::http_url(key, &data.get_str(key)));
        }
        if let Some(url) = optional(data, ISSUER_URL) {
            results.push(validation::http_url(ISSUER_URL, &url));
        }
        if let Some(scope) = optional(data, SCOPE) {
            results.push(validation::scope(SCOPE, &scope));
        }
        if let Some(sub) = optional(data, SUB) {
            results.push(validation::not_whitespace(SUB, &sub));
        }
        collect_invalid(results)
    }

    async fn create(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        let idp = client
            .idp_add_generic(
                &data.get_str(CN),
                Self::endpoints(data),
                Self::create_options(data),
            )
            .await?;

        data.set_id(canonical(CN, &idp.cn)?);
        data.record_desired(&FIELDS);
        Ok(Diagnostics::new())
    }

    async fn read(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        // The client secret is only returned with all attributes.
        let result = client.idp_show(data.id(), &QueryOptions::all()).await;
        if let Some(idp) = absent_on_not_found(data, result)? {
            data.set_all(flatten_idp(&idp)?);
        }
        Ok(Diagnostics::new())
    }

    async fn update(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        if let Some(options) = Self::update_options(data) {
            let renamed = options.rename.clone();
            client.idp_mod(data.id(), &options).await?;
            if let Some(cn) = renamed {
                data.set_id(cn);
            }
        }
        self.read(client, data).await
    }

    async fn delete(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        client.idp_del(data.id(), &DeleteOptions::default()).await?;
        data.clear_id();
        Ok(Diagnostics::new())
    }
}
