//! User resource.
//!
//! Fields: `uid` (identifier), `givenname`, `sn`, `password` (write-only),
//! `krbpasswordexpiration` (RFC 3339), `mail` (list), `homedirectory`.

use super::{
    absent_on_not_found, canonical, collect_invalid, first_or_default, require_same_identifier,
    Diagnostics, Reconciler, ResourceData, ResourceKind,
};
use crate::freeipa::api_client::IpaClient;
use crate::freeipa::codec::IpaTime;
use crate::freeipa::error::IpaResult;
use crate::freeipa::types::{DeleteOptions, QueryOptions, User, UserOptions};
use crate::freeipa::validation;
use serde_json::{json, Map, Value};

pub const UID: &str = "uid";
pub const GIVEN_NAME: &str = "givenname";
pub const SURNAME: &str = "sn";
pub const PASSWORD: &str = "password";
pub const PASSWORD_EXPIRATION: &str = "krbpasswordexpiration";
pub const MAIL: &str = "mail";
pub const HOME_DIRECTORY: &str = "homedirectory";

pub struct UserResource;

/// Flatten a user into resource fields. The password is never returned by
/// the server and is not part of the result.
pub fn flatten_user(user: &User) -> IpaResult<Map<String, Value>> {
    let mut flat = Map::new();
    flat.insert(UID.into(), json!(canonical(UID, &user.uid)?));
    flat.insert(
        PASSWORD_EXPIRATION.into(),
        json!(first_or_default(&user.krbpasswordexpiration)
            .datetime
            .to_rfc3339()),
    );
    flat.insert(GIVEN_NAME.into(), json!(first_or_default(&user.givenname)));
    flat.insert(SURNAME.into(), json!(first_or_default(&user.sn)));
    flat.insert(MAIL.into(), json!(user.mail));
    flat.insert(HOME_DIRECTORY.into(), json!(first_or_default(&user.homedirectory)));
    Ok(flat)
}

impl UserResource {
    /// Options for `user_add`, minus the names.
    pub fn create_options(data: &ResourceData) -> IpaResult<UserOptions> {
        let mut options = UserOptions {
            password: Some(data.get_str(PASSWORD)),
            // An explicit empty list keeps the server from generating an
            // address.
            mail: Some(data.get_list(MAIL)),
            ..Default::default()
        };
        let expiration = data.get_str(PASSWORD_EXPIRATION);
        if !expiration.is_empty() {
            options.password_expiration = Some(IpaTime::from_rfc3339(&expiration)?);
        }
        let homedir = data.get_str(HOME_DIRECTORY);
        if !homedir.is_empty() {
            options.homedirectory = Some(homedir);
        }
        Ok(options)
    }

    /// Options for `user_mod` holding only the changed fields, or `None`
    /// when nothing changed.
    pub fn update_options(data: &ResourceData) -> IpaResult<Option<UserOptions>> {
        let mut options = UserOptions::default();
        if data.has_change(GIVEN_NAME) {
            options.givenname = Some(data.get_str(GIVEN_NAME));
        }
        if data.has_change(SURNAME) {
            options.sn = Some(data.get_str(SURNAME));
        }
        if data.has_change(PASSWORD) {
            options.password = Some(data.get_str(PASSWORD));
        }
        options.password_expiration = Self::expiration_change(data)?;
        if data.has_change(MAIL) {
            options.mail = Some(data.get_list(MAIL));
        }
        if data.has_change(HOME_DIRECTORY) {
            options.homedirectory = Some(data.get_str(HOME_DIRECTORY));
        }
        Ok((!options.is_empty()).then_some(options))
    }

    /// Desired expiration when it names a different instant than the
    /// observed one. The server keeps whole seconds in UTC, so offsets and
    /// fractions are normalised before comparing.
    fn expiration_change(data: &ResourceData) -> IpaResult<Option<IpaTime>> {
        if !data.config.contains_key(PASSWORD_EXPIRATION) {
            return Ok(None);
        }
        let desired = IpaTime::from_rfc3339(&data.desired_str(PASSWORD_EXPIRATION))?;
        let observed = data
            .state()
            .get(PASSWORD_EXPIRATION)
            .and_then(Value::as_str)
            .map(IpaTime::from_rfc3339)
            .transpose()?
            .unwrap_or_default();
        Ok((desired.to_rfc3339() != observed.to_rfc3339()).then_some(desired))
    }
}

#[async_trait::async_trait]
impl Reconciler for UserResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::User
    }

    fn validate(&self, data: &ResourceData) -> Diagnostics {
        let mut results = vec![
            validation::identifier(UID, &data.get_str(UID)),
            validation::not_whitespace(GIVEN_NAME, &data.get_str(GIVEN_NAME)),
            validation::not_whitespace(SURNAME, &data.get_str(SURNAME)),
            validation::not_whitespace(PASSWORD, &data.get_str(PASSWORD)),
        ];
        if let Some(Value::String(expiration)) = data.get_ok(PASSWORD_EXPIRATION) {
            results.push(validation::rfc3339(PASSWORD_EXPIRATION, expiration));
        }
        for address in data.get_list(MAIL) {
            results.push(validation::email(MAIL, &address));
        }
        collect_invalid(results)
    }

    async fn create(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        let options = Self::create_options(data)?;
        let user = client
            .user_add_with_name(
                &data.get_str(UID),
                &data.get_str(GIVEN_NAME),
                &data.get_str(SURNAME),
                options,
            )
            .await?;

        data.set_id(canonical(UID, &user.uid)?);
        data.record_desired(&[PASSWORD]);

        self.read(client, data).await
    }

    async fn read(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        // Expiration and mail are only returned with all attributes.
        let result = client.user_show(data.id(), &QueryOptions::all()).await;
        if let Some(user) = absent_on_not_found(data, result)? {
            data.set_all(flatten_user(&user)?);
        }
        Ok(Diagnostics::new())
    }

    async fn update(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        require_same_identifier(data, UID, self.kind())?;
        if let Some(options) = Self::update_options(data)? {
            client.user_mod(data.id(), &options).await?;
            data.record_desired(&[PASSWORD]);
        }
        self.read(client, data).await
    }

    async fn delete(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics> {
        client.user_del(data.id(), &DeleteOptions::default()).await?;
        data.clear_id();
        Ok(Diagnostics::new())
    }
}
