//! Core types for the FreeIPA integration.
//!
//! Configuration, the JSON-RPC envelope, entity models as returned by the
//! server, and the typed option records sent with each call.
//!
//! ## Option mapping
//!
//! Every option record renders to the wire's free-form options object via
//! `to_options()`. Keys are the constants in [`opt`]:
//!
//! | Record field | Wire key |
//! |---|---|
//! | `UserOptions::givenname` | `givenname` |
//! | `UserOptions::sn` | `sn` |
//! | `UserOptions::password` | `userpassword` |
//! | `UserOptions::password_expiration` | `krbpasswordexpiration` (`__datetime__`) |
//! | `UserOptions::mail` | `mail` |
//! | `UserOptions::homedirectory` | `homedirectory` |
//! | `GroupOptions::description` | `description` |
//! | `*::rename` | `rename` |
//! | `ServiceOptions::force` | `force` |
//! | `IdentityProviderOptions::client_id` | `ipaidpclientid` |
//! | `IdentityProviderOptions::client_secret` | `ipaidpclientsecret` |
//! | `IdentityProviderOptions::scope` | `ipaidpscope` |
//! | `IdentityProviderOptions::sub` | `ipaidpsub` |
//! | `IdentityProviderOptions::auth_endpoint` | `ipaidpauthendpoint` |
//! | `IdentityProviderOptions::dev_auth_endpoint` | `ipaidpdevauthendpoint` |
//! | `IdentityProviderOptions::token_endpoint` | `ipaidptokenendpoint` |
//! | `IdentityProviderOptions::user_info_endpoint` | `ipaidpuserinfoendpoint` |
//! | `IdentityProviderOptions::keys_endpoint` | `ipaidpkeysendpoint` |
//! | `IdentityProviderOptions::issuer_url` | `ipaidpissuerurl` |
//! | `QueryOptions::all` | `all` |
//! | `QueryOptions::sizelimit` | `sizelimit` |
//! | `DeleteOptions::preserve` | `preserve` |
//! | `DeleteOptions::continue_on_error` | `continue` |
//! | `GroupMember::{User,Group,Service}` | `user` / `group` / `service` |

use crate::freeipa::codec::{IpaTime, TaggedDateTime, TaggedSecret};
use crate::freeipa::error::{IpaError, IpaResult, RemoteError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Protocol version sent with every call unless the config overrides it.
pub const DEFAULT_API_VERSION: &str = "2.251";
/// Password login endpoint.
pub const AUTH_PATH: &str = "/ipa/session/login_password";
/// JSON-RPC endpoint.
pub const JSON_RPC_PATH: &str = "/ipa/session/json";
/// Referer path the server requires on every request.
pub const REFERER_PATH: &str = "/ipa/";

/// Free-form options object as it travels on the wire.
pub type Options = serde_json::Map<String, Value>;

/// Wire option keys.
pub mod opt {
    pub const VERSION: &str = "version";
    pub const ALL: &str = "all";
    pub const SIZE_LIMIT: &str = "sizelimit";
    pub const RENAME: &str = "rename";
    pub const PRESERVE: &str = "preserve";
    pub const CONTINUE: &str = "continue";

    pub const GIVEN_NAME: &str = "givenname";
    pub const SURNAME: &str = "sn";
    pub const USER_PASSWORD: &str = "userpassword";
    pub const PASSWORD_EXPIRATION: &str = "krbpasswordexpiration";
    pub const MAIL: &str = "mail";
    pub const HOME_DIRECTORY: &str = "homedirectory";

    pub const DESCRIPTION: &str = "description";

    pub const FORCE: &str = "force";

    pub const IDP_CLIENT_ID: &str = "ipaidpclientid";
    pub const IDP_CLIENT_SECRET: &str = "ipaidpclientsecret";
    pub const IDP_SCOPE: &str = "ipaidpscope";
    pub const IDP_SUB: &str = "ipaidpsub";
    pub const IDP_AUTH_ENDPOINT: &str = "ipaidpauthendpoint";
    pub const IDP_DEV_AUTH_ENDPOINT: &str = "ipaidpdevauthendpoint";
    pub const IDP_TOKEN_ENDPOINT: &str = "ipaidptokenendpoint";
    pub const IDP_USER_INFO_ENDPOINT: &str = "ipaidpuserinfoendpoint";
    pub const IDP_KEYS_ENDPOINT: &str = "ipaidpkeysendpoint";
    pub const IDP_ISSUER_URL: &str = "ipaidpissuerurl";
}

// ── Configuration ───────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

/// Connection settings for one FreeIPA server.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeIpaConfig {
    /// Base URL, e.g. `https://ipa.example.com`.
    pub server_url: String,
    pub username: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl Default for FreeIpaConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            username: String::new(),
            password: String::new(),
            verify_tls: true,
            timeout_secs: default_timeout_secs(),
            api_version: default_api_version(),
        }
    }
}

impl fmt::Debug for FreeIpaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeIpaConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("verify_tls", &self.verify_tls)
            .field("timeout_secs", &self.timeout_secs)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl FreeIpaConfig {
    pub fn new(server_url: &str, username: &str, password: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    /// Read `FREEIPA_SERVER`, `FREEIPA_USER`, `FREEIPA_PASSWORD` and the
    /// optional `FREEIPA_INSECURE` flag. Missing variables stay empty;
    /// [`validate`](Self::validate) reports them.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();
        let insecure = matches!(
            var("FREEIPA_INSECURE").to_ascii_lowercase().as_str(),
            "1" | "true" | "yes"
        );
        Self {
            server_url: var("FREEIPA_SERVER"),
            username: var("FREEIPA_USER"),
            password: var("FREEIPA_PASSWORD"),
            verify_tls: !insecure,
            ..Default::default()
        }
    }

    /// Server, user and password must all be present.
    pub fn validate(&self) -> IpaResult<()> {
        if self.server_url.trim().is_empty()
            || self.username.trim().is_empty()
            || self.password.is_empty()
        {
            return Err(IpaError::Config(
                "Unable to find server, user or password: all three must be provided".into(),
            ));
        }
        if self.api_version.trim().is_empty() {
            return Err(IpaError::Config("API version must not be empty".into()));
        }
        url::Url::parse(&self.server_url)?;
        Ok(())
    }
}

/// Public description of an established session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpaSessionInfo {
    pub id: String,
    pub server_url: String,
    pub username: String,
    pub api_version: String,
    pub connected_at: DateTime<Utc>,
}

// ── JSON-RPC envelope ───────────────────────────────────────────────

/// Request body: `{"method": ..., "params": [[args...], {options...}], "id": 0}`.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub method: &'a str,
    pub params: (&'a [String], &'a Options),
    pub id: u64,
}

/// Inner `result` object of a successful response.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResult<R, V> {
    pub result: R,
    pub summary: Option<String>,
    pub value: Option<V>,
    /// Find calls: number of entries matched.
    pub count: Option<u32>,
    pub truncated: Option<bool>,
    /// Member mutations: number of members actually changed.
    pub completed: Option<u32>,
    /// Member mutations: per-type `[name, reason]` failures.
    pub failed: Option<Value>,
}

/// Full response body.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<R, V> {
    pub result: Option<RpcResult<R, V>>,
    pub error: Option<RemoteError>,
    pub id: Option<i64>,
    pub principal: Option<String>,
    pub version: Option<String>,
}

/// Acknowledgement of a delete call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub summary: Option<String>,
    /// Identifiers the server reports as deleted.
    pub value: Vec<String>,
}

// ── Entities ────────────────────────────────────────────────────────

/// User entry. Every attribute is multi-valued on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    /// Login.
    pub uid: Vec<String>,
    /// First name.
    pub givenname: Vec<String>,
    /// Last name.
    pub sn: Vec<String>,
    /// Password expiration.
    pub krbpasswordexpiration: Vec<TaggedDateTime>,
    pub mail: Vec<String>,
    pub homedirectory: Vec<String>,
    pub loginshell: Vec<String>,
    pub uidnumber: Vec<String>,
    pub gidnumber: Vec<String>,
    pub memberof_group: Vec<String>,
}

/// Group entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub cn: Vec<String>,
    pub description: Vec<String>,
    pub gidnumber: Vec<String>,
    pub member_user: Vec<String>,
    pub member_group: Vec<String>,
    pub member_service: Vec<String>,
    pub membermanager_user: Vec<String>,
    pub membermanager_group: Vec<String>,
    pub memberof_group: Vec<String>,
}

/// Kerberos service entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Service {
    /// `service/host_fqdn@REALM`.
    pub krbcanonicalname: Vec<String>,
    pub krbprincipalname: Vec<String>,
    pub managedby_host: Vec<String>,
    pub memberof_group: Vec<String>,
}

/// External identity provider reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityProvider {
    pub cn: Vec<String>,
    #[serde(rename = "ipaidpclientid")]
    pub client_id: Vec<String>,
    /// Only returned when all attributes are requested.
    #[serde(rename = "ipaidpclientsecret")]
    pub client_secret: Vec<TaggedSecret>,
    #[serde(rename = "ipaidpscope")]
    pub scope: Vec<String>,
    #[serde(rename = "ipaidpsub")]
    pub sub: Vec<String>,
    #[serde(rename = "ipaidpauthendpoint")]
    pub auth_endpoint: Vec<String>,
    #[serde(rename = "ipaidpdevauthendpoint")]
    pub dev_auth_endpoint: Vec<String>,
    #[serde(rename = "ipaidptokenendpoint")]
    pub token_endpoint: Vec<String>,
    #[serde(rename = "ipaidpuserinfoendpoint")]
    pub user_info_endpoint: Vec<String>,
    #[serde(rename = "ipaidpkeysendpoint")]
    pub keys_endpoint: Vec<String>,
    #[serde(rename = "ipaidpissuerurl")]
    pub issuer_url: Vec<String>,
}

/// Group names an entity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMemberships {
    #[serde(rename = "memberof_group", default)]
    pub groups: Vec<String>,
}

// ── Member references ───────────────────────────────────────────────

/// Kind of entity that can be a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    User,
    Group,
    Service,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Service => "service",
        }
    }

    /// Show method whose result carries `memberof_group` for this kind.
    pub fn show_method(&self) -> &'static str {
        match self {
            Self::User => "user_show",
            Self::Group => "group_show",
            Self::Service => "service_show",
        }
    }
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemberKind {
    type Err = IpaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            "service" => Ok(Self::Service),
            other => Err(IpaError::InvalidArgument(format!(
                "invalid member type '{}' (expected user, group or service)",
                other
            ))),
        }
    }
}

/// A polymorphic group member: the variant selects the option key, the
/// payload is the member's identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum GroupMember {
    User(String),
    Group(String),
    Service(String),
}

impl GroupMember {
    pub fn new(kind: MemberKind, id: impl Into<String>) -> Self {
        match kind {
            MemberKind::User => Self::User(id.into()),
            MemberKind::Group => Self::Group(id.into()),
            MemberKind::Service => Self::Service(id.into()),
        }
    }

    pub fn kind(&self) -> MemberKind {
        match self {
            Self::User(_) => MemberKind::User,
            Self::Group(_) => MemberKind::Group,
            Self::Service(_) => MemberKind::Service,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::User(id) | Self::Group(id) | Self::Service(id) => id,
        }
    }

    pub fn to_options(&self) -> Options {
        let mut options = Options::new();
        options.insert(self.kind().as_str().to_string(), json!(self.id()));
        options
    }
}

/// One member the server refused to add or remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberFailure {
    /// Member type key, e.g. `user`.
    pub kind: String,
    pub name: String,
    pub reason: String,
}

/// Result of a member mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberOutcome {
    pub completed: u32,
    pub failures: Vec<MemberFailure>,
}

impl MemberOutcome {
    /// Build from the `completed` / `failed` members of the result object.
    ///
    /// `failed` looks like
    /// `{"member": {"user": [["bob", "no such entry"]], "group": []}}`.
    pub fn from_parts(completed: Option<u32>, failed: Option<&Value>) -> Self {
        let mut failures = Vec::new();
        if let Some(Value::Object(attrs)) = failed {
            for by_kind in attrs.values() {
                let Some(by_kind) = by_kind.as_object() else {
                    continue;
                };
                for (kind, entries) in by_kind {
                    let Some(entries) = entries.as_array() else {
                        continue;
                    };
                    for entry in entries {
                        let pair = entry.as_array();
                        let at = |i: usize| {
                            pair.and_then(|p| p.get(i))
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string()
                        };
                        failures.push(MemberFailure {
                            kind: kind.clone(),
                            name: at(0),
                            reason: at(1),
                        });
                    }
                }
            }
        }
        Self {
            completed: completed.unwrap_or(0),
            failures,
        }
    }

    /// Nothing changed and the server explained why.
    pub fn is_rejected(&self) -> bool {
        self.completed == 0 && !self.failures.is_empty()
    }

    pub fn reasons(&self) -> String {
        self.failures
            .iter()
            .map(|f| format!("{} {}: {}", f.kind, f.name, f.reason))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Typed options ───────────────────────────────────────────────────

fn insert_opt(options: &mut Options, key: &str, value: &Option<String>) {
    if let Some(v) = value {
        options.insert(key.to_string(), json!(v));
    }
}

/// Options for show / find calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Retrieve all attributes, including secrets and computed fields.
    pub all: bool,
    pub sizelimit: Option<u32>,
}

impl QueryOptions {
    pub fn all() -> Self {
        Self {
            all: true,
            sizelimit: None,
        }
    }

    pub fn to_options(&self) -> Options {
        let mut options = Options::new();
        if self.all {
            options.insert(opt::ALL.into(), json!(true));
        }
        if let Some(limit) = self.sizelimit {
            options.insert(opt::SIZE_LIMIT.into(), json!(limit));
        }
        options
    }
}

/// Options for delete calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOptions {
    /// Users only: move to the preserved container instead of deleting.
    pub preserve: bool,
    pub continue_on_error: bool,
}

impl DeleteOptions {
    pub fn to_options(&self) -> Options {
        let mut options = Options::new();
        if self.preserve {
            options.insert(opt::PRESERVE.into(), json!(true));
        }
        if self.continue_on_error {
            options.insert(opt::CONTINUE.into(), json!(true));
        }
        options
    }
}

/// Options for `user_add` / `user_mod`.
#[derive(Clone, Default, PartialEq)]
pub struct UserOptions {
    pub givenname: Option<String>,
    pub sn: Option<String>,
    pub password: Option<String>,
    /// The zero value clears the attribute.
    pub password_expiration: Option<IpaTime>,
    /// `Some(vec![])` sends an explicit empty list.
    pub mail: Option<Vec<String>>,
    pub homedirectory: Option<String>,
}

impl fmt::Debug for UserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserOptions")
            .field("givenname", &self.givenname)
            .field("sn", &self.sn)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("password_expiration", &self.password_expiration)
            .field("mail", &self.mail)
            .field("homedirectory", &self.homedirectory)
            .finish()
    }
}

impl UserOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn to_options(&self) -> Options {
        let mut options = Options::new();
        insert_opt(&mut options, opt::GIVEN_NAME, &self.givenname);
        insert_opt(&mut options, opt::SURNAME, &self.sn);
        insert_opt(&mut options, opt::USER_PASSWORD, &self.password);
        if let Some(expiration) = self.password_expiration {
            let value = if expiration.is_zero() {
                json!("")
            } else {
                json!(TaggedDateTime::from(expiration))
            };
            options.insert(opt::PASSWORD_EXPIRATION.into(), value);
        }
        if let Some(ref mail) = self.mail {
            options.insert(opt::MAIL.into(), json!(mail));
        }
        insert_opt(&mut options, opt::HOME_DIRECTORY, &self.homedirectory);
        options
    }
}

/// Options for `group_add` / `group_mod`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupOptions {
    pub description: Option<String>,
    /// `group_mod` only.
    pub rename: Option<String>,
}

impl GroupOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn to_options(&self) -> Options {
        let mut options = Options::new();
        insert_opt(&mut options, opt::DESCRIPTION, &self.description);
        insert_opt(&mut options, opt::RENAME, &self.rename);
        options
    }
}

/// Options for `service_add` / `service_mod`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOptions {
    /// Add even if the host has no DNS A/AAAA record.
    pub force: bool,
}

impl ServiceOptions {
    pub fn to_options(&self) -> Options {
        let mut options = Options::new();
        if self.force {
            options.insert(opt::FORCE.into(), json!(true));
        }
        options
    }
}

/// Options for `idp_add` / `idp_mod`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct IdentityProviderOptions {
    /// `idp_mod` only.
    pub rename: Option<String>,
    pub client_id: Option<String>,
    /// Plaintext; the server stores it encoded.
    pub client_secret: Option<String>,
    pub scope: Option<String>,
    pub sub: Option<String>,
    pub auth_endpoint: Option<String>,
    pub dev_auth_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub user_info_endpoint: Option<String>,
    pub keys_endpoint: Option<String>,
    pub issuer_url: Option<String>,
}

impl fmt::Debug for IdentityProviderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityProviderOptions")
            .field("rename", &self.rename)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("scope", &self.scope)
            .field("sub", &self.sub)
            .field("auth_endpoint", &self.auth_endpoint)
            .field("dev_auth_endpoint", &self.dev_auth_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("user_info_endpoint", &self.user_info_endpoint)
            .field("keys_endpoint", &self.keys_endpoint)
            .field("issuer_url", &self.issuer_url)
            .finish()
    }
}

impl IdentityProviderOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn to_options(&self) -> Options {
        let mut options = Options::new();
        insert_opt(&mut options, opt::RENAME, &self.rename);
        insert_opt(&mut options, opt::IDP_CLIENT_ID, &self.client_id);
        insert_opt(&mut options, opt::IDP_CLIENT_SECRET, &self.client_secret);
        insert_opt(&mut options, opt::IDP_SCOPE, &self.scope);
        insert_opt(&mut options, opt::IDP_SUB, &self.sub);
        insert_opt(&mut options, opt::IDP_AUTH_ENDPOINT, &self.auth_endpoint);
        insert_opt(&mut options, opt::IDP_DEV_AUTH_ENDPOINT, &self.dev_auth_endpoint);
        insert_opt(&mut options, opt::IDP_TOKEN_ENDPOINT, &self.token_endpoint);
        insert_opt(&mut options, opt::IDP_USER_INFO_ENDPOINT, &self.user_info_endpoint);
        insert_opt(&mut options, opt::IDP_KEYS_ENDPOINT, &self.keys_endpoint);
        insert_opt(&mut options, opt::IDP_ISSUER_URL, &self.issuer_url);
        options
    }
}

/// Client credentials and endpoints every generic OAuth2 provider needs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct IdpEndpoints {
    pub client_id: String,
    pub client_secret: String,
    pub auth_endpoint: String,
    pub dev_auth_endpoint: String,
    pub token_endpoint: String,
    pub user_info_endpoint: String,
    pub keys_endpoint: String,
}

impl IdpEndpoints {
    /// Fill the corresponding fields of `options`, overriding what is there.
    pub fn apply(self, options: &mut IdentityProviderOptions) {
        options.client_id = Some(self.client_id);
        options.client_secret = Some(self.client_secret);
        options.auth_endpoint = Some(self.auth_endpoint);
        options.dev_auth_endpoint = Some(self.dev_auth_endpoint);
        options.token_endpoint = Some(self.token_endpoint);
        options.user_info_endpoint = Some(self.user_info_endpoint);
        options.keys_endpoint = Some(self.keys_endpoint);
    }
}

// ── Tests ───────────────────────────────────────────────────────────
