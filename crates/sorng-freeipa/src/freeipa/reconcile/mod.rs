//! Desired-state reconciliation.
//!
//! A [`ResourceData`] carries what an entity should look like (`config`),
//! what it looked like at the last read (`state`) and its identifier. One
//! [`Reconciler`] per resource kind maps create / read / update / delete
//! onto the entity API:
//!
//! - Create builds options from the desired fields and records the
//!   identifier returned by the server
//! - Read flattens the server entity into `state`; a not-found error clears
//!   the identifier instead of failing
//! - Update sends only the fields whose desired value differs from `state`,
//!   skips the call when nothing differs, and reads back afterwards
//! - Delete surfaces every error

pub mod groups;
pub mod idps;
pub mod membership;
pub mod services;
pub mod users;

pub use groups::GroupResource;
pub use idps::IdentityProviderResource;
pub use membership::GroupMembershipResource;
pub use services::ServiceResource;
pub use users::UserResource;

use crate::freeipa::api_client::IpaClient;
use crate::freeipa::error::{IpaError, IpaResult};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

// ── Resource data ───────────────────────────────────────────────────

/// Desired and observed state of one managed entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceData {
    /// Local identifier; empty while the entity does not exist.
    #[serde(default)]
    pub id: String,
    /// Desired field values, supplied by the caller.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Flattened entity as last read from the server.
    #[serde(default)]
    pub state: Map<String, Value>,
}

impl ResourceData {
    pub fn new(config: Map<String, Value>) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Seed a resource that already exists remotely; a subsequent read
    /// populates `state`.
    pub fn import(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Mark the entity as absent.
    pub fn clear_id(&mut self) {
        self.id.clear();
    }

    pub fn exists(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    /// Desired value, falling back to the last observed one.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.config.get(key).or_else(|| self.state.get(key))
    }

    /// Desired value if it is set to something other than its zero value.
    pub fn get_ok(&self, key: &str) -> Option<&Value> {
        self.config.get(key).filter(|v| !is_zero(v))
    }

    pub fn get_str(&self, key: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// Desired value only, empty when unset.
    pub fn desired_str(&self, key: &str) -> String {
        self.config
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether the desired value of `key` differs from the observed one.
    /// Keys absent from `config` are left to the server and never differ.
    pub fn has_change(&self, key: &str) -> bool {
        match self.config.get(key) {
            Some(desired) => self.state.get(key) != Some(desired),
            None => false,
        }
    }

    /// [`has_change`](Self::has_change) where an absent desired value means
    /// `default` rather than "unmanaged".
    pub fn has_change_or(&self, key: &str, default: Value) -> bool {
        let desired = self.config.get(key).cloned().unwrap_or(default);
        match self.state.get(key) {
            Some(observed) => *observed != desired,
            None => !is_zero(&desired),
        }
    }

    /// Desired keys whose value differs from the observed one.
    pub fn changed_fields(&self) -> Vec<&str> {
        self.config
            .keys()
            .filter(|k| self.has_change(k))
            .map(String::as_str)
            .collect()
    }

    /// Record an observed value.
    pub fn set(&mut self, key: &str, value: Value) {
        self.state.insert(key.to_string(), value);
    }

    /// Record every entry of a flattened entity.
    pub fn set_all(&mut self, flat: Map<String, Value>) {
        self.state.extend(flat);
    }

    /// Record the desired value of each key as observed, for fields the
    /// server does not echo back.
    pub fn record_desired(&mut self, keys: &[&str]) {
        for key in keys {
            if let Some(v) = self.config.get(*key).cloned() {
                self.state.insert((*key).to_string(), v);
            }
        }
    }
}

fn is_zero(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

/// Fail when the desired identifier differs from the observed one. These
/// entities are replaced, not renamed.
pub(crate) fn require_same_identifier(
    data: &ResourceData,
    key: &str,
    kind: ResourceKind,
) -> IpaResult<()> {
    if data.state.contains_key(key) && data.has_change(key) {
        return Err(IpaError::InvalidArgument(format!(
            "\"{}\" of {} '{}' cannot change in place; delete and recreate it",
            key,
            kind,
            data.id()
        )));
    }
    Ok(())
}

// ── Flatten helpers ─────────────────────────────────────────────────

/// First element of a multi-valued attribute, or the type's zero value.
pub fn first_or_default<T: Clone + Default>(values: &[T]) -> T {
    values.first().cloned().unwrap_or_default()
}

/// First element of the attribute that identifies the entity; its absence
/// means the payload is not the entity we asked for.
pub fn canonical<'a>(attribute: &str, values: &'a [String]) -> IpaResult<&'a str> {
    values
        .first()
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| IpaError::Decode(format!("entity carries no '{}' value", attribute)))
}

// ── Diagnostics ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Non-fatal finding reported alongside a reconcile result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            summary: summary.into(),
            detail: detail.into(),
        }
    }

    /// An error diagnostic for a failed field validation.
    pub fn invalid_field(err: IpaError) -> Self {
        Self::error("Invalid attribute value", err.to_string())
    }
}

pub type Diagnostics = Vec<Diagnostic>;

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

/// Collect the failures of a list of validation results.
pub(crate) fn collect_invalid(results: Vec<IpaResult<()>>) -> Diagnostics {
    results
        .into_iter()
        .filter_map(Result::err)
        .map(Diagnostic::invalid_field)
        .collect()
}

// ── Reconciler ──────────────────────────────────────────────────────

/// Create / read / update / delete cycle for one resource kind.
#[async_trait::async_trait]
pub trait Reconciler: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Check the desired fields; error diagnostics block create and update.
    fn validate(&self, data: &ResourceData) -> Diagnostics;

    /// Seed `ResourceData` from an identifier of an existing entity.
    fn import(&self, id: &str) -> IpaResult<ResourceData> {
        if id.trim().is_empty() {
            return Err(IpaError::InvalidArgument("import id must not be empty".into()));
        }
        Ok(ResourceData::import(id))
    }

    async fn create(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics>;

    async fn read(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics>;

    async fn update(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics>;

    async fn delete(&self, client: &IpaClient, data: &mut ResourceData) -> IpaResult<Diagnostics>;
}

/// Managed resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    User,
    Group,
    Service,
    IdentityProvider,
    GroupMembership,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Service => "service",
            Self::IdentityProvider => "identity_provider",
            Self::GroupMembership => "group_membership",
        }
    }

    pub fn reconciler(&self) -> &'static dyn Reconciler {
        match self {
            Self::User => &UserResource,
            Self::Group => &GroupResource,
            Self::Service => &ServiceResource,
            Self::IdentityProvider => &IdentityProviderResource,
            Self::GroupMembership => &GroupMembershipResource,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = IpaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            "service" => Ok(Self::Service),
            "identity_provider" | "idp" => Ok(Self::IdentityProvider),
            "group_membership" => Ok(Self::GroupMembership),
            other => Err(IpaError::InvalidArgument(format!(
                "unknown resource kind '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileAction {
    Create,
    Read,
    Update,
    Delete,
}

/// Resource data after an action, with the findings it produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileOutcome {
    pub data: ResourceData,
    pub diagnostics: Diagnostics,
}

impl ReconcileOutcome {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

/// Run `action` for a resource of `kind`. Create and update are refused,
/// without any remote call, when validation reports errors.
pub async fn apply(
    client: &IpaClient,
    kind: ResourceKind,
    action: ReconcileAction,
    mut data: ResourceData,
) -> IpaResult<ReconcileOutcome> {
    let reconciler = kind.reconciler();
    debug!("Reconcile {:?} {} '{}'", action, kind, data.id());

    if matches!(action, ReconcileAction::Create | ReconcileAction::Update) {
        let diagnostics = reconciler.validate(&data);
        if has_errors(&diagnostics) {
            return Ok(ReconcileOutcome { data, diagnostics });
        }
    }

    let diagnostics = match action {
        ReconcileAction::Create => reconciler.create(client, &mut data).await?,
        ReconcileAction::Read => reconciler.read(client, &mut data).await?,
        ReconcileAction::Update => reconciler.update(client, &mut data).await?,
        ReconcileAction::Delete => reconciler.delete(client, &mut data).await?,
    };
    Ok(ReconcileOutcome { data, diagnostics })
}

/// Seed a resource from `id` and read it.
pub async fn import(client: &IpaClient, kind: ResourceKind, id: &str) -> IpaResult<ReconcileOutcome> {
    let reconciler = kind.reconciler();
    let mut data = reconciler.import(id)?;
    let diagnostics = reconciler.read(client, &mut data).await?;
    Ok(ReconcileOutcome { data, diagnostics })
}

/// Swallow the server's not-found error by marking the resource absent.
/// Returns `Ok(None)` in that case.
pub(crate) fn absent_on_not_found<T>(
    data: &mut ResourceData,
    result: IpaResult<T>,
) -> IpaResult<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => {
            debug!("Entity '{}' not found, marking absent", data.id());
            data.clear_id();
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freeipa::error::RemoteError;
    use serde_json::json;

    fn data(config: Value, state: Value) -> ResourceData {
        ResourceData {
            id: "x".into(),
            config: config.as_object().cloned().unwrap_or_default(),
            state: state.as_object().cloned().unwrap_or_default(),
        }
    }

    #[test]
    fn test_has_change() {
        let d = data(
            json!({"cn": "eng", "description": "new"}),
            json!({"cn": "eng", "description": "old", "gidnumber": "5"}),
        );
        assert!(d.has_change("description"));
        assert!(!d.has_change("cn"));
        assert!(!d.has_change("gidnumber"));
        assert_eq!(d.changed_fields(), vec!["description"]);
    }

    #[test]
    fn test_has_change_or_default() {
        let d = data(json!({"cn": "eng"}), json!({"cn": "eng", "description": "old"}));
        assert!(!d.has_change("description"));
        assert!(d.has_change_or("description", json!("")));

        let unset = data(json!({"cn": "eng"}), json!({"cn": "eng"}));
        assert!(!unset.has_change_or("description", json!("")));
    }

    #[test]
    fn test_getters_fall_back_to_state() {
        let d = data(
            json!({"mail": ["a@example.com"], "manager": true}),
            json!({"uid": "alice"}),
        );
        assert_eq!(d.get_str("uid"), "alice");
        assert_eq!(d.get_list("mail"), vec!["a@example.com"]);
        assert!(d.get_bool("manager"));
        assert_eq!(d.get_str("missing"), "");
    }

    #[test]
    fn test_get_ok_skips_zero_values() {
        let d = data(json!({"scope": "", "sub": "email", "mail": []}), json!({}));
        assert!(d.get_ok("scope").is_none());
        assert!(d.get_ok("mail").is_none());
        assert_eq!(d.get_ok("sub"), Some(&json!("email")));
    }

    #[test]
    fn test_record_desired() {
        let mut d = data(json!({"password": "pw"}), json!({}));
        d.record_desired(&["password", "absent"]);
        assert_eq!(d.state().get("password"), Some(&json!("pw")));
        assert!(!d.has_change("password"));
        assert!(d.state().get("absent").is_none());
    }

    #[test]
    fn test_first_or_default_and_canonical() {
        assert_eq!(first_or_default::<String>(&[]), "");
        assert_eq!(first_or_default(&["a".to_string(), "b".to_string()]), "a");
        assert_eq!(canonical("cn", &["eng".to_string()]).unwrap(), "eng");
        assert!(matches!(canonical("cn", &[]), Err(IpaError::Decode(_))));
    }

    #[test]
    fn test_absent_on_not_found() {
        let mut d = ResourceData::import("eng");
        let not_found: IpaResult<()> = Err(IpaError::Remote(RemoteError {
            code: 4001,
            name: "NotFound".into(),
            message: "eng: group not found".into(),
        }));
        assert!(absent_on_not_found(&mut d, not_found).unwrap().is_none());
        assert!(!d.exists());

        let mut d = ResourceData::import("eng");
        let other: IpaResult<()> = Err(IpaError::Remote(RemoteError {
            code: 4002,
            name: "DuplicateEntry".into(),
            message: "dup".into(),
        }));
        assert_eq!(
            absent_on_not_found(&mut d, other).unwrap_err().remote_code(),
            Some(4002)
        );
        assert!(d.exists());
    }

    #[test]
    fn test_resource_kind_parse() {
        assert_eq!("idp".parse::<ResourceKind>().unwrap(), ResourceKind::IdentityProvider);
        assert_eq!(
            "group_membership".parse::<ResourceKind>().unwrap().reconciler().kind(),
            ResourceKind::GroupMembership
        );
        assert!("host".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_default_import_rejects_blank() {
        assert!(ResourceKind::Group.reconciler().import(" ").is_err());
        assert_eq!(
            ResourceKind::Group.reconciler().import("eng").unwrap().id(),
            "eng"
        );
    }
}
