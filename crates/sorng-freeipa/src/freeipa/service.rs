//! High-level orchestrator that owns sessions, delegates to IpaClient and the
//! reconcilers. Exposes the methods that `commands.rs` delegates to.

use crate::freeipa::api_client::IpaClient;
use crate::freeipa::error::{IpaError, IpaResult};
use crate::freeipa::reconcile::{self, ReconcileAction, ReconcileOutcome, ResourceData, ResourceKind};
use crate::freeipa::types::*;
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Thread-safe state managed by Tauri.
pub type FreeIpaServiceState = Arc<Mutex<FreeIpaService>>;

#[derive(Default)]
pub struct FreeIpaService {
    /// Active sessions keyed by session id.
    pub sessions: HashMap<String, (IpaSessionInfo, IpaClient)>,
}

impl FreeIpaService {
    /// Create a new service wrapped in `Arc<Mutex<_>>` for Tauri state.
    pub fn new() -> FreeIpaServiceState {
        Arc::new(Mutex::new(FreeIpaService::default()))
    }

    // ─── Connection lifecycle ────────────────────────────────────

    /// Log in to a FreeIPA server and register the session.
    pub async fn connect(&mut self, config: FreeIpaConfig) -> IpaResult<IpaSessionInfo> {
        let (session, client) = Self::open_session(&config).await?;
        self.register(session.clone(), client);
        Ok(session)
    }

    /// Log in without touching the registry, so callers holding the
    /// service behind a lock can do the round trip unlocked.
    pub async fn open_session(config: &FreeIpaConfig) -> IpaResult<(IpaSessionInfo, IpaClient)> {
        info!("FreeIPA connecting to {}", config.server_url);

        let client = IpaClient::connect(config).await?;
        let session = IpaSessionInfo {
            id: uuid::Uuid::new_v4().to_string(),
            server_url: client.base_url().to_string(),
            username: config.username.clone(),
            api_version: client.api_version().to_string(),
            connected_at: chrono::Utc::now(),
        };
        Ok((session, client))
    }

    /// Add an established session to the registry.
    pub fn register(&mut self, session: IpaSessionInfo, client: IpaClient) {
        info!(
            "FreeIPA session {} established for {}",
            session.id, session.server_url
        );
        self.sessions.insert(session.id.clone(), (session, client));
    }

    /// Forget a session. The server-side session simply expires.
    pub async fn disconnect(&mut self, session_id: &str) -> IpaResult<()> {
        if self.sessions.remove(session_id).is_some() {
            info!("FreeIPA session {} disconnected", session_id);
            Ok(())
        } else {
            Err(IpaError::SessionNotFound(session_id.to_string()))
        }
    }

    pub async fn disconnect_all(&mut self) -> IpaResult<()> {
        let count = self.sessions.len();
        self.sessions.clear();
        info!("FreeIPA: disconnected {} session(s)", count);
        Ok(())
    }

    pub fn get_session_info(&self, session_id: &str) -> IpaResult<IpaSessionInfo> {
        self.sessions
            .get(session_id)
            .map(|(s, _)| s.clone())
            .ok_or_else(|| IpaError::SessionNotFound(session_id.to_string()))
    }

    pub fn list_sessions(&self) -> Vec<IpaSessionInfo> {
        self.sessions.values().map(|(s, _)| s.clone()).collect()
    }

    /// Handle on a session's client; clones share the session cookie.
    pub fn client(&self, session_id: &str) -> IpaResult<IpaClient> {
        self.sessions
            .get(session_id)
            .map(|(_, c)| c.clone())
            .ok_or_else(|| IpaError::SessionNotFound(session_id.to_string()))
    }

    // ─── Reconcile ───────────────────────────────────────────────

    /// Run one reconcile action. Create and update come back with error
    /// diagnostics, and without touching the server, when the desired
    /// fields do not validate.
    pub async fn apply(
        &self,
        session_id: &str,
        kind: ResourceKind,
        action: ReconcileAction,
        data: ResourceData,
    ) -> IpaResult<ReconcileOutcome> {
        let client = self.client(session_id)?;
        reconcile::apply(&client, kind, action, data).await
    }

    /// Adopt an existing entity by identifier and read its state.
    pub async fn import(
        &self,
        session_id: &str,
        kind: ResourceKind,
        id: &str,
    ) -> IpaResult<ReconcileOutcome> {
        let client = self.client(session_id)?;
        reconcile::import(&client, kind, id).await
    }

    // ─── Users ───────────────────────────────────────────────────

    pub async fn user_show(&self, session_id: &str, uid: &str) -> IpaResult<User> {
        self.client(session_id)?
            .user_show(uid, &QueryOptions::all())
            .await
    }

    pub async fn user_find(&self, session_id: &str, criteria: &str) -> IpaResult<Vec<User>> {
        self.client(session_id)?
            .user_find(criteria, &QueryOptions::default())
            .await
    }

    pub async fn user_disable(&self, session_id: &str, uid: &str) -> IpaResult<bool> {
        self.client(session_id)?.user_disable(uid).await
    }

    pub async fn user_enable(&self, session_id: &str, uid: &str) -> IpaResult<bool> {
        self.client(session_id)?.user_enable(uid).await
    }

    pub async fn user_unlock(&self, session_id: &str, uid: &str) -> IpaResult<bool> {
        self.client(session_id)?.user_unlock(uid).await
    }

    // ─── Groups ──────────────────────────────────────────────────

    pub async fn group_show(&self, session_id: &str, cn: &str) -> IpaResult<Group> {
        self.client(session_id)?
            .group_show(cn, &QueryOptions::default())
            .await
    }

    pub async fn group_find(&self, session_id: &str, criteria: &str) -> IpaResult<Vec<Group>> {
        self.client(session_id)?
            .group_find(criteria, &QueryOptions::default())
            .await
    }

    pub async fn get_groups(
        &self,
        session_id: &str,
        id: &str,
        kind: &str,
    ) -> IpaResult<GroupMemberships> {
        self.client(session_id)?.get_groups_by_type(id, kind).await
    }

    // ─── Services / identity providers ───────────────────────────

    pub async fn service_find(&self, session_id: &str, criteria: &str) -> IpaResult<Vec<Service>> {
        self.client(session_id)?
            .service_find(criteria, &QueryOptions::default())
            .await
    }

    /// Listing never includes client secrets.
    pub async fn idp_find(
        &self,
        session_id: &str,
        criteria: &str,
    ) -> IpaResult<Vec<IdentityProvider>> {
        self.client(session_id)?
            .idp_find(criteria, &QueryOptions::default())
            .await
    }
}
