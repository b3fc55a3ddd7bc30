//! Tauri command bindings for the FreeIPA crate.
//!
//! Thin wrappers that take `State<FreeIpaServiceState>`, lock the mutex,
//! and delegate to the service. Every command returns `Result<T, String>`.

use crate::freeipa::reconcile::{ReconcileAction, ReconcileOutcome, ResourceData, ResourceKind};
use crate::freeipa::service::{FreeIpaService, FreeIpaServiceState};
use crate::freeipa::types::*;

// ── Connection / session ─────────────────────────────────────────────────────

#[tauri::command]
pub async fn ipa_connect(
    state: tauri::State<'_, FreeIpaServiceState>,
    config: FreeIpaConfig,
) -> Result<IpaSessionInfo, String> {
    // Log in unlocked; the lock is only taken to register the session.
    let (session, client) = FreeIpaService::open_session(&config)
        .await
        .map_err(|e| e.to_string())?;
    state.lock().await.register(session.clone(), client);
    Ok(session)
}

#[tauri::command]
pub async fn ipa_disconnect(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
) -> Result<(), String> {
    let mut svc = state.lock().await;
    svc.disconnect(&session_id).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ipa_disconnect_all(state: tauri::State<'_, FreeIpaServiceState>) -> Result<(), String> {
    let mut svc = state.lock().await;
    svc.disconnect_all().await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ipa_list_sessions(
    state: tauri::State<'_, FreeIpaServiceState>,
) -> Result<Vec<IpaSessionInfo>, String> {
    let svc = state.lock().await;
    Ok(svc.list_sessions())
}

// ── Reconcile ────────────────────────────────────────────────────────────────

#[tauri::command]
pub async fn ipa_apply(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    kind: ResourceKind,
    action: ReconcileAction,
    data: ResourceData,
) -> Result<ReconcileOutcome, String> {
    // Clone the client out so the lock is not held across the round trips.
    let client = state.lock().await.client(&session_id)?;
    crate::freeipa::reconcile::apply(&client, kind, action, data)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ipa_import(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    kind: ResourceKind,
    id: String,
) -> Result<ReconcileOutcome, String> {
    let client = state.lock().await.client(&session_id)?;
    crate::freeipa::reconcile::import(&client, kind, &id)
        .await
        .map_err(|e| e.to_string())
}

// ── Users ────────────────────────────────────────────────────────────────────

#[tauri::command]
pub async fn ipa_user_show(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    uid: String,
) -> Result<User, String> {
    let svc = state.lock().await;
    svc.user_show(&session_id, &uid).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ipa_user_find(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    criteria: String,
) -> Result<Vec<User>, String> {
    let svc = state.lock().await;
    svc.user_find(&session_id, &criteria)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ipa_user_disable(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    uid: String,
) -> Result<bool, String> {
    let svc = state.lock().await;
    svc.user_disable(&session_id, &uid)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ipa_user_enable(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    uid: String,
) -> Result<bool, String> {
    let svc = state.lock().await;
    svc.user_enable(&session_id, &uid)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ipa_user_unlock(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    uid: String,
) -> Result<bool, String> {
    let svc = state.lock().await;
    svc.user_unlock(&session_id, &uid)
        .await
        .map_err(|e| e.to_string())
}

// ── Groups ───────────────────────────────────────────────────────────────────

#[tauri::command]
pub async fn ipa_group_show(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    cn: String,
) -> Result<Group, String> {
    let svc = state.lock().await;
    svc.group_show(&session_id, &cn).await.map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ipa_group_find(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    criteria: String,
) -> Result<Vec<Group>, String> {
    let svc = state.lock().await;
    svc.group_find(&session_id, &criteria)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ipa_get_groups(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    id: String,
    member_type: String,
) -> Result<GroupMemberships, String> {
    let svc = state.lock().await;
    svc.get_groups(&session_id, &id, &member_type)
        .await
        .map_err(|e| e.to_string())
}

// ── Services / identity providers ────────────────────────────────────────────

#[tauri::command]
pub async fn ipa_service_find(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    criteria: String,
) -> Result<Vec<Service>, String> {
    let svc = state.lock().await;
    svc.service_find(&session_id, &criteria)
        .await
        .map_err(|e| e.to_string())
}

#[tauri::command]
pub async fn ipa_idp_find(
    state: tauri::State<'_, FreeIpaServiceState>,
    session_id: String,
    criteria: String,
) -> Result<Vec<IdentityProvider>, String> {
    let svc = state.lock().await;
    svc.idp_find(&session_id, &criteria)
        .await
        .map_err(|e| e.to_string())
}
