//! FreeIPA integration: sub-modules.
//!
//! ## Architecture
//!
//! - `types`: configuration, RPC envelope, entities, typed option records
//! - `error`: the `IpaError` taxonomy
//! - `codec`: tagged scalar wire encodings (timestamps, secrets)
//! - `api_client`: authenticated session and the single `invoke` primitive
//! - `users` / `groups` / `services` / `idps`: per-entity API methods
//! - `validation`: field validators for desired-state descriptions
//! - `reconcile`: desired-state container and per-resource reconcilers
//! - `service`: session registry and reconcile dispatcher
//! - `commands`: thin `#[tauri::command]` wrappers (feature `commands`)

pub mod api_client;
pub mod codec;
pub mod error;
pub mod groups;
pub mod idps;
pub mod reconcile;
pub mod service;
pub mod services;
pub mod types;
pub mod users;
pub mod validation;

#[cfg(feature = "commands")]
pub mod commands;

pub use api_client::IpaClient;
pub use error::{IpaError, IpaResult, RemoteError};
pub use service::{FreeIpaService, FreeIpaServiceState};
pub use types::*;

#[cfg(feature = "commands")]
pub use commands::*;
