//! # SortOfRemote NG – FreeIPA Integration
//!
//! Typed client for the FreeIPA / IdM JSON-RPC API and a desired-state
//! reconciliation layer on top of it:
//!
//! - **Session**: password login, cookie-based session, one generic `invoke`
//! - **Wire codecs**: `__datetime__` timestamps and `__base64__` secrets
//! - **Users**: add, modify, show, find, delete, enable/disable/unlock
//! - **Groups**: CRUD, member and member-manager management, reverse lookup
//! - **Services**: Kerberos service principal CRUD
//! - **Identity providers**: external OAuth2/OIDC IdP references
//! - **Reconcile**: create/read/update/delete cycle per managed resource

pub mod freeipa;

pub use freeipa::*;
