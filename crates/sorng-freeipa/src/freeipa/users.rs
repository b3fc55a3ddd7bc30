//! User accounts: add, delete, modify, show, find, account state.

use crate::freeipa::api_client::{require_identifier, IpaClient};
use crate::freeipa::error::IpaResult;
use crate::freeipa::types::*;
use log::info;

impl IpaClient {
    /// Create a user. First and last name must be present in `options`.
    pub async fn user_add(&self, uid: &str, options: &UserOptions) -> IpaResult<User> {
        require_identifier("uid", uid)?;
        let user: User = self.call("user_add", options.to_options(), &[uid]).await?;
        info!("Created FreeIPA user {}", uid);
        Ok(user)
    }

    /// Create a user, filling `givenname` and `sn` into `options` first.
    pub async fn user_add_with_name(
        &self,
        uid: &str,
        givenname: &str,
        sn: &str,
        mut options: UserOptions,
    ) -> IpaResult<User> {
        options.givenname = Some(givenname.to_string());
        options.sn = Some(sn.to_string());
        self.user_add(uid, &options).await
    }

    /// Delete a user. Fails with a not-found remote error when absent.
    pub async fn user_del(&self, uid: &str, options: &DeleteOptions) -> IpaResult<Ack> {
        require_identifier("uid", uid)?;
        let ack = self.delete_entry("user_del", uid, options).await?;
        info!("Deleted FreeIPA user {}", uid);
        Ok(ack)
    }

    /// Partially update a user; only the fields set in `options` change.
    pub async fn user_mod(&self, uid: &str, options: &UserOptions) -> IpaResult<User> {
        require_identifier("uid", uid)?;
        self.call("user_mod", options.to_options(), &[uid]).await
    }

    pub async fn user_show(&self, uid: &str, options: &QueryOptions) -> IpaResult<User> {
        require_identifier("uid", uid)?;
        self.call("user_show", options.to_options(), &[uid]).await
    }

    pub async fn user_find(&self, criteria: &str, options: &QueryOptions) -> IpaResult<Vec<User>> {
        self.find_entries("user_find", criteria, options).await
    }

    // ── Account state ───────────────────────────────────────────────

    pub async fn user_disable(&self, uid: &str) -> IpaResult<bool> {
        self.user_state_call("user_disable", uid).await
    }

    pub async fn user_enable(&self, uid: &str) -> IpaResult<bool> {
        self.user_state_call("user_enable", uid).await
    }

    /// Clear the lockout after too many failed logins.
    pub async fn user_unlock(&self, uid: &str) -> IpaResult<bool> {
        self.user_state_call("user_unlock", uid).await
    }

    async fn user_state_call(&self, method: &str, uid: &str) -> IpaResult<bool> {
        require_identifier("uid", uid)?;
        let done: bool = self.call(method, Options::new(), &[uid]).await?;
        info!("{} {} -> {}", method, uid, done);
        Ok(done)
    }
}
