//! Authenticated JSON-RPC session for the FreeIPA API.
//!
//! - Password login against `/ipa/session/login_password`; the session
//!   cookie the server sets lands in a cookie jar owned by the HTTP client
//! - One generic [`IpaClient::invoke`] primitive that POSTs the
//!   `{"method", "params": [[args], {options}], "id"}` envelope to
//!   `/ipa/session/json` and unwraps the response envelope
//! - Remote errors (`"error": {...}`) are mapped to [`IpaError::Remote`],
//!   kept distinct from transport and decode failures

use crate::freeipa::error::{IpaError, IpaResult};
use crate::freeipa::types::*;
use log::{debug, info};
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE, REFERER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// An authenticated FreeIPA session.
///
/// Cloning is cheap and clones share the cookie jar, so one session can be
/// used from several tasks at once.
#[derive(Debug, Clone)]
pub struct IpaClient {
    http: Client,
    base_url: String,
    api_version: String,
}

impl IpaClient {
    /// Log in with the default protocol version.
    pub async fn authenticate(server_url: &str, username: &str, password: &str) -> IpaResult<Self> {
        Self::connect(&FreeIpaConfig::new(server_url, username, password)).await
    }

    /// Validate `config`, log in and return the session.
    pub async fn connect(config: &FreeIpaConfig) -> IpaResult<Self> {
        config.validate()?;

        let jar = Arc::new(Jar::default());
        let http = Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .danger_accept_invalid_certs(!config.verify_tls)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| IpaError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        let client = Self {
            http,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
        };
        client.login(&config.username, &config.password).await?;

        info!("FreeIPA session established for {} on {}", config.username, client.base_url);
        Ok(client)
    }

    async fn login(&self, username: &str, password: &str) -> IpaResult<()> {
        let response = self
            .http
            .post(self.url(AUTH_PATH))
            .header(ACCEPT, "text/plain")
            .header(REFERER, self.referer())
            .form(&[("user", username), ("password", password)])
            .send()
            .await
            .map_err(|e| IpaError::Auth(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(IpaError::Auth(status.to_string()));
        }
        Ok(())
    }

    /// A client that never logged in; used to exercise argument checks.
    #[cfg(test)]
    pub(crate) fn unauthenticated(base_url: &str, api_version: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.to_string(),
            api_version: api_version.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn referer(&self) -> String {
        self.url(REFERER_PATH)
    }

    // ── RPC ─────────────────────────────────────────────────────────

    /// Call `method` with positional `params` and `options`; the protocol
    /// version is always merged into the options.
    ///
    /// `R` is the type of `result.result`, `V` the type of the `value` echo.
    pub async fn invoke<R, V>(
        &self,
        method: &str,
        mut options: Options,
        params: &[&str],
    ) -> IpaResult<RpcResult<R, V>>
    where
        R: DeserializeOwned,
        V: DeserializeOwned,
    {
        options.insert(opt::VERSION.into(), json!(self.api_version));
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        let body = RpcRequest {
            method,
            params: (params.as_slice(), &options),
            id: 0,
        };

        debug!("FreeIPA call {} {:?}", method, params);

        let response = self
            .http
            .post(self.url(JSON_RPC_PATH))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .header(REFERER, self.referer())
            .json(&body)
            .send()
            .await
            .map_err(|e| IpaError::Transport(format!("{}: {}", method, e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(IpaError::Transport(format!(
                "{}: request failed with status {}",
                method, status
            )));
        }

        let text = response
            .text()
            .await
            .map_err(|e| IpaError::Transport(format!("{}: failed to read body: {}", method, e)))?;

        let envelope: RpcResponse<R, V> = serde_json::from_str(&text)
            .map_err(|e| IpaError::Decode(format!("{}: {}", method, e)))?;

        if let Some(error) = envelope.error {
            debug!("FreeIPA {} returned error {}", method, error.code);
            return Err(IpaError::Remote(error));
        }

        envelope.result.ok_or_else(|| {
            IpaError::Decode(format!("{}: response carries neither result nor error", method))
        })
    }

    /// [`invoke`](Self::invoke), abandoning the request when `cancel`
    /// completes first. Cancellation surfaces as a transport error.
    pub async fn invoke_cancellable<R, V, C>(
        &self,
        cancel: C,
        method: &str,
        options: Options,
        params: &[&str],
    ) -> IpaResult<RpcResult<R, V>>
    where
        R: DeserializeOwned,
        V: DeserializeOwned,
        C: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = cancel => Err(IpaError::Transport(format!("{}: request cancelled", method))),
            result = self.invoke(method, options, params) => result,
        }
    }

    /// [`invoke`](Self::invoke) keeping only `result.result`.
    pub async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        options: Options,
        params: &[&str],
    ) -> IpaResult<R> {
        self.invoke::<R, Value>(method, options, params)
            .await
            .map(|r| r.result)
    }
}

// ── Shared entity plumbing ──────────────────────────────────────────

impl IpaClient {
    /// `*_del` calls: the value echo lists the deleted identifiers.
    pub(crate) async fn delete_entry(
        &self,
        method: &str,
        id: &str,
        options: &DeleteOptions,
    ) -> IpaResult<Ack> {
        let r = self
            .invoke::<Value, Vec<String>>(method, options.to_options(), &[id])
            .await?;
        Ok(Ack {
            summary: r.summary,
            value: r.value.unwrap_or_default(),
        })
    }

    /// `*_find` calls: an empty criteria string matches everything.
    pub(crate) async fn find_entries<T: DeserializeOwned>(
        &self,
        method: &str,
        criteria: &str,
        options: &QueryOptions,
    ) -> IpaResult<Vec<T>> {
        let params: Vec<&str> = if criteria.is_empty() {
            Vec::new()
        } else {
            vec![criteria]
        };
        let r = self
            .invoke::<Vec<T>, Value>(method, options.to_options(), &params)
            .await?;
        debug!("{} matched {} entries", method, r.result.len());
        Ok(r.result)
    }
}

/// Entity identifiers used as positional parameters must be non-blank.
pub(crate) fn require_identifier(what: &str, id: &str) -> IpaResult<()> {
    if id.trim().is_empty() {
        return Err(IpaError::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_rejects_missing_credentials_before_network() {
        // Port 9 (discard) is never contacted: validation fails first.
        let err = IpaClient::authenticate("http://127.0.0.1:9", "admin", "")
            .await
            .unwrap_err();
        assert!(matches!(err, IpaError::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_unreachable_is_auth_error() {
        let config = FreeIpaConfig {
            timeout_secs: 2,
            ..FreeIpaConfig::new("http://127.0.0.1:9", "admin", "pw")
        };
        let err = IpaClient::connect(&config).await.unwrap_err();
        assert!(matches!(err, IpaError::Auth(_)));
    }

    #[test]
    fn test_require_identifier() {
        assert!(require_identifier("uid", "alice").is_ok());
        assert!(matches!(
            require_identifier("uid", "  "),
            Err(IpaError::InvalidArgument(_))
        ));
    }
}
