//! Shared wiremock fixtures for the FreeIPA contract tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use sorng_freeipa::IpaClient;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockBuilder, MockServer, Request, ResponseTemplate};

pub const SESSION_COOKIE: &str = "ipa_session=MagBearerToken%3Dabc123";

/// Accept any password login and hand out a session cookie.
pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/ipa/session/login_password"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{}; Path=/ipa; HttpOnly", SESSION_COOKIE).as_str()),
        )
        .mount(server)
        .await;
}

/// Log in against `server` as admin.
pub async fn connect(server: &MockServer) -> IpaClient {
    mount_login(server).await;
    IpaClient::authenticate(&server.uri(), "admin", "Secret123")
        .await
        .unwrap()
}

/// Any JSON-RPC call to `rpc_method`.
pub fn rpc(rpc_method: &str) -> MockBuilder {
    Mock::given(method("POST"))
        .and(path("/ipa/session/json"))
        .and(body_partial_json(json!({ "method": rpc_method })))
}

/// A call whose positional params and options are exactly these.
pub fn exact_params(params: Value) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |req: &Request| {
        serde_json::from_slice::<Value>(&req.body)
            .map(|body| body["params"] == params)
            .unwrap_or(false)
    }
}

/// Successful envelope carrying `result`.
pub fn ok(result: Value) -> ResponseTemplate {
    ok_with(json!({ "result": result, "summary": null, "value": null }))
}

/// Successful envelope with a custom inner result object.
pub fn ok_with(inner: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "result": inner,
        "error": null,
        "id": 0,
        "principal": "admin@EXAMPLE.TEST",
        "version": "4.10.1"
    }))
}

pub fn remote_error(code: i64, name: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "result": null,
        "error": { "code": code, "name": name, "message": message },
        "id": 0,
        "principal": "admin@EXAMPLE.TEST",
        "version": "4.10.1"
    }))
}

pub fn not_found(what: &str) -> ResponseTemplate {
    remote_error(4001, "NotFound", &format!("{}: not found", what))
}

pub fn object(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}
