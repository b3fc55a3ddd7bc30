//! Contract tests for the session client: login, the JSON-RPC envelope and
//! how the different failure modes surface.
//!
//! | Endpoint | Test |
//! |---|---|
//! | `POST /ipa/session/login_password` | `test_login_*` |
//! | `POST /ipa/session/json` | `test_invoke_*`, entity API tests |

mod common;

use common::*;
use serde_json::{json, Value};
use sorng_freeipa::*;
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Login ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_posts_form_with_referer() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ipa/session/login_password"))
        .and(header("accept", "text/plain"))
        .and(header("referer", format!("{}/ipa/", server.uri()).as_str()))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("user=admin"))
        .and(body_string_contains("password=Secret123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = IpaClient::authenticate(&server.uri(), "admin", "Secret123")
        .await
        .unwrap();
    assert_eq!(client.base_url(), server.uri());
    assert_eq!(client.api_version(), "2.251");
}

#[tokio::test]
async fn test_login_rejected_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/ipa/session/login_password"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = IpaClient::authenticate(&server.uri(), "admin", "wrong")
        .await
        .unwrap_err();
    match err {
        IpaError::Auth(msg) => assert!(msg.contains("401"), "{}", msg),
        other => panic!("expected Auth, got {:?}", other),
    }
}

#[tokio::test]
async fn test_login_missing_password_never_hits_server() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = IpaClient::authenticate(&server.uri(), "admin", "")
        .await
        .unwrap_err();
    assert!(matches!(err, IpaError::Config(_)));
}

#[tokio::test]
async fn test_session_cookie_is_sent_on_rpc_calls() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("ping")
        .and(header("cookie", SESSION_COOKIE))
        .respond_with(ok(json!(null)))
        .expect(1)
        .mount(&server)
        .await;

    let _: Value = client.call("ping", Options::new(), &[]).await.unwrap();
}

#[tokio::test]
async fn test_open_session_logs_in_while_service_stays_unlocked() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let state = FreeIpaService::new();
    let guard = state.lock().await;
    let (session, client) =
        FreeIpaService::open_session(&FreeIpaConfig::new(&server.uri(), "admin", "Secret123"))
            .await
            .unwrap();
    drop(guard);

    assert!(state.lock().await.list_sessions().is_empty());
    state.lock().await.register(session.clone(), client);

    let svc = state.lock().await;
    assert_eq!(svc.get_session_info(&session.id).unwrap().username, "admin");
    assert_eq!(svc.client(&session.id).unwrap().base_url(), server.uri());
}

// ── Envelope ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invoke_sends_envelope_with_version() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("group_show")
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(header("referer", format!("{}/ipa/", server.uri()).as_str()))
        .and(exact_params(json!([["engineers"], {"all": true, "version": "2.251"}])))
        .respond_with(ok_with(json!({
            "result": {"cn": ["engineers"], "description": ["Engineering"]},
            "summary": null,
            "value": "engineers"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let r = client
        .invoke::<Group, String>("group_show", QueryOptions::all().to_options(), &["engineers"])
        .await
        .unwrap();
    assert_eq!(r.result.cn, vec!["engineers"]);
    assert_eq!(r.value.as_deref(), Some("engineers"));
}

#[tokio::test]
async fn test_invoke_absent_value_is_none() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("group_show")
        .respond_with(ok_with(json!({"result": {"cn": ["engineers"]}, "summary": null})))
        .mount(&server)
        .await;

    let r = client
        .invoke::<Group, String>("group_show", Options::new(), &["engineers"])
        .await
        .unwrap();
    assert!(r.value.is_none());
}

#[tokio::test]
async fn test_invoke_remote_error_is_mapped() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("group_add")
        .respond_with(remote_error(
            4002,
            "DuplicateEntry",
            "group with name \"engineers\" already exists",
        ))
        .mount(&server)
        .await;

    let err = client
        .group_add("engineers", &GroupOptions::default())
        .await
        .unwrap_err();
    match err {
        IpaError::Remote(e) => {
            assert_eq!(e.code, 4002);
            assert_eq!(e.name, "DuplicateEntry");
            assert!(!e.is_not_found());
        }
        other => panic!("expected Remote, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invoke_malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("group_show")
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client
        .group_show("engineers", &QueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IpaError::Decode(_)));
}

#[tokio::test]
async fn test_invoke_http_failure_is_transport_error() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("group_show")
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client
        .group_show("engineers", &QueryOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, IpaError::Transport(_)));
}

#[tokio::test]
async fn test_invoke_cancellable_stops_waiting() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("user_find")
        .respond_with(ok(json!([])).set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let err = client
        .invoke_cancellable::<Vec<User>, Value, _>(
            tokio::time::sleep(Duration::from_millis(50)),
            "user_find",
            Options::new(),
            &[],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, IpaError::Transport(ref m) if m.contains("cancelled")));
}

// ── Entity API ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_user_add_with_name_fills_names_and_decodes_expiration() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("user_add")
        .and(exact_params(json!([["alice"], {
            "givenname": "Alice",
            "sn": "Liddell",
            "userpassword": "pw",
            "mail": [],
            "version": "2.251"
        }])))
        .respond_with(ok(json!({
            "uid": ["alice"],
            "givenname": ["Alice"],
            "sn": ["Liddell"],
            "krbpasswordexpiration": [{"__datetime__": "20230101000000Z"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = UserOptions {
        password: Some("pw".into()),
        mail: Some(vec![]),
        ..Default::default()
    };
    let user = client
        .user_add_with_name("alice", "Alice", "Liddell", options)
        .await
        .unwrap();
    assert_eq!(
        user.krbpasswordexpiration[0].datetime.to_rfc3339(),
        "2023-01-01T00:00:00Z"
    );
}

#[tokio::test]
async fn test_user_del_reports_deleted_ids() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("user_del")
        .and(exact_params(json!([["alice"], {"preserve": true, "version": "2.251"}])))
        .respond_with(ok_with(json!({
            "result": {"failed": []},
            "summary": "Deleted user \"alice\"",
            "value": ["alice"]
        })))
        .mount(&server)
        .await;

    let ack = client
        .user_del(
            "alice",
            &DeleteOptions {
                preserve: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ack.value, vec!["alice"]);
    assert_eq!(ack.summary.as_deref(), Some("Deleted user \"alice\""));
}

#[tokio::test]
async fn test_find_without_criteria_sends_no_params() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("group_find")
        .and(exact_params(json!([[], {"version": "2.251"}])))
        .respond_with(ok_with(json!({
            "result": [{"cn": ["admins"]}, {"cn": ["engineers"]}],
            "count": 2,
            "truncated": false,
            "summary": "2 groups matched"
        })))
        .mount(&server)
        .await;

    let groups = client
        .group_find("", &QueryOptions::default())
        .await
        .unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[1].cn, vec!["engineers"]);
}

#[tokio::test]
async fn test_user_disable_returns_boolean() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("user_disable")
        .and(exact_params(json!([["alice"], {"version": "2.251"}])))
        .respond_with(ok(json!(true)))
        .mount(&server)
        .await;

    assert!(client.user_disable("alice").await.unwrap());
}

#[tokio::test]
async fn test_idp_show_all_decodes_secret() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("idp_show")
        .and(exact_params(json!([["keycloak"], {"all": true, "version": "2.251"}])))
        .respond_with(ok(json!({
            "cn": ["keycloak"],
            "ipaidpclientid": ["ipa"],
            "ipaidpclientsecret": [{"__base64__": "c2VjcmV0"}]
        })))
        .mount(&server)
        .await;

    let idp = client
        .idp_show("keycloak", &QueryOptions::all())
        .await
        .unwrap();
    assert_eq!(idp.client_secret[0].decode(), "secret");
}

#[tokio::test]
async fn test_get_groups_uses_kind_specific_show() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("service_show")
        .and(exact_params(json!([["HTTP/web.example.com"], {"version": "2.251"}])))
        .respond_with(ok(json!({
            "krbcanonicalname": ["HTTP/web.example.com@EXAMPLE.TEST"],
            "memberof_group": ["webservers"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let groups = client
        .get_groups_by_type("HTTP/web.example.com", "service")
        .await
        .unwrap();
    assert_eq!(groups.groups, vec!["webservers"]);
}

#[tokio::test]
async fn test_member_add_reports_failures() {
    let server = MockServer::start().await;
    let client = connect(&server).await;

    rpc("group_add_member")
        .and(exact_params(json!([["admins"], {"user": "bob", "version": "2.251"}])))
        .respond_with(ok_with(json!({
            "result": {"cn": ["admins"]},
            "completed": 0,
            "failed": {"member": {"user": [["bob", "no such entry"]], "group": [], "service": []}}
        })))
        .mount(&server)
        .await;

    let outcome = client
        .group_add_member("admins", &GroupMember::User("bob".into()))
        .await
        .unwrap();
    assert!(outcome.is_rejected());
    assert_eq!(outcome.failures[0].reason, "no such entry");
}
