// src/tests/proxy_tests.rs
use crate::auth::Caller;
use crate::db::listings::count_listings;
use crate::domain::CredentialUpdate;
use crate::errors::ServerError;
use crate::proxy::ProxyGateway;
use crate::tests::utils::{keys, save_credentials, tenant, test_db, FakeUpstream};
use crate::upstream::UpstreamError;
use serde_json::json;

#[test]
fn no_session_is_unauthenticated_without_upstream_call() {
    let t = test_db();
    let upstream = FakeUpstream::new();
    let gateway = ProxyGateway::new(t.db.clone(), upstream.clone());

    let err = gateway.proxy(None, "https://x/sold").unwrap_err();

    assert!(matches!(err, ServerError::Unauthenticated));
    assert!(upstream.calls().is_empty());
}

#[test]
fn tenant_without_settings_is_not_found() {
    let t = test_db();
    let upstream = FakeUpstream::new();
    let gateway = ProxyGateway::new(t.db.clone(), upstream.clone());
    let caller = Caller { tenant_id: tenant("new") };

    let err = gateway.proxy(Some(&caller), "https://x/sold").unwrap_err();

    assert!(matches!(err, ServerError::NotFound(_)));
    assert!(upstream.calls().is_empty());
}

#[test]
fn body_is_returned_verbatim_with_callers_credentials() {
    let t = test_db();
    let a = tenant("a");
    save_credentials(&t.db, &a, keys("key-a", "tok-a"));
    save_credentials(&t.db, &tenant("b"), keys("key-b", "tok-b"));
    let upstream = FakeUpstream::new();
    let payload = json!([{"id": 1, "headline": "Loft", "extra": {"nested": [1, 2]}}]);
    upstream.respond("https://x/anything", Ok(payload.clone()));
    let gateway = ProxyGateway::new(t.db.clone(), upstream.clone());

    let body = gateway
        .proxy(Some(&Caller { tenant_id: a.clone() }), " https://x/anything ")
        .unwrap();

    assert_eq!(body, payload.to_string());
    let calls = upstream.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].url, "https://x/anything");
    assert_eq!(calls[0].api_key, "key-a");
    assert_eq!(calls[0].bearer_token, "tok-a");

    // Pass-through only: nothing is persisted.
    assert_eq!(t.db.with_conn(|conn| count_listings(conn, &a)).unwrap(), 0);
}

#[test]
fn body_text_is_not_reencoded() {
    let t = test_db();
    let a = tenant("a");
    save_credentials(&t.db, &a, keys("k", "b"));
    let upstream = FakeUpstream::new();
    let raw = r#"[ {"zeta": 1, "alpha": 2, "price": 1.50, "big": 1e2} ]"#;
    upstream.respond_raw("https://x/raw", Ok(raw.to_string()));
    let gateway = ProxyGateway::new(t.db.clone(), upstream);

    let body = gateway
        .proxy(Some(&Caller { tenant_id: a }), "https://x/raw")
        .unwrap();

    assert_eq!(body, raw);
}

#[test]
fn upstream_failure_keeps_exact_reason() {
    let t = test_db();
    let a = tenant("a");
    save_credentials(
        &t.db,
        &a,
        CredentialUpdate {
            endpoint_sold: Some("https://x/sold".into()),
            ..keys("bad", "bad")
        },
    );
    let upstream = FakeUpstream::new();
    upstream.respond(
        "https://x/sold",
        Err(UpstreamError::Status {
            status_code: 401,
            message: "API request failed: Unauthorized".into(),
        }),
    );
    let gateway = ProxyGateway::new(t.db.clone(), upstream);

    let err = gateway
        .proxy(Some(&Caller { tenant_id: a }), "https://x/sold")
        .unwrap_err();

    assert_eq!(err.kind(), "upstream");
    assert!(err.to_string().contains("401"));
    assert!(err.to_string().contains("Unauthorized"));
}

#[test]
fn invalid_endpoint_is_rejected_before_fetch() {
    let t = test_db();
    let a = tenant("a");
    save_credentials(&t.db, &a, keys("k", "b"));
    let upstream = FakeUpstream::new();
    let gateway = ProxyGateway::new(t.db.clone(), upstream.clone());

    let err = gateway
        .proxy(Some(&Caller { tenant_id: a }), "file:///etc/passwd")
        .unwrap_err();

    assert!(matches!(err, ServerError::BadRequest(_)));
    assert!(upstream.calls().is_empty());
}
