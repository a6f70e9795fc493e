use crate::auth::sessions::{
    create_session, load_tenant_from_session, revoke_session, SESSION_TTL_SECS,
};
use crate::db::credentials::{get_all_credentials, get_credential, upsert_credential};
use crate::domain::CredentialUpdate;
use crate::errors::ServerError;
use crate::tests::utils::{keys, now_unix, save_credentials, tenant, test_db};

#[test]
fn first_save_creates_row() {
    let t = test_db();
    let a = tenant("a");
    let saved = save_credentials(&t.db, &a, keys("key", "tok"));

    let loaded = t.db.with_conn(|conn| get_credential(conn, &a)).unwrap();
    assert_eq!(saved, loaded);
    assert_eq!(loaded.api_key, "key");
    assert!(loaded.endpoints().is_empty());
}

#[test]
fn missing_tenant_is_not_found() {
    let t = test_db();
    let err = t
        .db
        .with_conn(|conn| get_credential(conn, &tenant("ghost")))
        .unwrap_err();
    assert!(matches!(err, ServerError::NotFound(_)));
}

#[test]
fn partial_save_keeps_other_endpoints() {
    let t = test_db();
    let a = tenant("a");
    save_credentials(
        &t.db,
        &a,
        CredentialUpdate {
            endpoint_for_sale: Some("https://x/sale".into()),
            endpoint_sold: Some("https://x/sold".into()),
            ..keys("key", "tok")
        },
    );

    // Testing a single endpoint only sends that field.
    save_credentials(
        &t.db,
        &a,
        CredentialUpdate {
            endpoint_leased: Some("https://x/leased".into()),
            ..Default::default()
        },
    );

    let cred = t.db.with_conn(|conn| get_credential(conn, &a)).unwrap();
    assert_eq!(cred.api_key, "key");
    assert_eq!(cred.bearer_token, "tok");
    assert_eq!(cred.endpoint_for_sale.as_deref(), Some("https://x/sale"));
    assert_eq!(cred.endpoint_sold.as_deref(), Some("https://x/sold"));
    assert_eq!(cred.endpoint_leased.as_deref(), Some("https://x/leased"));
}

#[test]
fn one_row_per_tenant() {
    let t = test_db();
    for _ in 0..3 {
        save_credentials(&t.db, &tenant("a"), keys("k", "b"));
    }
    save_credentials(&t.db, &tenant("b"), keys("k", "b"));

    let all = t.db.with_conn(|conn| get_all_credentials(conn)).unwrap();
    let ids: Vec<_> = all.iter().map(|c| c.tenant_id.as_str()).collect();
    assert_eq!(ids, ["a", "b"]);
}

#[test]
fn invalid_endpoint_is_rejected_and_nothing_written() {
    let t = test_db();
    let a = tenant("a");
    let err = t
        .db
        .with_conn(|conn| {
            upsert_credential(
                conn,
                &a,
                &CredentialUpdate {
                    endpoint_sold: Some("not a url".into()),
                    ..Default::default()
                },
                now_unix(),
            )
        })
        .unwrap_err();
    assert!(matches!(err, ServerError::BadRequest(_)));
    assert!(t.db.with_conn(|conn| get_all_credentials(conn)).unwrap().is_empty());
}

#[test]
fn concurrent_saves_for_one_tenant_keep_both_fields() {
    let t = test_db();
    let a = tenant("a");
    save_credentials(&t.db, &a, keys("k", "b"));

    std::thread::scope(|s| {
        let db = &t.db;
        let a = &a;
        s.spawn(move || {
            save_credentials(
                db,
                a,
                CredentialUpdate {
                    endpoint_for_sale: Some("https://x/sale".into()),
                    ..Default::default()
                },
            )
        });
        s.spawn(move || {
            save_credentials(
                db,
                a,
                CredentialUpdate {
                    endpoint_leased: Some("https://x/leased".into()),
                    ..Default::default()
                },
            )
        });
    });

    let cred = t.db.with_conn(|conn| get_credential(conn, &a)).unwrap();
    assert_eq!(cred.endpoint_for_sale.as_deref(), Some("https://x/sale"));
    assert_eq!(cred.endpoint_leased.as_deref(), Some("https://x/leased"));
}

#[test]
fn session_lifecycle() {
    let t = test_db();
    let a = tenant("a");
    let now = now_unix();

    let token = t.db.with_conn(|conn| create_session(conn, &a, now)).unwrap();
    let found = t
        .db
        .with_conn(|conn| load_tenant_from_session(conn, &token, now + 10))
        .unwrap();
    assert_eq!(found, Some(a.clone()));

    let expired = t
        .db
        .with_conn(|conn| load_tenant_from_session(conn, &token, now + SESSION_TTL_SECS + 1))
        .unwrap();
    assert_eq!(expired, None);

    assert!(t.db.with_conn(|conn| revoke_session(conn, &token, now)).unwrap());
    let revoked = t
        .db
        .with_conn(|conn| load_tenant_from_session(conn, &token, now + 10))
        .unwrap();
    assert_eq!(revoked, None);
}
