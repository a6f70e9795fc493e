use crate::db::connection::{init_db, Database};
use crate::db::credentials::upsert_credential;
use crate::domain::{ApiCredentials, CredentialUpdate, TenantCredential, TenantId};
use crate::proxy::ProxyGateway;
use crate::router::AppState;
use crate::sync::{CancelToken, SyncOrchestrator};
use crate::upstream::{Upstream, UpstreamError};
use astra::{Body, Request, Response};
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// A schema-initialized database in its own temp dir, removed on drop.
pub struct TestDb {
    _dir: TempDir,
    pub db: Database,
}

pub fn test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("test.sqlite");
    let db = Database::new(path.to_string_lossy().to_string());
    init_db(&db).unwrap_or_else(|e| panic!("Database initialization failed: {e}"));
    TestDb { _dir: dir, db }
}

pub fn tenant(id: &str) -> TenantId {
    TenantId::new(id).unwrap()
}

pub fn save_credentials(
    db: &Database,
    tenant_id: &TenantId,
    update: CredentialUpdate,
) -> TenantCredential {
    db.with_conn(|conn| upsert_credential(conn, tenant_id, &update, now_unix()))
        .unwrap()
}

pub fn keys(api_key: &str, bearer: &str) -> CredentialUpdate {
    CredentialUpdate {
        api_key: Some(api_key.into()),
        bearer_token: Some(bearer.into()),
        ..Default::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeCall {
    pub url: String,
    pub api_key: String,
    pub bearer_token: String,
}

/// Canned upstream keyed by URL. Unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct FakeUpstream {
    responses: Mutex<HashMap<String, Result<String, UpstreamError>>>,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, url: &str, result: Result<Value, UpstreamError>) {
        self.respond_raw(url, result.map(|v| v.to_string()));
    }

    pub fn respond_raw(&self, url: &str, result: Result<String, UpstreamError>) {
        self.responses.lock().unwrap().insert(url.to_string(), result);
    }

    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Upstream for FakeUpstream {
    fn fetch(&self, url: &str, creds: &ApiCredentials) -> Result<String, UpstreamError> {
        self.calls.lock().unwrap().push(FakeCall {
            url: url.to_string(),
            api_key: creds.api_key.clone(),
            bearer_token: creds.bearer_token.clone(),
        });
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(UpstreamError::Network(format!("no route to {url}"))))
    }
}

pub fn app_state(db: &Database, upstream: Arc<dyn Upstream>) -> AppState {
    AppState {
        db: db.clone(),
        sync: Arc::new(SyncOrchestrator::new(db.clone(), upstream.clone(), 2)),
        proxy: ProxyGateway::new(db.clone(), upstream),
        cancel: CancelToken::new(),
    }
}

pub fn request(method: Method, uri: &str, body: Option<Value>, session: Option<&str>) -> Request {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let mut req = Request::new(body);
    *req.method_mut() = method;
    *req.uri_mut() = uri.parse().unwrap();
    if let Some(token) = session {
        req.headers_mut()
            .insert("Authorization", format!("Bearer {token}").parse().unwrap());
    }
    req
}

pub fn read_text(resp: &mut Response) -> String {
    let mut raw = String::new();
    resp.body_mut().reader().read_to_string(&mut raw).unwrap();
    raw
}

pub fn read_json(resp: &mut Response) -> Value {
    serde_json::from_str(&read_text(resp)).unwrap()
}

/// Accept one HTTP connection, answer with the canned response, and hand
/// back the raw request head that was received.
pub fn one_shot_server(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/listings", listener.local_addr().unwrap());
    let response = format!(
        "HTTP/1.1 {status_line}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut head = String::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                break;
            }
            head.push_str(&line);
        }
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        head
    });

    (url, handle)
}
