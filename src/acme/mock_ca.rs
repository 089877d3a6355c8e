//! In-process ACME server for issuer tests.
//!
//! Plugs into `instant-acme` as its HTTP client, so the real account, order,
//! challenge and finalize code paths run without a network. Requests are
//! routed by method and path on any host; the host only separates
//! registration counts so tests can tell two CAs apart. JWS bodies are not
//! verified.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use http_body_util::Full;
use instant_acme::{BytesResponse, HttpClient};
use serde_json::{json, Value};

use crate::acme::HttpClientFactory;

pub const TOKEN: &str = "tok1";
pub const CERT_PEM: &str = "-----BEGIN CERTIFICATE-----\nTU9DSw==\n-----END CERTIFICATE-----\n";

/// Where the order ends up once the challenge is marked ready.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Order goes ready, finalize yields a certificate.
    Issued,
    /// Order goes invalid with this problem detail.
    Invalid(&'static str),
    /// Order stays pending forever.
    NeverReady,
    /// Order goes ready but stays processing after finalize.
    NeverIssued,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub authz_status: &'static str,
    pub challenge_types: Vec<&'static str>,
    pub outcome: Outcome,
}

impl Script {
    pub fn issued() -> Self {
        Self::new(Outcome::Issued)
    }

    pub fn new(outcome: Outcome) -> Self {
        Self {
            authz_status: "pending",
            challenge_types: vec!["dns-01", "http-01"],
            outcome,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    registrations: HashMap<String, usize>,
    orders: usize,
    ready_calls: usize,
    published_at_ready: Vec<Option<String>>,
    finalized: bool,
}

#[derive(Clone)]
pub struct MockCa {
    script: Script,
    challenge_dir: PathBuf,
    state: Arc<Mutex<State>>,
}

impl MockCa {
    pub fn new(script: Script, challenge_dir: &Path) -> Self {
        Self {
            script,
            challenge_dir: challenge_dir.to_path_buf(),
            state: Arc::default(),
        }
    }

    pub fn factory(&self) -> HttpClientFactory {
        let ca = self.clone();
        Arc::new(move || Box::new(ca.clone()) as Box<dyn HttpClient>)
    }

    /// Accounts registered against `host`.
    pub fn registrations(&self, host: &str) -> usize {
        let state = self.state.lock().unwrap();
        state.registrations.get(host).copied().unwrap_or(0)
    }

    pub fn orders(&self) -> usize {
        self.state.lock().unwrap().orders
    }

    pub fn ready_calls(&self) -> usize {
        self.state.lock().unwrap().ready_calls
    }

    /// Challenge file contents seen each time a challenge was marked ready.
    pub fn published_at_ready(&self) -> Vec<Option<String>> {
        self.state.lock().unwrap().published_at_ready.clone()
    }

    fn respond(&self, req: &Request<Full<Bytes>>) -> Response<Full<Bytes>> {
        let uri = req.uri();
        let host = uri.authority().map(|a| a.as_str()).unwrap_or("ca.test").to_string();
        let base = format!("{}://{}", uri.scheme_str().unwrap_or("https"), host);
        let mut state = self.state.lock().unwrap();

        match (req.method(), uri.path()) {
            (&Method::GET, "/directory") => reply(
                StatusCode::OK,
                None,
                json!({
                    "newNonce": format!("{base}/nonce"),
                    "newAccount": format!("{base}/account"),
                    "newOrder": format!("{base}/order"),
                }),
            ),
            (&Method::HEAD, "/nonce") => reply(StatusCode::OK, None, Value::Null),
            (&Method::POST, "/account") => {
                *state.registrations.entry(host).or_default() += 1;
                reply(
                    StatusCode::CREATED,
                    Some(format!("{base}/acct/1")),
                    json!({ "status": "valid" }),
                )
            }
            (&Method::POST, "/order") => {
                state.orders += 1;
                state.finalized = false;
                reply(
                    StatusCode::CREATED,
                    Some(format!("{base}/order/1")),
                    order(&base, "pending", None, false),
                )
            }
            (&Method::POST, "/authz/1") => {
                let challenge_status = if self.script.authz_status == "valid" {
                    "valid"
                } else {
                    "pending"
                };
                let challenges: Vec<Value> = self
                    .script
                    .challenge_types
                    .iter()
                    .map(|kind| challenge(&base, kind, challenge_status))
                    .collect();
                reply(
                    StatusCode::OK,
                    None,
                    json!({
                        "identifier": { "type": "dns", "value": "example.com" },
                        "status": self.script.authz_status,
                        "challenges": challenges,
                    }),
                )
            }
            (&Method::POST, "/chall/1") => {
                state.ready_calls += 1;
                let published = std::fs::read_to_string(self.challenge_dir.join(TOKEN)).ok();
                state.published_at_ready.push(published);
                reply(StatusCode::OK, None, challenge(&base, "http-01", "processing"))
            }
            (&Method::POST, "/order/1") => {
                let body = if state.finalized {
                    self.after_finalize(&base)
                } else {
                    match &self.script.outcome {
                        Outcome::Issued | Outcome::NeverIssued => order(&base, "ready", None, false),
                        Outcome::Invalid(detail) => order(&base, "invalid", Some(*detail), false),
                        Outcome::NeverReady => order(&base, "pending", None, false),
                    }
                };
                reply(StatusCode::OK, None, body)
            }
            (&Method::POST, "/finalize/1") => {
                state.finalized = true;
                reply(StatusCode::OK, None, self.after_finalize(&base))
            }
            (&Method::POST, "/cert/1") => Response::builder()
                .status(StatusCode::OK)
                .header("Replay-Nonce", "nonce")
                .header("Content-Type", "application/pem-certificate-chain")
                .body(Full::new(Bytes::from_static(CERT_PEM.as_bytes())))
                .unwrap(),
            _ => reply(
                StatusCode::NOT_FOUND,
                None,
                json!({
                    "type": "urn:ietf:params:acme:error:malformed",
                    "detail": format!("no route for {}", uri.path()),
                    "status": 404,
                }),
            ),
        }
    }

    fn after_finalize(&self, base: &str) -> Value {
        match self.script.outcome {
            Outcome::NeverIssued => order(base, "processing", None, false),
            _ => order(base, "valid", None, true),
        }
    }
}

impl HttpClient for MockCa {
    fn request(
        &self,
        req: Request<Full<Bytes>>,
    ) -> Pin<Box<dyn Future<Output = Result<BytesResponse, instant_acme::Error>> + Send>> {
        let response = BytesResponse::from(self.respond(&req));
        Box::pin(async move { Ok(response) })
    }
}

fn reply(status: StatusCode, location: Option<String>, body: Value) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(status)
        .header("Replay-Nonce", "nonce")
        .header("Content-Type", "application/json");
    if let Some(location) = location {
        builder = builder.header("Location", location);
    }
    let body = if body.is_null() {
        Bytes::new()
    } else {
        Bytes::from(body.to_string())
    };
    builder.body(Full::new(body)).unwrap()
}

fn order(base: &str, status: &str, detail: Option<&str>, issued: bool) -> Value {
    json!({
        "status": status,
        "identifiers": [{ "type": "dns", "value": "example.com" }],
        "authorizations": [format!("{base}/authz/1")],
        "finalize": format!("{base}/finalize/1"),
        "certificate": issued.then(|| format!("{base}/cert/1")),
        "error": detail.map(|detail| json!({
            "type": "urn:ietf:params:acme:error:unauthorized",
            "detail": detail,
            "status": 403,
        })),
    })
}

fn challenge(base: &str, kind: &str, status: &str) -> Value {
    json!({
        "type": kind,
        "url": format!("{base}/chall/1"),
        "token": TOKEN,
        "status": status,
    })
}
