//! End-to-end workflows for the integration engine.
//!
//! [`BackOffice`] is an in-memory stand-in for the remote back-office service,
//! served over HTTP by `wiremock`. Scenarios drive a real [`Engine`] against it,
//! so every call goes through the same HTTP adapters as production.

use anyhow::{anyhow, Result};
use integration_engine::session::Credentials;
use integration_engine::{Engine, EngineContext, EngineSettings};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, Once};
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,workflow_tests=debug,integration_engine=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub const TOKEN: &str = "workflow-token";

pub fn admin_user() -> Value {
    json!({
        "id": 1,
        "firstName": "Awa",
        "lastName": "Diop",
        "matricule": "M001",
        "roles": [{ "id": 1, "name": "ADMIN", "profiles": [] }]
    })
}

pub fn plain_user() -> Value {
    json!({
        "id": 2,
        "firstName": "Moussa",
        "lastName": "Ba",
        "matricule": "M002",
        "roles": [{ "id": 7, "name": "Operateur", "profiles": [] }]
    })
}

/// A user whose single role carries the given profile codes.
pub fn user_with_profiles(codes: &[&str]) -> Value {
    let profiles: Vec<Value> = codes
        .iter()
        .enumerate()
        .map(|(i, code)| json!({ "id": i + 1, "code": code, "libelle": code }))
        .collect();
    json!({
        "id": 3,
        "firstName": "Fatou",
        "lastName": "Ndiaye",
        "matricule": "M003",
        "roles": [{ "id": 8, "name": "Gestionnaire", "profiles": profiles }]
    })
}

struct Ledger {
    user: Value,
    requests: BTreeMap<i64, Value>,
    role_profiles: HashMap<i64, BTreeSet<i64>>,
    analysis: Value,
    process_calls: usize,
    next_id: i64,
}

impl Ledger {
    fn user_ref(&self) -> Value {
        json!({
            "id": self.user["id"],
            "firstName": self.user["firstName"],
            "lastName": self.user["lastName"],
        })
    }
}

/// Simulated back-office service.
pub struct BackOffice {
    pub server: MockServer,
    ledger: Arc<Mutex<Ledger>>,
}

fn lock(ledger: &Mutex<Ledger>) -> MutexGuard<'_, Ledger> {
    ledger.lock().unwrap_or_else(|e| e.into_inner())
}

fn trailing_id(request: &Request) -> Option<i64> {
    request
        .url
        .path()
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
}

fn ack(message: &str, data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "code": "200",
        "message": message,
        "data": data
    }))
}

fn now() -> String {
    chrono::Utc::now()
        .naive_utc()
        .format("%Y-%m-%dT%H:%M:%S")
        .to_string()
}

impl BackOffice {
    /// Start the service with `user` signed in on every login.
    pub async fn start(user: Value) -> Self {
        init_tracing();

        let office = Self {
            server: MockServer::start().await,
            ledger: Arc::new(Mutex::new(Ledger {
                user,
                requests: BTreeMap::new(),
                role_profiles: HashMap::new(),
                analysis: json!({ "totalOperation": 0, "totalDebit": 0, "totalCredit": 0 }),
                process_calls: 0,
                next_id: 1,
            })),
        };
        office.mount().await;
        office
    }

    async fn mount(&self) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": TOKEN })))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/logout"))
            .respond_with(ack("Déconnecté", Value::Null))
            .mount(&self.server)
            .await;

        let ledger = Arc::clone(&self.ledger);
        Mock::given(method("GET"))
            .and(path("/users/current-user"))
            .respond_with(move |_: &Request| {
                ResponseTemplate::new(200).set_body_json(lock(&ledger).user.clone())
            })
            .mount(&self.server)
            .await;

        let ledger = Arc::clone(&self.ledger);
        Mock::given(method("POST"))
            .and(path("/requests"))
            .respond_with(move |request: &Request| {
                let query: Value = serde_json::from_slice(&request.body).unwrap_or_default();
                ResponseTemplate::new(200).set_body_json(search(&lock(&ledger), &query))
            })
            .mount(&self.server)
            .await;

        let ledger = Arc::clone(&self.ledger);
        Mock::given(method("GET"))
            .and(path_regex(r"^/requests/\d+$"))
            .respond_with(move |request: &Request| {
                let ledger = lock(&ledger);
                match trailing_id(request).and_then(|id| ledger.requests.get(&id)) {
                    Some(found) => ResponseTemplate::new(200).set_body_json(found.clone()),
                    None => ResponseTemplate::new(404),
                }
            })
            .mount(&self.server)
            .await;

        let ledger = Arc::clone(&self.ledger);
        Mock::given(method("PUT"))
            .and(path_regex(r"^/requests/valid/\d+$"))
            .respond_with(move |request: &Request| {
                let mut ledger = lock(&ledger);
                let by = ledger.user_ref();
                match trailing_id(request).and_then(|id| ledger.requests.get_mut(&id)) {
                    Some(found) => {
                        found["operationStatus"] = json!("VALIDEE");
                        found["validatedBy"] = by;
                        found["validatedAt"] = json!(now());
                        ack("Demande validée", found.clone())
                    }
                    None => ResponseTemplate::new(404),
                }
            })
            .mount(&self.server)
            .await;

        let ledger = Arc::clone(&self.ledger);
        Mock::given(method("PUT"))
            .and(path_regex(r"^/requests/cancel/\d+$"))
            .respond_with(move |request: &Request| {
                let mut ledger = lock(&ledger);
                match trailing_id(request).and_then(|id| ledger.requests.get_mut(&id)) {
                    Some(found) => {
                        found["integrationStatus"] = json!("ANNULER");
                        ack("Demande annulée", found.clone())
                    }
                    None => ResponseTemplate::new(404),
                }
            })
            .mount(&self.server)
            .await;

        let ledger = Arc::clone(&self.ledger);
        Mock::given(method("POST"))
            .and(path("/file/analyze-operation-file"))
            .respond_with(move |_: &Request| {
                ResponseTemplate::new(200).set_body_json(lock(&ledger).analysis.clone())
            })
            .mount(&self.server)
            .await;

        let ledger = Arc::clone(&self.ledger);
        Mock::given(method("POST"))
            .and(path("/file/process-file"))
            .respond_with(move |_: &Request| {
                let mut ledger = lock(&ledger);
                ledger.process_calls += 1;
                let id = ledger.next_id;
                ledger.next_id += 1;

                let created_by = ledger.user_ref();
                let analysis = ledger.analysis.clone();
                ledger.requests.insert(
                    id,
                    json!({
                        "id": id,
                        "reference": format!("INT-{:05}", id),
                        "debitAmount": analysis["totalDebit"],
                        "creditAmount": analysis["totalCredit"],
                        "integrationStatus": "EN_TRAITEMENT",
                        "operationStatus": "EN_TRAITEMENT",
                        "createdBy": created_by,
                        "createdAt": now()
                    }),
                );
                ack("Fichier pris en charge", json!({ "id": id }))
            })
            .mount(&self.server)
            .await;

        let ledger = Arc::clone(&self.ledger);
        Mock::given(method("POST"))
            .and(path("/roles/assign-profiles"))
            .respond_with(move |request: &Request| {
                let body: Value = serde_json::from_slice(&request.body).unwrap_or_default();
                let Some(role_id) = body["roleId"].as_i64() else {
                    return ResponseTemplate::new(400);
                };
                let profiles: BTreeSet<i64> = body["profileIds"]
                    .as_array()
                    .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
                    .unwrap_or_default();
                lock(&ledger).role_profiles.insert(role_id, profiles);
                ack("Profils mis à jour", Value::Null)
            })
            .mount(&self.server)
            .await;
    }

    pub fn settings(&self) -> EngineSettings {
        EngineSettings::for_base_url(self.server.uri())
    }

    pub async fn sign_in(&self) -> Result<EngineContext> {
        let engine = Engine::new(self.settings()).map_err(|e| anyhow!("engine: {}", e))?;
        engine
            .login(&Credentials::new("operator@example.com", "secret"))
            .await
            .map_err(|e| anyhow!("login failed: {}", e))
    }

    /// Insert `count` requests in the given state; returns their ids.
    pub fn seed_requests(&self, count: usize, integration: &str, operation: &str) -> Vec<i64> {
        let mut ledger = lock(&self.ledger);
        (0..count)
            .map(|_| {
                let id = ledger.next_id;
                ledger.next_id += 1;
                ledger.requests.insert(
                    id,
                    json!({
                        "id": id,
                        "reference": format!("INT-{:05}", id),
                        "debitAmount": "1000.00",
                        "creditAmount": "1000.00",
                        "integrationStatus": integration,
                        "operationStatus": operation,
                        "createdAt": "2024-01-15T08:00:00"
                    }),
                );
                id
            })
            .collect()
    }

    /// Totals the analyzer reports for the next upload.
    pub fn set_analysis(&self, total_operation: u64, debit: &str, credit: &str) {
        lock(&self.ledger).analysis = json!({
            "totalOperation": total_operation,
            "totalDebit": debit,
            "totalCredit": credit
        });
    }

    pub fn set_user(&self, user: Value) {
        lock(&self.ledger).user = user;
    }

    pub fn process_calls(&self) -> usize {
        lock(&self.ledger).process_calls
    }

    pub fn request(&self, id: i64) -> Option<Value> {
        lock(&self.ledger).requests.get(&id).cloned()
    }

    pub fn role_profiles(&self, role_id: i64) -> BTreeSet<i64> {
        lock(&self.ledger)
            .role_profiles
            .get(&role_id)
            .cloned()
            .unwrap_or_default()
    }
}

/// Newest first, optionally filtered by operation status, 0-based pages.
fn search(ledger: &Ledger, query: &Value) -> Value {
    let page = query["page"].as_u64().unwrap_or(0) as usize;
    let size = query["size"].as_u64().unwrap_or(10).max(1) as usize;
    let status = query["operationStatus"].as_str();

    let matching: Vec<&Value> = ledger
        .requests
        .values()
        .rev()
        .filter(|r| status.is_none_or(|s| r["operationStatus"] == s))
        .collect();

    let total = matching.len();
    let content: Vec<Value> = matching
        .into_iter()
        .skip(page * size)
        .take(size)
        .cloned()
        .collect();

    json!({
        "content": content,
        "totalElements": total,
        "totalPages": total.div_ceil(size),
        "number": page,
        "size": size
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeded_requests_are_searchable_newest_first() {
        let office = BackOffice::start(plain_user()).await;
        office.seed_requests(3, "EN_TRAITEMENT", "EN_TRAITEMENT");

        let ledger = lock(&office.ledger);
        let page = search(&ledger, &json!({ "page": 0, "size": 2 }));

        assert_eq!(page["totalElements"], 3);
        assert_eq!(page["totalPages"], 2);
        assert_eq!(page["content"][0]["id"], 3);
    }
}
