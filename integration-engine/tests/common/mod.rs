#![allow(dead_code)]

use integration_engine::session::Credentials;
use integration_engine::{Engine, EngineContext, EngineSettings};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mocked back-office service and an engine pointed at it.
pub struct TestBackend {
    pub server: MockServer,
    pub engine: Engine,
}

impl TestBackend {
    pub async fn start() -> Self {
        Self::with_settings(|_| {}).await
    }

    pub async fn with_settings(adjust: impl FnOnce(&mut EngineSettings)) -> Self {
        let server = MockServer::start().await;
        let mut settings = EngineSettings::for_base_url(server.uri());
        adjust(&mut settings);
        let engine = Engine::new(settings).expect("Failed to build engine");
        Self { server, engine }
    }

    pub async fn mount_login(&self) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-42" })))
            .mount(&self.server)
            .await;
    }

    /// `current-user` answering `user`, expected exactly `calls` times.
    pub async fn mount_current_user(&self, user: Value, calls: u64) {
        Mock::given(method("GET"))
            .and(path("/users/current-user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user))
            .expect(calls)
            .mount(&self.server)
            .await;
    }

    pub async fn sign_in(&self) -> EngineContext {
        self.engine
            .login(&Credentials::new("awa@example.com", "secret"))
            .await
            .expect("login failed")
    }
}

pub fn user(id: i64, roles: Value) -> Value {
    json!({
        "id": id,
        "firstName": "Awa",
        "lastName": "Diop",
        "matricule": format!("M{:03}", id),
        "roles": roles
    })
}

pub fn request_json(id: i64, integration: &str, operation: &str) -> Value {
    json!({
        "id": id,
        "reference": format!("REF-{}", id),
        "debitAmount": "250.00",
        "creditAmount": "250.00",
        "integrationStatus": integration,
        "operationStatus": operation,
        "createdAt": "2024-03-01T09:30:00"
    })
}

pub fn page(content: Vec<Value>, total_elements: u64, number: u32, size: u32) -> Value {
    let total_pages = total_elements.div_ceil(size as u64);
    json!({
        "content": content,
        "totalElements": total_elements,
        "totalPages": total_pages,
        "number": number,
        "size": size
    })
}
