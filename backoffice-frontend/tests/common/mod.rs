#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use backoffice_frontend::config::ServerSettings;
use backoffice_frontend::startup::build_router;
use backoffice_frontend::AppState;
use http_body_util::BodyExt;
use integration_engine::{Engine, EngineSettings};
use secrecy::Secret;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct TestApp {
    pub router: Router,
    pub backend: MockServer,
    pub state: AppState,
}

pub fn server_settings() -> ServerSettings {
    ServerSettings {
        host: "127.0.0.1".into(),
        port: 0,
        session_secret: Secret::new("test-session-secret-".repeat(4)),
        secure_cookies: false,
        session_idle_minutes: 5,
    }
}

pub async fn spawn_app() -> TestApp {
    let backend = MockServer::start().await;
    let engine = Engine::new(EngineSettings::for_base_url(backend.uri()))
        .expect("Failed to build engine");
    let settings = server_settings();
    let state = AppState::new(engine, settings.session_idle());
    let router = build_router(state.clone(), &settings).expect("Failed to build router");

    TestApp {
        router,
        backend,
        state,
    }
}

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

pub fn request_json(id: i64, integration: &str, operation: &str) -> Value {
    json!({
        "id": id,
        "reference": format!("REF-{}", id),
        "debitAmount": 1500.5,
        "creditAmount": 1500.5,
        "integrationStatus": integration,
        "operationStatus": operation,
        "createdBy": { "id": 2, "firstName": "Moussa", "lastName": "Ba" },
        "createdAt": "2024-03-01T09:30:00"
    })
}

impl TestApp {
    /// Mount login and current-user on the backend for `user`.
    pub async fn mount_identity(&self, user: Value) {
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-1" })))
            .mount(&self.backend)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/current-user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user))
            .mount(&self.backend)
            .await;
    }

    /// Sign in and return the session cookie.
    pub async fn login(&self) -> String {
        self.login_as("awa@example.com").await
    }

    pub async fn login_as(&self, email: &str) -> String {
        let request = Request::builder()
            .method("POST")
            .uri("/api/session/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "email": email, "password": "secret" }).to_string(),
            ))
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .expect("login sets a session cookie")
            .to_string()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn put_json(&self, uri: &str, cookie: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn post_json(&self, uri: &str, cookie: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Multipart upload with a `file` part and an optional `fileType` part.
    pub async fn upload(
        &self,
        uri: &str,
        cookie: &str,
        file_name: &str,
        bytes: &[u8],
        file_type: Option<&str>,
    ) -> (StatusCode, Value) {
        let boundary = "X-BOUNDARY-42";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                b = boundary,
                f = file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
        if let Some(file_type) = file_type {
            body.extend_from_slice(
                format!(
                    "--{b}\r\nContent-Disposition: form-data; name=\"fileType\"\r\n\r\n{t}\r\n",
                    b = boundary,
                    t = file_type
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookie)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }
}
