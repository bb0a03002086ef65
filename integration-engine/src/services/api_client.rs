//! Bearer-authenticated JSON client for the remote back-office service.
//!
//! Responses come either bare or wrapped in a `{code, message, data}`
//! envelope; both shapes are accepted. A 401 on any call tears the session
//! down before the error is returned.

use crate::error::EngineError;
use crate::session::{Session, SessionEvent};
use metrics::counter;
use reqwest::{Client, Method, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::observability::{TracedClientExt, TracedRequest};
use std::time::Duration;

/// A response either wrapped in the service envelope or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ApiBody<T> {
    Wrapped {
        #[serde(default)]
        code: Option<Value>,
        #[serde(default)]
        message: Option<String>,
        data: T,
    },
    Bare(T),
}

impl<T> ApiBody<T> {
    pub fn into_data(self) -> T {
        match self {
            ApiBody::Wrapped { data, .. } | ApiBody::Bare(data) => data,
        }
    }
}

/// `{code, message}` acknowledgement returned by mutations.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiAck {
    #[serde(default)]
    pub code: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl ApiAck {
    /// The service reports success as code `"200"` or `200`; a missing code
    /// means the HTTP status alone decides.
    pub fn is_success(&self) -> bool {
        match &self.code {
            None | Some(Value::Null) => true,
            Some(Value::String(code)) => code.trim() == "200",
            Some(Value::Number(code)) => code.as_u64() == Some(200),
            Some(_) => false,
        }
    }

    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    session: Session,
}

impl ApiClient {
    pub fn new(client: Client, base_url: &str, timeout: Duration, session: Session) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and return the parsed body (`Null` when empty).
    pub async fn execute<F>(&self, method: Method, path: &str, build: F) -> Result<Value, EngineError>
    where
        F: FnOnce(TracedRequest) -> TracedRequest,
    {
        let url = self.url(path);
        let mut request = build(self.client.traced(method.clone(), &url));
        if let Some(token) = self.session.token().await {
            request = request.bearer_auth(token.expose_secret());
        }

        tracing::debug!(method = %method, path = %path, "Calling remote service");

        let response = request.send().await.map_err(|e| {
            counter!("remote_calls_total", "outcome" => "transport_error").increment(1);
            if e.is_timeout() {
                tracing::error!(method = %method, path = %path, timeout = ?self.timeout, "Remote call timed out");
                EngineError::Timeout(self.timeout)
            } else {
                tracing::error!(method = %method, path = %path, error = %e, "Remote call failed");
                EngineError::Transport(e)
            }
        })?;

        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            counter!("remote_calls_total", "outcome" => "unauthorized").increment(1);
            tracing::warn!(method = %method, path = %path, "Remote service rejected the session");
            self.session.teardown(SessionEvent::Expired).await;
            return Err(EngineError::SessionExpired);
        }

        let body = response.text().await?;

        if !status.is_success() {
            counter!("remote_calls_total", "outcome" => "error_status").increment(1);
            let message = serde_json::from_str::<ApiAck>(&body)
                .ok()
                .and_then(|ack| ack.message)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unexpected status")
                        .to_string()
                });

            tracing::error!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                message = %message,
                "Remote service returned an error"
            );

            return Err(if status == StatusCode::NOT_FOUND {
                EngineError::NotFound
            } else {
                EngineError::RemoteStatus {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        counter!("remote_calls_total", "outcome" => "success").increment(1);

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get_json<T, Q>(&self, path: &str, query: &Q) -> Result<T, EngineError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let value = self.execute(Method::GET, path, |r| r.query(query)).await?;
        decode(value)
    }

    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, EngineError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let value = self.execute(Method::POST, path, |r| r.json(body)).await?;
        decode(value)
    }

    /// POST a mutation and interpret the `{code, message}` acknowledgement.
    pub async fn post_ack<B>(&self, path: &str, body: &B) -> Result<ApiAck, EngineError>
    where
        B: Serialize + ?Sized,
    {
        let value = self.execute(Method::POST, path, |r| r.json(body)).await?;
        ack(value)
    }

    pub async fn put_ack(&self, path: &str) -> Result<ApiAck, EngineError> {
        let value = self.execute(Method::PUT, path, |r| r).await?;
        ack(value)
    }

    pub async fn delete(&self, path: &str) -> Result<ApiAck, EngineError> {
        let value = self.execute(Method::DELETE, path, |r| r).await?;
        ack(value)
    }
}

/// Decode a body that may or may not be wrapped in the service envelope.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, EngineError> {
    Ok(serde_json::from_value::<ApiBody<T>>(value)?.into_data())
}

/// Read an acknowledgement. Bodies that are not an envelope (an entity, or
/// nothing at all) count as success and are kept in `data`.
pub fn ack(value: Value) -> Result<ApiAck, EngineError> {
    match value {
        Value::Object(ref map) if map.contains_key("code") || map.contains_key("message") => {
            Ok(serde_json::from_value(value)?)
        }
        Value::Null => Ok(ApiAck::default()),
        other => Ok(ApiAck {
            data: Some(other),
            ..ApiAck::default()
        }),
    }
}
