use super::api_client::{ack, ApiClient};
use crate::error::EngineError;
use crate::models::{IntegrationRequest, Page, RequestId};
use crate::query::SearchQuery;
use async_trait::async_trait;

/// Remote system of record for integration requests.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Page<IntegrationRequest>, EngineError>;

    async fn fetch(&self, id: RequestId) -> Result<IntegrationRequest, EngineError>;

    async fn validate(&self, id: RequestId) -> Result<MutationReply, EngineError>;

    async fn cancel(&self, id: RequestId) -> Result<MutationReply, EngineError>;
}

/// A confirmed mutation. The service may echo the updated request.
#[derive(Debug, Clone, Default)]
pub struct MutationReply {
    pub message: Option<String>,
    pub request: Option<IntegrationRequest>,
}

pub struct HttpRequestStore {
    api: ApiClient,
}

impl HttpRequestStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    async fn mutate(&self, path: &str, refused: &str) -> Result<MutationReply, EngineError> {
        let reply = ack(self.api.execute(reqwest::Method::PUT, path, |r| r).await?)?;
        if !reply.is_success() {
            return Err(EngineError::Rejected(reply.message_or(refused)));
        }

        let request = reply
            .data
            .and_then(|data| serde_json::from_value::<IntegrationRequest>(data).ok());

        Ok(MutationReply {
            message: reply.message,
            request,
        })
    }
}

#[async_trait]
impl RequestStore for HttpRequestStore {
    async fn search(&self, query: &SearchQuery) -> Result<Page<IntegrationRequest>, EngineError> {
        self.api.post_json("/requests", query).await
    }

    async fn fetch(&self, id: RequestId) -> Result<IntegrationRequest, EngineError> {
        self.api.get_json(&format!("/requests/{}", id), &()).await
    }

    async fn validate(&self, id: RequestId) -> Result<MutationReply, EngineError> {
        self.mutate(&format!("/requests/valid/{}", id), "Validation was refused")
            .await
    }

    async fn cancel(&self, id: RequestId) -> Result<MutationReply, EngineError> {
        self.mutate(&format!("/requests/cancel/{}", id), "Cancellation was refused")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{PageRequest, RequestFilter};
    use crate::session::Session;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> HttpRequestStore {
        HttpRequestStore::new(ApiClient::new(
            reqwest::Client::new(),
            &server.uri(),
            Duration::from_secs(5),
            Session::with_token("t"),
        ))
    }

    #[tokio::test]
    async fn test_search_posts_zero_based_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/requests"))
            .and(body_partial_json(json!({"page": 1, "size": 10, "reference": "REF-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [], "totalPages": 2, "totalElements": 11, "number": 1, "size": 10
            })))
            .expect(1)
            .mount(&server)
            .await;

        let filter = RequestFilter {
            reference: Some("REF-1".into()),
            ..RequestFilter::default()
        };
        let query = SearchQuery::new(&filter, PageRequest::new(2, 10).unwrap());

        let page = store(&server).search(&query).await.unwrap();
        assert_eq!(page.total_elements, 11);
    }

    #[tokio::test]
    async fn test_refused_validation_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/requests/valid/5"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"code": "403", "message": "Validation non autorisée"})),
            )
            .mount(&server)
            .await;

        let err = store(&server).validate(5).await.unwrap_err();
        assert!(matches!(err, EngineError::Rejected(ref m) if m == "Validation non autorisée"));
    }

    #[tokio::test]
    async fn test_cancel_with_empty_body_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/requests/cancel/5"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let reply = store(&server).cancel(5).await.unwrap();
        assert!(reply.request.is_none());
    }
}
