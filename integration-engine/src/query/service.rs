//! Read paths. Failures degrade to an empty page and are reported next to it.

use super::filter::{PageRequest, ProfileFilter, RequestFilter, RoleFilter, SearchQuery, UserFilter};
use super::search::DebouncedSearch;
use crate::error::EngineError;
use crate::models::{IntegrationRequest, Page, Profile, Role, User};
use crate::services::{IdentityStore, RequestStore};
use std::sync::Arc;
use std::time::Duration;

const ALL_ROLES_PAGE_SIZE: u32 = 100;

/// A page plus the error that produced it, if any. An empty page with no
/// error means "no results"; with an error it means "load failed".
#[derive(Debug)]
pub struct QueryOutcome<T> {
    pub page: Page<T>,
    pub error: Option<EngineError>,
}

impl<T> QueryOutcome<T> {
    fn from_result(result: Result<Page<T>, EngineError>, page: PageRequest, what: &str) -> Self {
        match result {
            Ok(found) => Self {
                page: found.normalized(page.size()),
                error: None,
            },
            Err(e) => {
                tracing::warn!(query = what, error = %e, "Query failed, returning an empty page");
                Self {
                    page: Page::empty(page.size()),
                    error: Some(e),
                }
            }
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_result(self) -> Result<Page<T>, EngineError> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.page),
        }
    }
}

#[derive(Clone)]
pub struct RequestQueryService {
    requests: Arc<dyn RequestStore>,
    identity: Arc<dyn IdentityStore>,
}

impl RequestQueryService {
    pub fn new(requests: Arc<dyn RequestStore>, identity: Arc<dyn IdentityStore>) -> Self {
        Self { requests, identity }
    }

    pub async fn search(
        &self,
        filter: &RequestFilter,
        page: PageRequest,
    ) -> QueryOutcome<IntegrationRequest> {
        if let Err(e) = filter.check_range() {
            return QueryOutcome {
                page: Page::empty(page.size()),
                error: Some(e),
            };
        }

        let query = SearchQuery::new(filter, page);
        tracing::debug!(page = query.page, size = query.size, "Searching integration requests");
        QueryOutcome::from_result(self.requests.search(&query).await, page, "requests")
    }

    pub async fn list_users(&self, filter: &UserFilter, page: PageRequest) -> QueryOutcome<User> {
        let result = self
            .identity
            .list_users(&filter.clone().normalized(), page.remote())
            .await;
        QueryOutcome::from_result(result, page, "users")
    }

    pub async fn list_roles(&self, filter: &RoleFilter, page: PageRequest) -> QueryOutcome<Role> {
        let result = self
            .identity
            .list_roles(&filter.clone().normalized(), page.remote())
            .await;
        QueryOutcome::from_result(result, page, "roles")
    }

    pub async fn list_profiles(
        &self,
        filter: &ProfileFilter,
        page: PageRequest,
    ) -> QueryOutcome<Profile> {
        let result = self
            .identity
            .list_profiles(&filter.clone().normalized(), page.remote())
            .await;
        QueryOutcome::from_result(result, page, "profiles")
    }

    /// Every role, walking the directory page by page.
    pub async fn fetch_all_roles(&self) -> Result<Vec<Role>, EngineError> {
        let mut roles = Vec::new();
        let mut page = PageRequest::first(ALL_ROLES_PAGE_SIZE)?;

        loop {
            let found = self
                .identity
                .list_roles(&RoleFilter::default(), page.remote())
                .await?
                .normalized(ALL_ROLES_PAGE_SIZE);
            let last = found.is_last();
            roles.extend(found.content);
            if last {
                break;
            }
            page = PageRequest::new(page.page() + 1, ALL_ROLES_PAGE_SIZE)?;
        }

        Ok(roles)
    }

    /// A request search that waits for `quiet_period` of inactivity and only
    /// publishes the latest submission.
    pub fn debounced(
        &self,
        quiet_period: Duration,
    ) -> DebouncedSearch<(RequestFilter, PageRequest), IntegrationRequest> {
        let service = self.clone();
        DebouncedSearch::new(quiet_period, move |(filter, page): (RequestFilter, PageRequest)| {
            let service = service.clone();
            Box::pin(async move { service.search(&filter, page).await })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RequestId;
    use crate::query::RemotePage;
    use crate::services::MutationReply;
    use crate::session::Credentials;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    struct PagedStore {
        total: u64,
        seen: Mutex<Vec<SearchQuery>>,
        fail: bool,
    }

    #[async_trait]
    impl RequestStore for PagedStore {
        async fn search(&self, query: &SearchQuery) -> Result<Page<IntegrationRequest>, EngineError> {
            self.seen.lock().unwrap().push(query.clone());
            if self.fail {
                return Err(EngineError::RemoteStatus {
                    status: 503,
                    message: "maintenance".into(),
                });
            }
            let start = (query.page * query.size) as u64;
            let count = self.total.saturating_sub(start).min(query.size as u64);
            let content = (0..count)
                .map(|i| crate::test_support::request((start + i) as RequestId))
                .collect();
            Ok(Page {
                content,
                total_pages: self.total.div_ceil(query.size as u64) as u32,
                total_elements: self.total,
                number: query.page,
                size: query.size,
            })
        }

        async fn fetch(&self, _id: RequestId) -> Result<IntegrationRequest, EngineError> {
            Err(EngineError::NotFound)
        }

        async fn validate(&self, _id: RequestId) -> Result<MutationReply, EngineError> {
            Err(EngineError::NotFound)
        }

        async fn cancel(&self, _id: RequestId) -> Result<MutationReply, EngineError> {
            Err(EngineError::NotFound)
        }
    }

    struct RoleDirectory {
        roles: Vec<Role>,
    }

    #[async_trait]
    impl IdentityStore for RoleDirectory {
        async fn login(&self, _c: &Credentials) -> Result<String, EngineError> {
            Err(EngineError::NotAuthenticated)
        }
        async fn logout(&self) -> Result<(), EngineError> {
            Ok(())
        }
        async fn current_user(&self) -> Result<User, EngineError> {
            Err(EngineError::NotAuthenticated)
        }
        async fn list_users(&self, _f: &UserFilter, _p: RemotePage) -> Result<Page<User>, EngineError> {
            Err(EngineError::Timeout(Duration::from_secs(15)))
        }
        async fn list_roles(&self, _f: &RoleFilter, p: RemotePage) -> Result<Page<Role>, EngineError> {
            let start = (p.page * p.size) as usize;
            let content: Vec<Role> = self.roles.iter().skip(start).take(p.size as usize).cloned().collect();
            Ok(Page {
                content,
                total_pages: (self.roles.len() as u64).div_ceil(p.size as u64) as u32,
                total_elements: self.roles.len() as u64,
                number: p.page,
                size: p.size,
            })
        }
        async fn list_profiles(&self, _f: &ProfileFilter, _p: RemotePage) -> Result<Page<Profile>, EngineError> {
            Ok(Page::empty(10))
        }
        async fn assign_profiles(&self, _r: i64, _p: &BTreeSet<i64>) -> Result<(), EngineError> {
            Ok(())
        }
        async fn assign_roles(&self, _u: i64, _r: &BTreeSet<i64>) -> Result<(), EngineError> {
            Ok(())
        }
        async fn create_role(&self, _n: &str) -> Result<Role, EngineError> {
            Err(EngineError::NotFound)
        }
        async fn delete_role(&self, _r: i64) -> Result<(), EngineError> {
            Ok(())
        }
    }

    fn service(store: PagedStore, roles: usize) -> RequestQueryService {
        let roles = (1..=roles as i64)
            .map(|id| Role {
                id,
                name: format!("Role {}", id),
                profiles: vec![],
            })
            .collect();
        RequestQueryService::new(Arc::new(store), Arc::new(RoleDirectory { roles }))
    }

    #[tokio::test]
    async fn test_first_page_of_twenty_three() {
        let svc = service(
            PagedStore {
                total: 23,
                seen: Mutex::new(vec![]),
                fail: false,
            },
            0,
        );

        let outcome = svc
            .search(&RequestFilter::default(), PageRequest::new(1, 10).unwrap())
            .await;

        assert!(!outcome.is_failed());
        assert_eq!(outcome.page.total_pages, 3);
        assert_eq!(outcome.page.number, 0);
        assert_eq!(outcome.page.content.len(), 10);
    }

    #[tokio::test]
    async fn test_transport_failure_degrades_to_empty_page() {
        let svc = service(
            PagedStore {
                total: 23,
                seen: Mutex::new(vec![]),
                fail: true,
            },
            0,
        );

        let outcome = svc
            .search(&RequestFilter::default(), PageRequest::new(2, 10).unwrap())
            .await;

        assert!(outcome.is_failed());
        assert!(outcome.page.content.is_empty());
        assert_eq!(outcome.page.total_elements, 0);
        assert_eq!(outcome.page.total_pages, 0);
    }

    #[tokio::test]
    async fn test_invalid_range_never_reaches_the_store() {
        let store = PagedStore {
            total: 5,
            seen: Mutex::new(vec![]),
            fail: false,
        };
        let svc = service(store, 0);
        let filter = RequestFilter {
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 2),
            end_date: chrono::NaiveDate::from_ymd_opt(2024, 6, 1),
            ..RequestFilter::default()
        };

        let outcome = svc.search(&filter, PageRequest::default()).await;
        assert!(matches!(outcome.error, Some(EngineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_directory_timeout_is_reported() {
        let svc = service(
            PagedStore {
                total: 0,
                seen: Mutex::new(vec![]),
                fail: false,
            },
            0,
        );

        let outcome = svc
            .list_users(&UserFilter::default(), PageRequest::default())
            .await;
        assert!(matches!(outcome.error, Some(EngineError::Timeout(_))));
        assert_eq!(outcome.page.size, 10);
    }

    #[tokio::test]
    async fn test_fetch_all_roles_walks_every_page() {
        let svc = service(
            PagedStore {
                total: 0,
                seen: Mutex::new(vec![]),
                fail: false,
            },
            230,
        );

        let roles = svc.fetch_all_roles().await.unwrap();
        assert_eq!(roles.len(), 230);
        assert_eq!(roles.last().unwrap().id, 230);
    }
}
