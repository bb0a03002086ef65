//! In-memory collaborators for unit tests.

use crate::error::EngineError;
use crate::models::*;
use crate::query::{ProfileFilter, RemotePage, RoleFilter, SearchQuery, UserFilter};
use crate::services::{FilePipeline, IdentityStore, MutationReply, ProcessReceipt, RequestStore};
use crate::session::Credentials;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn request(id: RequestId) -> IntegrationRequest {
    IntegrationRequest {
        id,
        reference: format!("REF-{:04}", id),
        debit_amount: Decimal::from(1_000_000),
        credit_amount: Decimal::from(1_000_000),
        integration_status: IntegrationStatus::EnTraitement,
        operation_status: OperationStatus::EnTraitement,
        created_by: Some(user_ref(2)),
        validated_by: None,
        created_at: chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(9, 0, 0))
            .unwrap_or_default(),
        validated_at: None,
    }
}

pub fn user_ref(id: UserId) -> UserRef {
    UserRef {
        id,
        first_name: "Fatou".into(),
        last_name: "Ba".into(),
        matricule: Some(format!("M{:03}", id)),
    }
}

pub fn profile(id: ProfileId, code: &str) -> Profile {
    Profile {
        id,
        code: code.into(),
        libelle: String::new(),
    }
}

pub fn user_with_roles(roles: &[(&str, &[&str])]) -> User {
    User {
        id: 20,
        first_name: "Ibrahima".into(),
        last_name: "Sarr".into(),
        matricule: "M020".into(),
        email: None,
        roles: roles
            .iter()
            .enumerate()
            .map(|(i, (name, codes))| Role {
                id: i as RoleId + 1,
                name: name.to_string(),
                profiles: codes
                    .iter()
                    .enumerate()
                    .map(|(j, code)| profile(j as ProfileId + 1, code))
                    .collect(),
            })
            .collect(),
    }
}

pub fn admin() -> User {
    let mut user = user_with_roles(&[("ADMIN", &[])]);
    user.id = 1;
    user
}

pub fn plain_user() -> User {
    user_with_roles(&[("Operateur", &[])])
}

pub struct FakePipeline {
    debit: Decimal,
    credit: Decimal,
    reject: Option<String>,
    process_calls: AtomicUsize,
}

impl FakePipeline {
    pub fn with_totals(debit: Decimal, credit: Decimal) -> Self {
        Self {
            debit,
            credit,
            reject: None,
            process_calls: AtomicUsize::new(0),
        }
    }

    pub fn rejecting(mut self, message: &str) -> Self {
        self.reject = Some(message.into());
        self
    }

    pub fn process_calls(&self) -> usize {
        self.process_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FilePipeline for FakePipeline {
    async fn analyze(&self, _file: &UploadFile, _t: FileType) -> Result<FileAnalysisResult, EngineError> {
        Ok(FileAnalysisResult {
            total_operation: 2,
            file_size: Decimal::ONE,
            total_debit: self.debit,
            total_credit: self.credit,
            reported_balanced: None,
        })
    }

    async fn process(&self, _file: &UploadFile, _t: FileType) -> Result<ProcessReceipt, EngineError> {
        self.process_calls.fetch_add(1, Ordering::SeqCst);
        match &self.reject {
            Some(message) => Err(EngineError::Rejected(message.clone())),
            None => Ok(ProcessReceipt {
                message: Some("ok".into()),
                request_id: Some(101),
            }),
        }
    }
}

pub struct FakeRequestStore {
    requests: Mutex<HashMap<RequestId, IntegrationRequest>>,
    fail_mutations: bool,
    validate_calls: AtomicUsize,
    cancel_calls: AtomicUsize,
}

impl FakeRequestStore {
    pub fn with(requests: Vec<IntegrationRequest>) -> Self {
        Self {
            requests: Mutex::new(requests.into_iter().map(|r| (r.id, r)).collect()),
            fail_mutations: false,
            validate_calls: AtomicUsize::new(0),
            cancel_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_mutations(mut self) -> Self {
        self.fail_mutations = true;
        self
    }

    pub fn stored(&self, id: RequestId) -> Option<IntegrationRequest> {
        self.requests.lock().unwrap().get(&id).cloned()
    }

    pub fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub fn cancel_calls(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    fn refuse(&self) -> Result<(), EngineError> {
        if self.fail_mutations {
            return Err(EngineError::RemoteStatus {
                status: 503,
                message: "unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RequestStore for FakeRequestStore {
    async fn search(&self, query: &SearchQuery) -> Result<Page<IntegrationRequest>, EngineError> {
        let content: Vec<_> = self.requests.lock().unwrap().values().cloned().collect();
        let total = content.len() as u64;
        Ok(Page {
            content,
            total_pages: 1,
            total_elements: total,
            number: query.page,
            size: query.size,
        })
    }

    async fn fetch(&self, id: RequestId) -> Result<IntegrationRequest, EngineError> {
        self.stored(id).ok_or(EngineError::NotFound)
    }

    async fn validate(&self, _id: RequestId) -> Result<MutationReply, EngineError> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        self.refuse()?;
        Ok(MutationReply::default())
    }

    async fn cancel(&self, id: RequestId) -> Result<MutationReply, EngineError> {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        self.refuse()?;
        let mut requests = self.requests.lock().unwrap();
        let request = requests.get_mut(&id).ok_or(EngineError::NotFound)?;
        request.integration_status = IntegrationStatus::Annuler;
        Ok(MutationReply {
            message: None,
            request: Some(request.clone()),
        })
    }
}

pub struct FakeIdentity {
    user: Mutex<User>,
    fail_current_user: bool,
    fail_mutations: bool,
    current_user_calls: AtomicUsize,
    role_profiles: Mutex<HashMap<RoleId, BTreeSet<ProfileId>>>,
    user_roles: Mutex<HashMap<UserId, BTreeSet<RoleId>>>,
}

impl FakeIdentity {
    pub fn new(user: User) -> Self {
        Self {
            user: Mutex::new(user),
            fail_current_user: false,
            fail_mutations: false,
            current_user_calls: AtomicUsize::new(0),
            role_profiles: Mutex::new(HashMap::new()),
            user_roles: Mutex::new(HashMap::new()),
        }
    }

    pub fn failing_current_user(mut self) -> Self {
        self.fail_current_user = true;
        self
    }

    pub fn failing_mutations(mut self) -> Self {
        self.fail_mutations = true;
        self
    }

    pub fn set_user(&self, user: User) {
        *self.user.lock().unwrap() = user;
    }

    pub fn current_user_calls(&self) -> usize {
        self.current_user_calls.load(Ordering::SeqCst)
    }

    pub fn role_profiles(&self, role_id: RoleId) -> BTreeSet<ProfileId> {
        self.role_profiles
            .lock()
            .unwrap()
            .get(&role_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn user_roles(&self, user_id: UserId) -> BTreeSet<RoleId> {
        self.user_roles
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    fn refuse(&self) -> Result<(), EngineError> {
        if self.fail_mutations {
            return Err(EngineError::Timeout(std::time::Duration::from_secs(15)));
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityStore for FakeIdentity {
    async fn login(&self, _credentials: &Credentials) -> Result<String, EngineError> {
        Ok("token".into())
    }

    async fn logout(&self) -> Result<(), EngineError> {
        Ok(())
    }

    async fn current_user(&self) -> Result<User, EngineError> {
        self.current_user_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_current_user {
            return Err(EngineError::RemoteStatus {
                status: 500,
                message: "directory down".into(),
            });
        }
        Ok(self.user.lock().unwrap().clone())
    }

    async fn list_users(&self, _f: &UserFilter, page: RemotePage) -> Result<Page<User>, EngineError> {
        Ok(Page::empty(page.size))
    }

    async fn list_roles(&self, _f: &RoleFilter, page: RemotePage) -> Result<Page<Role>, EngineError> {
        Ok(Page::empty(page.size))
    }

    async fn list_profiles(&self, _f: &ProfileFilter, page: RemotePage) -> Result<Page<Profile>, EngineError> {
        Ok(Page::empty(page.size))
    }

    async fn assign_profiles(&self, role_id: RoleId, ids: &BTreeSet<ProfileId>) -> Result<(), EngineError> {
        self.refuse()?;
        self.role_profiles.lock().unwrap().insert(role_id, ids.clone());
        Ok(())
    }

    async fn assign_roles(&self, user_id: UserId, ids: &BTreeSet<RoleId>) -> Result<(), EngineError> {
        self.refuse()?;
        self.user_roles.lock().unwrap().insert(user_id, ids.clone());
        Ok(())
    }

    async fn create_role(&self, name: &str) -> Result<Role, EngineError> {
        self.refuse()?;
        Ok(Role {
            id: 100,
            name: name.into(),
            profiles: vec![],
        })
    }

    async fn delete_role(&self, _role_id: RoleId) -> Result<(), EngineError> {
        self.refuse()
    }
}
