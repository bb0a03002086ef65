use crate::error::EngineError;
use crate::models::{OperationStatus, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
const NEWEST_FIRST: &str = "createdAt,desc";

/// Filters accepted by the request search. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_status: Option<OperationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl RequestFilter {
    /// Build a filter from loose key/value parameters.
    ///
    /// Unknown keys and blank values are ignored. A value that cannot be
    /// parsed, or a date range that ends before it starts, is an error.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, EngineError> {
        let value = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
        };

        let filter = Self {
            reference: value("reference").map(str::to_string),
            operation_status: value("operationStatus")
                .map(|v| v.parse::<OperationStatus>())
                .transpose()
                .map_err(EngineError::InvalidInput)?,
            created_by_id: value("createdById")
                .map(|v| {
                    v.parse::<UserId>()
                        .map_err(|_| EngineError::InvalidInput(format!("invalid createdById '{}'", v)))
                })
                .transpose()?,
            start_date: value("startDate").map(|v| parse_date("startDate", v)).transpose()?,
            end_date: value("endDate").map(|v| parse_date("endDate", v)).transpose()?,
        };

        filter.check_range()?;
        Ok(filter)
    }

    pub fn check_range(&self) -> Result<(), EngineError> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(EngineError::InvalidInput(format!(
                "startDate {} is after endDate {}",
                start, end
            ))),
            _ => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate, EngineError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| EngineError::InvalidInput(format!("{} must be YYYY-MM-DD, got '{}'", key, value)))
}

/// 1-based page as the operator sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Result<Self, EngineError> {
        if page == 0 {
            return Err(EngineError::InvalidInput("page numbers start at 1".into()));
        }
        if size == 0 || size > MAX_PAGE_SIZE {
            return Err(EngineError::InvalidInput(format!(
                "page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(Self { page, size })
    }

    pub fn first(size: u32) -> Result<Self, EngineError> {
        Self::new(1, size)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn remote(&self) -> RemotePage {
        RemotePage {
            page: self.page - 1,
            size: self.size,
        }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// 0-based page as the remote store expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemotePage {
    pub page: u32,
    pub size: u32,
}

/// Body of `POST /requests`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    #[serde(flatten)]
    pub filter: RequestFilter,
    pub page: u32,
    pub size: u32,
    pub sort: String,
}

impl SearchQuery {
    pub fn new(filter: &RequestFilter, page: PageRequest) -> Self {
        let remote = page.remote();
        Self {
            filter: filter.clone(),
            page: remote.page,
            size: remote.size,
            sort: NEWEST_FIRST.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matricule: Option<String>,
}

impl UserFilter {
    pub fn normalized(self) -> Self {
        Self {
            first_name: non_blank(self.first_name),
            last_name: non_blank(self.last_name),
            matricule: non_blank(self.matricule),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RoleFilter {
    pub fn normalized(self) -> Self {
        Self {
            name: non_blank(self.name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ProfileFilter {
    pub fn normalized(self) -> Self {
        Self {
            code: non_blank(self.code),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
