use super::identity::UserRef;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type RequestId = i64;

/// Lifecycle of the request as a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationStatus {
    EnTraitement,
    Integree,
    NonIntegrer,
    Rejetee,
    Annuler,
}

impl IntegrationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            IntegrationStatus::EnTraitement => "En traitement",
            IntegrationStatus::Integree => "Intégrée",
            IntegrationStatus::NonIntegrer => "Non intégrée",
            IntegrationStatus::Rejetee => "Rejetée",
            IntegrationStatus::Annuler => "Annulée",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationStatus::EnTraitement => "EN_TRAITEMENT",
            IntegrationStatus::Integree => "INTEGREE",
            IntegrationStatus::NonIntegrer => "NON_INTEGRER",
            IntegrationStatus::Rejetee => "REJETEE",
            IntegrationStatus::Annuler => "ANNULER",
        }
    }
}

/// Lifecycle of the validation decision on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    EnTraitement,
    #[serde(alias = "VALIDE")]
    Validee,
    NonValidee,
    Rejetee,
}

impl OperationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            OperationStatus::EnTraitement => "En traitement",
            OperationStatus::Validee => "Validée",
            OperationStatus::NonValidee => "Non validée",
            OperationStatus::Rejetee => "Rejetée",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::EnTraitement => "EN_TRAITEMENT",
            OperationStatus::Validee => "VALIDEE",
            OperationStatus::NonValidee => "NON_VALIDEE",
            OperationStatus::Rejetee => "REJETEE",
        }
    }
}

impl std::str::FromStr for OperationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EN_TRAITEMENT" => Ok(OperationStatus::EnTraitement),
            "VALIDEE" | "VALIDE" => Ok(OperationStatus::Validee),
            "NON_VALIDEE" => Ok(OperationStatus::NonValidee),
            "REJETEE" => Ok(OperationStatus::Rejetee),
            other => Err(format!("unknown operation status '{}'", other)),
        }
    }
}

/// A batch of financial operations submitted for processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationRequest {
    pub id: RequestId,
    #[serde(default)]
    pub reference: String,
    pub debit_amount: Decimal,
    pub credit_amount: Decimal,
    pub integration_status: IntegrationStatus,
    pub operation_status: OperationStatus,
    #[serde(default)]
    pub created_by: Option<UserRef>,
    #[serde(default)]
    pub validated_by: Option<UserRef>,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub validated_at: Option<NaiveDateTime>,
}

impl IntegrationRequest {
    pub fn is_balanced(&self) -> bool {
        self.debit_amount == self.credit_amount
    }

    /// `validatedAt` and `validatedBy` are set exactly when the request is validated.
    pub fn is_consistent(&self) -> bool {
        let validated = self.operation_status == OperationStatus::Validee;
        validated == self.validated_at.is_some() && validated == self.validated_by.is_some()
    }
}
