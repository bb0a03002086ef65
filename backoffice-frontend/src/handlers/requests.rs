use super::{bad_request, invalid, page_request, page_response};
use crate::models::{Operator, PageResponse, RequestView};
use crate::AppState;
use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use integration_engine::lifecycle::{CancelOutcome, RequestState, ValidationOutcome};
use integration_engine::models::{FileAnalysisResult, FileType, RequestId, UploadFile};
use integration_engine::query::RequestFilter;
use integration_engine::EngineError;
use serde::Serialize;
use service_core::error::AppError;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub intake_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub analysis: FileAnalysisResult,
    pub balanced: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub request_id: Option<RequestId>,
    pub file_name: String,
    pub state: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub outcome: &'static str,
    pub request: RequestView,
}

fn number_param(params: &HashMap<String, String>, key: &str) -> Result<Option<u32>, AppError> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<u32>()
                .map_err(|_| invalid(format!("{} must be a positive number, got '{}'", key, v)))
        })
        .transpose()
}

pub async fn list_requests(
    operator: Operator,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PageResponse<RequestView>>, AppError> {
    let filter = RequestFilter::from_params(&params)?;
    let page = page_request(number_param(&params, "page")?, number_param(&params, "size")?)?;

    let outcome = operator.context.queries().search(&filter, page).await;
    let context = operator.context.clone();
    page_response(&operator, outcome, |request| RequestView::new(&context, request)).await
}

/// Phase one of an intake: check the file locally, then have it analyzed.
/// The analyzed intake is kept server-side until it is submitted.
pub async fn analyze(
    State(state): State<AppState>,
    operator: Operator,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut file = None;
    let mut file_type = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_request)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(bad_request)?;
                file = Some(UploadFile::new(file_name, bytes.to_vec()));
            }
            Some("fileType") => {
                let value = field.text().await.map_err(bad_request)?;
                if !value.trim().is_empty() {
                    file_type = Some(value.parse::<FileType>().map_err(invalid)?);
                }
            }
            _ => {}
        }
    }

    let file = file.ok_or(EngineError::EmptyFile)?;
    let draft = operator.context.draft(file, file_type)?;
    let owner = operator.user().await?;
    let intake = operator
        .settle(draft.analyze(operator.context.files()).await)
        .await?;

    let file_name = intake.file_name().to_string();
    let file_type = intake.file_type();
    let analysis = intake.analysis().clone();
    let balanced = intake.is_balanced();
    let intake_id = state.intakes.put(owner.id, intake);

    tracing::info!(%intake_id, file = %file_name, balanced, "File analyzed");
    Ok(Json(AnalysisResponse {
        intake_id,
        file_name,
        file_type,
        analysis,
        balanced,
    }))
}

/// Phase two: send an analyzed file for processing.
///
/// A refused submission leaves the intake in place so it can be retried,
/// unless the file is unbalanced and can never be accepted.
pub async fn submit(
    State(state): State<AppState>,
    operator: Operator,
    Path(intake_id): Path<Uuid>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let owner = operator.user().await?;
    let intake = state
        .intakes
        .take(intake_id, owner.id)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("no analyzed file {}", intake_id)))?;

    match intake.submit(operator.context.files()).await {
        Ok(submitted) => Ok(Json(SubmissionResponse {
            request_id: submitted.request_id(),
            state: submitted.initial_state(),
            message: submitted.receipt.message.clone(),
            file_name: submitted.file_name,
        })),
        Err(failure) => {
            if !matches!(failure.error, EngineError::UnbalancedFile { .. }) {
                state.intakes.restore(intake_id, owner.id, failure.intake);
            }
            Err(operator.fail(failure.error).await)
        }
    }
}

pub async fn validate(
    operator: Operator,
    Path(id): Path<RequestId>,
) -> Result<Json<TransitionResponse>, AppError> {
    let outcome = operator.settle(operator.context.validate(id).await).await?;
    let (label, request) = match outcome {
        ValidationOutcome::Validated(r) => ("VALIDATED", r),
        ValidationOutcome::AlreadyValidated(r) => ("ALREADY_VALIDATED", r),
    };

    Ok(Json(TransitionResponse {
        outcome: label,
        request: RequestView::new(&operator.context, request),
    }))
}

pub async fn cancel(
    operator: Operator,
    Path(id): Path<RequestId>,
) -> Result<Json<TransitionResponse>, AppError> {
    let outcome = operator.settle(operator.context.cancel(id).await).await?;
    let (label, request) = match outcome {
        CancelOutcome::Cancelled(r) => ("CANCELLED", r),
        CancelOutcome::AlreadyCancelled(r) => ("ALREADY_CANCELLED", r),
    };

    Ok(Json(TransitionResponse {
        outcome: label,
        request: RequestView::new(&operator.context, request),
    }))
}
