use super::api_client::{ack, decode, ApiClient};
use crate::error::EngineError;
use crate::models::{FileAnalysisResult, FileType, RequestId, UploadFile};
use async_trait::async_trait;
use reqwest::{multipart, Method};

/// Remote file analyzer and processor.
#[async_trait]
pub trait FilePipeline: Send + Sync {
    async fn analyze(
        &self,
        file: &UploadFile,
        file_type: FileType,
    ) -> Result<FileAnalysisResult, EngineError>;

    /// Hand the file over for integration.
    async fn process(&self, file: &UploadFile, file_type: FileType)
        -> Result<ProcessReceipt, EngineError>;
}

/// Confirmation returned by the process endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReceipt {
    pub message: Option<String>,
    pub request_id: Option<RequestId>,
}

pub struct HttpFilePipeline {
    api: ApiClient,
}

impl HttpFilePipeline {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    fn form(file: &UploadFile) -> Result<multipart::Form, EngineError> {
        let part = multipart::Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(file.content_type())?;
        Ok(multipart::Form::new().part("file", part))
    }
}

#[async_trait]
impl FilePipeline for HttpFilePipeline {
    async fn analyze(
        &self,
        file: &UploadFile,
        file_type: FileType,
    ) -> Result<FileAnalysisResult, EngineError> {
        let form = Self::form(file)?;
        let value = self
            .api
            .execute(Method::POST, "/file/analyze-operation-file", |r| {
                r.query(&[("fileType", file_type.as_str())]).multipart(form)
            })
            .await
            .map_err(|e| match e {
                EngineError::RemoteStatus { message, .. } => EngineError::AnalysisFailed(message),
                other => other,
            })?;

        let reply = ack(value.clone())?;
        if !reply.is_success() {
            return Err(EngineError::AnalysisFailed(
                reply.message_or("The analyzer refused the file"),
            ));
        }

        let result: FileAnalysisResult = decode(value)
            .map_err(|e| EngineError::AnalysisFailed(format!("unreadable analysis: {}", e)))?;

        tracing::info!(
            file_name = %file.file_name,
            file_type = %file_type,
            total_operation = result.total_operation,
            total_debit = %result.total_debit,
            total_credit = %result.total_credit,
            "File analyzed"
        );

        Ok(result)
    }

    async fn process(
        &self,
        file: &UploadFile,
        file_type: FileType,
    ) -> Result<ProcessReceipt, EngineError> {
        let form = Self::form(file)?;
        let value = self
            .api
            .execute(Method::POST, "/file/process-file", |r| {
                r.query(&[("fileType", file_type.as_str())]).multipart(form)
            })
            .await?;

        let reply = ack(value)?;
        if !reply.is_success() {
            let message = reply.message_or("File processing was refused");
            tracing::warn!(file_name = %file.file_name, message = %message, "File processing refused");
            return Err(EngineError::Rejected(message));
        }

        let request_id = reply.data.as_ref().and_then(|data| {
            data.as_i64()
                .or_else(|| data.get("id").and_then(|id| id.as_i64()))
                .or_else(|| data.get("requestId").and_then(|id| id.as_i64()))
        });

        Ok(ProcessReceipt {
            message: reply.message,
            request_id,
        })
    }
}
