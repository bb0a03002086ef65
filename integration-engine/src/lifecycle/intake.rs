//! Two-phase intake of a new request: `IntakeDraft` → `AnalyzedIntake` → `SubmittedIntake`.
//!
//! Each phase consumes the previous one, so a file cannot be submitted
//! without having been analyzed, and an analysis cannot outlive its file.

use super::transitions::RequestState;
use crate::config::UploadSettings;
use crate::error::EngineError;
use crate::models::{FileAnalysisResult, FileType, RequestId, UploadFile};
use crate::services::{FilePipeline, ProcessReceipt};
use metrics::counter;
use std::fmt;

/// A file picked by the operator that passed the local checks.
#[derive(Debug)]
pub struct IntakeDraft {
    file: UploadFile,
    file_type: FileType,
}

impl IntakeDraft {
    pub fn new(
        file: UploadFile,
        file_type: Option<FileType>,
        limits: &UploadSettings,
    ) -> Result<Self, EngineError> {
        let file_type = file_type.ok_or(EngineError::MissingFileType)?;

        if !file.has_allowed_extension() {
            return Err(EngineError::InvalidFileType {
                extension: file.extension(),
            });
        }
        if file.bytes.is_empty() {
            return Err(EngineError::EmptyFile);
        }
        if file.size() >= limits.max_file_size_bytes {
            return Err(EngineError::FileTooLarge {
                size: file.size(),
                limit: limits.max_file_size_bytes,
            });
        }

        Ok(Self { file, file_type })
    }

    pub fn file_name(&self) -> &str {
        &self.file.file_name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Ask the remote analyzer for the file's totals. There is no retry: on
    /// failure the operator uploads the file again.
    pub async fn analyze(self, pipeline: &dyn FilePipeline) -> Result<AnalyzedIntake, EngineError> {
        match pipeline.analyze(&self.file, self.file_type).await {
            Ok(analysis) => {
                counter!("intake_analyses_total", "outcome" => "analyzed").increment(1);
                Ok(AnalyzedIntake {
                    file: self.file,
                    file_type: self.file_type,
                    analysis,
                })
            }
            Err(e) => {
                counter!("intake_analyses_total", "outcome" => "failed").increment(1);
                tracing::warn!(file_name = %self.file.file_name, error = %e, "File analysis failed");
                Err(e)
            }
        }
    }
}

/// A file with its analysis, ready to be submitted if balanced.
#[derive(Debug)]
pub struct AnalyzedIntake {
    file: UploadFile,
    file_type: FileType,
    analysis: FileAnalysisResult,
}

impl AnalyzedIntake {
    pub fn analysis(&self) -> &FileAnalysisResult {
        &self.analysis
    }

    pub fn file_name(&self) -> &str {
        &self.file.file_name
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn is_balanced(&self) -> bool {
        self.analysis.is_balanced()
    }

    /// Submit the file for integration.
    ///
    /// An unbalanced file is refused locally and never reaches the service.
    /// On any failure the intake is handed back so the operator can retry.
    pub async fn submit(self, pipeline: &dyn FilePipeline) -> Result<SubmittedIntake, SubmitFailure> {
        if !self.is_balanced() {
            counter!("intake_submissions_total", "outcome" => "unbalanced").increment(1);
            tracing::warn!(
                file_name = %self.file.file_name,
                total_debit = %self.analysis.total_debit,
                total_credit = %self.analysis.total_credit,
                "Refusing to submit an unbalanced file"
            );
            let error = EngineError::UnbalancedFile {
                debit: self.analysis.total_debit,
                credit: self.analysis.total_credit,
            };
            return Err(SubmitFailure {
                intake: self,
                error,
            });
        }

        match pipeline.process(&self.file, self.file_type).await {
            Ok(receipt) => {
                counter!("intake_submissions_total", "outcome" => "submitted").increment(1);
                tracing::info!(
                    file_name = %self.file.file_name,
                    request_id = ?receipt.request_id,
                    state = %RequestState::INITIAL,
                    "File submitted for integration"
                );
                Ok(SubmittedIntake {
                    file_name: self.file.file_name,
                    file_type: self.file_type,
                    analysis: self.analysis,
                    receipt,
                })
            }
            Err(error) => {
                counter!("intake_submissions_total", "outcome" => "failed").increment(1);
                tracing::warn!(file_name = %self.file.file_name, error = %error, "File submission failed");
                Err(SubmitFailure {
                    intake: self,
                    error,
                })
            }
        }
    }
}

#[derive(Debug)]
pub struct SubmittedIntake {
    pub file_name: String,
    pub file_type: FileType,
    pub analysis: FileAnalysisResult,
    pub receipt: ProcessReceipt,
}

impl SubmittedIntake {
    pub fn request_id(&self) -> Option<RequestId> {
        self.receipt.request_id
    }

    pub fn initial_state(&self) -> RequestState {
        RequestState::INITIAL
    }
}

/// A refused submission, carrying the intake back to the caller.
#[derive(Debug)]
pub struct SubmitFailure {
    pub intake: AnalyzedIntake,
    pub error: EngineError,
}

impl fmt::Display for SubmitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for SubmitFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<SubmitFailure> for EngineError {
    fn from(failure: SubmitFailure) -> Self {
        failure.error
    }
}
