use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["xlsx", "xls", "csv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileType {
    FichierTraitementSalaire,
    FichierTraitementOperation,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::FichierTraitementSalaire => "FICHIER_TRAITEMENT_SALAIRE",
            FileType::FichierTraitementOperation => "FICHIER_TRAITEMENT_OPERATION",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FICHIER_TRAITEMENT_SALAIRE" => Ok(FileType::FichierTraitementSalaire),
            "FICHIER_TRAITEMENT_OPERATION" => Ok(FileType::FichierTraitementOperation),
            other => Err(format!("unknown file type '{}'", other)),
        }
    }
}

/// Aggregate totals returned by the remote file analyzer.
///
/// Only lives between analysis and submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysisResult {
    #[serde(default)]
    pub total_operation: u64,
    /// Unit is whatever the analyzer reports.
    #[serde(default)]
    pub file_size: Decimal,
    pub total_debit: Decimal,
    #[serde(alias = "totaCredit")]
    pub total_credit: Decimal,
    #[serde(rename = "isBalanced", default, skip_serializing)]
    pub reported_balanced: Option<bool>,
}

impl FileAnalysisResult {
    /// Balanced means debit equals credit. A remote verdict of "unbalanced"
    /// is honored, but a remote "balanced" never overrides the arithmetic.
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_credit && self.reported_balanced.unwrap_or(true)
    }
}

/// A file picked by the operator, held in memory until analysis.
#[derive(Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for UploadFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadFile")
            .field("file_name", &self.file_name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lower-cased extension, empty when the name has none.
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn has_allowed_extension(&self) -> bool {
        ALLOWED_EXTENSIONS.contains(&self.extension().as_str())
    }

    pub fn content_type(&self) -> &'static str {
        match self.extension().as_str() {
            "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            "xls" => "application/vnd.ms-excel",
            "csv" => "text/csv",
            _ => "application/octet-stream",
        }
    }
}
