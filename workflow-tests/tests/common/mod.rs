//! Common setup for workflow scenarios.
#![allow(dead_code)]

use integration_engine::models::{FileType, UploadFile};
use integration_engine::EngineContext;
use serde_json::Value;
use workflow_tests::BackOffice;

/// Start a back office with `user` and sign in against it.
pub async fn setup(user: Value) -> (BackOffice, EngineContext) {
    let office = BackOffice::start(user).await;
    let context = office.sign_in().await.expect("Failed to sign in");
    (office, context)
}

pub fn salary_file() -> (UploadFile, Option<FileType>) {
    (
        UploadFile::new("virements_mars.xlsx", b"PK\x03\x04 salary rows".to_vec()),
        Some(FileType::FichierTraitementSalaire),
    )
}
