pub mod api_client;
pub mod file_pipeline;
pub mod identity_store;
pub mod request_store;

pub use api_client::{ApiAck, ApiBody, ApiClient};
pub use file_pipeline::{FilePipeline, HttpFilePipeline, ProcessReceipt};
pub use identity_store::{HttpIdentityStore, IdentityStore};
pub use request_store::{HttpRequestStore, MutationReply, RequestStore};
