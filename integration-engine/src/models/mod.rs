pub mod analysis;
pub mod identity;
pub mod page;
pub mod request;

pub use analysis::{FileAnalysisResult, FileType, UploadFile};
pub use identity::{Profile, ProfileId, Role, RoleId, User, UserId, UserRef};
pub use page::Page;
pub use request::{IntegrationRequest, IntegrationStatus, OperationStatus, RequestId};
