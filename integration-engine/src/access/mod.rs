pub mod assignment;
pub mod permissions;
pub mod resolver;

pub use assignment::{available, search_profiles, Assignable, MembershipDraft, RoleProfileAssignment};
pub use permissions::{
    can_access, granted_modules, is_admin, AccessModel, BASELINE_MODULES, DASHBOARD, DEMANDES,
    GESTION_UTILISATEURS, KNOWN_MODULES, ROLES_PERMISSIONS,
};
pub use resolver::PermissionResolver;
