//! Module access rules, as pure functions over a user's roles and profiles.

use crate::models::User;
use serde::{Deserialize, Serialize};

pub const DASHBOARD: &str = "dashboard";
pub const DEMANDES: &str = "demandes";
pub const GESTION_UTILISATEURS: &str = "gestion_utilisateurs";
pub const ROLES_PERMISSIONS: &str = "roles_permissions";

/// Granted to every authenticated user.
pub const BASELINE_MODULES: [&str; 2] = [DASHBOARD, DEMANDES];

pub const KNOWN_MODULES: [&str; 4] = [DASHBOARD, DEMANDES, GESTION_UTILISATEURS, ROLES_PERMISSIONS];

/// How non-admin users gain modules beyond the baseline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessModel {
    /// Baseline only.
    Baseline,
    /// Baseline plus every profile code reachable through the user's roles.
    #[default]
    ProfileCodes,
}

pub fn is_admin(user: &User) -> bool {
    user.roles.iter().any(|role| {
        let name = role.name.trim().to_lowercase();
        name.contains("admin") || name.contains("administrateur") || name == "super admin"
    })
}

/// Admins reach every module, including ones nobody has heard of.
/// Everyone else is denied unless the module is granted.
pub fn can_access(user: &User, module: &str, model: AccessModel) -> bool {
    if is_admin(user) {
        return true;
    }

    let module = module.trim();
    if module.is_empty() {
        return false;
    }
    if BASELINE_MODULES
        .iter()
        .any(|m| m.eq_ignore_ascii_case(module))
    {
        return true;
    }

    match model {
        AccessModel::Baseline => false,
        AccessModel::ProfileCodes => profile_codes(user).any(|code| code.eq_ignore_ascii_case(module)),
    }
}

/// Modules to show in navigation.
pub fn granted_modules(user: &User, model: AccessModel) -> Vec<String> {
    let mut modules: Vec<String> = if is_admin(user) {
        KNOWN_MODULES.iter().map(|m| m.to_string()).collect()
    } else {
        BASELINE_MODULES.iter().map(|m| m.to_string()).collect()
    };

    if model == AccessModel::ProfileCodes {
        for code in profile_codes(user) {
            let code = code.to_lowercase();
            if !modules.contains(&code) {
                modules.push(code);
            }
        }
    }

    modules
}

fn profile_codes(user: &User) -> impl Iterator<Item = &str> {
    user.roles
        .iter()
        .flat_map(|role| role.profiles.iter())
        .map(|profile| profile.code.trim())
        .filter(|code| !code.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{admin, plain_user, user_with_roles};

    #[test]
    fn test_admin_bypasses_every_check() {
        let admin = admin();
        assert!(can_access(&admin, "anything_undefined", AccessModel::Baseline));
        assert!(can_access(&admin, ROLES_PERMISSIONS, AccessModel::ProfileCodes));
    }

    #[test]
    fn test_admin_role_names() {
        for name in ["ADMIN", "Administrateur Principal", "super admin", "Sous-Admin"] {
            assert!(is_admin(&user_with_roles(&[(name, &[])])), "{name} should be admin");
        }
        for name in ["Operateur", "Auditeur", ""] {
            assert!(!is_admin(&user_with_roles(&[(name, &[])])), "{name} should not be admin");
        }
    }

    #[test]
    fn test_plain_user_gets_baseline_only() {
        let user = plain_user();
        assert!(can_access(&user, DASHBOARD, AccessModel::ProfileCodes));
        assert!(can_access(&user, "DEMANDES", AccessModel::ProfileCodes));
        assert!(!can_access(&user, ROLES_PERMISSIONS, AccessModel::ProfileCodes));
        assert!(!can_access(&user, "unknown_module", AccessModel::ProfileCodes));
        assert!(!can_access(&user, "", AccessModel::ProfileCodes));
    }

    #[test]
    fn test_profile_code_grants_module() {
        let user = user_with_roles(&[("Gestionnaire", &["ROLES_PERMISSIONS"])]);

        assert!(can_access(&user, ROLES_PERMISSIONS, AccessModel::ProfileCodes));
        assert!(!can_access(&user, ROLES_PERMISSIONS, AccessModel::Baseline));
        assert!(!can_access(&user, GESTION_UTILISATEURS, AccessModel::ProfileCodes));
    }

    #[test]
    fn test_granted_modules() {
        let user = user_with_roles(&[("Gestionnaire", &["gestion_utilisateurs", "DEMANDES"])]);
        assert_eq!(
            granted_modules(&user, AccessModel::ProfileCodes),
            vec![DASHBOARD, DEMANDES, GESTION_UTILISATEURS]
        );
        assert_eq!(granted_modules(&admin(), AccessModel::Baseline).len(), KNOWN_MODULES.len());
    }
}
