use serde::{Deserialize, Serialize};

/// System roles recognised by the authorization layer.
///
/// Tokens carry both a role id and a role name. Authorization keys on the
/// id through [`RoleCatalog`]; the name is kept for display and audit only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    AdminEselon1,
    VerificatorEselon1,
    AdminBalai,
    VerificatorBalai,
    Surveyor,
    Guest,
}

/// Approval stage a verificator acts on.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStage {
    Balai,
    Eselon1,
}

impl Role {
    /// Roles allowed to moderate any comment thread (person-in-charge set).
    pub fn is_pic(self) -> bool {
        !matches!(self, Self::Guest)
    }

    /// Roles whose visibility is restricted to their own balai.
    pub fn is_balai_scoped(self) -> bool {
        matches!(self, Self::AdminBalai | Self::VerificatorBalai)
    }

    /// Roles allowed to filter survey listings by arbitrary owner.
    pub fn can_filter_by_owner(self) -> bool {
        matches!(self, Self::SuperAdmin | Self::AdminEselon1)
    }

    pub fn verifier_stage(self) -> Option<ApprovalStage> {
        match self {
            Self::VerificatorBalai => Some(ApprovalStage::Balai),
            Self::VerificatorEselon1 => Some(ApprovalStage::Eselon1),
            _ => None,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::AdminEselon1 => "Admin Eselon 1",
            Self::VerificatorEselon1 => "Verificator Eselon 1",
            Self::AdminBalai => "Admin Balai",
            Self::VerificatorBalai => "Verificator Balai",
            Self::Surveyor => "Surveyor",
            Self::Guest => "Guest",
        }
    }
}

/// Maps the stable role ids stored in tokens onto [`Role`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleCatalog {
    pub super_admin: String,
    pub admin_eselon1: String,
    pub verificator_eselon1: String,
    pub admin_balai: String,
    pub verificator_balai: String,
    pub surveyor: String,
}

impl Default for RoleCatalog {
    fn default() -> Self {
        // Seed order of the roles table.
        Self {
            super_admin: "1".to_string(),
            admin_eselon1: "2".to_string(),
            verificator_eselon1: "3".to_string(),
            admin_balai: "4".to_string(),
            verificator_balai: "5".to_string(),
            surveyor: "6".to_string(),
        }
    }
}

impl RoleCatalog {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            super_admin: read_role_id("ROLE_ID_SUPER_ADMIN", defaults.super_admin),
            admin_eselon1: read_role_id("ROLE_ID_ADMIN_ESELON_1", defaults.admin_eselon1),
            verificator_eselon1: read_role_id(
                "ROLE_ID_VERIFICATOR_ESELON_1",
                defaults.verificator_eselon1,
            ),
            admin_balai: read_role_id("ROLE_ID_ADMIN_BALAI", defaults.admin_balai),
            verificator_balai: read_role_id(
                "ROLE_ID_VERIFICATOR_BALAI",
                defaults.verificator_balai,
            ),
            surveyor: read_role_id("ROLE_ID_SURVEYOR", defaults.surveyor),
        }
    }

    /// Resolves a token role id. Unknown ids resolve to `None`.
    pub fn resolve(&self, role_id: &str) -> Option<Role> {
        let role_id = role_id.trim();
        if role_id.is_empty() {
            return None;
        }
        [
            (&self.super_admin, Role::SuperAdmin),
            (&self.admin_eselon1, Role::AdminEselon1),
            (&self.verificator_eselon1, Role::VerificatorEselon1),
            (&self.admin_balai, Role::AdminBalai),
            (&self.verificator_balai, Role::VerificatorBalai),
            (&self.surveyor, Role::Surveyor),
        ]
        .into_iter()
        .find(|(id, _)| id.as_str() == role_id)
        .map(|(_, role)| role)
    }
}

fn read_role_id(key: &str, fallback: String) -> String {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::{ApprovalStage, Role, RoleCatalog};

    #[test]
    fn resolves_default_role_ids() {
        let catalog = RoleCatalog::default();
        assert_eq!(catalog.resolve("1"), Some(Role::SuperAdmin));
        assert_eq!(catalog.resolve("5"), Some(Role::VerificatorBalai));
        assert_eq!(catalog.resolve(" 6 "), Some(Role::Surveyor));
        assert_eq!(catalog.resolve("99"), None);
        assert_eq!(catalog.resolve(""), None);
    }

    #[test]
    fn pic_set_covers_every_system_role() {
        assert!(Role::Surveyor.is_pic());
        assert!(Role::AdminBalai.is_pic());
        assert!(Role::VerificatorBalai.is_pic());
        assert!(Role::AdminEselon1.is_pic());
        assert!(Role::VerificatorEselon1.is_pic());
        assert!(Role::SuperAdmin.is_pic());
        assert!(!Role::Guest.is_pic());
    }

    #[test]
    fn only_verificators_have_an_approval_stage() {
        assert_eq!(Role::VerificatorBalai.verifier_stage(), Some(ApprovalStage::Balai));
        assert_eq!(
            Role::VerificatorEselon1.verifier_stage(),
            Some(ApprovalStage::Eselon1)
        );
        assert_eq!(Role::AdminBalai.verifier_stage(), None);
        assert_eq!(Role::SuperAdmin.verifier_stage(), None);
    }
}
