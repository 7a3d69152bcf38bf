use sqlx::PgPool;
use uuid::Uuid;

use crate::{auth::actor::Actor, models::roles::Role, repositories::profiles as profile_repo};

/// Which surveys an actor may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurveyScope {
    All,
    Owner(Uuid),
    Balai(i64),
    Nothing,
}

/// Scope flattened into query parameters. Every listing query binds all four.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeBinds {
    pub owner_id: Option<Uuid>,
    pub balai_id: Option<i64>,
    pub deny_all: bool,
    pub include_drafts: bool,
}

impl SurveyScope {
    pub fn resolve(role: Role, actor_id: Option<Uuid>, balai_id: Option<i64>) -> Self {
        match role {
            Role::SuperAdmin | Role::AdminEselon1 | Role::VerificatorEselon1 | Role::Guest => {
                Self::All
            }
            Role::Surveyor => actor_id.map_or(Self::Nothing, Self::Owner),
            Role::AdminBalai | Role::VerificatorBalai => {
                balai_id.map_or(Self::Nothing, Self::Balai)
            }
        }
    }

    /// Drafts are only visible when the scope is restricted to their owner.
    pub fn includes_drafts(&self) -> bool {
        matches!(self, Self::Owner(_))
    }

    pub fn permits(&self, owner_id: Uuid, owner_balai_id: Option<i64>, is_submitted: bool) -> bool {
        if !is_submitted && !self.includes_drafts() {
            return false;
        }
        match self {
            Self::All => true,
            Self::Owner(id) => *id == owner_id,
            Self::Balai(balai) => owner_balai_id == Some(*balai),
            Self::Nothing => false,
        }
    }

    pub fn binds(&self) -> ScopeBinds {
        ScopeBinds {
            owner_id: match self {
                Self::Owner(id) => Some(*id),
                _ => None,
            },
            balai_id: match self {
                Self::Balai(balai) => Some(*balai),
                _ => None,
            },
            deny_all: matches!(self, Self::Nothing),
            include_drafts: self.includes_drafts(),
        }
    }
}

/// Resolves the scope for an actor, loading the profile balai when needed.
/// A failed lookup degrades to [`SurveyScope::Nothing`].
pub async fn resolve_scope(pool: &PgPool, actor: &Actor) -> SurveyScope {
    if !actor.role.is_balai_scoped() {
        return SurveyScope::resolve(actor.role, actor.user_id, None);
    }

    let Some(user_id) = actor.user_id else {
        return SurveyScope::Nothing;
    };

    match profile_repo::find_balai_id(pool, user_id).await {
        Ok(balai_id) => {
            if balai_id.is_none() {
                tracing::warn!(user_id = %user_id, role = ?actor.role, "Balai role without balai");
            }
            SurveyScope::resolve(actor.role, actor.user_id, balai_id)
        }
        Err(error) => {
            tracing::warn!(
                user_id = %user_id,
                error = %error,
                "Profile lookup failed; scope closed"
            );
            SurveyScope::Nothing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surveyor_is_restricted_to_own_surveys() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        let scope = SurveyScope::resolve(Role::Surveyor, Some(me), None);

        assert_eq!(scope, SurveyScope::Owner(me));
        assert!(scope.permits(me, None, false));
        assert!(scope.permits(me, Some(3), true));
        assert!(!scope.permits(other, None, true));
    }

    #[test]
    fn balai_roles_see_only_their_balai() {
        for role in [Role::AdminBalai, Role::VerificatorBalai] {
            let scope = SurveyScope::resolve(role, Some(Uuid::new_v4()), Some(7));
            assert_eq!(scope, SurveyScope::Balai(7));
            assert!(scope.permits(Uuid::new_v4(), Some(7), true));
            assert!(!scope.permits(Uuid::new_v4(), Some(8), true));
            assert!(!scope.permits(Uuid::new_v4(), None, true));
        }
    }

    #[test]
    fn balai_role_without_balai_sees_nothing() {
        let scope = SurveyScope::resolve(Role::VerificatorBalai, Some(Uuid::new_v4()), None);
        assert_eq!(scope, SurveyScope::Nothing);
        assert!(!scope.permits(Uuid::new_v4(), Some(1), true));
        assert!(scope.binds().deny_all);
    }

    #[test]
    fn unrestricted_roles_never_see_drafts() {
        for role in [
            Role::SuperAdmin,
            Role::AdminEselon1,
            Role::VerificatorEselon1,
            Role::Guest,
        ] {
            let scope = SurveyScope::resolve(role, None, None);
            assert_eq!(scope, SurveyScope::All);
            assert!(scope.permits(Uuid::new_v4(), None, true));
            assert!(!scope.permits(Uuid::new_v4(), None, false));
        }
    }

    #[test]
    fn surveyor_without_id_sees_nothing() {
        assert_eq!(
            SurveyScope::resolve(Role::Surveyor, None, None),
            SurveyScope::Nothing
        );
    }

    #[test]
    fn binds_mirror_the_scope() {
        let me = Uuid::new_v4();
        assert_eq!(
            SurveyScope::Owner(me).binds(),
            ScopeBinds {
                owner_id: Some(me),
                balai_id: None,
                deny_all: false,
                include_drafts: true,
            }
        );
        assert_eq!(
            SurveyScope::Balai(4).binds(),
            ScopeBinds {
                owner_id: None,
                balai_id: Some(4),
                deny_all: false,
                include_drafts: false,
            }
        );
        assert_eq!(
            SurveyScope::All.binds(),
            ScopeBinds {
                owner_id: None,
                balai_id: None,
                deny_all: false,
                include_drafts: false,
            }
        );
    }
}
