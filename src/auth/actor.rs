use uuid::Uuid;

use crate::{
    auth::jwt::Claims,
    error::AppError,
    models::roles::{Role, RoleCatalog},
};

/// Identity of the caller, decoded once at the authentication boundary.
#[derive(Debug, Clone)]
pub struct Actor {
    /// `None` for the guest identity on public routes.
    pub user_id: Option<Uuid>,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub role_id: String,
    pub role_name: String,
}

impl Actor {
    pub fn guest(client_ip: Option<&str>) -> Self {
        Self {
            user_id: None,
            email: "public".to_string(),
            name: client_ip.unwrap_or("anonymous").to_string(),
            role: Role::Guest,
            role_id: "0".to_string(),
            role_name: Role::Guest.display_name().to_string(),
        }
    }

    pub fn from_claims(claims: Claims, catalog: &RoleCatalog) -> Result<Self, AppError> {
        let user_id = Uuid::parse_str(claims.user_id.trim())
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".to_string()))?;
        if user_id.is_nil() {
            return Err(AppError::Unauthorized(
                "Invalid user id in token".to_string(),
            ));
        }

        let role = match catalog.resolve(&claims.role_id) {
            Some(role) => role,
            None => {
                tracing::warn!(
                    role_id = %claims.role_id,
                    role_name = %claims.role_name,
                    "Unrecognised role id in token; treating caller as guest"
                );
                Role::Guest
            }
        };

        Ok(Self {
            user_id: Some(user_id),
            email: claims.user_email,
            name: claims.user_name,
            role,
            role_id: claims.role_id,
            role_name: claims.role_name,
        })
    }

    pub fn is_guest(&self) -> bool {
        self.user_id.is_none()
    }

    /// Returns the user id or fails with 401 for the guest identity.
    pub fn require_user_id(&self) -> Result<Uuid, AppError> {
        self.user_id
            .ok_or(AppError::Unauthorized("User not authenticated".to_string()))
    }

    pub fn owns(&self, owner_id: Option<Uuid>) -> bool {
        match (self.user_id, owner_id) {
            (Some(actor), Some(owner)) => actor == owner,
            _ => false,
        }
    }

    /// Label stamped into created_by/updated_by/deleted_by columns.
    pub fn label(&self) -> String {
        match self.user_id {
            Some(user_id) => user_id.to_string(),
            None if !self.name.is_empty() => self.name.clone(),
            None => self.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::tests::claims_for;

    #[test]
    fn resolves_role_from_role_id_not_name() {
        let user_id = Uuid::new_v4();
        let mut claims = claims_for(user_id, "5");
        claims.role_name = "Surveyor".to_string();

        let actor = Actor::from_claims(claims, &RoleCatalog::default()).unwrap();
        assert_eq!(actor.role, Role::VerificatorBalai);
        assert_eq!(actor.user_id, Some(user_id));
    }

    #[test]
    fn unknown_role_id_degrades_to_guest_role() {
        let actor =
            Actor::from_claims(claims_for(Uuid::new_v4(), "42"), &RoleCatalog::default()).unwrap();
        assert_eq!(actor.role, Role::Guest);
        assert!(!actor.is_guest());
    }

    #[test]
    fn rejects_malformed_user_id() {
        let mut claims = claims_for(Uuid::new_v4(), "6");
        claims.user_id = "17".to_string();
        let result = Actor::from_claims(claims, &RoleCatalog::default());
        assert!(matches!(result, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn guest_owns_nothing() {
        let guest = Actor::guest(Some("10.0.0.1"));
        assert!(guest.is_guest());
        assert!(!guest.owns(None));
        assert!(!guest.owns(Some(Uuid::new_v4())));
        assert_eq!(guest.label(), "10.0.0.1");
        assert!(matches!(
            guest.require_user_id(),
            Err(AppError::Unauthorized(_))
        ));
    }
}
