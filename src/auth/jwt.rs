use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Deserializer, Serialize};

/// Claims issued by the identity provider for an authenticated user.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub user_id: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(deserialize_with = "string_or_number")]
    pub role_id: String,
    #[serde(default)]
    pub role_name: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        if secret.is_empty() {
            tracing::warn!("JWT_SECRET is empty; every bearer token will be rejected");
        }
        let issuer = std::env::var("JWT_ISSUER")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let audience = std::env::var("JWT_AUDIENCE")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self {
            secret,
            issuer,
            audience,
        }
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        if self.secret.is_empty() {
            return Err(jsonwebtoken::errors::Error::from(
                jsonwebtoken::errors::ErrorKind::InvalidKeyFormat,
            ));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &self.audience {
            validation.set_audience(&[audience]);
        } else {
            validation.validate_aud = false;
        }
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
impl JwtConfig {
    pub fn create_token(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{EncodingKey, Header, encode};

        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }
}

// Role ids are emitted as numbers by some issuers and strings by others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(value) => value,
        RawId::Number(value) => value.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    pub(crate) fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "secret".to_string(),
            issuer: None,
            audience: None,
        }
    }

    pub(crate) fn claims_for(user_id: uuid::Uuid, role_id: &str) -> Claims {
        Claims {
            user_id: user_id.to_string(),
            user_email: "surveyor@example.com".to_string(),
            user_name: "Surveyor".to_string(),
            role_id: role_id.to_string(),
            role_name: "Surveyor".to_string(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Some(Utc::now().timestamp()),
            iss: None,
            aud: None,
        }
    }

    #[test]
    fn verifies_issued_token() {
        let config = test_config();
        let user_id = uuid::Uuid::new_v4();
        let token = config.create_token(&claims_for(user_id, "6")).unwrap();

        let claims = config.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, user_id.to_string());
        assert_eq!(claims.role_id, "6");
    }

    #[test]
    fn accepts_numeric_role_id() {
        let config = test_config();

        #[derive(Serialize)]
        struct NumericRoleClaims {
            user_id: String,
            role_id: i64,
            role_name: String,
            exp: i64,
        }

        let token = encode(
            &Header::new(Algorithm::HS256),
            &NumericRoleClaims {
                user_id: uuid::Uuid::new_v4().to_string(),
                role_id: 5,
                role_name: "Verificator Balai".to_string(),
                exp: (Utc::now() + Duration::hours(1)).timestamp(),
            },
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        let claims = config.verify_token(&token).unwrap();
        assert_eq!(claims.role_id, "5");
        assert!(claims.user_email.is_empty());
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let config = test_config();
        let other = JwtConfig {
            secret: "other".to_string(),
            issuer: None,
            audience: None,
        };
        let token = other
            .create_token(&claims_for(uuid::Uuid::new_v4(), "1"))
            .unwrap();

        assert!(config.verify_token(&token).is_err());
    }

    #[test]
    fn rejects_everything_without_secret() {
        let config = JwtConfig {
            secret: String::new(),
            issuer: None,
            audience: None,
        };
        let token = test_config()
            .create_token(&claims_for(uuid::Uuid::new_v4(), "1"))
            .unwrap();

        assert!(config.verify_token(&token).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let config = test_config();
        let mut claims = claims_for(uuid::Uuid::new_v4(), "6");
        claims.exp = (Utc::now() - Duration::hours(2)).timestamp();
        let token = config.create_token(&claims).unwrap();

        assert!(config.verify_token(&token).is_err());
    }
}
