//! HS256 session tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use domains::{DomainError, IssuedToken, Result, SessionClaims, TokenIssuer, User};

pub struct JwtIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtIssuer {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::hours(ttl_hours),
        }
    }
}

impl TokenIssuer for JwtIssuer {
    fn issue(&self, user: &User) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = SessionClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            departments: user.department_ids.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(DomainError::internal)?;
        Ok(IssuedToken { token, expires_at })
    }

    fn verify(&self, token: &str) -> Result<SessionClaims> {
        decode::<SessionClaims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(|err| {
                tracing::debug!(error = %err, "rejected session token");
                DomainError::InvalidToken
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::Role;

    fn user() -> User {
        User {
            id: 42,
            first_name: "Sara".into(),
            last_name: "Gallo".into(),
            email: "sara.gallo@company.com".into(),
            password_hash: String::new(),
            role: Role::Administrator,
            is_active: true,
            department_ids: vec![1, 3],
            created_at: Utc::now(),
            last_access: None,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let issuer = JwtIssuer::new("test-secret", 24);
        let issued = issuer.issue(&user()).unwrap();
        let claims = issuer.verify(&issued.token).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, Role::Administrator);
        assert_eq!(claims.departments, vec![1, 3]);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = JwtIssuer::new("one", 24).issue(&user()).unwrap().token;
        let err = JwtIssuer::new("two", 24).verify(&token).unwrap_err();
        assert!(matches!(err, DomainError::InvalidToken));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = JwtIssuer::new("test-secret", -2);
        let token = issuer.issue(&user()).unwrap().token;
        assert!(matches!(issuer.verify(&token), Err(DomainError::InvalidToken)));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let issuer = JwtIssuer::new("test-secret", 24);
        assert!(matches!(issuer.verify("not.a.jwt"), Err(DomainError::InvalidToken)));
    }
}
