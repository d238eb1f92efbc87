use chrono::Duration;
use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::SignWithKey;
use jwt::VerifyWithKey;
use serde::Deserialize;
use serde::Serialize;
use sha2::Sha256;

use crate::error::ApiError;
use crate::schema::{Id, User, UserRole};

use super::permissions::ActionType;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtSessionData {
    pub user_id: Id,
    pub role: UserRole,
    iat: i64,
    exp: i64,
}

impl JwtSessionData {
    pub fn new(id: Id, role: UserRole, lifetime: Duration) -> Self {
        let now = Local::now();
        let iat = now.timestamp();
        let exp = (now + lifetime).timestamp();

        Self {
            user_id: id,
            role,
            iat,
            exp,
        }
    }

    pub fn expires_at(&self) -> i64 {
        self.exp
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionData {
    pub user_id: Id,
    pub role: UserRole,
}

impl SessionData {
    pub fn authenticate(&self, action: ActionType) -> Result<(), ApiError> {
        if !action.authenticate(self) {
            return Err(ApiError::forbidden());
        }
        Ok(())
    }

    /// Owners may always touch their own rows, admins may touch any.
    pub fn authenticate_owner(
        &self,
        owner_id: Id,
        own: ActionType,
        all: ActionType,
    ) -> Result<(), ApiError> {
        self.authenticate(own)?;

        if owner_id == self.user_id || self.authenticate(all).is_ok() {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

impl From<JwtSessionData> for SessionData {
    fn from(value: JwtSessionData) -> Self {
        SessionData {
            user_id: value.user_id,
            role: value.role,
        }
    }
}

fn signing_key(secret: &str) -> Result<Hmac<Sha256>, ApiError> {
    Hmac::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiError::Internal(format!("Invalid signing key: {e}")))
}

pub fn generate_jwt_session(
    user: &User,
    secret: &str,
    lifetime_hours: i64,
) -> Result<String, ApiError> {
    let key = signing_key(secret)?;
    let claims = JwtSessionData::new(user.id, user.role.to_owned(), Duration::hours(lifetime_hours));

    claims
        .sign_with_key(&key)
        .map_err(|e| ApiError::Internal(format!("Failed to sign session: {e}")))
}

pub fn verify_jwt_session(token: &str, secret: &str) -> Result<JwtSessionData, ApiError> {
    let key = signing_key(secret)?;

    let session: JwtSessionData = token
        .verify_with_key(&key)
        .map_err(|_| ApiError::Unauthorized(String::from("Invalid token.")))?;

    let now = Local::now().timestamp();
    if session.expires_at() < now {
        return Err(ApiError::Unauthorized(String::from("Token expired.")));
    }

    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole) -> User {
        User {
            id: 7,
            email: String::from("cook@example.com"),
            username: String::from("cook"),
            first_name: String::from("Ada"),
            last_name: String::from("Lovelace"),
            password: String::new(),
            role,
        }
    }

    #[test]
    fn token_round_trips_claims() {
        let token = generate_jwt_session(&user(UserRole::Admin), "secret", 1).unwrap();
        let session: SessionData = verify_jwt_session(&token, "secret").unwrap().into();

        assert_eq!(session.user_id, 7);
        assert_eq!(session.role, UserRole::Admin);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = generate_jwt_session(&user(UserRole::User), "secret", 1).unwrap();
        assert!(matches!(
            verify_jwt_session(&token, "other"),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = generate_jwt_session(&user(UserRole::User), "secret", -1).unwrap();
        assert!(matches!(
            verify_jwt_session(&token, "secret"),
            Err(ApiError::Unauthorized(info)) if info.contains("expired")
        ));
    }

    #[test]
    fn non_owner_needs_manage_all() {
        let session: SessionData = JwtSessionData::new(1, UserRole::User, Duration::hours(1)).into();

        assert!(session
            .authenticate_owner(1, ActionType::ManageOwnRecipes, ActionType::ManageAllRecipes)
            .is_ok());
        assert!(matches!(
            session.authenticate_owner(
                2,
                ActionType::ManageOwnRecipes,
                ActionType::ManageAllRecipes
            ),
            Err(ApiError::Forbidden(_))
        ));
    }
}
