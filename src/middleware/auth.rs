use axum::{extract::FromRequestParts, http::header};

use crate::{
    error::AppError,
    models::ROLE_ADMIN,
    state::AppState,
    token::{decode_session_token, subject_id},
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::forbidden());
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, ROLE_ADMIN)
}

/// Allow the account owner or an administrator.
pub fn ensure_self_or_admin(user: &AuthUser, user_id: i64) -> Result<(), AppError> {
    if user.user_id == user_id || user.is_admin() {
        return Ok(());
    }
    Err(AppError::Forbidden("Not allowed to access another user".into()))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("No token provided".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = bearer_token(auth_str)
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let claims = decode_session_token(&state.config.jwt_secret, token)?;
        let user_id = subject_id(&claims.sub)?;

        // Tokens outlive deactivation; the stored flag wins.
        let active: Option<(bool,)> = sqlx::query_as("SELECT is_active FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.pool)
            .await?;
        match active {
            Some((true,)) => {}
            Some((false,)) => return Err(AppError::Unauthorized("Account is deactivated".into())),
            None => return Err(AppError::Unauthorized("User not found".into())),
        }

        Ok(AuthUser {
            user_id,
            email: claims.email,
            role: claims.role,
        })
    }
}

fn bearer_token(value: &str) -> Option<&str> {
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, role: &str) -> AuthUser {
        AuthUser {
            user_id: id,
            email: "x@y.z".into(),
            role: role.into(),
        }
    }

    #[test]
    fn bearer_scheme_is_required() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("abc.def"), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }

    #[test]
    fn owner_or_admin_guard() {
        assert!(ensure_self_or_admin(&user(1, "user"), 1).is_ok());
        assert!(ensure_self_or_admin(&user(9, "admin"), 1).is_ok());
        assert!(matches!(
            ensure_self_or_admin(&user(2, "user"), 1),
            Err(AppError::Forbidden(_))
        ));
        assert!(ensure_admin(&user(1, "user")).is_err());
        assert!(ensure_admin(&user(1, "admin")).is_ok());
    }
}
