use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::Utc;
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set,
};

use crate::{
    audit,
    dto::auth::{
        ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, LoginResponse,
        RegisterRequest, ResetPasswordRequest, UpdateDetailsRequest,
    },
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    error::{AppError, AppResult, is_unique_violation},
    middleware::auth::AuthUser,
    models::{ROLE_ADMIN, ROLE_USER, User},
    response::{ApiResponse, Meta},
    state::AppState,
    token,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

pub fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

async fn find_by_email(state: &AppState, email: &str) -> AppResult<Option<UserModel>> {
    Ok(Users::find()
        .filter(UserCol::Email.eq(email))
        .one(&state.orm)
        .await?)
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        name,
        email,
        password,
        phone,
    } = payload;
    if is_blank(&name) || is_blank(&email) || password.is_empty() {
        return Err(AppError::BadRequest(
            "Please provide all required fields".into(),
        ));
    }
    let email = normalize_email(&email);

    if find_by_email(state, &email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&password)?;

    let inserted = UserActive {
        id: NotSet,
        name: Set(name.trim().to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        phone: Set(phone.filter(|p| !is_blank(p))),
        role: Set(ROLE_USER.to_string()),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await;

    // A concurrent registration can pass the pre-check; the unique index decides.
    let user = match inserted {
        Ok(user) => user,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        Err(err) => return Err(err.into()),
    };

    audit::record(
        &state.orm,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User registered successfully",
        User::from(user),
        None,
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { email, password } = payload;
    if is_blank(&email) || password.is_empty() {
        return Err(AppError::BadRequest(
            "Please provide email and password".into(),
        ));
    }

    let user = match find_by_email(state, &normalize_email(&email)).await? {
        Some(u) => u,
        None => return Err(AppError::Unauthorized("User not registered".into())),
    };

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Wrong password".into()));
    }

    if !user.is_active {
        return Err(AppError::Unauthorized("Account is deactivated".into()));
    }

    let token = token::issue_session_token(
        &state.config.jwt_secret,
        user.id,
        &user.email,
        &user.role,
    )?;

    audit::record(
        &state.orm,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    let resp = LoginResponse {
        token: format!("Bearer {}", token),
        user: User::from(user),
    };

    Ok(ApiResponse::success(
        "Login successful",
        resp,
        Some(Meta::empty()),
    ))
}

pub async fn check_user_auth(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let found = Users::find_by_id(user.user_id).one(&state.orm).await?;
    match found {
        Some(u) => Ok(ApiResponse::success("Authenticated", User::from(u), None)),
        None => Err(AppError::Unauthorized("User not found".into())),
    }
}

/// Re-checks the stored role, not just the token claim.
pub async fn check_admin_auth(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let found = Users::find_by_id(user.user_id)
        .filter(UserCol::Role.eq(ROLE_ADMIN))
        .one(&state.orm)
        .await?;
    match found {
        Some(u) => Ok(ApiResponse::success("Authenticated", User::from(u), None)),
        None => Err(AppError::forbidden()),
    }
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<ForgotPasswordResponse>> {
    if is_blank(&payload.email) {
        return Err(AppError::BadRequest("Please provide email".into()));
    }

    let user = match find_by_email(state, &normalize_email(&payload.email)).await? {
        Some(u) => u,
        None => return Err(AppError::NotFound("User")),
    };

    // No mail transport: the token goes back to the caller.
    let reset_token = token::issue_reset_token(&state.config.jwt_secret, user.id, &user.email)?;
    tracing::info!(user_id = user.id, "password reset token issued");

    Ok(ApiResponse::success(
        "Password reset link sent to email",
        ForgotPasswordResponse { reset_token },
        None,
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if is_blank(&payload.reset_token) || payload.new_password.is_empty() {
        return Err(AppError::BadRequest(
            "Please provide reset token and new password".into(),
        ));
    }

    let claims = token::decode_reset_token(&state.config.jwt_secret, payload.reset_token.trim())?;
    let user_id = token::subject_id(&claims.sub)?;

    let existing = match Users::find_by_id(user_id).one(&state.orm).await? {
        Some(u) => u,
        None => return Err(AppError::NotFound("User")),
    };

    let mut active: UserActive = existing.into();
    active.password_hash = Set(hash_password(&payload.new_password)?);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user_id),
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password reset successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn update_details(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateDetailsRequest,
) -> AppResult<ApiResponse<User>> {
    if payload.is_empty() {
        return Err(AppError::BadRequest("No update data provided".into()));
    }

    let existing = match Users::find_by_id(user.user_id).one(&state.orm).await? {
        Some(u) => u,
        None => return Err(AppError::NotFound("User")),
    };

    let mut active: UserActive = existing.clone().into();
    if let Some(name) = payload.name.filter(|n| !is_blank(n)) {
        active.name = Set(name.trim().to_string());
    }
    if let Some(email) = payload.email.filter(|e| !is_blank(e)) {
        let email = normalize_email(&email);
        if email != existing.email {
            if find_by_email(state, &email).await?.is_some() {
                return Err(AppError::Conflict("Email already registered".into()));
            }
            active.email = Set(email);
        }
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone).filter(|p| !is_blank(p)));
    }
    active.updated_at = Set(Utc::now().into());

    let updated = match active.update(&state.orm).await {
        Ok(u) => u,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::Conflict("Email already registered".into()));
        }
        Err(err) => return Err(err.into()),
    };

    Ok(ApiResponse::success(
        "Details updated successfully",
        User::from(updated),
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("s3cret").unwrap();
        assert_ne!(hash, "s3cret");
        assert!(verify_password("s3cret", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(normalize_email("  Foo@Example.COM "), "foo@example.com");
    }
}
