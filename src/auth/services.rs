use axum::extract::FromRef;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::email::{spawn_password_reset, spawn_welcome};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::User;

use super::codes::{generate_activation_code, generate_reset_token};
use super::dto::{
    ForgotPasswordRequest, LoginRequest, RefreshTokenRequest, RegisterRequest,
    ResendVerificationRequest, ResetPasswordRequest, TokenPairResponse, VerifyEmailRequest,
};
use super::password::{hash_password, verify_password};
use super::token::TokenKeys;

/// Shared by every login failure branch so responses never reveal whether the
/// email exists, is deleted, or had a wrong password.
pub const INVALID_CREDENTIALS: &str = "Invalid credentials!";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require_valid_email(email: &str) -> Result<(), ApiError> {
    if is_valid_email(email) {
        Ok(())
    } else {
        Err(ApiError::Validation(vec!["email is invalid".into()]))
    }
}

/// What a registration attempt does, given the record currently holding the
/// email. Verified wins over deleted, matching the upstream check order.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum RegisterAction {
    Create,
    Overwrite(Uuid),
    RejectVerified,
    RejectDeleted,
}

pub(crate) fn classify_registration(existing: Option<&User>) -> RegisterAction {
    match existing {
        None => RegisterAction::Create,
        Some(u) if u.email_verified_at.is_some() => RegisterAction::RejectVerified,
        Some(u) if u.deleted_at.is_some() => RegisterAction::RejectDeleted,
        Some(u) => RegisterAction::Overwrite(u.id),
    }
}

/// Credential check with a single failure message across all branches.
pub(crate) fn authenticate(user: Option<&User>, password: &str) -> Result<Uuid, ApiError> {
    let Some(user) = user else {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    };
    if user.deleted_at.is_some() {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }
    let ok = verify_password(password, &user.password_hash)
        .map_err(|_| ApiError::unauthorized(INVALID_CREDENTIALS))?;
    if !ok {
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }
    Ok(user.id)
}

fn verification_outcome(user: Option<&User>) -> Result<Uuid, ApiError> {
    let Some(user) = user else {
        return Err(ApiError::bad_request("Invalid code!"));
    };
    if user.email_verified_at.is_some() {
        return Err(ApiError::bad_request("User is already verified!"));
    }
    Ok(user.id)
}

fn resend_outcome(user: Option<&User>) -> Result<Uuid, ApiError> {
    let Some(user) = user else {
        return Err(ApiError::bad_request("Invalid action!"));
    };
    if user.email_verified_at.is_some() {
        return Err(ApiError::bad_request("User is already verified!"));
    }
    Ok(user.id)
}

pub async fn login(state: &AppState, body: LoginRequest) -> Result<TokenPairResponse, ApiError> {
    let email = normalize_email(&body.email);
    require_valid_email(&email)?;

    let user = User::find_by_email_any(&state.db, &email).await?;
    let user_id = authenticate(user.as_ref(), &body.password)?;

    let keys = TokenKeys::from_ref(state);
    let access_token = keys.sign_access(user_id)?;
    let refresh_token = keys.sign_refresh(user_id)?;

    info!(%user_id, "user logged in");
    Ok(TokenPairResponse {
        access_token,
        refresh_token,
    })
}

/// Idempotent by email: a still-unverified registration is overwritten in
/// place and the activation code resent, so at most one row per email exists.
pub async fn register(state: &AppState, body: RegisterRequest) -> Result<Uuid, ApiError> {
    let email = normalize_email(&body.email);
    require_valid_email(&email)?;
    if body.password.len() < 8 {
        return Err(ApiError::Validation(vec![
            "password must be at least 8 characters".into(),
        ]));
    }

    let existing = User::find_by_email_any(&state.db, &email).await?;
    let code = generate_activation_code();
    let hash = hash_password(&body.password)?;

    match classify_registration(existing.as_ref()) {
        RegisterAction::Create => {
            let user = User::create(&state.db, &body.name, &email, &hash, &code).await?;
            spawn_welcome(state.mailer.clone(), email, code);
            info!(user_id = %user.id, "user registered");
            Ok(user.id)
        }
        RegisterAction::Overwrite(id) => {
            User::overwrite_pending(&state.db, id, &body.name, &hash, &code).await?;
            spawn_welcome(state.mailer.clone(), email, code);
            info!(user_id = %id, "pending registration refreshed");
            Ok(id)
        }
        RegisterAction::RejectVerified => Err(ApiError::bad_request(
            "User already exists with this email, try another email!",
        )),
        RegisterAction::RejectDeleted => {
            Err(ApiError::bad_request("User is deleted, try another email!"))
        }
    }
}

pub async fn verify_email(state: &AppState, body: VerifyEmailRequest) -> Result<(), ApiError> {
    let email = normalize_email(&body.email);
    let user = User::find_by_email_and_code(&state.db, &email, &body.code).await?;
    let user_id = verification_outcome(user.as_ref())?;

    User::mark_verified(&state.db, user_id).await?;
    info!(%user_id, "email verified");
    Ok(())
}

pub async fn resend_verification_email(
    state: &AppState,
    body: ResendVerificationRequest,
) -> Result<(), ApiError> {
    let email = normalize_email(&body.email);
    let user = User::find_by_email_any(&state.db, &email).await?;
    let user_id = resend_outcome(user.as_ref())?;

    let code = generate_activation_code();
    User::set_activation_code(&state.db, user_id, &code).await?;
    spawn_welcome(state.mailer.clone(), email, code);
    info!(%user_id, "verification email resent");
    Ok(())
}

/// Always reports success to the caller; an unknown email is logged and
/// swallowed so the endpoint cannot be used to probe for accounts.
pub async fn forgot_password(
    state: &AppState,
    body: ForgotPasswordRequest,
) -> Result<(), ApiError> {
    let email = normalize_email(&body.email);
    let Some(user) = User::find_by_email_any(&state.db, &email).await? else {
        warn!(%email, "password reset requested for unknown email");
        return Ok(());
    };

    let token = generate_reset_token();
    User::set_reset_token(&state.db, user.id, &token).await?;
    spawn_password_reset(state.mailer.clone(), email, token);
    info!(user_id = %user.id, "password reset token issued");
    Ok(())
}

/// Consumes the reset token: one successful reset clears it (and any stale
/// activation code), so replaying the token fails.
pub async fn reset_password(state: &AppState, body: ResetPasswordRequest) -> Result<(), ApiError> {
    let Some(user) = User::find_by_reset_token(&state.db, &body.token).await? else {
        return Err(ApiError::bad_request("Invalid token or expired!"));
    };

    let hash = hash_password(&body.password)?;
    User::apply_password_reset(&state.db, user.id, &hash).await?;
    info!(user_id = %user.id, "password reset");
    Ok(())
}

/// Rotation: a valid refresh token yields a brand-new access/refresh pair.
/// The superseded token is not revoked — tokens are stateless by design.
pub async fn refresh_token(
    state: &AppState,
    body: RefreshTokenRequest,
) -> Result<TokenPairResponse, ApiError> {
    let keys = TokenKeys::from_ref(state);
    let claims = keys.verify_refresh(&body.refresh_token).map_err(|e| {
        warn!(error = %e, "refresh token rejected");
        ApiError::unauthorized("Invalid or expired token")
    })?;

    let access_token = keys.sign_access(claims.sub)?;
    let refresh_token = keys.sign_refresh(claims.sub)?;
    Ok(TokenPairResponse {
        access_token,
        refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn user_with(
        verified: bool,
        deleted: bool,
        password_hash: &str,
    ) -> User {
        let now = OffsetDateTime::now_utc();
        User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "a@x.com".into(),
            password_hash: password_hash.into(),
            email_verified_at: verified.then_some(now),
            email_activation_code: (!verified).then(|| "123456".to_string()),
            reset_password_token: None,
            created_at: now,
            updated_at: now,
            deleted_at: deleted.then_some(now),
        }
    }

    #[test]
    fn email_normalization_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a @x.com"));
    }

    #[test]
    fn registration_with_no_existing_record_creates() {
        assert_eq!(classify_registration(None), RegisterAction::Create);
    }

    #[test]
    fn registration_against_verified_record_is_rejected() {
        let u = user_with(true, false, "h");
        assert_eq!(
            classify_registration(Some(&u)),
            RegisterAction::RejectVerified
        );
    }

    #[test]
    fn verified_check_precedes_deleted_check() {
        let u = user_with(true, true, "h");
        assert_eq!(
            classify_registration(Some(&u)),
            RegisterAction::RejectVerified
        );
    }

    #[test]
    fn registration_against_deleted_record_is_rejected() {
        let u = user_with(false, true, "h");
        assert_eq!(
            classify_registration(Some(&u)),
            RegisterAction::RejectDeleted
        );
    }

    #[test]
    fn pending_registration_is_overwritten_in_place() {
        let u = user_with(false, false, "h");
        assert_eq!(
            classify_registration(Some(&u)),
            RegisterAction::Overwrite(u.id)
        );
    }

    fn unauthorized_message(err: ApiError) -> String {
        match err {
            ApiError::Unauthorized(msg) => msg,
            other => panic!("expected unauthorized, got {other:?}"),
        }
    }

    #[test]
    fn login_failures_share_one_message() {
        let hash = hash_password("right-password").unwrap();

        let unknown = unauthorized_message(authenticate(None, "right-password").unwrap_err());

        let deleted = user_with(false, true, &hash);
        let deleted_msg =
            unauthorized_message(authenticate(Some(&deleted), "right-password").unwrap_err());

        let active = user_with(true, false, &hash);
        let wrong_pw =
            unauthorized_message(authenticate(Some(&active), "wrong-password").unwrap_err());

        assert_eq!(unknown, INVALID_CREDENTIALS);
        assert_eq!(deleted_msg, INVALID_CREDENTIALS);
        assert_eq!(wrong_pw, INVALID_CREDENTIALS);
    }

    #[test]
    fn correct_credentials_yield_subject_id() {
        let hash = hash_password("right-password").unwrap();
        let user = user_with(true, false, &hash);
        assert_eq!(
            authenticate(Some(&user), "right-password").unwrap(),
            user.id
        );
    }

    #[test]
    fn soft_deleted_user_is_rejected_even_with_correct_password() {
        let hash = hash_password("right-password").unwrap();
        let user = user_with(true, true, &hash);
        let msg = unauthorized_message(authenticate(Some(&user), "right-password").unwrap_err());
        assert_eq!(msg, INVALID_CREDENTIALS);
    }

    #[test]
    fn stale_activation_code_is_invalid() {
        // after a successful verify the code is cleared, so the same lookup
        // finds nothing on the second call
        let err = verification_outcome(None).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "Invalid code!"));
    }

    #[test]
    fn verifying_twice_is_rejected() {
        let u = user_with(true, false, "h");
        let err = verification_outcome(Some(&u)).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "User is already verified!"));
    }

    #[test]
    fn pending_user_can_verify() {
        let u = user_with(false, false, "h");
        assert_eq!(verification_outcome(Some(&u)).unwrap(), u.id);
    }

    #[test]
    fn resend_for_unknown_email_is_rejected() {
        let err = resend_outcome(None).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg == "Invalid action!"));
    }

    #[test]
    fn resend_for_verified_user_is_rejected() {
        let u = user_with(true, false, "h");
        assert!(resend_outcome(Some(&u)).is_err());
    }
}
