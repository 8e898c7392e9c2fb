use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use crate::{error::ApiError, state::AppState};

use super::{
    dto::{
        ForgotPasswordRequest, LoginRequest, RefreshTokenRequest, RegisterRequest,
        ResendVerificationRequest, ResetPasswordRequest, SuccessResponse, TokenPairResponse,
        VerifyEmailRequest,
    },
    services,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/verify-email/resend", post(resend_verification))
        .route("/auth/refresh-token", post(refresh_token))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

#[instrument(skip(state, body))]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let tokens = services::login(&state, body).await?;
    Ok(Json(tokens))
}

#[instrument(skip(state, body))]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    services::register(&state, body).await?;
    Ok(Json(SuccessResponse::with_message(
        "Check your email for the activation code.",
    )))
}

#[instrument(skip(state, body))]
async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    services::verify_email(&state, body).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, body))]
async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<ResendVerificationRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    services::resend_verification_email(&state, body).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, body))]
async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPairResponse>, ApiError> {
    let tokens = services::refresh_token(&state, body).await?;
    Ok(Json(tokens))
}

#[instrument(skip(state, body))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    services::forgot_password(&state, body).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[instrument(skip(state, body))]
async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    services::reset_password(&state, body).await?;
    Ok(Json(SuccessResponse::ok()))
}
