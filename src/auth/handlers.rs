use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginRequest, LoginResponse, RegisterRequest},
        extractors::AuthUser,
        repo_types::PublicUser,
        services::AuthService,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(auth, payload))]
pub async fn register(
    State(auth): State<AuthService>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let user = auth.register(&payload.login, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(auth, payload))]
pub async fn login(
    State(auth): State<AuthService>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;
    payload.validate()?;

    let (user, token) = auth.login(&payload.login, &payload.password).await?;
    Ok(Json(LoginResponse { token, user }))
}

#[instrument(skip_all, fields(user_id = caller.user_id))]
pub async fn logout(
    State(auth): State<AuthService>,
    caller: AuthUser,
) -> Result<StatusCode, ApiError> {
    auth.revoke_token(&caller.token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip_all, fields(user_id = caller.user_id))]
pub async fn get_me(
    State(auth): State<AuthService>,
    caller: AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = auth.current_user(caller.user_id).await?;
    Ok(Json(user))
}
