// src/web/auth_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::user::{LoginRequest, RegisterRequest, User},
    services::{auth_service, user_service},
    state::AppState,
    web::{
        mw_auth::CurrentUser,
        response::{ApiJson, ApiResponse, AuthData, UserData},
    },
};
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};

fn auth_data(state: &AppState, user: User) -> AppResult<AuthData> {
    let token = auth_service::issue_token(&user, &state.config.jwt_secret, state.config.jwt_expires_days)?;
    Ok(AuthData {
        user: user.into(),
        token,
    })
}

// POST /api/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthData>>)> {
    let user = user_service::register_user(&state.db_pool, &state.config, &request).await?;
    let data = auth_data(&state, user)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("Utilizador registado com sucesso", data)),
    ))
}

// POST /api/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthData>>> {
    let (Some(email), Some(password)) = (request.email.as_deref(), request.password.as_deref()) else {
        return Err(AppError::validation(vec![
            "Indique o email e a password".to_string(),
        ]));
    };

    let user = user_service::authenticate(&state.db_pool, email, password).await?;
    let data = auth_data(&state, user)?;
    Ok(Json(ApiResponse::with_message("Login efetuado com sucesso", data)))
}

// GET /api/auth/me
pub async fn handle_me(Extension(current): Extension<CurrentUser>) -> Json<ApiResponse<UserData>> {
    Json(ApiResponse::ok(UserData {
        user: current.0.into(),
    }))
}
