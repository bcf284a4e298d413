// src/web/mw_auth.rs
use crate::{
    error::AppError,
    models::user::User,
    services::{auth_service, user_service},
    state::AppState,
};
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

/// Utilizador autenticado, posto nas extensões da requisição por `require_auth`.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

// Middleware que valida o token Bearer e carrega o utilizador
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(auth_service::bearer_token)
        .ok_or_else(|| {
            tracing::debug!("Autenticação MW: pedido sem token Bearer.");
            AppError::Unauthenticated("Não autorizado, token em falta".to_string())
        })?;

    let claims = auth_service::verify_token(token, &state.config.jwt_secret)?;

    // O papel vem da base de dados, não do token
    let user = user_service::find_user_by_id(&state.db_pool, &claims.sub)
        .await?
        .ok_or_else(|| {
            tracing::warn!("Autenticação MW: token válido para utilizador inexistente {}", claims.sub);
            AppError::Unauthenticated("Utilizador não encontrado".to_string())
        })?;

    tracing::debug!("Autenticação MW: utilizador '{}' ({}) autenticado.", user.id, user.role);
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}
