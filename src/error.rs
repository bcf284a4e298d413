// src/error.rs
use crate::web::response::ApiResponse;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Violações das regras de atribuição de quartos.
/// São devolvidas explicitamente pelo `Room` e pelo `assignment_service`,
/// nunca deduzidas a partir do texto de outra mensagem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssignmentError {
    #[error("O quarto {room_number} já está na capacidade máxima ({capacity})")]
    CapacityExceeded { room_number: String, capacity: i64 },

    #[error("O estudante já está atribuído ao quarto {room_number}")]
    AlreadyAssigned { room_number: String },

    #[error("O estudante não está atribuído a nenhum quarto")]
    NotAssigned,

    // Inconsistência interna: o ponteiro do estudante aponta para um quarto
    // cuja lista de membros não o contém.
    #[error("O estudante não consta da lista de membros do quarto {room_number}")]
    NotInRoom { room_number: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Erro na base de dados: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Erro de migração da base de dados: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Variável de ambiente em falta: {0}")]
    EnvVarError(#[from] std::env::VarError),

    #[error("Erro de configuração: {0}")]
    ConfigError(String),

    #[error("Erro ao processar password")]
    PasswordHashingError,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Não autenticado: {0}")]
    Unauthenticated(String),

    #[error("Acesso negado: {0}")]
    Forbidden(String),

    #[error("{message}")]
    Validation { message: String, errors: Vec<String> },

    #[error("{0}")]
    DuplicateKey(String),

    #[error("{0}")]
    NotFound(String),

    #[error("O utilizador não é um estudante")]
    NotAStudent,

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    #[error("Erro no token: {0}")]
    TokenError(#[from] jsonwebtoken::errors::Error),

    #[error("Erro interno inesperado")]
    InternalServerError,
}

impl AppError {
    /// Atalho para erros de validação com a lista de mensagens por campo.
    pub fn validation(errors: Vec<String>) -> Self {
        AppError::Validation {
            message: "Erro de validação".to_string(),
            errors,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. }
            | AppError::DuplicateKey(_)
            | AppError::NotAStudent
            | AppError::Assignment(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidCredentials
            | AppError::Unauthenticated(_)
            | AppError::TokenError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::SqlxError(_)
            | AppError::SqlxMigrateError(_)
            | AppError::EnvVarError(_)
            | AppError::ConfigError(_)
            | AppError::PasswordHashingError
            | AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Mensagem devolvida ao cliente. Os erros internos nunca expõem o detalhe
    /// (esse fica apenas no log).
    fn client_message(&self) -> String {
        match self {
            AppError::SqlxError(_) | AppError::SqlxMigrateError(_) => {
                "Erro ao aceder aos dados.".to_string()
            }
            AppError::EnvVarError(_) | AppError::ConfigError(_) => {
                "Erro de configuração.".to_string()
            }
            AppError::PasswordHashingError => "Erro ao processar credenciais.".to_string(),
            AppError::InvalidCredentials => "Email ou password inválidos.".to_string(),
            AppError::TokenError(_) => "Não autorizado, token inválido ou expirado.".to_string(),
            AppError::Unauthenticated(msg) | AppError::Forbidden(msg) => msg.clone(),
            AppError::InternalServerError => "Ocorreu um erro inesperado.".to_string(),
            other => other.to_string(),
        }
    }
}

// Corpo JSON inválido ou ausente cai no mesmo envelope que os restantes erros
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation {
            message: "Corpo do pedido inválido".to_string(),
            errors: vec![rejection.body_text()],
        }
    }
}

// Como converter AppError numa resposta HTTP
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Erro processado: {:?}", self);
        } else {
            tracing::warn!("Pedido rejeitado ({}): {}", status.as_u16(), self);
        }

        let errors = match &self {
            AppError::Validation { errors, .. } => errors.clone(),
            _ => Vec::new(),
        };
        let body = ApiResponse::<()>::failure(self.client_message(), errors);

        (status, Json(body)).into_response()
    }
}

// Tipo Result padrão para a aplicação
pub type AppResult<T = ()> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_errors_map_to_bad_request() {
        let err = AppError::from(AssignmentError::CapacityExceeded {
            room_number: "101".into(),
            capacity: 2,
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Assignment(AssignmentError::NotAssigned).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotAStudent.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_errors_map_to_401_and_403() {
        assert_eq!(
            AppError::Unauthenticated("sem token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Forbidden("só admin".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = AppError::ConfigError("JWT_SECRET em falta".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.client_message().contains("JWT_SECRET"));
    }

    #[test]
    fn capacity_message_names_the_room() {
        let err = AssignmentError::CapacityExceeded {
            room_number: "A-205".into(),
            capacity: 3,
        };
        assert!(err.to_string().contains("A-205"));
    }
}
