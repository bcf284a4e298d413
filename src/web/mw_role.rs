// src/web/mw_role.rs
use crate::{error::AppError, models::user::Role, web::mw_auth::CurrentUser};
use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

/// Compara o papel do utilizador com o exigido pela rota.
pub fn check_role(current: &CurrentUser, required: Role) -> Result<(), AppError> {
    match (current.0.role, required) {
        (Role::Admin, Role::Admin) | (Role::Student, Role::Student) => Ok(()),
        (_, Role::Admin) => Err(AppError::Forbidden(
            "Acesso negado. São necessários privilégios de administrador.".to_string(),
        )),
        (_, Role::Student) => Err(AppError::Forbidden(
            "Acesso negado. São necessários privilégios de estudante.".to_string(),
        )),
    }
}

/// Deve ser executado *depois* do middleware `require_auth`.
pub async fn require_admin(
    Extension(current): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_role(&current, Role::Admin).inspect_err(|_| {
        tracing::warn!("Admin MW: acesso negado para {} ({}).", current.0.id, current.0.role);
    })?;
    Ok(next.run(request).await)
}

/// Deve ser executado *depois* do middleware `require_auth`.
pub async fn require_student(
    Extension(current): Extension<CurrentUser>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    check_role(&current, Role::Student).inspect_err(|_| {
        tracing::warn!("Student MW: acesso negado para {} ({}).", current.0.id, current.0.role);
    })?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;
    use chrono::Utc;

    fn current(role: Role) -> CurrentUser {
        CurrentUser(User {
            id: "u".into(),
            name: "U".into(),
            email: "u@escola.pt".into(),
            password_hash: String::new(),
            role,
            room_number: None,
            student_id: None,
            phone: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    #[test]
    fn roles_only_pass_their_own_gate() {
        assert!(check_role(&current(Role::Admin), Role::Admin).is_ok());
        assert!(check_role(&current(Role::Student), Role::Student).is_ok());
        assert!(matches!(
            check_role(&current(Role::Student), Role::Admin),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            check_role(&current(Role::Admin), Role::Student),
            Err(AppError::Forbidden(_))
        ));
    }
}
