// src/models/user.rs
use crate::{
    error::{AppError, AppResult},
    models::validation::{
        non_blank, normalize_room_number, validate_email, validate_name, validate_password,
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Papel do utilizador. Conjunto fechado: qualquer decisão de acesso faz `match` aqui.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Representa um utilizador lido da tabela 'users'
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub room_number: Option<String>,
    pub student_id: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_student(&self) -> bool {
        matches!(self.role, Role::Student)
    }
}

/// Vista pública do utilizador (sem a password).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub room_number: Option<String>,
    pub student_id: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            room_number: user.room_number,
            student_id: user.student_id,
            phone: user.phone,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Resumo de um estudante tal como aparece na lista de membros de um quarto.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub student_id: Option<String>,
    pub phone: Option<String>,
}

/// Estatísticas da listagem de estudantes, calculadas sobre as linhas devolvidas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStats {
    pub total_students: usize,
    pub assigned_students: usize,
    pub unassigned_students: usize,
}

impl StudentStats {
    pub fn from_students(students: &[User]) -> Self {
        let assigned = students.iter().filter(|s| s.room_number.is_some()).count();
        StudentStats {
            total_students: students.len(),
            assigned_students: assigned,
            unassigned_students: students.len() - assigned,
        }
    }
}

/// Dados validados para inserir um utilizador (password ainda em claro).
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub student_id: Option<String>,
    pub phone: Option<String>,
}

// --- Payloads JSON ---
// Campos obrigatórios chegam como Option para que a ausência dê uma mensagem
// de validação em vez de uma rejeição genérica do extractor.

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub room_number: Option<String>,
}

impl RegisterRequest {
    /// Devolve o utilizador a criar e, se indicado, o quarto pretendido (normalizado).
    pub fn validate(&self) -> AppResult<(NewUser, Option<String>)> {
        let mut errors = Vec::new();
        let name = validate_name(self.name.as_deref()).map_err(|e| errors.push(e)).ok();
        let email = validate_email(self.email.as_deref()).map_err(|e| errors.push(e)).ok();
        let password = validate_password(self.password.as_deref())
            .map_err(|e| errors.push(e))
            .ok();
        let role = self.role.unwrap_or(Role::Student);
        let room_number = non_blank(self.room_number.as_deref()).map(|r| normalize_room_number(&r));
        if room_number.is_some() && role == Role::Admin {
            errors.push("Apenas estudantes podem ter quarto atribuído".to_string());
        }

        match (name, email, password) {
            (Some(name), Some(email), Some(password)) if errors.is_empty() => Ok((
                NewUser {
                    name,
                    email,
                    password,
                    role,
                    student_id: None,
                    phone: None,
                },
                room_number,
            )),
            _ => Err(AppError::validation(errors)),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudentRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub student_id: Option<String>,
    pub phone: Option<String>,
}

impl CreateStudentRequest {
    pub fn validate(&self) -> AppResult<NewUser> {
        let mut errors = Vec::new();
        let name = validate_name(self.name.as_deref()).map_err(|e| errors.push(e)).ok();
        let email = validate_email(self.email.as_deref()).map_err(|e| errors.push(e)).ok();
        let password = validate_password(self.password.as_deref())
            .map_err(|e| errors.push(e))
            .ok();

        match (name, email, password) {
            (Some(name), Some(email), Some(password)) => Ok(NewUser {
                name,
                email,
                password,
                role: Role::Student,
                student_id: non_blank(self.student_id.as_deref()),
                phone: non_blank(self.phone.as_deref()),
            }),
            _ => Err(AppError::validation(errors)),
        }
    }
}

/// Alterações que o estudante pode fazer ao próprio perfil.
/// Campos ausentes ou vazios ficam como estão.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub student_id: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub student_id: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> AppResult<ProfileChanges> {
        let name = match non_blank(self.name.as_deref()) {
            Some(n) => Some(validate_name(Some(&n)).map_err(|e| AppError::validation(vec![e]))?),
            None => None,
        };
        Ok(ProfileChanges {
            name,
            phone: non_blank(self.phone.as_deref()),
            student_id: non_blank(self.student_id.as_deref()),
        })
    }
}
