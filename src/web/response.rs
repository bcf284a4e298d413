// src/web/response.rs
use crate::{
    error::AppError,
    models::{
        room::{RoomResponse, RoomStats},
        user::{MemberSummary, StudentStats, UserResponse},
    },
};
use axum::extract::FromRequest;
use serde::Serialize;

/// Envelope comum a todas as respostas JSON.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            message: None,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            message: Some(message.into()),
            ..ApiResponse::ok(data)
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>, errors: Vec<String>) -> Self {
        ApiResponse {
            success: false,
            message: Some(message.into()),
            data: None,
            errors,
        }
    }
}

/// `Json` com as rejeições convertidas em `AppError` (mesmo envelope dos outros erros).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

// --- Conteúdo do campo `data` ---

#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct StudentData {
    pub student: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct RoomData {
    pub room: RoomResponse,
}

#[derive(Debug, Serialize)]
pub struct RoomListData {
    pub count: usize,
    pub stats: RoomStats,
    pub rooms: Vec<RoomResponse>,
}

#[derive(Debug, Serialize)]
pub struct StudentListData {
    pub count: usize,
    pub stats: StudentStats,
    pub students: Vec<UserResponse>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentData {
    pub student: UserResponse,
    pub room: RoomResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRoomData {
    pub room: RoomResponse,
    pub roommates: Vec<MemberSummary>,
    pub total_roommates: usize,
}
