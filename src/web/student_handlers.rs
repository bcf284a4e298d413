// src/web/student_handlers.rs
use crate::{
    error::AppResult,
    models::{room::RoomResponse, user::UpdateProfileRequest},
    services::{room_service, user_service},
    state::AppState,
    web::{
        mw_auth::CurrentUser,
        response::{ApiJson, ApiResponse, StudentData, StudentRoomData},
    },
};
use axum::{
    extract::{Extension, State},
    Json,
};

// GET /api/student/profile
pub async fn handle_get_profile(
    Extension(current): Extension<CurrentUser>,
) -> Json<ApiResponse<StudentData>> {
    Json(ApiResponse::ok(StudentData {
        student: current.0.into(),
    }))
}

// PUT /api/student/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<StudentData>>> {
    let changes = request.validate()?;
    let student = user_service::update_profile(&state.db_pool, &current.0.id, &changes).await?;
    Ok(Json(ApiResponse::with_message(
        "Perfil atualizado com sucesso",
        StudentData {
            student: student.into(),
        },
    )))
}

// GET /api/student/room
pub async fn handle_get_room(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Json<ApiResponse<StudentRoomData>>> {
    let (room, roommates) = room_service::student_room(&state.db_pool, &current.0).await?;
    Ok(Json(ApiResponse::ok(StudentRoomData {
        room: RoomResponse::new(&room, None),
        total_roommates: roommates.len(),
        roommates,
    })))
}
