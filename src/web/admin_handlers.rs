// src/web/admin_handlers.rs
use crate::{
    error::{AppError, AppResult},
    models::{
        room::{AssignRoomRequest, CreateRoomRequest, Room, RoomResponse, RoomStats},
        user::{CreateStudentRequest, MemberSummary, StudentStats, UserResponse},
        validation::non_blank,
    },
    services::{assignment_service, room_service, user_service},
    state::AppState,
    web::response::{
        ApiJson, ApiResponse, AssignmentData, RoomData, RoomListData, StudentData, StudentListData,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

fn room_list(rooms: Vec<(Room, Vec<MemberSummary>)>) -> RoomListData {
    let stats = RoomStats::from_rooms(rooms.iter().map(|(room, _)| room));
    let rooms: Vec<RoomResponse> = rooms
        .into_iter()
        .map(|(room, members)| RoomResponse::new(&room, Some(members)))
        .collect();
    RoomListData {
        count: rooms.len(),
        stats,
        rooms,
    }
}

// POST /api/admin/rooms
pub async fn handle_create_room(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateRoomRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<RoomData>>)> {
    let room = room_service::create_room(&state.db_pool, &request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Quarto criado com sucesso",
            RoomData {
                room: RoomResponse::new(&room, Some(Vec::new())),
            },
        )),
    ))
}

// GET /api/admin/rooms
pub async fn handle_list_rooms(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<RoomListData>>> {
    let rooms = room_service::list_rooms(&state.db_pool).await?;
    Ok(Json(ApiResponse::ok(room_list(rooms))))
}

// GET /api/admin/rooms/available
pub async fn handle_available_rooms(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<RoomListData>>> {
    let rooms = room_service::find_available_rooms(&state.db_pool).await?;
    Ok(Json(ApiResponse::ok(room_list(rooms))))
}

// GET /api/admin/rooms/full
pub async fn handle_full_rooms(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<RoomListData>>> {
    let rooms = room_service::find_full_rooms(&state.db_pool).await?;
    Ok(Json(ApiResponse::ok(room_list(rooms))))
}

// POST /api/admin/students
pub async fn handle_create_student(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateStudentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<StudentData>>)> {
    let new_user = request.validate()?;
    let student = user_service::create_user(&state.db_pool, &state.config, &new_user).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Estudante adicionado com sucesso",
            StudentData {
                student: student.into(),
            },
        )),
    ))
}

// GET /api/admin/students
pub async fn handle_list_students(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<StudentListData>>> {
    let students = user_service::list_students(&state.db_pool).await?;
    let stats = StudentStats::from_students(&students);
    let students: Vec<UserResponse> = students.into_iter().map(UserResponse::from).collect();
    Ok(Json(ApiResponse::ok(StudentListData {
        count: students.len(),
        stats,
        students,
    })))
}

// POST /api/admin/assign-room
pub async fn handle_assign_room(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AssignRoomRequest>,
) -> AppResult<Json<ApiResponse<AssignmentData>>> {
    let (Some(student_id), Some(room_id)) = (
        non_blank(request.student_id.as_deref()),
        non_blank(request.room_id.as_deref()),
    ) else {
        return Err(AppError::validation(vec![
            "Indique o ID do estudante e o ID do quarto".to_string(),
        ]));
    };

    let (room, members, student) =
        assignment_service::assign_with_members(&state.db_pool, &student_id, &room_id).await?;
    let message = format!(
        "Estudante {} atribuído ao quarto {}",
        student.name, room.room_number
    );
    Ok(Json(ApiResponse::with_message(
        message,
        AssignmentData {
            student: student.into(),
            room: RoomResponse::new(&room, Some(members)),
        },
    )))
}

// DELETE /api/admin/remove-room/{student_id}
pub async fn handle_remove_room(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> AppResult<Json<ApiResponse<StudentData>>> {
    let student = assignment_service::remove(&state.db_pool, &student_id).await?;
    let message = format!("Estudante {} removido do quarto", student.name);
    Ok(Json(ApiResponse::with_message(
        message,
        StudentData {
            student: student.into(),
        },
    )))
}
