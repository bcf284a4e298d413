// src/models/room.rs
use crate::{
    error::{AppError, AppResult, AssignmentError},
    models::{
        user::MemberSummary,
        validation::{validate_capacity, validate_room_number},
    },
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Linha da tabela 'rooms' (sem os membros)
#[derive(Debug, Clone, FromRow)]
pub struct RoomRow {
    pub id: String,
    pub room_number: String,
    pub capacity: i64,
    pub occupied: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Quarto com a lista de membros (ids dos estudantes).
///
/// `occupied` nunca é escrito diretamente: `recompute_occupied` deriva-o de
/// `students` e tem de ser chamado antes de cada gravação.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: String,
    pub room_number: String,
    pub capacity: i64,
    pub occupied: i64,
    pub students: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Cria um quarto vazio, validando o número e a capacidade (1..=10).
    pub fn new(room_number: Option<&str>, capacity: Option<i64>) -> AppResult<Room> {
        let mut errors = Vec::new();
        let room_number = validate_room_number(room_number).map_err(|e| errors.push(e)).ok();
        let capacity = validate_capacity(capacity).map_err(|e| errors.push(e)).ok();

        match (room_number, capacity) {
            (Some(room_number), Some(capacity)) => {
                let now = Utc::now();
                Ok(Room {
                    id: uuid::Uuid::new_v4().to_string(),
                    room_number,
                    capacity,
                    occupied: 0,
                    students: Vec::new(),
                    created_at: now,
                    updated_at: now,
                })
            }
            _ => Err(AppError::validation(errors)),
        }
    }

    pub fn from_row(row: RoomRow, students: Vec<String>) -> Room {
        Room {
            id: row.id,
            room_number: row.room_number,
            capacity: row.capacity,
            occupied: row.occupied,
            students,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn is_full(&self) -> bool {
        self.occupied >= self.capacity
    }

    pub fn has_space(&self) -> bool {
        self.occupied < self.capacity
    }

    pub fn available_beds(&self) -> i64 {
        self.capacity - self.occupied
    }

    /// Percentagem de ocupação arredondada (0-100).
    pub fn occupancy_rate(&self) -> i64 {
        if self.capacity <= 0 {
            return 0;
        }
        ((self.occupied as f64 / self.capacity as f64) * 100.0).round() as i64
    }

    pub fn contains(&self, student_id: &str) -> bool {
        self.students.iter().any(|s| s == student_id)
    }

    /// Acerta `occupied` com o tamanho da lista e recusa listas acima da capacidade.
    pub fn recompute_occupied(&mut self) -> Result<(), AssignmentError> {
        let count = self.students.len() as i64;
        if count > self.capacity {
            return Err(AssignmentError::CapacityExceeded {
                room_number: self.room_number.clone(),
                capacity: self.capacity,
            });
        }
        self.occupied = count;
        Ok(())
    }

    pub fn add_student(&mut self, student_id: &str) -> Result<(), AssignmentError> {
        if self.is_full() {
            return Err(AssignmentError::CapacityExceeded {
                room_number: self.room_number.clone(),
                capacity: self.capacity,
            });
        }
        if self.contains(student_id) {
            return Err(AssignmentError::AlreadyAssigned {
                room_number: self.room_number.clone(),
            });
        }
        self.students.push(student_id.to_string());
        self.recompute_occupied()
    }

    pub fn remove_student(&mut self, student_id: &str) -> Result<(), AssignmentError> {
        let index = self
            .students
            .iter()
            .position(|s| s == student_id)
            .ok_or_else(|| AssignmentError::NotInRoom {
                room_number: self.room_number.clone(),
            })?;
        self.students.remove(index);
        self.recompute_occupied()
    }
}

/// Vista JSON de um quarto. `students` só é incluído quando os membros foram expandidos.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub room_number: String,
    pub capacity: i64,
    pub occupied: i64,
    pub available_beds: i64,
    pub is_full: bool,
    pub occupancy_rate: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub students: Option<Vec<MemberSummary>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomResponse {
    pub fn new(room: &Room, students: Option<Vec<MemberSummary>>) -> Self {
        RoomResponse {
            id: room.id.clone(),
            room_number: room.room_number.clone(),
            capacity: room.capacity,
            occupied: room.occupied,
            available_beds: room.available_beds(),
            is_full: room.is_full(),
            occupancy_rate: room.occupancy_rate(),
            students,
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

/// Estatísticas da listagem de quartos, calculadas sobre as linhas devolvidas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomStats {
    pub total_rooms: usize,
    pub total_capacity: i64,
    pub total_occupied: i64,
    pub available_rooms: usize,
    pub full_rooms: usize,
}

impl RoomStats {
    pub fn from_rooms<'a>(rooms: impl IntoIterator<Item = &'a Room>) -> Self {
        rooms.into_iter().fold(RoomStats::default(), |mut stats, room| {
            stats.total_rooms += 1;
            stats.total_capacity += room.capacity;
            stats.total_occupied += room.occupied;
            if room.has_space() {
                stats.available_rooms += 1;
            } else {
                stats.full_rooms += 1;
            }
            stats
        })
    }
}

// --- Payloads JSON ---

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub room_number: Option<String>,
    pub capacity: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoomRequest {
    pub student_id: Option<String>,
    pub room_id: Option<String>,
}
