// src/services/room_service.rs
use crate::{
    db::is_unique_violation,
    error::{AppError, AppResult},
    models::{
        room::{CreateRoomRequest, Room, RoomRow},
        user::{MemberSummary, User},
        validation::normalize_room_number,
    },
};
use chrono::Utc;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use std::collections::HashMap;

const ROOM_COLUMNS: &str = "id, room_number, capacity, occupied, created_at, updated_at";

// Linha de membro com o quarto a que pertence (para agrupar numa só query)
#[derive(Debug, FromRow)]
struct MemberRow {
    room_id: String,
    #[sqlx(flatten)]
    member: MemberSummary,
}

/// Cria um quarto novo. O número é normalizado antes da verificação de duplicados.
pub async fn create_room(db_pool: &SqlitePool, request: &CreateRoomRequest) -> AppResult<Room> {
    let room = Room::new(request.room_number.as_deref(), request.capacity)?;
    tracing::info!("Criando quarto {} (capacidade {})", room.room_number, room.capacity);

    let mut conn = db_pool.acquire().await?;
    if find_room_by_number(&mut conn, &room.room_number).await?.is_some() {
        tracing::warn!("Quarto {} já existe.", room.room_number);
        return Err(AppError::DuplicateKey(format!(
            "O quarto {} já existe",
            room.room_number
        )));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO rooms (id, room_number, capacity, occupied, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&room.id)
    .bind(&room.room_number)
    .bind(room.capacity)
    .bind(room.occupied)
    .bind(room.created_at)
    .bind(room.updated_at)
    .execute(&mut *conn)
    .await;

    match result {
        Ok(_) => {
            tracing::info!("✅ Quarto {} criado.", room.room_number);
            Ok(room)
        }
        Err(e) if is_unique_violation(&e) => Err(AppError::DuplicateKey(format!(
            "O quarto {} já existe",
            room.room_number
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Ids dos membros do quarto, pela ordem de atribuição.
pub async fn load_members(conn: &mut SqliteConnection, room_id: &str) -> AppResult<Vec<String>> {
    let members = sqlx::query_scalar(
        "SELECT user_id FROM room_members WHERE room_id = ? ORDER BY assigned_at ASC, rowid ASC",
    )
    .bind(room_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(members)
}

async fn hydrate(conn: &mut SqliteConnection, row: Option<RoomRow>) -> AppResult<Option<Room>> {
    match row {
        Some(row) => {
            let members = load_members(conn, &row.id).await?;
            Ok(Some(Room::from_row(row, members)))
        }
        None => Ok(None),
    }
}

pub async fn find_room_by_id(conn: &mut SqliteConnection, room_id: &str) -> AppResult<Option<Room>> {
    let sql = format!("SELECT {} FROM rooms WHERE id = ?", ROOM_COLUMNS);
    let row = sqlx::query_as::<_, RoomRow>(&sql)
        .bind(room_id)
        .fetch_optional(&mut *conn)
        .await?;
    hydrate(conn, row).await
}

pub async fn find_room_by_number(
    conn: &mut SqliteConnection,
    room_number: &str,
) -> AppResult<Option<Room>> {
    let sql = format!("SELECT {} FROM rooms WHERE room_number = ?", ROOM_COLUMNS);
    let row = sqlx::query_as::<_, RoomRow>(&sql)
        .bind(normalize_room_number(room_number))
        .fetch_optional(&mut *conn)
        .await?;
    hydrate(conn, row).await
}

/// Grava o quarto. `occupied` é sempre recalculado a partir dos membros antes
/// do UPDATE; uma lista acima da capacidade é recusada aqui.
pub async fn save_room(conn: &mut SqliteConnection, room: &mut Room) -> AppResult<()> {
    room.recompute_occupied()?;
    room.updated_at = Utc::now();

    let rows = sqlx::query("UPDATE rooms SET capacity = ?, occupied = ?, updated_at = ? WHERE id = ?")
        .bind(room.capacity)
        .bind(room.occupied)
        .bind(room.updated_at)
        .bind(&room.id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(AppError::NotFound("Quarto não encontrado".to_string()));
    }
    tracing::debug!(
        "Quarto {} gravado: {}/{} ocupados",
        room.room_number,
        room.occupied,
        room.capacity
    );
    Ok(())
}

/// Resumos (nome, email, ...) dos membros de um quarto.
pub async fn member_summaries(
    conn: &mut SqliteConnection,
    room_id: &str,
) -> AppResult<Vec<MemberSummary>> {
    let members = sqlx::query_as::<_, MemberSummary>(
        r#"
        SELECT u.id, u.name, u.email, u.student_id, u.phone
        FROM room_members rm
        JOIN users u ON u.id = rm.user_id
        WHERE rm.room_id = ?
        ORDER BY rm.assigned_at ASC, rm.rowid ASC
        "#,
    )
    .bind(room_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(members)
}

async fn rooms_where(
    db_pool: &SqlitePool,
    filter: &str,
) -> AppResult<Vec<(Room, Vec<MemberSummary>)>> {
    let sql = format!(
        "SELECT {} FROM rooms {} ORDER BY room_number ASC",
        ROOM_COLUMNS, filter
    );
    let rows = sqlx::query_as::<_, RoomRow>(&sql).fetch_all(db_pool).await?;

    // Todos os membros numa só query, agrupados por quarto
    let member_rows = sqlx::query_as::<_, MemberRow>(
        r#"
        SELECT rm.room_id, u.id, u.name, u.email, u.student_id, u.phone
        FROM room_members rm
        JOIN users u ON u.id = rm.user_id
        ORDER BY rm.assigned_at ASC, rm.rowid ASC
        "#,
    )
    .fetch_all(db_pool)
    .await?;

    let mut by_room: HashMap<String, Vec<MemberSummary>> = HashMap::new();
    for row in member_rows {
        by_room.entry(row.room_id).or_default().push(row.member);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let members = by_room.remove(&row.id).unwrap_or_default();
            let ids = members.iter().map(|m| m.id.clone()).collect();
            (Room::from_row(row, ids), members)
        })
        .collect())
}

/// Todos os quartos, ordenados por número, com os membros expandidos.
pub async fn list_rooms(db_pool: &SqlitePool) -> AppResult<Vec<(Room, Vec<MemberSummary>)>> {
    tracing::debug!("Buscando todos os quartos...");
    rooms_where(db_pool, "").await
}

/// Quartos com pelo menos uma cama livre.
pub async fn find_available_rooms(db_pool: &SqlitePool) -> AppResult<Vec<(Room, Vec<MemberSummary>)>> {
    rooms_where(db_pool, "WHERE occupied < capacity").await
}

pub async fn find_full_rooms(db_pool: &SqlitePool) -> AppResult<Vec<(Room, Vec<MemberSummary>)>> {
    rooms_where(db_pool, "WHERE occupied >= capacity").await
}

/// Quarto do estudante e os colegas (todos os membros menos o próprio).
pub async fn student_room(
    db_pool: &SqlitePool,
    student: &User,
) -> AppResult<(Room, Vec<MemberSummary>)> {
    let room_number = student
        .room_number
        .as_deref()
        .ok_or_else(|| AppError::NotFound("Ainda não tem quarto atribuído".to_string()))?;

    let mut conn = db_pool.acquire().await?;
    let room = find_room_by_number(&mut conn, room_number)
        .await?
        .ok_or_else(|| {
            tracing::warn!(
                "Estudante {} aponta para o quarto {} que não existe.",
                student.id,
                room_number
            );
            AppError::NotFound("Quarto não encontrado".to_string())
        })?;

    let roommates = member_summaries(&mut conn, &room.id)
        .await?
        .into_iter()
        .filter(|m| m.id != student.id)
        .collect();
    Ok((room, roommates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::services::{assignment_service, user_service::tests::add_student};

    fn request(number: &str, capacity: i64) -> CreateRoomRequest {
        CreateRoomRequest {
            room_number: Some(number.into()),
            capacity: Some(capacity),
        }
    }

    #[tokio::test]
    async fn create_room_normalizes_and_refuses_duplicates() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let room = create_room(&pool, &request("a-205", 4)).await.unwrap();
        assert_eq!(room.room_number, "A-205");

        let err = create_room(&pool, &request(" A-205", 2)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateKey(_)));
    }

    #[tokio::test]
    async fn create_room_validates_capacity() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let err = create_room(&pool, &request("101", 11)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn listing_splits_available_and_full() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let single = create_room(&pool, &request("102", 1)).await.unwrap();
        create_room(&pool, &request("101", 2)).await.unwrap();
        let ana = add_student(&pool, "Ana").await;
        assignment_service::assign(&pool, &ana.id, &single.id).await.unwrap();

        let all = list_rooms(&pool).await.unwrap();
        let numbers: Vec<&str> = all.iter().map(|(r, _)| r.room_number.as_str()).collect();
        assert_eq!(numbers, vec!["101", "102"]);
        assert_eq!(all[1].1.len(), 1);
        assert_eq!(all[1].1[0].name, "Ana");

        let full = find_full_rooms(&pool).await.unwrap();
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].0.room_number, "102");
        let available = find_available_rooms(&pool).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].0.room_number, "101");
    }

    #[tokio::test]
    async fn student_room_lists_roommates_only() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let room = create_room(&pool, &request("201", 3)).await.unwrap();
        let ana = add_student(&pool, "Ana").await;
        let bia = add_student(&pool, "Bia").await;
        assignment_service::assign(&pool, &ana.id, &room.id).await.unwrap();
        let (_, bia) = assignment_service::assign(&pool, &bia.id, &room.id).await.unwrap();

        let (room, roommates) = student_room(&pool, &bia).await.unwrap();
        assert_eq!(room.occupied, 2);
        assert_eq!(roommates.len(), 1);
        assert_eq!(roommates[0].id, ana.id);
    }

    #[tokio::test]
    async fn student_without_room_gets_not_found() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let ana = add_student(&pool, "Ana").await;
        assert!(matches!(
            student_room(&pool, &ana).await,
            Err(AppError::NotFound(_))
        ));
    }
}
