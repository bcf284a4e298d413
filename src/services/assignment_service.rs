// src/services/assignment_service.rs
//! Atribuição e remoção de estudantes em quartos.
//!
//! A lista `room_members` é a fonte de verdade; `rooms.occupied` e
//! `users.room_number` são cópias derivadas. As três escritas de cada operação
//! acontecem numa única transação, cuja primeira instrução é uma escrita: o
//! SQLite dá o lock de escrita logo aí, pelo que duas atribuições concorrentes
//! ao mesmo quarto são serializadas e a segunda vê a ocupação já atualizada.

use crate::{
    error::{AppError, AppResult, AssignmentError},
    models::{
        room::Room,
        user::{MemberSummary, User},
    },
    services::{room_service, user_service},
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};

/// Coloca o estudante no quarto `room_id`, retirando-o do quarto anterior.
/// Devolve o quarto e o estudante já atualizados.
pub async fn assign(db_pool: &SqlitePool, student_id: &str, room_id: &str) -> AppResult<(Room, User)> {
    let (room, _, student) = assign_with_members(db_pool, student_id, room_id).await?;
    Ok((room, student))
}

/// Como `assign`, mas devolve também os membros do quarto, lidos na mesma
/// transação que os alterou.
pub async fn assign_with_members(
    db_pool: &SqlitePool,
    student_id: &str,
    room_id: &str,
) -> AppResult<(Room, Vec<MemberSummary>, User)> {
    tracing::info!("Atribuir estudante {} ao quarto {}", student_id, room_id);

    let student = user_service::find_user_by_id(db_pool, student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Estudante não encontrado".to_string()))?;
    if !student.is_student() {
        tracing::warn!("Utilizador {} não é estudante ({}).", student.id, student.role);
        return Err(AppError::NotAStudent);
    }

    let mut tx = db_pool.begin().await?;
    let room = assign_in_tx(&mut tx, &student, room_id).await?;
    let members = room_service::member_summaries(&mut tx, &room.id).await?;
    let student = user_service::find_user_by_id(&mut *tx, &student.id)
        .await?
        .ok_or(AppError::InternalServerError)?;
    tx.commit().await?;

    tracing::info!(
        "✅ Estudante {} atribuído ao quarto {} ({}/{})",
        student.name,
        room.room_number,
        room.occupied,
        room.capacity
    );
    Ok((room, members, student))
}

/// Passos da atribuição dentro de uma transação já aberta (também usado no registo).
pub async fn assign_in_tx(
    conn: &mut SqliteConnection,
    student: &User,
    room_id: &str,
) -> AppResult<Room> {
    // Escrita inicial: garante o lock de escrita antes de qualquer leitura
    let touched = sqlx::query("UPDATE rooms SET updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(room_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if touched == 0 {
        return Err(AppError::NotFound("Quarto não encontrado".to_string()));
    }

    let mut target = room_service::find_room_by_id(conn, room_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quarto não encontrado".to_string()))?;

    // Verificações antes de mexer no quarto anterior: uma falha não altera nada
    if target.contains(&student.id) {
        return Err(AssignmentError::AlreadyAssigned {
            room_number: target.room_number.clone(),
        }
        .into());
    }
    if target.is_full() {
        return Err(AssignmentError::CapacityExceeded {
            room_number: target.room_number.clone(),
            capacity: target.capacity,
        }
        .into());
    }

    // Ponteiro atual lido dentro da transação
    let current = user_service::find_user_by_id(&mut *conn, &student.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Estudante não encontrado".to_string()))?;
    if let Some(previous_number) = current.room_number.as_deref() {
        detach_from_previous(conn, &current, previous_number).await?;
    }

    target.add_student(&student.id)?;
    insert_member(conn, &target, &student.id).await?;
    room_service::save_room(conn, &mut target).await?;
    user_service::set_room_number(&mut *conn, &student.id, Some(&target.room_number)).await?;

    Ok(target)
}

/// Retira o estudante do quarto anterior. Um ponteiro para um quarto que já não
/// existe, ou que não o lista, é registado e ignorado: o ponteiro vai ser
/// reescrito a seguir de qualquer forma.
async fn detach_from_previous(
    conn: &mut SqliteConnection,
    student: &User,
    previous_number: &str,
) -> AppResult<()> {
    let Some(mut previous) = room_service::find_room_by_number(conn, previous_number).await? else {
        tracing::warn!(
            "Quarto anterior {} do estudante {} não existe; ponteiro será substituído.",
            previous_number,
            student.id
        );
        return Ok(());
    };

    match previous.remove_student(&student.id) {
        Ok(()) => {
            delete_member(conn, &previous.id, &student.id).await?;
            room_service::save_room(conn, &mut previous).await?;
            tracing::debug!("Estudante {} saiu do quarto {}", student.id, previous.room_number);
            Ok(())
        }
        Err(AssignmentError::NotInRoom { room_number }) => {
            tracing::warn!(
                "Estudante {} não constava do quarto anterior {}; a continuar.",
                student.id,
                room_number
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Insere o membro só se ainda houver cama livre. Com o lock de escrita já
/// obtido isto não falha, mas fica como guarda ao nível da base de dados.
async fn insert_member(conn: &mut SqliteConnection, room: &Room, student_id: &str) -> AppResult<()> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO room_members (room_id, user_id, assigned_at)
        SELECT ?1, ?2, ?3
        WHERE (SELECT COUNT(*) FROM room_members WHERE room_id = ?1)
            < (SELECT capacity FROM rooms WHERE id = ?1)
        "#,
    )
    .bind(&room.id)
    .bind(student_id)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if inserted == 0 {
        tracing::warn!("Quarto {} ficou cheio durante a atribuição.", room.room_number);
        return Err(AssignmentError::CapacityExceeded {
            room_number: room.room_number.clone(),
            capacity: room.capacity,
        }
        .into());
    }
    Ok(())
}

async fn delete_member(conn: &mut SqliteConnection, room_id: &str, student_id: &str) -> AppResult<()> {
    sqlx::query("DELETE FROM room_members WHERE room_id = ? AND user_id = ?")
        .bind(room_id)
        .bind(student_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Retira o estudante do quarto atual e limpa o ponteiro.
pub async fn remove(db_pool: &SqlitePool, student_id: &str) -> AppResult<User> {
    tracing::info!("Remover estudante {} do quarto", student_id);

    let student = user_service::find_user_by_id(db_pool, student_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Estudante não encontrado".to_string()))?;
    if student.room_number.is_none() {
        return Err(AssignmentError::NotAssigned.into());
    }

    let mut tx = db_pool.begin().await?;

    // Escrita inicial (lock). Se outro pedido já o removeu, não há nada a fazer.
    let cleared = sqlx::query(
        "UPDATE users SET updated_at = ? WHERE id = ? AND room_number IS NOT NULL",
    )
    .bind(Utc::now())
    .bind(&student.id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if cleared == 0 {
        return Err(AssignmentError::NotAssigned.into());
    }

    let current = user_service::find_user_by_id(&mut *tx, &student.id)
        .await?
        .ok_or(AppError::InternalServerError)?;
    let room_number = current
        .room_number
        .as_deref()
        .ok_or(AssignmentError::NotAssigned)?;

    match room_service::find_room_by_number(&mut tx, room_number).await? {
        Some(mut room) => {
            room.remove_student(&student.id)?;
            delete_member(&mut tx, &room.id, &student.id).await?;
            room_service::save_room(&mut tx, &mut room).await?;
        }
        None => {
            tracing::warn!(
                "Quarto {} do estudante {} não existe; só o ponteiro é limpo.",
                room_number,
                student.id
            );
        }
    }

    user_service::set_room_number(&mut *tx, &student.id, None).await?;
    tx.commit().await?;

    tracing::info!("✅ Estudante {} removido do quarto {}", student.name, room_number);
    user_service::find_user_by_id(db_pool, &student.id)
        .await?
        .ok_or(AppError::InternalServerError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db,
        models::{
            room::CreateRoomRequest,
            user::{RegisterRequest, Role},
        },
        services::user_service::tests::{add_student, test_config},
    };

    async fn room(pool: &SqlitePool, number: &str, capacity: i64) -> Room {
        room_service::create_room(
            pool,
            &CreateRoomRequest {
                room_number: Some(number.into()),
                capacity: Some(capacity),
            },
        )
        .await
        .unwrap()
    }

    async fn reload(pool: &SqlitePool, room_id: &str) -> Room {
        let mut conn = pool.acquire().await.unwrap();
        room_service::find_room_by_id(&mut conn, room_id)
            .await
            .unwrap()
            .unwrap()
    }

    async fn reload_user(pool: &SqlitePool, id: &str) -> User {
        user_service::find_user_by_id(pool, id).await.unwrap().unwrap()
    }

    fn assert_consistent(room: &Room) {
        assert_eq!(room.occupied as usize, room.students.len());
        assert!(room.occupied <= room.capacity);
    }

    #[tokio::test]
    async fn filling_a_room_then_overflowing_it() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let r101 = room(&pool, "101", 2).await;
        let a = add_student(&pool, "Ana").await;
        let b = add_student(&pool, "Bruno").await;
        let c = add_student(&pool, "Carla").await;

        assign(&pool, &a.id, &r101.id).await.unwrap();
        let (after, b) = assign(&pool, &b.id, &r101.id).await.unwrap();
        assert_eq!(after.occupied, 2);
        assert!(after.is_full());
        assert_eq!(after.occupancy_rate(), 100);
        assert_eq!(b.room_number.as_deref(), Some("101"));

        let err = assign(&pool, &c.id, &r101.id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Assignment(AssignmentError::CapacityExceeded { .. })
        ));

        // Nada mudou com a falha
        let stored = reload(&pool, &r101.id).await;
        assert_consistent(&stored);
        assert_eq!(stored.students, vec![a.id.clone(), b.id.clone()]);
        assert_eq!(reload_user(&pool, &c.id).await.room_number, None);
    }

    #[tokio::test]
    async fn assigning_a_member_again_fails_without_changes() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let r = room(&pool, "101", 3).await;
        let a = add_student(&pool, "Ana").await;
        assign(&pool, &a.id, &r.id).await.unwrap();

        let err = assign(&pool, &a.id, &r.id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Assignment(AssignmentError::AlreadyAssigned { .. })
        ));

        let stored = reload(&pool, &r.id).await;
        assert_eq!(stored.students, vec![a.id.clone()]);
        assert_eq!(stored.occupied, 1);
        assert_eq!(reload_user(&pool, &a.id).await.room_number.as_deref(), Some("101"));
    }

    #[tokio::test]
    async fn reassigning_moves_the_student() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let room_a = room(&pool, "a1", 2).await;
        let room_b = room(&pool, "b1", 2).await;
        let s = add_student(&pool, "Sara").await;

        assign(&pool, &s.id, &room_a.id).await.unwrap();
        let (b_after, s_after) = assign(&pool, &s.id, &room_b.id).await.unwrap();

        let a_after = reload(&pool, &room_a.id).await;
        assert!(!a_after.contains(&s.id));
        assert_eq!(a_after.occupied, 0);
        assert_eq!(b_after.students.iter().filter(|id| **id == s.id).count(), 1);
        assert_eq!(s_after.room_number.as_deref(), Some("B1"));
        assert_consistent(&a_after);
        assert_consistent(&reload(&pool, &room_b.id).await);
    }

    #[tokio::test]
    async fn unknown_student_or_room_is_not_found() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let r = room(&pool, "101", 2).await;
        let s = add_student(&pool, "Ana").await;
        assert!(matches!(
            assign(&pool, "nao-existe", &r.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            assign(&pool, &s.id, "nao-existe").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn admins_cannot_be_assigned() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let r = room(&pool, "101", 2).await;
        let admin = user_service::register_user(
            &pool,
            &test_config(),
            &RegisterRequest {
                name: Some("Chefe".into()),
                email: Some("chefe@escola.pt".into()),
                password: Some("segredo".into()),
                role: Some(Role::Admin),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(matches!(
            assign(&pool, &admin.id, &r.id).await,
            Err(AppError::NotAStudent)
        ));
    }

    #[tokio::test]
    async fn removing_frees_the_bed() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let r = room(&pool, "101", 2).await;
        let a = add_student(&pool, "Ana").await;
        let b = add_student(&pool, "Bruno").await;
        assign(&pool, &a.id, &r.id).await.unwrap();
        assign(&pool, &b.id, &r.id).await.unwrap();

        let a = remove(&pool, &a.id).await.unwrap();
        assert_eq!(a.room_number, None);
        let stored = reload(&pool, &r.id).await;
        assert_eq!(stored.occupied, 1);
        assert_eq!(stored.students, vec![b.id.clone()]);
    }

    #[tokio::test]
    async fn removing_an_unassigned_student_fails() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let a = add_student(&pool, "Ana").await;
        assert!(matches!(
            remove(&pool, &a.id).await,
            Err(AppError::Assignment(AssignmentError::NotAssigned))
        ));
        assert!(matches!(
            remove(&pool, "nao-existe").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn stale_pointer_is_overwritten_on_assign() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let r = room(&pool, "101", 2).await;
        let a = add_student(&pool, "Ana").await;
        user_service::set_room_number(&pool, &a.id, Some("FANTASMA"))
            .await
            .unwrap();

        let (room, a) = assign(&pool, &a.id, &r.id).await.unwrap();
        assert_eq!(room.occupied, 1);
        assert_eq!(a.room_number.as_deref(), Some("101"));
    }

    #[tokio::test]
    async fn pointer_without_membership_is_an_integrity_error_on_remove() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        room(&pool, "101", 2).await;
        let a = add_student(&pool, "Ana").await;
        user_service::set_room_number(&pool, &a.id, Some("101")).await.unwrap();

        assert!(matches!(
            remove(&pool, &a.id).await,
            Err(AppError::Assignment(AssignmentError::NotInRoom { .. }))
        ));
        // A transação foi desfeita: o ponteiro mantém-se
        assert_eq!(reload_user(&pool, &a.id).await.room_number.as_deref(), Some("101"));
    }

    #[tokio::test]
    async fn remove_with_missing_room_clears_pointer() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let a = add_student(&pool, "Ana").await;
        user_service::set_room_number(&pool, &a.id, Some("FANTASMA"))
            .await
            .unwrap();

        let a = remove(&pool, &a.id).await.unwrap();
        assert_eq!(a.room_number, None);
        assert_eq!(reload_user(&pool, &a.id).await.room_number, None);
    }

    #[tokio::test]
    async fn moving_into_a_full_room_keeps_the_old_assignment() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let room_a = room(&pool, "A", 2).await;
        let room_b = room(&pool, "B", 1).await;
        let s = add_student(&pool, "Sara").await;
        let t = add_student(&pool, "Tiago").await;
        assign(&pool, &s.id, &room_a.id).await.unwrap();
        assign(&pool, &t.id, &room_b.id).await.unwrap();

        let err = assign(&pool, &s.id, &room_b.id).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Assignment(AssignmentError::CapacityExceeded { .. })
        ));

        let a_after = reload(&pool, &room_a.id).await;
        assert_consistent(&a_after);
        assert_eq!(a_after.occupied, 1);
        assert_eq!(a_after.students, vec![s.id.clone()]);
        let b_after = reload(&pool, &room_b.id).await;
        assert_eq!(b_after.students, vec![t.id.clone()]);
        assert_eq!(reload_user(&pool, &s.id).await.room_number.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn assignment_returns_members_matching_occupancy() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let r = room(&pool, "101", 3).await;
        let a = add_student(&pool, "Ana").await;
        let b = add_student(&pool, "Bruno").await;
        assign(&pool, &a.id, &r.id).await.unwrap();

        let (room, members, b) = assign_with_members(&pool, &b.id, &r.id).await.unwrap();
        assert_eq!(room.occupied as usize, members.len());
        let ids: Vec<String> = members.into_iter().map(|m| m.id).collect();
        assert_eq!(ids, room.students);
        assert_eq!(ids, vec![a.id.clone(), b.id.clone()]);
    }

    #[tokio::test]
    async fn register_with_room_goes_through_assignment() {
        let pool = db::connect("sqlite::memory:", 1).await.unwrap();
        let r = room(&pool, "301", 1).await;
        let request = |name: &str| RegisterRequest {
            name: Some(name.into()),
            email: Some(format!("{}@escola.pt", name.to_lowercase())),
            password: Some("segredo".into()),
            room_number: Some("301".into()),
            ..Default::default()
        };

        let first = user_service::register_user(&pool, &test_config(), &request("Rui"))
            .await
            .unwrap();
        assert_eq!(first.room_number.as_deref(), Some("301"));
        assert_eq!(reload(&pool, &r.id).await.students, vec![first.id.clone()]);

        let err = user_service::register_user(&pool, &test_config(), &request("Rita"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Assignment(AssignmentError::CapacityExceeded { .. })
        ));
        // A conta também não ficou criada
        assert!(user_service::find_user_by_email(&pool, "rita@escola.pt")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn concurrent_assignments_to_the_last_bed() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("hostel.db").display());
        let pool = db::connect(&url, 5).await.unwrap();

        let r = room(&pool, "401", 2).await;
        let first = add_student(&pool, "Ana").await;
        let a = add_student(&pool, "Bruno").await;
        let b = add_student(&pool, "Carla").await;
        assign(&pool, &first.id, &r.id).await.unwrap();

        let (ra, rb) = tokio::join!(assign(&pool, &a.id, &r.id), assign(&pool, &b.id, &r.id));
        let outcomes = [ra.is_ok(), rb.is_ok()];
        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);

        let loser = if ra.is_ok() { rb.unwrap_err() } else { ra.unwrap_err() };
        assert!(matches!(
            loser,
            AppError::Assignment(AssignmentError::CapacityExceeded { .. })
        ));

        let stored = reload(&pool, &r.id).await;
        assert_consistent(&stored);
        assert_eq!(stored.occupied, 2);
    }
}
