// src/services/user_service.rs
use crate::{
    config::Config,
    db::is_unique_violation,
    error::{AppError, AppResult},
    models::{
        user::{NewUser, ProfileChanges, RegisterRequest, Role, User},
        validation::normalize_email,
    },
    services::{assignment_service, auth_service, room_service},
};
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, room_number, student_id, phone, created_at, updated_at";

/// Busca um utilizador na base de dados pelo seu ID.
pub async fn find_user_by_id<'e, E>(executor: E, user_id: &str) -> AppResult<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    tracing::debug!("Buscando utilizador por ID: {}", user_id);
    let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;
    Ok(user)
}

/// Busca pelo email (comparação sem distinção de maiúsculas).
pub async fn find_user_by_email(db_pool: &SqlitePool, email: &str) -> AppResult<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS);
    let user = sqlx::query_as::<_, User>(&sql)
        .bind(normalize_email(email))
        .fetch_optional(db_pool)
        .await?;
    Ok(user)
}

async fn student_id_taken(
    db_pool: &SqlitePool,
    student_id: &str,
    except_user: Option<&str>,
) -> AppResult<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE student_id = ? AND id <> COALESCE(?, '')")
            .bind(student_id)
            .bind(except_user)
            .fetch_one(db_pool)
            .await?;
    Ok(count > 0)
}

/// Garante que nem o email nem o número de estudante estão em uso.
async fn ensure_unique(db_pool: &SqlitePool, new_user: &NewUser) -> AppResult<()> {
    if find_user_by_email(db_pool, &new_user.email).await?.is_some() {
        tracing::warn!("Email '{}' já registado.", new_user.email);
        return Err(AppError::DuplicateKey(
            "Já existe um utilizador com este email".to_string(),
        ));
    }
    if let Some(student_id) = &new_user.student_id {
        if student_id_taken(db_pool, student_id, None).await? {
            return Err(AppError::DuplicateKey(
                "Já existe um estudante com este número".to_string(),
            ));
        }
    }
    Ok(())
}

/// Insere o utilizador já com a password em hash.
pub async fn insert_user<'e, E>(executor: E, new_user: &NewUser, password_hash: &str) -> AppResult<User>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let user = User {
        id: uuid::Uuid::new_v4().to_string(),
        name: new_user.name.clone(),
        email: new_user.email.clone(),
        password_hash: password_hash.to_string(),
        role: new_user.role,
        room_number: None,
        student_id: new_user.student_id.clone(),
        phone: new_user.phone.clone(),
        created_at: now,
        updated_at: now,
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, role, student_id, phone, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(&user.student_id)
    .bind(&user.phone)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(executor)
    .await;

    match result {
        Ok(_) => Ok(user),
        // Corrida entre a verificação prévia e o INSERT
        Err(e) if is_unique_violation(&e) => {
            tracing::warn!("Falha ao criar '{}': registo duplicado.", user.email);
            Err(AppError::DuplicateKey(
                "Já existe um utilizador com este email ou número de estudante".to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

/// Cria um utilizador (usado pelo admin para adicionar estudantes).
pub async fn create_user(db_pool: &SqlitePool, config: &Config, new_user: &NewUser) -> AppResult<User> {
    tracing::info!("Tentando criar utilizador: {} ({})", new_user.email, new_user.role);
    ensure_unique(db_pool, new_user).await?;

    let password_hash = auth_service::hash_password(&new_user.password, config.bcrypt_cost).await?;
    let user = insert_user(db_pool, new_user, &password_hash).await?;

    tracing::info!("✅ Utilizador '{}' criado com sucesso.", user.email);
    Ok(user)
}

/// Registo público. Se vier `roomNumber`, o estudante é colocado no quarto pela
/// via normal de atribuição, na mesma transação que cria a conta.
pub async fn register_user(
    db_pool: &SqlitePool,
    config: &Config,
    request: &RegisterRequest,
) -> AppResult<User> {
    let (new_user, room_number) = request.validate()?;
    let Some(room_number) = room_number else {
        return create_user(db_pool, config, &new_user).await;
    };

    tracing::info!("Registo de '{}' com quarto {}", new_user.email, room_number);
    ensure_unique(db_pool, &new_user).await?;
    let password_hash = auth_service::hash_password(&new_user.password, config.bcrypt_cost).await?;

    let mut tx = db_pool.begin().await?;
    let user = insert_user(&mut *tx, &new_user, &password_hash).await?;
    let room = room_service::find_room_by_number(&mut tx, &room_number)
        .await?
        .ok_or_else(|| {
            AppError::validation(vec![format!("O quarto {} não existe", room_number)])
        })?;
    assignment_service::assign_in_tx(&mut tx, &user, &room.id).await?;
    tx.commit().await?;

    find_user_by_id(db_pool, &user.id)
        .await?
        .ok_or(AppError::InternalServerError)
}

/// Verifica email e password. Ambos os casos de falha dão a mesma resposta.
pub async fn authenticate(db_pool: &SqlitePool, email: &str, password: &str) -> AppResult<User> {
    tracing::info!("Tentativa de login para: {}", email);
    let Some(user) = find_user_by_email(db_pool, email).await? else {
        tracing::warn!("Utilizador não encontrado: {}", email);
        return Err(AppError::InvalidCredentials);
    };

    if !auth_service::verify_password(password, &user.password_hash).await? {
        tracing::warn!("Senha incorreta para: {}", email);
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!("✅ Login bem-sucedido para: {}", user.id);
    Ok(user)
}

/// Todos os estudantes, ordenados por nome.
pub async fn list_students(db_pool: &SqlitePool) -> AppResult<Vec<User>> {
    tracing::debug!("Buscando todos os estudantes...");
    let sql = format!(
        "SELECT {} FROM users WHERE role = ? ORDER BY name COLLATE NOCASE ASC",
        USER_COLUMNS
    );
    let students = sqlx::query_as::<_, User>(&sql)
        .bind(Role::Student)
        .fetch_all(db_pool)
        .await?;
    tracing::debug!("Encontrados {} estudantes.", students.len());
    Ok(students)
}

/// Atualiza nome, telefone e número de estudante do próprio estudante.
pub async fn update_profile(
    db_pool: &SqlitePool,
    user_id: &str,
    changes: &ProfileChanges,
) -> AppResult<User> {
    tracing::info!("Atualizando perfil de: {}", user_id);

    if let Some(student_id) = &changes.student_id {
        if student_id_taken(db_pool, student_id, Some(user_id)).await? {
            return Err(AppError::DuplicateKey(
                "Já existe um estudante com este número".to_string(),
            ));
        }
    }

    let result = sqlx::query(
        r#"
        UPDATE users
        SET
            name = COALESCE(?, name),
            phone = COALESCE(?, phone),
            student_id = COALESCE(?, student_id),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&changes.name)
    .bind(&changes.phone)
    .bind(&changes.student_id)
    .bind(Utc::now())
    .bind(user_id)
    .execute(db_pool)
    .await;

    let rows_affected = match result {
        Ok(r) => r.rows_affected(),
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::DuplicateKey(
                "Já existe um estudante com este número".to_string(),
            ))
        }
        Err(e) => return Err(e.into()),
    };

    if rows_affected == 0 {
        tracing::warn!("Falha ao atualizar perfil: utilizador '{}' não encontrado.", user_id);
        return Err(AppError::NotFound("Utilizador não encontrado".to_string()));
    }

    tracing::info!("✅ Perfil atualizado para: {}", user_id);
    find_user_by_id(db_pool, user_id)
        .await?
        .ok_or(AppError::InternalServerError)
}

/// Escreve o ponteiro desnormalizado `users.room_number`.
/// Só deve ser chamado dentro da transação que altera `room_members`.
pub async fn set_room_number<'e, E>(
    executor: E,
    user_id: &str,
    room_number: Option<&str>,
) -> AppResult<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query("UPDATE users SET room_number = ?, updated_at = ? WHERE id = ?")
        .bind(room_number)
        .bind(Utc::now())
        .bind(user_id)
        .execute(executor)
        .await?
        .rows_affected();
    Ok(rows)
}
