// src/db.rs
use crate::{config::Config, error::AppResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration; // Usar std::time::Duration aqui

/// Cria o pool a partir da configuração e aplica as migrações.
pub async fn create_db_pool(config: &Config) -> AppResult<SqlitePool> {
    tracing::info!("Ligando à base de dados: {}", config.database_url);
    connect(&config.database_url, 5).await
}

/// Liga-se a `database_url` e executa as migrações de ./migrations.
/// Para `sqlite::memory:` use `max_connections = 1`: cada ligação teria a sua própria base.
pub async fn connect(database_url: &str, max_connections: u32) -> AppResult<SqlitePool> {
    // Opções de conexão (criar se não existir, timeout, chaves estrangeiras)
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        // A base em memória desaparece com a última ligação
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    tracing::info!("Executando migrações da base de dados...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrações concluídas.");

    Ok(pool)
}

/// Verifica se o erro é uma violação de UNIQUE no SQLite.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map_or(false, |c| c == "19" || c == "2067" || c == "1555"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_database_is_migrated() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        for expected in ["room_members", "rooms", "users"] {
            assert!(tables.iter().any(|t| t == expected), "falta a tabela {}", expected);
        }
    }

    #[tokio::test]
    async fn duplicate_room_number_is_a_unique_violation() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let insert = "INSERT INTO rooms (id, room_number, capacity, occupied, created_at, updated_at) \
                      VALUES (?, '101', 2, 0, '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')";
        sqlx::query(insert).bind("a").execute(&pool).await.unwrap();
        let err = sqlx::query(insert).bind("b").execute(&pool).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn occupied_above_capacity_is_rejected_by_storage() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let result = sqlx::query(
            "INSERT INTO rooms (id, room_number, capacity, occupied, created_at, updated_at) \
             VALUES ('r', '102', 1, 2, '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
