// src/config.rs
use crate::error::{AppError, AppResult};
use std::env;
use std::str::FromStr;

/// Configuração da aplicação, lida das variáveis de ambiente (e do `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Validade do token em dias (30 por omissão).
    pub jwt_expires_days: i64,
    pub port: u16,
    pub app_env: String,
    /// Custo do bcrypt (10 por omissão; os testes usam o mínimo, 4).
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok(); // Carrega .env

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            tracing::warn!("⚠️ JWT_SECRET é curta, considere usar uma chave mais longa e aleatória!");
        }

        Ok(Config {
            database_url,
            jwt_secret,
            jwt_expires_days: optional("JWT_EXPIRES_DAYS", 30)?,
            port: optional("PORT", 5000)?,
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            bcrypt_cost: optional("BCRYPT_COST", 10)?,
        })
    }
}

fn required(name: &str) -> AppResult<String> {
    let value = env::var(name).inspect_err(|_| {
        tracing::error!("❌ Variável {} não definida.", name);
    })?;
    Ok(value)
}

fn optional<T: FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::ConfigError(format!("{} tem um valor inválido: '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_falls_back_to_default() {
        let port: u16 = optional("HOSTEL_TEST_UNSET_VARIABLE", 5000).unwrap();
        assert_eq!(port, 5000);
    }

    #[test]
    fn missing_required_variable_is_an_env_var_error() {
        let result = required("HOSTEL_TEST_MISSING_REQUIRED");
        assert!(matches!(result, Err(AppError::EnvVarError(_))));
    }

    #[test]
    fn optional_rejects_garbage() {
        env::set_var("HOSTEL_TEST_BAD_PORT", "not-a-port");
        let result: AppResult<u16> = optional("HOSTEL_TEST_BAD_PORT", 5000);
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }
}
