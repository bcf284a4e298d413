// src/models/validation.rs
//! Validação dos campos de entrada.
//!
//! Cada função devolve `Err(mensagem)` para o campo em causa; os pedidos juntam
//! as mensagens e devolvem `AppError::Validation` com a lista completa.

use lazy_static::lazy_static;
use regex::Regex;

pub const NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 6;
pub const MIN_CAPACITY: i64 = 1;
pub const MAX_CAPACITY: i64 = 10;

lazy_static! {
    /// Domínio com TLD de 2 ou 3 letras
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^\w+([\.-]?\w+)*@\w+([\.-]?\w+)*(\.\w{2,3})+$"
    ).unwrap();
}

/// Converte `Some("  ")` em `None` e apara o resto.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

pub fn validate_name(name: Option<&str>) -> Result<String, String> {
    let name = non_blank(name).ok_or_else(|| "Indique um nome".to_string())?;
    if name.chars().count() > NAME_MAX_LEN {
        return Err(format!("O nome não pode ter mais de {} caracteres", NAME_MAX_LEN));
    }
    Ok(name)
}

/// Devolve o email normalizado (aparado e em minúsculas).
pub fn validate_email(email: Option<&str>) -> Result<String, String> {
    let email = non_blank(email).ok_or_else(|| "Indique um email".to_string())?;
    let email = normalize_email(&email);
    if !EMAIL_REGEX.is_match(&email) {
        return Err("Indique um email válido".to_string());
    }
    Ok(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_password(password: Option<&str>) -> Result<String, String> {
    match password {
        None | Some("") => Err("Indique uma password".to_string()),
        Some(p) if p.chars().count() < PASSWORD_MIN_LEN => Err(format!(
            "A password deve ter pelo menos {} caracteres",
            PASSWORD_MIN_LEN
        )),
        Some(p) => Ok(p.to_string()),
    }
}

/// Números de quarto são guardados aparados e em maiúsculas ("a-205" -> "A-205").
pub fn normalize_room_number(room_number: &str) -> String {
    room_number.trim().to_uppercase()
}

pub fn validate_room_number(room_number: Option<&str>) -> Result<String, String> {
    non_blank(room_number)
        .map(|r| normalize_room_number(&r))
        .ok_or_else(|| "Indique o número do quarto".to_string())
}

pub fn validate_capacity(capacity: Option<i64>) -> Result<i64, String> {
    match capacity {
        None => Err("Indique a capacidade do quarto".to_string()),
        Some(c) if c < MIN_CAPACITY => {
            Err(format!("A capacidade deve ser pelo menos {}", MIN_CAPACITY))
        }
        Some(c) if c > MAX_CAPACITY => {
            Err(format!("A capacidade não pode exceder {}", MAX_CAPACITY))
        }
        Some(c) => Ok(c),
    }
}
