// src/services/mod.rs
pub mod assignment_service;
pub mod auth_service;
pub mod room_service;
pub mod user_service;
