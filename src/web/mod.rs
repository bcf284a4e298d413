// src/web/mod.rs
pub mod admin_handlers;
pub mod auth_handlers;
pub mod mw_auth;
pub mod mw_role;
pub mod response;
pub mod routes;
pub mod student_handlers;
pub mod system_handlers;
