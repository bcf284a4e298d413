// src/models/mod.rs
pub mod room;
pub mod user;
pub mod validation;
