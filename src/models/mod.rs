//! Core data models for the eduaccess backend.
//!
//! These entities mirror the relational schema in `migrations/0001_init.sql`.
//! They map to database rows via `sqlx::FromRow` and serialize naturally as
//! JSON via `serde`.

pub mod accessibility;
pub mod content;
pub mod course;
pub mod module;
pub mod user;
