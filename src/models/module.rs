//! Modules and per-user module progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An ordered unit of a course offering containing content items.
///
/// `position` is unique within the owning offering and drives the order
/// modules are presented in.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Module {
    pub id: Uuid,
    pub offering_id: Uuid,
    pub title: String,
    pub description: String,
    pub position: i64,
}

/// Per-user, per-module progress record.
///
/// Created on first view of a module; `last_accessed` is bumped on every
/// subsequent view. `completed` is set by an explicit student action.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ModuleProgress {
    pub user_id: Uuid,
    pub module_id: Uuid,
    pub completed: bool,
    pub last_accessed: DateTime<Utc>,
}
