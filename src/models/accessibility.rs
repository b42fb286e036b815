//! Per-user accessibility profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Declared primary disability type. Determines which presentation
/// preferences apply.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum DisabilityType {
    Visual,
    Auditory,
    None,
}

/// A user's accessibility preferences.
///
/// One profile per user, created lazily with defaults on first access.
/// Saving a profile resets all preference fields to their defaults and then
/// applies only the fields belonging to the declared disability type, so
/// stale combinations cannot survive a type change.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct AccessibilityProfile {
    pub user_id: Uuid,
    pub disability_type: Option<DisabilityType>,

    /// High-contrast presentation (visual).
    pub high_contrast: bool,

    /// Font size from 1 (very small) to 5 (very large); default 3 (visual).
    pub font_size: i64,

    /// Automatic subtitles (auditory).
    pub subtitles: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
