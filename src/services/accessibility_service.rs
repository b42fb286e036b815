//! src/services/accessibility_service.rs
//!
//! AccessibilityService — per-user presentation preferences. Profiles are
//! created lazily with defaults; saving one resets every preference field
//! and then applies only the fields belonging to the declared disability
//! type, so a type change cannot leave stale combinations behind.

use crate::models::accessibility::{AccessibilityProfile, DisabilityType};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_FONT_SIZE: i64 = 3;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("user `{0}` not found")]
    UserNotFound(Uuid),
    #[error("font size {0} is out of range (1-5)")]
    FontSizeOutOfRange(i64),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type ProfileResult<T> = Result<T, ProfileError>;

/// Preferences submitted when saving a profile. Fields not relevant to the
/// declared disability type are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub disability_type: Option<DisabilityType>,
    #[serde(default)]
    pub high_contrast: bool,
    pub font_size: Option<i64>,
    #[serde(default)]
    pub subtitles: bool,
}

#[derive(Clone)]
pub struct AccessibilityService {
    pub db: Arc<SqlitePool>,
}

impl AccessibilityService {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    async fn ensure_user_exists(&self, user_id: Uuid) -> ProfileResult<()> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
            .bind(user_id)
            .fetch_one(&*self.db)
            .await?;
        if exists {
            Ok(())
        } else {
            Err(ProfileError::UserNotFound(user_id))
        }
    }

    /// Fetch a user's profile, creating one with defaults on first access.
    pub async fn profile(&self, user_id: Uuid) -> ProfileResult<AccessibilityProfile> {
        self.ensure_user_exists(user_id).await?;

        let now = Utc::now();
        sqlx::query(
            "INSERT OR IGNORE INTO accessibility_profiles
                 (user_id, disability_type, high_contrast, font_size, subtitles, created_at, updated_at)
             VALUES (?, NULL, 0, ?, 1, ?, ?)",
        )
        .bind(user_id)
        .bind(DEFAULT_FONT_SIZE)
        .bind(now)
        .bind(now)
        .execute(&*self.db)
        .await?;

        self.fetch_profile(user_id).await
    }

    /// Save a profile: reset all preference fields, then apply only the
    /// ones belonging to the declared disability type.
    pub async fn save_profile(
        &self,
        user_id: Uuid,
        update: ProfileUpdate,
    ) -> ProfileResult<AccessibilityProfile> {
        // Ensure the row exists so the update below always hits one.
        self.profile(user_id).await?;

        // Reset, then apply per type.
        let mut high_contrast = false;
        let mut font_size = DEFAULT_FONT_SIZE;
        let mut subtitles = false;

        match update.disability_type {
            Some(DisabilityType::Visual) => {
                high_contrast = update.high_contrast;
                if let Some(size) = update.font_size {
                    if !(1..=5).contains(&size) {
                        return Err(ProfileError::FontSizeOutOfRange(size));
                    }
                    font_size = size;
                }
            }
            Some(DisabilityType::Auditory) => {
                subtitles = update.subtitles;
            }
            // NONE or unset: defaults stand.
            Some(DisabilityType::None) | None => {}
        }

        sqlx::query(
            "UPDATE accessibility_profiles
             SET disability_type = ?, high_contrast = ?, font_size = ?, subtitles = ?, updated_at = ?
             WHERE user_id = ?",
        )
        .bind(update.disability_type)
        .bind(high_contrast)
        .bind(font_size)
        .bind(subtitles)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&*self.db)
        .await?;

        self.fetch_profile(user_id).await
    }

    async fn fetch_profile(&self, user_id: Uuid) -> ProfileResult<AccessibilityProfile> {
        let profile = sqlx::query_as::<_, AccessibilityProfile>(
            "SELECT user_id, disability_type, high_contrast, font_size, subtitles, created_at, updated_at
             FROM accessibility_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(&*self.db)
        .await?;
        Ok(profile)
    }
}
