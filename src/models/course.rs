//! Courses, academic terms, offerings, and enrollments.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An institutional course, independent of teacher or term.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Course {
    pub id: Uuid,

    /// Institutional course code (unique, e.g. "CS-101").
    pub code: String,

    pub name: String,
    pub description: String,
    pub credits: i64,
    pub active: bool,
}

/// An academic period (e.g. "2025-1").
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct AcademicTerm {
    pub id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub active: bool,
}

/// One course instance scheduled within a specific academic term.
///
/// At most one offering exists per (course, term) pair.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Offering {
    pub id: Uuid,
    pub course_id: Uuid,
    pub term_id: Uuid,
    pub published: bool,
}

/// A student's enrollment in an offering.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub offering_id: Uuid,
    pub enrolled_at: DateTime<Utc>,
    pub active: bool,
}
