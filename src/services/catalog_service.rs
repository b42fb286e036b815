//! src/services/catalog_service.rs
//!
//! CatalogService — the relational surface of the platform: courses,
//! academic terms, offerings with teacher assignments, student enrollments,
//! modules, and per-user module progress. Deletes cascade down the
//! offering → module → content chain; payload files of cascaded content are
//! removed best-effort.

use crate::models::course::{AcademicTerm, Course, Enrollment, Offering};
use crate::models::module::{Module, ModuleProgress};
use crate::models::user::{Role, User};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::{io, path::PathBuf, sync::Arc};
use thiserror::Error;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("course `{0}` not found")]
    CourseNotFound(Uuid),
    #[error("term `{0}` not found")]
    TermNotFound(Uuid),
    #[error("offering `{0}` not found")]
    OfferingNotFound(Uuid),
    #[error("module `{0}` not found")]
    ModuleNotFound(Uuid),
    #[error("user `{0}` not found")]
    UserNotFound(Uuid),
    #[error("course code `{0}` already exists")]
    DuplicateCourseCode(String),
    #[error("offering for this course and term already exists")]
    DuplicateOffering,
    #[error("student is already enrolled in this offering")]
    AlreadyEnrolled,
    #[error("module position {0} is already taken in this offering")]
    PositionTaken(i64),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

#[derive(Debug, Deserialize)]
pub struct NewCourse {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub credits: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewTerm {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct NewModule {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub position: i64,
}

#[derive(Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub display_name: String,
    pub role: Role,
}

/// One row of a student's home view.
#[derive(Debug, Serialize)]
pub struct StudentCourseSummary {
    pub offering: Offering,
    pub course: Course,
    pub total_modules: i64,
    pub completed_modules: i64,
    /// Integer percentage; 0 when the offering has no modules.
    pub progress: i64,
}

/// One row of a teacher's home view.
#[derive(Debug, Serialize)]
pub struct TeachingSummary {
    pub offering: Offering,
    pub course: Course,
    pub students_count: i64,
}

/// CatalogService provides CRUD and aggregation over the course schema.
#[derive(Clone)]
pub struct CatalogService {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,

    /// Upload directory, used to remove payload files of cascaded content.
    pub base_path: PathBuf,
}

impl CatalogService {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    // --- users ---

    pub async fn create_user(&self, new: NewUser) -> CatalogResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            username: new.username,
            display_name: new.display_name,
            role: new.role,
            created_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO users (id, username, display_name, role, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&*self.db)
        .await?;
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> CatalogResult<User> {
        sqlx::query_as::<_, User>(
            "SELECT id, username, display_name, role, created_at FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => CatalogError::UserNotFound(user_id),
            other => CatalogError::Sqlx(other),
        })
    }

    // --- courses & terms ---

    pub async fn create_course(&self, new: NewCourse) -> CatalogResult<Course> {
        let course = Course {
            id: Uuid::new_v4(),
            code: new.code,
            name: new.name,
            description: new.description,
            credits: new.credits,
            active: true,
        };
        match sqlx::query(
            "INSERT INTO courses (id, code, name, description, credits, active) VALUES (?, ?, ?, ?, ?, 1)",
        )
        .bind(course.id)
        .bind(&course.code)
        .bind(&course.name)
        .bind(&course.description)
        .bind(course.credits)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(course),
            Err(err) if is_unique_violation(&err) => {
                Err(CatalogError::DuplicateCourseCode(course.code))
            }
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }

    pub async fn list_courses(&self) -> CatalogResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, Course>(
            "SELECT id, code, name, description, credits, active FROM courses ORDER BY code",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    pub async fn create_term(&self, new: NewTerm) -> CatalogResult<AcademicTerm> {
        let term = AcademicTerm {
            id: Uuid::new_v4(),
            name: new.name,
            start_date: new.start_date,
            end_date: new.end_date,
            active: new.active,
        };
        sqlx::query(
            "INSERT INTO academic_terms (id, name, start_date, end_date, active) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(term.id)
        .bind(&term.name)
        .bind(term.start_date)
        .bind(term.end_date)
        .bind(term.active)
        .execute(&*self.db)
        .await?;
        Ok(term)
    }

    // --- offerings ---

    pub async fn create_offering(
        &self,
        course_id: Uuid,
        term_id: Uuid,
        published: bool,
    ) -> CatalogResult<Offering> {
        self.get_course(course_id).await?;
        self.get_term(term_id).await?;

        let offering = Offering {
            id: Uuid::new_v4(),
            course_id,
            term_id,
            published,
        };
        match sqlx::query(
            "INSERT INTO offerings (id, course_id, term_id, published) VALUES (?, ?, ?, ?)",
        )
        .bind(offering.id)
        .bind(course_id)
        .bind(term_id)
        .bind(published)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(offering),
            Err(err) if is_unique_violation(&err) => Err(CatalogError::DuplicateOffering),
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }

    pub async fn get_course(&self, course_id: Uuid) -> CatalogResult<Course> {
        sqlx::query_as::<_, Course>(
            "SELECT id, code, name, description, credits, active FROM courses WHERE id = ?",
        )
        .bind(course_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => CatalogError::CourseNotFound(course_id),
            other => CatalogError::Sqlx(other),
        })
    }

    async fn get_term(&self, term_id: Uuid) -> CatalogResult<AcademicTerm> {
        sqlx::query_as::<_, AcademicTerm>(
            "SELECT id, name, start_date, end_date, active FROM academic_terms WHERE id = ?",
        )
        .bind(term_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => CatalogError::TermNotFound(term_id),
            other => CatalogError::Sqlx(other),
        })
    }

    pub async fn get_offering(&self, offering_id: Uuid) -> CatalogResult<Offering> {
        sqlx::query_as::<_, Offering>(
            "SELECT id, course_id, term_id, published FROM offerings WHERE id = ?",
        )
        .bind(offering_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => CatalogError::OfferingNotFound(offering_id),
            other => CatalogError::Sqlx(other),
        })
    }

    pub async fn assign_teacher(&self, offering_id: Uuid, user_id: Uuid) -> CatalogResult<()> {
        self.get_offering(offering_id).await?;
        self.get_user(user_id).await?;
        sqlx::query(
            "INSERT OR IGNORE INTO offering_teachers (offering_id, user_id) VALUES (?, ?)",
        )
        .bind(offering_id)
        .bind(user_id)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    /// Delete an offering; modules, content, enrollments, and progress rows
    /// cascade. Payload files of cascaded content are removed best-effort.
    pub async fn delete_offering(&self, offering_id: Uuid) -> CatalogResult<()> {
        let file_paths: Vec<String> = sqlx::query_scalar(
            "SELECT c.file_path FROM content c
             JOIN modules m ON c.module_id = m.id
             WHERE m.offering_id = ? AND c.file_path IS NOT NULL",
        )
        .bind(offering_id)
        .fetch_all(&*self.db)
        .await?;

        let result = sqlx::query("DELETE FROM offerings WHERE id = ?")
            .bind(offering_id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::OfferingNotFound(offering_id));
        }

        self.remove_payload_files(&file_paths).await;
        Ok(())
    }

    // --- enrollment ---

    pub async fn enroll(&self, offering_id: Uuid, student_id: Uuid) -> CatalogResult<Enrollment> {
        self.get_offering(offering_id).await?;
        self.get_user(student_id).await?;

        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            student_id,
            offering_id,
            enrolled_at: Utc::now(),
            active: true,
        };
        match sqlx::query(
            "INSERT INTO enrollments (id, student_id, offering_id, enrolled_at, active) VALUES (?, ?, ?, ?, 1)",
        )
        .bind(enrollment.id)
        .bind(student_id)
        .bind(offering_id)
        .bind(enrollment.enrolled_at)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(enrollment),
            Err(err) if is_unique_violation(&err) => Err(CatalogError::AlreadyEnrolled),
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }

    // --- modules ---

    pub async fn create_module(&self, offering_id: Uuid, new: NewModule) -> CatalogResult<Module> {
        self.get_offering(offering_id).await?;

        let module = Module {
            id: Uuid::new_v4(),
            offering_id,
            title: new.title,
            description: new.description,
            position: new.position.max(0),
        };
        match sqlx::query(
            "INSERT INTO modules (id, offering_id, title, description, position) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(module.id)
        .bind(offering_id)
        .bind(&module.title)
        .bind(&module.description)
        .bind(module.position)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(module),
            Err(err) if is_unique_violation(&err) => {
                Err(CatalogError::PositionTaken(module.position))
            }
            Err(err) => Err(CatalogError::Sqlx(err)),
        }
    }

    pub async fn get_module(&self, module_id: Uuid) -> CatalogResult<Module> {
        sqlx::query_as::<_, Module>(
            "SELECT id, offering_id, title, description, position FROM modules WHERE id = ?",
        )
        .bind(module_id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => CatalogError::ModuleNotFound(module_id),
            other => CatalogError::Sqlx(other),
        })
    }

    pub async fn list_modules(&self, offering_id: Uuid) -> CatalogResult<Vec<Module>> {
        self.get_offering(offering_id).await?;
        let rows = sqlx::query_as::<_, Module>(
            "SELECT id, offering_id, title, description, position
             FROM modules WHERE offering_id = ? ORDER BY position",
        )
        .bind(offering_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    /// Delete a module; its content cascades. Payload files are removed
    /// best-effort.
    pub async fn delete_module(&self, module_id: Uuid) -> CatalogResult<()> {
        let file_paths: Vec<String> = sqlx::query_scalar(
            "SELECT file_path FROM content WHERE module_id = ? AND file_path IS NOT NULL",
        )
        .bind(module_id)
        .fetch_all(&*self.db)
        .await?;

        let result = sqlx::query("DELETE FROM modules WHERE id = ?")
            .bind(module_id)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CatalogError::ModuleNotFound(module_id));
        }

        self.remove_payload_files(&file_paths).await;
        Ok(())
    }

    async fn remove_payload_files(&self, rel_paths: &[String]) {
        for rel_path in rel_paths {
            let file_path = self.base_path.join(rel_path);
            if let Err(err) = fs::remove_file(&file_path).await {
                if err.kind() != io::ErrorKind::NotFound {
                    debug!(
                        "failed to remove payload file {} after cascade: {}",
                        file_path.display(),
                        err
                    );
                }
            }
        }
    }

    // --- progress ---

    /// Record that a user viewed a module: create the progress row on first
    /// view, bump `last_accessed` on later ones.
    pub async fn record_module_view(
        &self,
        user_id: Uuid,
        module_id: Uuid,
    ) -> CatalogResult<ModuleProgress> {
        self.get_module(module_id).await?;
        self.get_user(user_id).await?;

        let progress = sqlx::query_as::<_, ModuleProgress>(
            "INSERT INTO module_progress (user_id, module_id, completed, last_accessed)
             VALUES (?, ?, 0, ?)
             ON CONFLICT(user_id, module_id) DO UPDATE SET last_accessed = excluded.last_accessed
             RETURNING user_id, module_id, completed, last_accessed",
        )
        .bind(user_id)
        .bind(module_id)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        Ok(progress)
    }

    /// Mark a module completed for a user.
    pub async fn complete_module(
        &self,
        user_id: Uuid,
        module_id: Uuid,
    ) -> CatalogResult<ModuleProgress> {
        self.get_module(module_id).await?;
        self.get_user(user_id).await?;

        let progress = sqlx::query_as::<_, ModuleProgress>(
            "INSERT INTO module_progress (user_id, module_id, completed, last_accessed)
             VALUES (?, ?, 1, ?)
             ON CONFLICT(user_id, module_id) DO UPDATE SET
                 completed = 1,
                 last_accessed = excluded.last_accessed
             RETURNING user_id, module_id, completed, last_accessed",
        )
        .bind(user_id)
        .bind(module_id)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;
        Ok(progress)
    }

    /// Student home: one summary per active enrollment, with completed and
    /// total module counts and an integer progress percentage.
    pub async fn student_home(&self, user_id: Uuid) -> CatalogResult<Vec<StudentCourseSummary>> {
        self.get_user(user_id).await?;

        let offerings = sqlx::query_as::<_, Offering>(
            "SELECT o.id, o.course_id, o.term_id, o.published
             FROM offerings o
             JOIN enrollments e ON e.offering_id = o.id
             WHERE e.student_id = ? AND e.active = 1",
        )
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;

        let mut summaries = Vec::with_capacity(offerings.len());
        for offering in offerings {
            let course = self.get_course(offering.course_id).await?;
            let total_modules: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM modules WHERE offering_id = ?")
                    .bind(offering.id)
                    .fetch_one(&*self.db)
                    .await?;
            let completed_modules: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM module_progress p
                 JOIN modules m ON p.module_id = m.id
                 WHERE p.user_id = ? AND m.offering_id = ? AND p.completed = 1",
            )
            .bind(user_id)
            .bind(offering.id)
            .fetch_one(&*self.db)
            .await?;

            let progress = if total_modules > 0 {
                completed_modules * 100 / total_modules
            } else {
                0
            };

            summaries.push(StudentCourseSummary {
                offering,
                course,
                total_modules,
                completed_modules,
                progress,
            });
        }
        Ok(summaries)
    }

    /// Teacher home: offerings taught with enrolled-student counts.
    pub async fn teacher_home(&self, user_id: Uuid) -> CatalogResult<Vec<TeachingSummary>> {
        self.get_user(user_id).await?;

        let offerings = sqlx::query_as::<_, Offering>(
            "SELECT o.id, o.course_id, o.term_id, o.published
             FROM offerings o
             JOIN offering_teachers t ON t.offering_id = o.id
             WHERE t.user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&*self.db)
        .await?;

        let mut summaries = Vec::with_capacity(offerings.len());
        for offering in offerings {
            let course = self.get_course(offering.course_id).await?;
            let students_count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM enrollments WHERE offering_id = ? AND active = 1",
            )
            .bind(offering.id)
            .fetch_one(&*self.db)
            .await?;
            summaries.push(TeachingSummary {
                offering,
                course,
                students_count,
            });
        }
        Ok(summaries)
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> Arc<SqlitePool> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        for statement in [
            "CREATE TABLE users (
                id BLOB PRIMARY KEY, username TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL, role TEXT NOT NULL, created_at TEXT NOT NULL)",
            "CREATE TABLE courses (
                id BLOB PRIMARY KEY, code TEXT NOT NULL UNIQUE, name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '', credits INTEGER NOT NULL,
                active INTEGER NOT NULL DEFAULT 1)",
            "CREATE TABLE academic_terms (
                id BLOB PRIMARY KEY, name TEXT NOT NULL UNIQUE,
                start_date TEXT NOT NULL, end_date TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 0)",
            "CREATE TABLE offerings (
                id BLOB PRIMARY KEY,
                course_id BLOB NOT NULL REFERENCES courses(id),
                term_id BLOB NOT NULL REFERENCES academic_terms(id),
                published INTEGER NOT NULL DEFAULT 0,
                UNIQUE (course_id, term_id))",
            "CREATE TABLE offering_teachers (
                offering_id BLOB NOT NULL REFERENCES offerings(id) ON DELETE CASCADE,
                user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (offering_id, user_id))",
            "CREATE TABLE enrollments (
                id BLOB PRIMARY KEY,
                student_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                offering_id BLOB NOT NULL REFERENCES offerings(id) ON DELETE CASCADE,
                enrolled_at TEXT NOT NULL, active INTEGER NOT NULL DEFAULT 1,
                UNIQUE (student_id, offering_id))",
            "CREATE TABLE modules (
                id BLOB PRIMARY KEY,
                offering_id BLOB NOT NULL REFERENCES offerings(id) ON DELETE CASCADE,
                title TEXT NOT NULL, description TEXT NOT NULL DEFAULT '',
                position INTEGER NOT NULL,
                UNIQUE (offering_id, position))",
            "CREATE TABLE content (
                id BLOB PRIMARY KEY,
                module_id BLOB NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
                title TEXT NOT NULL, kind TEXT NOT NULL,
                body TEXT, video_url TEXT, file_path TEXT, file_name TEXT,
                position INTEGER NOT NULL DEFAULT 0, created_at TEXT NOT NULL,
                ai_text TEXT, processed INTEGER NOT NULL DEFAULT 0)",
            "CREATE TABLE module_progress (
                user_id BLOB NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                module_id BLOB NOT NULL REFERENCES modules(id) ON DELETE CASCADE,
                completed INTEGER NOT NULL DEFAULT 0, last_accessed TEXT NOT NULL,
                PRIMARY KEY (user_id, module_id))",
        ] {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }

        Arc::new(pool)
    }

    fn service(db: Arc<SqlitePool>) -> CatalogService {
        CatalogService::new(db, std::env::temp_dir().join("eduaccess-catalog-test"))
    }

    async fn seed_offering(svc: &CatalogService) -> Offering {
        let course = svc
            .create_course(NewCourse {
                code: format!("CS-{}", &Uuid::new_v4().to_string()[..8]),
                name: "Intro".into(),
                description: String::new(),
                credits: 3,
            })
            .await
            .unwrap();
        let term = svc
            .create_term(NewTerm {
                name: format!("term-{}", &Uuid::new_v4().to_string()[..8]),
                start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
                active: true,
            })
            .await
            .unwrap();
        svc.create_offering(course.id, term.id, true).await.unwrap()
    }

    async fn seed_student(svc: &CatalogService) -> User {
        svc.create_user(NewUser {
            username: format!("student-{}", &Uuid::new_v4().to_string()[..8]),
            display_name: "Student".into(),
            role: Role::Student,
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn duplicate_course_code_is_rejected() {
        let svc = service(setup_test_db().await);
        let new = |code: &str| NewCourse {
            code: code.into(),
            name: "Intro".into(),
            description: String::new(),
            credits: 3,
        };
        svc.create_course(new("CS-101")).await.unwrap();
        let err = svc.create_course(new("CS-101")).await.unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCourseCode(_)));
    }

    #[tokio::test]
    async fn module_positions_are_unique_per_offering() {
        let svc = service(setup_test_db().await);
        let offering = seed_offering(&svc).await;

        svc.create_module(
            offering.id,
            NewModule {
                title: "One".into(),
                description: String::new(),
                position: 1,
            },
        )
        .await
        .unwrap();
        let err = svc
            .create_module(
                offering.id,
                NewModule {
                    title: "Clash".into(),
                    description: String::new(),
                    position: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::PositionTaken(1)));
    }

    #[tokio::test]
    async fn deleting_a_module_cascades_to_its_content() {
        let db = setup_test_db().await;
        let svc = service(db.clone());
        let offering = seed_offering(&svc).await;
        let module = svc
            .create_module(
                offering.id,
                NewModule {
                    title: "One".into(),
                    description: String::new(),
                    position: 1,
                },
            )
            .await
            .unwrap();

        let content_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO content (id, module_id, title, kind, position, created_at)
             VALUES (?, ?, 'Slides', 'FILE', 0, ?)",
        )
        .bind(content_id)
        .bind(module.id)
        .bind(Utc::now())
        .execute(&*db)
        .await
        .unwrap();

        svc.delete_module(module.id).await.unwrap();

        let err = svc.get_module(module.id).await.unwrap_err();
        assert!(matches!(err, CatalogError::ModuleNotFound(_)));

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM content WHERE id = ?")
            .bind(content_id)
            .fetch_one(&*db)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn deleting_an_offering_cascades_modules_content_and_enrollments() {
        let db = setup_test_db().await;
        let dir = std::env::temp_dir().join(format!("eduaccess-catalog-{}", Uuid::new_v4()));
        let svc = CatalogService::new(db.clone(), &dir);
        let offering = seed_offering(&svc).await;
        let student = seed_student(&svc).await;
        svc.enroll(offering.id, student.id).await.unwrap();
        let module = svc
            .create_module(
                offering.id,
                NewModule {
                    title: "One".into(),
                    description: String::new(),
                    position: 1,
                },
            )
            .await
            .unwrap();

        // A content row whose payload file lives under the upload dir.
        let content_id = Uuid::new_v4();
        let rel_path = format!("aa/bb/{}-slides.pdf", content_id);
        let file_path = dir.join(&rel_path);
        std::fs::create_dir_all(file_path.parent().unwrap()).unwrap();
        std::fs::write(&file_path, b"slides").unwrap();
        sqlx::query(
            "INSERT INTO content (id, module_id, title, kind, file_path, position, created_at)
             VALUES (?, ?, 'Slides', 'FILE', ?, 0, ?)",
        )
        .bind(content_id)
        .bind(module.id)
        .bind(&rel_path)
        .bind(Utc::now())
        .execute(&*db)
        .await
        .unwrap();

        svc.delete_offering(offering.id).await.unwrap();

        let err = svc.get_offering(offering.id).await.unwrap_err();
        assert!(matches!(err, CatalogError::OfferingNotFound(_)));
        for (table, query) in [
            ("modules", "SELECT COUNT(*) FROM modules WHERE offering_id = ?"),
            ("content", "SELECT COUNT(*) FROM content WHERE module_id = ?"),
            (
                "enrollments",
                "SELECT COUNT(*) FROM enrollments WHERE offering_id = ?",
            ),
        ] {
            let id = if table == "content" { module.id } else { offering.id };
            let remaining: i64 = sqlx::query_scalar(query)
                .bind(id)
                .fetch_one(&*db)
                .await
                .unwrap();
            assert_eq!(remaining, 0, "{} rows survived the cascade", table);
        }
        assert!(!file_path.exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn double_enrollment_is_rejected() {
        let svc = service(setup_test_db().await);
        let offering = seed_offering(&svc).await;
        let student = seed_student(&svc).await;

        svc.enroll(offering.id, student.id).await.unwrap();
        let err = svc.enroll(offering.id, student.id).await.unwrap_err();
        assert!(matches!(err, CatalogError::AlreadyEnrolled));
    }

    #[tokio::test]
    async fn student_home_reports_integer_progress() {
        let svc = service(setup_test_db().await);
        let offering = seed_offering(&svc).await;
        let student = seed_student(&svc).await;
        svc.enroll(offering.id, student.id).await.unwrap();

        let mut modules = Vec::new();
        for position in 1..=3 {
            modules.push(
                svc.create_module(
                    offering.id,
                    NewModule {
                        title: format!("Module {}", position),
                        description: String::new(),
                        position,
                    },
                )
                .await
                .unwrap(),
            );
        }
        svc.complete_module(student.id, modules[0].id).await.unwrap();

        let home = svc.student_home(student.id).await.unwrap();
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].total_modules, 3);
        assert_eq!(home[0].completed_modules, 1);
        assert_eq!(home[0].progress, 33);
    }

    #[tokio::test]
    async fn module_view_upserts_progress() {
        let svc = service(setup_test_db().await);
        let offering = seed_offering(&svc).await;
        let student = seed_student(&svc).await;
        let module = svc
            .create_module(
                offering.id,
                NewModule {
                    title: "One".into(),
                    description: String::new(),
                    position: 1,
                },
            )
            .await
            .unwrap();

        let first = svc.record_module_view(student.id, module.id).await.unwrap();
        assert!(!first.completed);

        let completed = svc.complete_module(student.id, module.id).await.unwrap();
        assert!(completed.completed);

        // A later view must not clear the completed flag.
        let viewed_again = svc.record_module_view(student.id, module.id).await.unwrap();
        assert!(viewed_again.completed);
        assert!(viewed_again.last_accessed >= completed.last_accessed);
    }

    #[tokio::test]
    async fn modules_list_in_position_order() {
        let svc = service(setup_test_db().await);
        let offering = seed_offering(&svc).await;

        assert!(svc.list_modules(offering.id).await.unwrap().is_empty());

        for position in [3, 1, 2] {
            svc.create_module(
                offering.id,
                NewModule {
                    title: format!("Module {}", position),
                    description: String::new(),
                    position,
                },
            )
            .await
            .unwrap();
        }

        // The first element is the entry module clients should land on.
        let modules = svc.list_modules(offering.id).await.unwrap();
        let positions: Vec<i64> = modules.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn teacher_home_counts_active_students() {
        let svc = service(setup_test_db().await);
        let offering = seed_offering(&svc).await;
        let teacher = svc
            .create_user(NewUser {
                username: "prof".into(),
                display_name: "Prof".into(),
                role: Role::Teacher,
            })
            .await
            .unwrap();
        svc.assign_teacher(offering.id, teacher.id).await.unwrap();

        for _ in 0..2 {
            let student = seed_student(&svc).await;
            svc.enroll(offering.id, student.id).await.unwrap();
        }

        let home = svc.teacher_home(teacher.id).await.unwrap();
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].students_count, 2);
    }
}
