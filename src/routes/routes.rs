//! Defines routes for the eduaccess API.
//!
//! ## Structure
//! - **Catalog endpoints**
//!   - `POST   /users` — create user; `GET /users/{id}/home`, `/users/{id}/teaching`
//!   - `POST   /courses`, `GET /courses`
//!   - `POST   /terms`
//!   - `POST   /offerings`, `GET/DELETE /offerings/{id}`
//!   - `POST   /offerings/{id}/teachers`, `POST /offerings/{id}/enrollments`
//!   - `POST/GET /offerings/{id}/modules`, `GET/DELETE /modules/{id}`
//!
//! - **Content endpoints**
//!   - `POST/GET /modules/{id}/content` — multipart upload / listing
//!   - `GET/PATCH/DELETE /content/{id}`
//!   - `GET/PUT /content/{id}/file` — stream / replace the stored payload
//!   - `GET    /content/{id}/transcript` — accessibility text download
//!
//! - **Accessibility endpoints**
//!   - `GET    /offerings/{id}/accessibility` — coverage dashboard
//!   - `POST   /offerings/{id}/accessibility/reprocess`
//!   - `GET/PUT /users/{id}/accessibility-profile`
//!
//! - **Progress endpoints**
//!   - `POST   /modules/{id}/view`, `POST /modules/{id}/complete`

use crate::{
    handlers::{
        accessibility_handlers::{get_profile, save_profile},
        content_handlers::{
            accessibility_dashboard, delete_content, download_payload, download_transcript,
            get_content, list_module_content, replace_payload, reprocess_pending, update_content,
            upload_content,
        },
        course_handlers::{
            assign_teacher, complete_module, create_course, create_module, create_offering,
            create_term, create_user, delete_module, delete_offering, enroll, get_module,
            get_offering, list_courses, list_modules, student_home, teacher_home, view_module,
        },
        health_handlers::{healthz, readyz},
    },
    services::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Uploads (PDFs, images) can be large; the axum default of 2 MiB is too
/// small for course material.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build and return the router for the whole API.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // users
        .route("/users", post(create_user))
        .route("/users/{id}/home", get(student_home))
        .route("/users/{id}/teaching", get(teacher_home))
        .route(
            "/users/{id}/accessibility-profile",
            get(get_profile).put(save_profile),
        )
        // catalog
        .route("/courses", post(create_course).get(list_courses))
        .route("/terms", post(create_term))
        .route("/offerings", post(create_offering))
        .route("/offerings/{id}", get(get_offering).delete(delete_offering))
        .route("/offerings/{id}/teachers", post(assign_teacher))
        .route("/offerings/{id}/enrollments", post(enroll))
        .route(
            "/offerings/{id}/modules",
            post(create_module).get(list_modules),
        )
        .route("/modules/{id}", get(get_module).delete(delete_module))
        // progress
        .route("/modules/{id}/view", post(view_module))
        .route("/modules/{id}/complete", post(complete_module))
        // content
        .route(
            "/modules/{id}/content",
            post(upload_content).get(list_module_content),
        )
        .route(
            "/content/{id}",
            get(get_content).patch(update_content).delete(delete_content),
        )
        .route(
            "/content/{id}/file",
            get(download_payload).put(replace_payload),
        )
        .route("/content/{id}/transcript", get(download_transcript))
        // accessibility dashboard
        .route(
            "/offerings/{id}/accessibility",
            get(accessibility_dashboard),
        )
        .route(
            "/offerings/{id}/accessibility/reprocess",
            post(reprocess_pending),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
