//! HTTP handlers for the course catalog: courses, terms, offerings,
//! modules, enrollments, and module progress.

use crate::{
    errors::AppError,
    models::{course::Course, module::Module},
    services::{
        AppState,
        catalog_service::{NewCourse, NewModule, NewTerm, NewUser},
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateOfferingReq {
    pub course_id: Uuid,
    pub term_id: Uuid,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Deserialize)]
pub struct AssignTeacherReq {
    pub user_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct EnrollReq {
    pub student_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ProgressReq {
    pub user_id: Uuid,
}

/// Offering detail: the surrounding course plus its modules and the entry
/// module a client should land on first.
#[derive(Debug, Serialize)]
pub struct OfferingDetail {
    pub offering_id: Uuid,
    pub course: Course,
    pub published: bool,
    pub modules: Vec<Module>,
    pub first_module_id: Option<Uuid>,
}

/// POST `/users`
pub async fn create_user(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::CREATED, Json(state.catalog.create_user(new).await?)))
}

/// POST `/courses`
pub async fn create_course(
    State(state): State<AppState>,
    Json(new): Json<NewCourse>,
) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::CREATED, Json(state.catalog.create_course(new).await?)))
}

/// GET `/courses`
pub async fn list_courses(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.list_courses().await?))
}

/// POST `/terms`
pub async fn create_term(
    State(state): State<AppState>,
    Json(new): Json<NewTerm>,
) -> Result<impl IntoResponse, AppError> {
    Ok((StatusCode::CREATED, Json(state.catalog.create_term(new).await?)))
}

/// POST `/offerings`
pub async fn create_offering(
    State(state): State<AppState>,
    Json(req): Json<CreateOfferingReq>,
) -> Result<impl IntoResponse, AppError> {
    let offering = state
        .catalog
        .create_offering(req.course_id, req.term_id, req.published)
        .await?;
    Ok((StatusCode::CREATED, Json(offering)))
}

/// GET `/offerings/{id}` — detail with modules and the entry module.
pub async fn get_offering(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
) -> Result<Json<OfferingDetail>, AppError> {
    let offering = state.catalog.get_offering(offering_id).await?;
    let course = state.catalog.get_course(offering.course_id).await?;
    let modules = state.catalog.list_modules(offering_id).await?;
    let first_module_id = modules.first().map(|module| module.id);

    Ok(Json(OfferingDetail {
        offering_id: offering.id,
        course,
        published: offering.published,
        modules,
        first_module_id,
    }))
}

/// DELETE `/offerings/{id}` — cascades modules, content, and enrollments.
pub async fn delete_offering(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog.delete_offering(offering_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/offerings/{id}/teachers`
pub async fn assign_teacher(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
    Json(req): Json<AssignTeacherReq>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog.assign_teacher(offering_id, req.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/offerings/{id}/enrollments`
pub async fn enroll(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
    Json(req): Json<EnrollReq>,
) -> Result<impl IntoResponse, AppError> {
    let enrollment = state.catalog.enroll(offering_id, req.student_id).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// POST `/offerings/{id}/modules`
pub async fn create_module(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
    Json(new): Json<NewModule>,
) -> Result<impl IntoResponse, AppError> {
    let module = state.catalog.create_module(offering_id, new).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

/// GET `/offerings/{id}/modules`
pub async fn list_modules(
    State(state): State<AppState>,
    Path(offering_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.list_modules(offering_id).await?))
}

/// GET `/modules/{id}`
pub async fn get_module(
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.get_module(module_id).await?))
}

/// DELETE `/modules/{id}` — cascades to the module's content.
pub async fn delete_module(
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.catalog.delete_module(module_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/modules/{id}/view` — upsert the viewer's progress row.
pub async fn view_module(
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
    Json(req): Json<ProgressReq>,
) -> Result<impl IntoResponse, AppError> {
    let progress = state.catalog.record_module_view(req.user_id, module_id).await?;
    Ok(Json(progress))
}

/// POST `/modules/{id}/complete`
pub async fn complete_module(
    State(state): State<AppState>,
    Path(module_id): Path<Uuid>,
    Json(req): Json<ProgressReq>,
) -> Result<impl IntoResponse, AppError> {
    let progress = state.catalog.complete_module(req.user_id, module_id).await?;
    Ok(Json(progress))
}

/// GET `/users/{id}/home` — student home view.
pub async fn student_home(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.student_home(user_id).await?))
}

/// GET `/users/{id}/teaching` — teacher home view.
pub async fn teacher_home(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.catalog.teacher_home(user_id).await?))
}
