use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<crate::services::catalog_service::CatalogError> for AppError {
    fn from(err: crate::services::catalog_service::CatalogError) -> Self {
        use crate::services::catalog_service::CatalogError::*;
        match err {
            CourseNotFound(_) | TermNotFound(_) | OfferingNotFound(_) | ModuleNotFound(_)
            | UserNotFound(_) => AppError::not_found(err.to_string()),
            DuplicateCourseCode(_) | DuplicateOffering | AlreadyEnrolled | PositionTaken(_) => {
                AppError::new(StatusCode::CONFLICT, err.to_string())
            }
            Sqlx(_) | Io(_) => AppError::internal(err.to_string()),
        }
    }
}

impl From<crate::services::content_service::ContentError> for AppError {
    fn from(err: crate::services::content_service::ContentError) -> Self {
        use crate::services::content_service::ContentError::*;
        match err {
            ModuleNotFound(_) | ContentNotFound(_) | PayloadNotFound(_) | OfferingNotFound(_) => {
                AppError::not_found(err.to_string())
            }
            Sqlx(_) | Io(_) => AppError::internal(err.to_string()),
        }
    }
}

impl From<crate::services::accessibility_service::ProfileError> for AppError {
    fn from(err: crate::services::accessibility_service::ProfileError) -> Self {
        use crate::services::accessibility_service::ProfileError::*;
        match err {
            UserNotFound(_) => AppError::not_found(err.to_string()),
            FontSizeOutOfRange(_) => AppError::bad_request(err.to_string()),
            Sqlx(_) => AppError::internal(err.to_string()),
        }
    }
}
