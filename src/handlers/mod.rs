//! HTTP handler modules.

pub mod accessibility_handlers;
pub mod content_handlers;
pub mod course_handlers;
pub mod health_handlers;
