//! Service layer: business logic over the SQLite pool and upload directory.

pub mod accessibility_service;
pub mod catalog_service;
pub mod content_service;
pub mod enrichment_service;

use accessibility_service::AccessibilityService;
use catalog_service::CatalogService;
use content_service::ContentService;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogService,
    pub content: ContentService,
    pub accessibility: AccessibilityService,
}
