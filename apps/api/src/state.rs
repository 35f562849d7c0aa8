use std::sync::Arc;

use crate::resume::service::ResumeService;
use crate::students::repository::StudentRepository;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub students: Arc<dyn StudentRepository>,
    /// Resume lifecycle; holds its own handle to the same repository.
    pub resumes: Arc<ResumeService>,
}
