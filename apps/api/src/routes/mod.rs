pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::config::MAX_RESUME_BYTES;
use crate::resume::handlers as resume;
use crate::state::AppState;
use crate::students::handlers as students;

/// Room for multipart framing on top of the largest accepted resume.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::root_handler))
        .route("/health", get(health::health_handler))
        .route(
            "/api/students",
            get(students::handle_list_students).post(students::handle_create_student),
        )
        .route("/api/students/:id", get(students::handle_get_student))
        .route(
            "/api/students/:id/resume",
            get(resume::handle_get_resume)
                .post(resume::handle_upload_resume)
                .delete(resume::handle_delete_resume)
                .layer(DefaultBodyLimit::max(
                    MAX_RESUME_BYTES + MULTIPART_OVERHEAD_BYTES,
                )),
        )
        .route(
            "/api/students/:id/resume/download",
            get(resume::handle_download_resume),
        )
        .route(
            "/api/students/:id/resume/analyze",
            post(resume::handle_analyze_resume),
        )
        .with_state(state)
}
