use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::student::ResumeAnalysis;
use crate::resume::service::ResumeInfo;
use crate::state::AppState;
use crate::students::parse_student_id;

/// Multipart field carrying the PDF.
const RESUME_FIELD: &str = "resume";

#[derive(Serialize)]
pub struct ResumeUploadResponse {
    pub message: &'static str,
    pub resume: ResumeInfo,
}

#[derive(Serialize)]
pub struct ResumeAnalyzeResponse {
    pub message: &'static str,
    pub analysis: ResumeAnalysis,
}

/// GET /api/students/:id/resume
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeInfo>, AppError> {
    let id = parse_student_id(&id)?;
    Ok(Json(state.resumes.get_info(id).await?))
}

/// POST /api/students/:id/resume
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ResumeUploadResponse>, AppError> {
    let id = parse_student_id(&id)?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("Resume upload has no file name".to_string()))?;
        let content = field.bytes().await.map_err(multipart_error)?;

        let resume = state.resumes.upload(id, &filename, &content).await?;
        return Ok(Json(ResumeUploadResponse {
            message: "Resume uploaded successfully",
            resume,
        }));
    }

    Err(AppError::Validation(format!(
        "Missing '{RESUME_FIELD}' file field"
    )))
}

/// GET /api/students/:id/resume/download
pub async fn handle_download_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_student_id(&id)
        .map_err(|_| AppError::NotFound("Resume not found".to_string()))?;
    let download = state.resumes.download(id).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        download.file_name.replace(['"', '\\'], "_")
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.content,
    )
        .into_response())
}

/// POST /api/students/:id/resume/analyze
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ResumeAnalyzeResponse>, AppError> {
    let id = parse_student_id(&id)?;
    let analysis = state.resumes.analyze(id).await?;
    Ok(Json(ResumeAnalyzeResponse {
        message: "Resume analyzed successfully",
        analysis,
    }))
}

/// DELETE /api/students/:id/resume
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_student_id(&id)?;
    state.resumes.delete(id).await?;
    Ok(Json(json!({ "message": "Resume deleted successfully" })))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::FileTooLarge("File too large. Maximum size is 5MB".to_string())
    } else {
        AppError::Validation(e.body_text())
    }
}
