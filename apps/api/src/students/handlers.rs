use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::student::{NewStudent, Student, StudentSummary};
use crate::state::AppState;
use crate::students::parse_student_id;

#[derive(Serialize)]
pub struct StudentListResponse {
    pub students: Vec<StudentSummary>,
}

#[derive(Serialize)]
pub struct CreatedStudent {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub university: String,
    pub major: String,
}

#[derive(Serialize)]
pub struct StudentCreateResponse {
    pub message: &'static str,
    pub student: CreatedStudent,
}

/// GET /api/students
pub async fn handle_list_students(
    State(state): State<AppState>,
) -> Result<Json<StudentListResponse>, AppError> {
    let students = state.students.list().await?;
    Ok(Json(StudentListResponse { students }))
}

/// POST /api/students
pub async fn handle_create_student(
    State(state): State<AppState>,
    Json(req): Json<NewStudent>,
) -> Result<Json<StudentCreateResponse>, AppError> {
    req.validate()?;
    let student = state.students.create(req).await?;
    Ok(Json(StudentCreateResponse {
        message: "Student created successfully",
        student: CreatedStudent {
            id: student.id,
            name: student.name,
            email: student.email,
            university: student.university,
            major: student.major,
        },
    }))
}

/// GET /api/students/:id
pub async fn handle_get_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Student>, AppError> {
    let id = parse_student_id(&id)?;
    Ok(Json(state.students.get(id).await?))
}
