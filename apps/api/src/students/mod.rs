pub mod handlers;
#[cfg(test)]
pub mod memory;
pub mod repository;

use uuid::Uuid;

use crate::errors::AppError;

/// Parses a student id from a path segment. Malformed ids can never name a
/// stored student, so they are reported as not found.
pub fn parse_student_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Student {raw} not found")))
}
