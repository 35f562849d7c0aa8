use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::AppError;

/// A student record, including the embedded resume metadata and analysis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub university: String,
    pub major: String,
    pub graduation_year: Option<i32>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub career_goals: Vec<String>,
    pub job_preferences: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_file: Option<ResumeFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_analysis: Option<ResumeAnalysis>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

/// List projection of a student. Resume fields are left out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub university: String,
    pub major: String,
    pub graduation_year: Option<i32>,
    pub skills: Vec<String>,
    pub interests: Vec<String>,
    pub career_goals: Vec<String>,
    pub job_preferences: Map<String, Value>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
}

impl From<Student> for StudentSummary {
    fn from(s: Student) -> Self {
        StudentSummary {
            id: s.id,
            name: s.name,
            email: s.email,
            university: s.university,
            major: s.major,
            graduation_year: s.graduation_year,
            skills: s.skills,
            interests: s.interests,
            career_goals: s.career_goals,
            job_preferences: s.job_preferences,
            is_active: s.is_active,
            created_at: s.created_at,
            last_login: s.last_login,
        }
    }
}

/// Profile fields supplied by the client when creating a student.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub graduation_year: Option<i32>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub career_goals: Vec<String>,
    #[serde(default)]
    pub job_preferences: Map<String, Value>,
}

impl NewStudent {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Name must not be empty".to_string()));
        }
        if !looks_like_email(&self.email) {
            return Err(AppError::Validation(format!(
                "'{}' is not a valid email address",
                self.email
            )));
        }
        Ok(())
    }
}

/// Metadata for the resume binary stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeFile {
    pub original_name: String,
    pub stored_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeAnalysis {
    pub overall_score: f64,
    pub category_scores: BTreeMap<String, f64>,
    pub strengths: Vec<String>,
    pub priority_improvements: Vec<String>,
    pub overall_assessment: String,
    pub last_analyzed: DateTime<Utc>,
}

/// Single `@`, non-empty local part, dotted domain, no whitespace.
pub fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
