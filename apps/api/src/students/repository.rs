//! Student record persistence.
//!
//! A student is one row in `students`; the embedded resume metadata, the
//! analysis and the job preferences live in JSONB columns.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::student::{NewStudent, ResumeAnalysis, ResumeFile, Student, StudentSummary};

/// CRUD access to student records. Carried in `AppState` as
/// `Arc<dyn StudentRepository>`.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Inserts a new student. Fails with `Conflict` if the email is taken.
    async fn create(&self, profile: NewStudent) -> Result<Student, AppError>;

    async fn get(&self, id: Uuid) -> Result<Student, AppError>;

    /// All students, oldest first, without resume fields.
    async fn list(&self) -> Result<Vec<StudentSummary>, AppError>;

    async fn set_resume_file(&self, id: Uuid, file: &ResumeFile) -> Result<(), AppError>;

    async fn set_resume_analysis(
        &self,
        id: Uuid,
        analysis: &ResumeAnalysis,
    ) -> Result<(), AppError>;

    /// Removes both the resume metadata and the analysis.
    async fn clear_resume_fields(&self, id: Uuid) -> Result<(), AppError>;

    /// Round-trips the backing store; used by the health check.
    async fn ping(&self) -> Result<(), AppError>;
}

pub(crate) fn student_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Student {id} not found"))
}

pub(crate) fn duplicate_email(email: &str) -> AppError {
    AppError::Conflict(format!("Student with email {email} already exists"))
}

#[derive(Debug, FromRow)]
struct StudentRow {
    id: Uuid,
    name: String,
    email: String,
    university: String,
    major: String,
    graduation_year: Option<i32>,
    skills: Vec<String>,
    interests: Vec<String>,
    career_goals: Vec<String>,
    job_preferences: Json<Map<String, Value>>,
    resume_file: Option<Json<ResumeFile>>,
    resume_analysis: Option<Json<ResumeAnalysis>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    last_login: DateTime<Utc>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: row.id,
            name: row.name,
            email: row.email,
            university: row.university,
            major: row.major,
            graduation_year: row.graduation_year,
            skills: row.skills,
            interests: row.interests,
            career_goals: row.career_goals,
            job_preferences: row.job_preferences.0,
            resume_file: row.resume_file.map(|j| j.0),
            resume_analysis: row.resume_analysis.map(|j| j.0),
            is_active: row.is_active,
            created_at: row.created_at,
            last_login: row.last_login,
        }
    }
}

type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>;

/// PostgreSQL-backed repository.
#[derive(Clone)]
pub struct PgStudentRepository {
    pool: PgPool,
}

impl PgStudentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn update_one(&self, id: Uuid, query: PgQuery<'_>) -> Result<(), AppError> {
        let result = query.execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(student_not_found(id));
        }
        Ok(())
    }
}

#[async_trait]
impl StudentRepository for PgStudentRepository {
    async fn create(&self, profile: NewStudent) -> Result<Student, AppError> {
        let now = Utc::now();
        let row: StudentRow = sqlx::query_as(
            r#"
            INSERT INTO students
                (id, name, email, university, major, graduation_year, skills,
                 interests, career_goals, job_preferences, is_active, created_at, last_login)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE, $11, $11)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(&profile.university)
        .bind(&profile.major)
        .bind(profile.graduation_year)
        .bind(&profile.skills)
        .bind(&profile.interests)
        .bind(&profile.career_goals)
        .bind(Json(&profile.job_preferences))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                duplicate_email(&profile.email)
            }
            other => AppError::Database(other),
        })?;

        info!("Created student {} ({})", row.id, row.email);
        Ok(row.into())
    }

    async fn get(&self, id: Uuid) -> Result<Student, AppError> {
        let row: Option<StudentRow> = sqlx::query_as("SELECT * FROM students WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Student::from).ok_or_else(|| student_not_found(id))
    }

    async fn list(&self) -> Result<Vec<StudentSummary>, AppError> {
        // Resume columns are nulled out in the projection rather than fetched.
        let rows: Vec<StudentRow> = sqlx::query_as(
            r#"
            SELECT id, name, email, university, major, graduation_year, skills,
                   interests, career_goals, job_preferences,
                   NULL::jsonb AS resume_file, NULL::jsonb AS resume_analysis,
                   is_active, created_at, last_login
            FROM students
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StudentSummary::from(Student::from(row)))
            .collect())
    }

    async fn set_resume_file(&self, id: Uuid, file: &ResumeFile) -> Result<(), AppError> {
        self.update_one(
            id,
            sqlx::query("UPDATE students SET resume_file = $2 WHERE id = $1")
                .bind(id)
                .bind(Json(file)),
        )
        .await
    }

    async fn set_resume_analysis(
        &self,
        id: Uuid,
        analysis: &ResumeAnalysis,
    ) -> Result<(), AppError> {
        self.update_one(
            id,
            sqlx::query("UPDATE students SET resume_analysis = $2 WHERE id = $1")
                .bind(id)
                .bind(Json(analysis)),
        )
        .await
    }

    async fn clear_resume_fields(&self, id: Uuid) -> Result<(), AppError> {
        self.update_one(
            id,
            sqlx::query(
                "UPDATE students SET resume_file = NULL, resume_analysis = NULL WHERE id = $1",
            )
            .bind(id),
        )
        .await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(all(test, feature = "postgres-tests"))]
mod tests {
    use serde_json::json;

    use super::*;

    fn profile(email: &str) -> NewStudent {
        let mut job_preferences = Map::new();
        job_preferences.insert("remote".to_string(), json!(true));
        NewStudent {
            name: "A".to_string(),
            email: email.to_string(),
            university: "State".to_string(),
            major: "CS".to_string(),
            graduation_year: Some(2027),
            skills: vec!["rust".into()],
            interests: vec![],
            career_goals: vec!["backend".into()],
            job_preferences,
        }
    }

    fn resume_file() -> ResumeFile {
        ResumeFile {
            original_name: "cv.pdf".to_string(),
            stored_name: "resume-x-20240101000000-cv.pdf".to_string(),
            file_path: "uploads/resumes/resume-x-20240101000000-cv.pdf".to_string(),
            file_size: 10,
            uploaded_at: Utc::now(),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_then_get(pool: PgPool) {
        let repo = PgStudentRepository::new(pool);
        let created = repo.create(profile("a@x.com")).await.unwrap();
        let fetched = repo.get(created.id).await.unwrap();

        assert_eq!(fetched.email, "a@x.com");
        assert_eq!(fetched.skills, vec!["rust"]);
        assert_eq!(fetched.job_preferences["remote"], json!(true));
        assert!(fetched.is_active);
        assert!(fetched.resume_file.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_duplicate_email_is_conflict(pool: PgPool) {
        let repo = PgStudentRepository::new(pool);
        repo.create(profile("a@x.com")).await.unwrap();
        let err = repo.create(profile("a@x.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_updates_on_missing_student_are_not_found(pool: PgPool) {
        let repo = PgStudentRepository::new(pool);
        let id = Uuid::new_v4();
        assert!(matches!(repo.get(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            repo.set_resume_file(id, &resume_file()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            repo.clear_resume_fields(id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_resume_fields_round_trip_and_clear(pool: PgPool) {
        let repo = PgStudentRepository::new(pool);
        let id = repo.create(profile("a@x.com")).await.unwrap().id;
        let file = resume_file();
        repo.set_resume_file(id, &file).await.unwrap();

        let stored = repo.get(id).await.unwrap().resume_file.unwrap();
        assert_eq!(stored.file_path, file.file_path);
        assert_eq!(stored.file_size, 10);

        repo.clear_resume_fields(id).await.unwrap();
        let student = repo.get(id).await.unwrap();
        assert!(student.resume_file.is_none());
        assert!(student.resume_analysis.is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_list_leaves_out_resume_fields(pool: PgPool) {
        let repo = PgStudentRepository::new(pool);
        let id = repo.create(profile("a@x.com")).await.unwrap().id;
        repo.create(profile("b@x.com")).await.unwrap();
        repo.set_resume_file(id, &resume_file()).await.unwrap();

        let students = repo.list().await.unwrap();
        assert_eq!(students.len(), 2);
        let with_resume = students.iter().find(|s| s.id == id).unwrap();
        let value = serde_json::to_value(with_resume).unwrap();
        assert!(value.get("resumeFile").is_none());
        repo.ping().await.unwrap();
    }
}
