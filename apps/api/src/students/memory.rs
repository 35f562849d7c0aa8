use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::student::{NewStudent, ResumeAnalysis, ResumeFile, Student, StudentSummary};
use crate::students::repository::{duplicate_email, student_not_found, StudentRepository};

/// In-process repository used by the service and router tests.
#[derive(Default)]
pub struct InMemoryStudentRepository {
    students: Mutex<Vec<Student>>,
    fail_resume_writes: AtomicBool,
}

impl InMemoryStudentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `set_resume_file` fail with a database error.
    pub fn fail_resume_writes(&self) {
        self.fail_resume_writes.store(true, Ordering::SeqCst);
    }

    fn update<F>(&self, id: Uuid, f: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Student),
    {
        let mut students = self.students.lock().unwrap();
        let student = students
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| student_not_found(id))?;
        f(student);
        Ok(())
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    async fn create(&self, profile: NewStudent) -> Result<Student, AppError> {
        let mut students = self.students.lock().unwrap();
        if students.iter().any(|s| s.email == profile.email) {
            return Err(duplicate_email(&profile.email));
        }
        let now = Utc::now();
        let student = Student {
            id: Uuid::new_v4(),
            name: profile.name,
            email: profile.email,
            university: profile.university,
            major: profile.major,
            graduation_year: profile.graduation_year,
            skills: profile.skills,
            interests: profile.interests,
            career_goals: profile.career_goals,
            job_preferences: profile.job_preferences,
            resume_file: None,
            resume_analysis: None,
            is_active: true,
            created_at: now,
            last_login: now,
        };
        students.push(student.clone());
        Ok(student)
    }

    async fn get(&self, id: Uuid) -> Result<Student, AppError> {
        self.students
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| student_not_found(id))
    }

    async fn list(&self) -> Result<Vec<StudentSummary>, AppError> {
        Ok(self
            .students
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(StudentSummary::from)
            .collect())
    }

    async fn set_resume_file(&self, id: Uuid, file: &ResumeFile) -> Result<(), AppError> {
        if self.fail_resume_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        self.update(id, |s| s.resume_file = Some(file.clone()))
    }

    async fn set_resume_analysis(
        &self,
        id: Uuid,
        analysis: &ResumeAnalysis,
    ) -> Result<(), AppError> {
        self.update(id, |s| s.resume_analysis = Some(analysis.clone()))
    }

    async fn clear_resume_fields(&self, id: Uuid) -> Result<(), AppError> {
        self.update(id, |s| {
            s.resume_file = None;
            s.resume_analysis = None;
        })
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;

    fn profile(name: &str, email: &str) -> NewStudent {
        NewStudent {
            name: name.to_string(),
            email: email.to_string(),
            university: "State".to_string(),
            major: "CS".to_string(),
            graduation_year: Some(2027),
            skills: vec!["rust".into(), "sql".into()],
            interests: vec!["systems".into()],
            career_goals: vec!["backend".into()],
            job_preferences: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get_returns_same_profile() {
        let repo = InMemoryStudentRepository::new();
        let mut input = profile("A", "a@x.com");
        input
            .job_preferences
            .insert("remote".to_string(), json!(true));
        let created = repo.create(input.clone()).await.unwrap();
        let fetched = repo.get(created.id).await.unwrap();

        assert_eq!(fetched.name, input.name);
        assert_eq!(fetched.email, input.email);
        assert_eq!(fetched.university, input.university);
        assert_eq!(fetched.major, input.major);
        assert_eq!(fetched.graduation_year, input.graduation_year);
        assert_eq!(fetched.skills, input.skills);
        assert_eq!(fetched.interests, input.interests);
        assert_eq!(fetched.career_goals, input.career_goals);
        assert_eq!(fetched.job_preferences, input.job_preferences);
        assert!(fetched.is_active);
        assert!(fetched.resume_file.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts_even_with_other_fields_changed() {
        let repo = InMemoryStudentRepository::new();
        repo.create(profile("A", "a@x.com")).await.unwrap();
        let mut other = profile("Somebody Else", "a@x.com");
        other.major = "History".to_string();
        let err = repo.create(other).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_updates_on_missing_student_are_not_found() {
        let repo = InMemoryStudentRepository::new();
        let err = repo.clear_resume_fields(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
