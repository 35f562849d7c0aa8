//! Resume lifecycle: keeps the file store and the student record consistent.
//!
//! Ordering on replace: write the new file, point the record at it, and only
//! then remove the prior file. A failure part-way leaves at worst an orphaned
//! file on disk, never a record pointing at a missing file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::MAX_RESUME_BYTES;
use crate::errors::AppError;
use crate::models::student::{ResumeAnalysis, ResumeFile, Student};
use crate::resume::analyzer::{ResumeAnalyzer, MAX_SCORE};
use crate::resume::file_store::LocalFileStore;
use crate::resume::locks::StudentLocks;
use crate::students::repository::StudentRepository;

/// Resume metadata as returned to clients.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResumeInfo {
    pub id: Uuid,
    pub file_name: String,
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
    pub file_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ResumeAnalysis>,
}

impl ResumeInfo {
    fn new(student_id: Uuid, file: &ResumeFile, analysis: Option<ResumeAnalysis>) -> Self {
        ResumeInfo {
            id: student_id,
            file_name: file.original_name.clone(),
            file_url: format!("/api/students/{student_id}/resume/download"),
            uploaded_at: file.uploaded_at,
            file_size: file.file_size,
            analysis,
        }
    }
}

/// Bytes of a stored resume plus the name the client uploaded it under.
#[derive(Debug)]
pub struct ResumeDownload {
    pub file_name: String,
    pub content: Vec<u8>,
}

pub struct ResumeService {
    students: Arc<dyn StudentRepository>,
    files: LocalFileStore,
    analyzer: Arc<dyn ResumeAnalyzer>,
    locks: StudentLocks,
}

impl ResumeService {
    pub fn new(
        students: Arc<dyn StudentRepository>,
        files: LocalFileStore,
        analyzer: Arc<dyn ResumeAnalyzer>,
    ) -> Self {
        Self {
            students,
            files,
            analyzer,
            locks: StudentLocks::new(),
        }
    }

    /// Stores `content` as the student's resume, replacing any previous one.
    pub async fn upload(
        &self,
        student_id: Uuid,
        filename: &str,
        content: &[u8],
    ) -> Result<ResumeInfo, AppError> {
        self.upload_at(student_id, filename, content, Utc::now())
            .await
    }

    async fn upload_at(
        &self,
        student_id: Uuid,
        filename: &str,
        content: &[u8],
        now: DateTime<Utc>,
    ) -> Result<ResumeInfo, AppError> {
        let filename = validate_upload(filename, content.len())?;

        let _guard = self.locks.acquire(student_id).await;
        let student = self.students.get(student_id).await?;
        let prior_path = student.resume_file.map(|f| PathBuf::from(f.file_path));

        // A same-second re-upload of the same name lands on the prior path.
        // Hold the prior file aside until the record points at the new one.
        let target = self.files.path_for(student_id, filename, now);
        let held = match &prior_path {
            Some(prior) if *prior == target => self.files.set_aside(prior).await?,
            _ => None,
        };

        let stored = match self.files.save(student_id, filename, content, now).await {
            Ok(stored) => stored,
            Err(e) => {
                self.put_back(held.as_deref(), &target).await;
                return Err(e);
            }
        };
        let file = ResumeFile {
            original_name: filename.to_string(),
            stored_name: stored.stored_name,
            file_path: stored.path.to_string_lossy().into_owned(),
            file_size: content.len() as u64,
            uploaded_at: now,
        };

        if let Err(e) = self.students.set_resume_file(student_id, &file).await {
            if held.is_some() {
                self.put_back(held.as_deref(), &stored.path).await;
            } else {
                warn!(
                    "Resume record update failed for student {student_id}; {} left orphaned",
                    file.file_path
                );
            }
            return Err(e);
        }

        match (held, prior_path) {
            (Some(held), _) => {
                self.files.delete(&held).await;
            }
            (None, Some(prior)) if prior != stored.path => {
                self.files.delete(&prior).await;
            }
            _ => {}
        }

        info!(
            "Stored resume {} ({} bytes) for student {student_id}",
            file.stored_name, file.file_size
        );
        Ok(ResumeInfo::new(student_id, &file, None))
    }

    async fn put_back(&self, held: Option<&Path>, path: &Path) {
        if let Some(held) = held {
            if let Err(e) = self.files.restore(held, path).await {
                warn!("Prior resume could not be restored: {e}");
            }
        }
    }

    /// Metadata for the current resume, with the stored analysis if any.
    pub async fn get_info(&self, student_id: Uuid) -> Result<ResumeInfo, AppError> {
        let student = self.students.get(student_id).await?;
        let file = resume_of(&student)?;
        Ok(ResumeInfo::new(
            student_id,
            file,
            student.resume_analysis.clone(),
        ))
    }

    pub async fn download(&self, student_id: Uuid) -> Result<ResumeDownload, AppError> {
        let student = self
            .students
            .get(student_id)
            .await
            .map_err(|e| match e {
                AppError::NotFound(_) => resume_not_found(),
                other => other,
            })?;
        let file = resume_of(&student)?;
        let content = self.files.read(Path::new(&file.file_path)).await?;
        Ok(ResumeDownload {
            file_name: file.original_name.clone(),
            content,
        })
    }

    /// Runs the analyzer over the stored resume and persists the result,
    /// replacing any earlier analysis.
    pub async fn analyze(&self, student_id: Uuid) -> Result<ResumeAnalysis, AppError> {
        let _guard = self.locks.acquire(student_id).await;
        let student = self.students.get(student_id).await?;
        let file = student.resume_file.as_ref().ok_or_else(|| {
            AppError::Validation(
                "No resume file found. Please upload a resume first.".to_string(),
            )
        })?;

        let content = self.files.read(Path::new(&file.file_path)).await?;
        let analysis = self.analyzer.analyze(&content).await?;
        check_scores(&analysis)?;
        self.students
            .set_resume_analysis(student_id, &analysis)
            .await?;

        info!(
            "Analyzed resume for student {student_id}: overall {:.1}",
            analysis.overall_score
        );
        Ok(analysis)
    }

    /// Removes the resume file and clears both resume fields on the record.
    /// The record is cleared even if the file could not be removed.
    pub async fn delete(&self, student_id: Uuid) -> Result<(), AppError> {
        let _guard = self.locks.acquire(student_id).await;
        let student = self.students.get(student_id).await?;
        let file = resume_of(&student)?;

        self.files.delete(Path::new(&file.file_path)).await;
        self.students.clear_resume_fields(student_id).await?;

        info!("Deleted resume for student {student_id}");
        Ok(())
    }
}

fn check_scores(analysis: &ResumeAnalysis) -> Result<(), AppError> {
    let scores = std::iter::once(("overall", &analysis.overall_score)).chain(
        analysis
            .category_scores
            .iter()
            .map(|(name, score)| (name.as_str(), score)),
    );
    for (name, score) in scores {
        if !(0.0..=MAX_SCORE).contains(score) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "Analyzer returned out-of-range {name} score {score}"
            )));
        }
    }
    Ok(())
}

fn resume_not_found() -> AppError {
    AppError::NotFound("Resume not found".to_string())
}

fn resume_of(student: &Student) -> Result<&ResumeFile, AppError> {
    student.resume_file.as_ref().ok_or_else(resume_not_found)
}

/// Checks the upload name and size. Returns the name reduced to its final
/// path component.
pub fn validate_upload(filename: &str, len: usize) -> Result<&str, AppError> {
    if !filename.ends_with(".pdf") {
        return Err(AppError::Validation(
            "Only PDF files are allowed".to_string(),
        ));
    }
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    if base == ".pdf" {
        return Err(AppError::Validation(format!(
            "'{filename}' is not a usable file name"
        )));
    }
    if len > MAX_RESUME_BYTES {
        return Err(AppError::FileTooLarge(
            "File too large. Maximum size is 5MB".to_string(),
        ));
    }
    Ok(base)
}
