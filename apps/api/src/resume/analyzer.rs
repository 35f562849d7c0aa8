//! Resume analysis — pluggable, trait-based scorer for an uploaded resume.
//!
//! Default: `StaticResumeAnalyzer`, which returns a fixed assessment without
//! looking at the document. A real backend implements `ResumeAnalyzer` and is
//! swapped in at startup; the lifecycle service does not change.

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::AppError;
use crate::models::student::ResumeAnalysis;

/// Scores are on a 0 – 10 scale.
pub const MAX_SCORE: f64 = 10.0;

/// Carried by `ResumeService` as `Arc<dyn ResumeAnalyzer>`.
#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    async fn analyze(&self, content: &[u8]) -> Result<ResumeAnalysis, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// StaticResumeAnalyzer — default implementation
// ────────────────────────────────────────────────────────────────────────────

pub struct StaticResumeAnalyzer;

const CATEGORY_SCORES: [(&str, f64); 10] = [
    ("bulletPoints", 8.0),
    ("header", 9.0),
    ("education", 8.0),
    ("experience", 9.0),
    ("secondarySections", 7.0),
    ("formatting", 8.0),
    ("language", 8.0),
    ("contentQuality", 9.0),
    ("targeting", 8.0),
    ("universalStandards", 8.0),
];

#[async_trait]
impl ResumeAnalyzer for StaticResumeAnalyzer {
    async fn analyze(&self, _content: &[u8]) -> Result<ResumeAnalysis, AppError> {
        Ok(ResumeAnalysis {
            overall_score: 8.5,
            category_scores: CATEGORY_SCORES
                .iter()
                .map(|(name, score)| (name.to_string(), *score))
                .collect(),
            strengths: vec![
                "Strong technical skills section".to_string(),
                "Quantified achievements in experience".to_string(),
                "Clear and concise formatting".to_string(),
            ],
            priority_improvements: vec![
                "Add more specific metrics to bullet points".to_string(),
                "Include relevant keywords for target roles".to_string(),
            ],
            overall_assessment:
                "Strong resume with good technical content and clear structure.".to_string(),
            last_analyzed: Utc::now(),
        })
    }
}
