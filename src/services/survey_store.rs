//! Read contract of the persistence collaborator.

use anyhow::Result;

use crate::model::{RawResponseRow, Survey};

/// Read-only access to stored survey schemas and their result rows.
///
/// Implementations normalize schemas on the way in but hand result rows
/// back untouched; answer normalization happens in the pipeline.
#[async_trait::async_trait]
pub trait SurveyStore: Send + Sync {
    /// Returns every stored survey schema.
    async fn list_surveys(&self) -> Result<Vec<Survey>>;

    /// Returns the raw result rows submitted for `survey_id`.
    async fn list_results(&self, survey_id: &str) -> Result<Vec<RawResponseRow>>;
}
