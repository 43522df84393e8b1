use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::model::{RawResponseRow, Survey};
use crate::output::safe_filename;
use crate::parser::{parse_response_rows, parse_survey_rows};
use crate::services::survey_store::SurveyStore;

/// Reads a dump laid out as:
///
/// ```text
/// <root>/surveys.json            survey listing, same shape as GET /api/surveys
/// <root>/results/<survey>.json   result rows, same shape as GET /api/results/{id}
/// ```
///
/// A survey without a results file simply has no responses.
pub struct DirectorySurveyStore {
    root: PathBuf,
}

impl DirectorySurveyStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn results_path(&self, survey_id: &str) -> PathBuf {
        self.root
            .join("results")
            .join(format!("{}.json", safe_filename(survey_id)))
    }
}

async fn read_json(path: &Path) -> Result<serde_json::Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}

#[async_trait]
impl SurveyStore for DirectorySurveyStore {
    async fn list_surveys(&self) -> Result<Vec<Survey>> {
        let payload = read_json(&self.root.join("surveys.json")).await?;
        let surveys = parse_survey_rows(&payload);
        info!(root = %self.root.display(), count = surveys.len(), "Survey list loaded");
        Ok(surveys)
    }

    async fn list_results(&self, survey_id: &str) -> Result<Vec<RawResponseRow>> {
        let path = self.results_path(survey_id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(survey_id, path = %path.display(), "No results file");
            return Ok(Vec::new());
        }
        let rows = parse_response_rows(&read_json(&path).await?);
        debug!(survey_id, count = rows.len(), "Result rows loaded");
        Ok(rows)
    }
}
