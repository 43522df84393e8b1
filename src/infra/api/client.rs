use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info};

use crate::fetch::{HttpClient, fetch_json};
use crate::model::{RawResponseRow, Survey};
use crate::parser::{parse_response_rows, parse_survey_rows};
use crate::services::survey_store::SurveyStore;

/// Reads surveys and results from the survey web API
/// (`GET /api/surveys`, `GET /api/results/{surveyId}`).
pub struct ApiSurveyStore<C> {
    base_url: Url,
    client: C,
}

impl<C: HttpClient> ApiSurveyStore<C> {
    pub fn new(base_url: &str, client: C) -> Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("Invalid API base URL '{base_url}'"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("API base URL '{base_url}' cannot carry a path"));
        }
        Ok(Self { base_url, client })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("API base URL '{}' cannot carry a path", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn surveys_url(&self) -> Result<Url> {
        self.endpoint(&["api", "surveys"])
    }

    /// The survey id is percent-encoded as a single path segment.
    pub fn results_url(&self, survey_id: &str) -> Result<Url> {
        self.endpoint(&["api", "results", survey_id])
    }
}

#[async_trait]
impl<C: HttpClient> SurveyStore for ApiSurveyStore<C> {
    async fn list_surveys(&self) -> Result<Vec<Survey>> {
        let url = self.surveys_url()?;
        let payload = fetch_json(&self.client, url.as_str()).await?;
        let surveys = parse_survey_rows(&payload);
        info!(base_url = %self.base_url, count = surveys.len(), "Survey list fetched");
        Ok(surveys)
    }

    async fn list_results(&self, survey_id: &str) -> Result<Vec<RawResponseRow>> {
        let url = self.results_url(survey_id)?;
        let payload = fetch_json(&self.client, url.as_str()).await?;
        let rows = parse_response_rows(&payload);
        debug!(survey_id, count = rows.len(), "Result rows fetched");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_endpoints() {
        let store = ApiSurveyStore::new("https://forms.example.com", BasicClient::new()).unwrap();
        assert_eq!(store.surveys_url().unwrap().as_str(), "https://forms.example.com/api/surveys");
        assert_eq!(
            store.results_url("survey 1/2").unwrap().as_str(),
            "https://forms.example.com/api/results/survey%201%2F2"
        );
    }

    #[test]
    fn test_endpoints_keep_base_path() {
        let store = ApiSurveyStore::new("https://example.com/forms/", BasicClient::new()).unwrap();
        assert_eq!(store.surveys_url().unwrap().as_str(), "https://example.com/forms/api/surveys");
    }

    #[test]
    fn test_rejects_bad_base() {
        assert!(ApiSurveyStore::new("not a url", BasicClient::new()).is_err());
        assert!(ApiSurveyStore::new("mailto:ops@example.com", BasicClient::new()).is_err());
    }
}
