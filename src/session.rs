//! Analytics state for one operator view.
//!
//! [`AnalyticsSession`] owns the schemas, the normalized response snapshot
//! of every survey fetched so far, the active date range and the latest
//! report per survey. Which survey is on screen is up to the caller.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::analyzers::aggregate::build_report;
use crate::analyzers::distribution::compute_distribution;
use crate::analyzers::summary::summarize_portfolio;
use crate::analyzers::types::{Distribution, PortfolioSummary, SurveyReport};
use crate::filter::{DateRange, filter_by_date_range};
use crate::model::{NormalizedResponse, RawResponseRow, Survey};
use crate::parser::normalize_responses;
use crate::services::survey_store::SurveyStore;

/// Handle for one in-flight result fetch.
///
/// Only the most recently issued ticket is accepted, so a slow fetch for a
/// survey the operator has moved away from cannot overwrite newer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    survey_id: String,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct AnalyticsSession {
    surveys: Vec<Survey>,
    snapshots: HashMap<String, Vec<NormalizedResponse>>,
    range: DateRange,
    latest: HashMap<String, SurveyReport>,
    generation: u64,
}

impl AnalyticsSession {
    pub fn new(surveys: Vec<Survey>) -> Self {
        Self {
            surveys,
            ..Default::default()
        }
    }

    /// Starts a session from the store's survey list. A failed listing
    /// leaves the session empty.
    pub async fn connect(store: &dyn SurveyStore) -> Self {
        let mut session = Self::default();
        session.load_surveys(store).await;
        session
    }

    /// Replaces the schemas with the store's listing and returns how many
    /// were loaded.
    pub async fn load_surveys(&mut self, store: &dyn SurveyStore) -> usize {
        match store.list_surveys().await {
            Ok(surveys) => self.surveys = surveys,
            Err(e) => {
                warn!(error = %e, "Survey listing failed, continuing with none");
                self.surveys.clear();
            }
        }
        self.snapshots.retain(|id, _| self.surveys.iter().any(|s| &s.id == id));
        self.latest.retain(|id, _| self.surveys.iter().any(|s| &s.id == id));
        self.surveys.len()
    }

    pub fn surveys(&self) -> &[Survey] {
        &self.surveys
    }

    pub fn survey(&self, survey_id: &str) -> Option<&Survey> {
        self.surveys.iter().find(|s| s.id == survey_id)
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    /// Issues a ticket for fetching `survey_id`, superseding any earlier one.
    pub fn begin_fetch(&mut self, survey_id: &str) -> FetchTicket {
        self.generation += 1;
        FetchTicket {
            survey_id: survey_id.to_string(),
            generation: self.generation,
        }
    }

    /// Stores the fetched rows and recomputes that survey's report.
    ///
    /// Returns `false`, leaving the session untouched, when the ticket has
    /// been superseded.
    pub fn accept(&mut self, ticket: FetchTicket, rows: Vec<RawResponseRow>) -> bool {
        if ticket.generation != self.generation {
            debug!(
                survey_id = %ticket.survey_id,
                ticket = ticket.generation,
                current = self.generation,
                "Discarding stale fetch result"
            );
            return false;
        }

        let responses = normalize_responses(&rows);
        debug!(survey_id = %ticket.survey_id, responses = responses.len(), "Snapshot stored");
        self.snapshots.insert(ticket.survey_id.clone(), responses);
        self.recompute(&ticket.survey_id);
        true
    }

    /// Fetches, normalizes and aggregates one survey. A failed fetch is
    /// treated as a survey with no responses.
    pub async fn load_survey(&mut self, store: &dyn SurveyStore, survey_id: &str) -> Option<&SurveyReport> {
        let ticket = self.begin_fetch(survey_id);
        let rows = match store.list_results(survey_id).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(survey_id, error = %e, "Result fetch failed, using an empty response set");
                Vec::new()
            }
        };
        self.accept(ticket, rows);
        self.latest.get(survey_id)
    }

    /// Applies a new date range and recomputes every cached survey from
    /// its snapshot.
    pub fn set_range(&mut self, range: DateRange) {
        self.range = range;
        let ids: Vec<String> = self.snapshots.keys().cloned().collect();
        for id in ids {
            self.recompute(&id);
        }
        info!(from = ?range.from, to = ?range.to, surveys = self.latest.len(), "Date range applied");
    }

    fn filtered(&self, survey_id: &str) -> Vec<NormalizedResponse> {
        self.snapshots
            .get(survey_id)
            .map(|all| filter_by_date_range(all, &self.range))
            .unwrap_or_default()
    }

    /// Rebuilds the report for one survey from its cached snapshot.
    pub fn recompute(&mut self, survey_id: &str) -> Option<&SurveyReport> {
        if !self.snapshots.contains_key(survey_id) {
            return None;
        }
        let filtered = self.filtered(survey_id);
        let report = match self.survey(survey_id) {
            Some(survey) => build_report(survey, filtered),
            None => {
                let placeholder = Survey {
                    id: survey_id.to_string(),
                    title: String::new(),
                    questions: Vec::new(),
                };
                build_report(&placeholder, filtered)
            }
        };
        self.latest.insert(survey_id.to_string(), report);
        self.latest.get(survey_id)
    }

    /// Most recently computed report for the survey, if it has been loaded.
    pub fn report(&self, survey_id: &str) -> Option<&SurveyReport> {
        self.latest.get(survey_id)
    }

    /// Distribution of one question over the survey's filtered responses.
    pub fn distribution(&self, survey_id: &str, question_id: &str) -> Distribution {
        let Some(question) = self.survey(survey_id).and_then(|s| s.question(question_id)) else {
            return Distribution::default();
        };
        compute_distribution(question, &self.filtered(survey_id))
    }

    /// Portfolio totals over every survey, using full unfiltered snapshots.
    /// Surveys that were never loaded count as having no responses.
    pub fn portfolio(&self) -> PortfolioSummary {
        let entries: Vec<(&Survey, &[NormalizedResponse])> = self
            .surveys
            .iter()
            .map(|s| {
                let responses = self.snapshots.get(&s.id).map(Vec::as_slice).unwrap_or(&[]);
                (s, responses)
            })
            .collect();
        summarize_portfolio(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OptionRef, Question, QuestionType};
    use anyhow::{Result, anyhow};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    struct MemoryStore {
        surveys: Vec<Survey>,
        rows: HashMap<String, Vec<RawResponseRow>>,
        fail_results: bool,
    }

    #[async_trait::async_trait]
    impl SurveyStore for MemoryStore {
        async fn list_surveys(&self) -> Result<Vec<Survey>> {
            Ok(self.surveys.clone())
        }

        async fn list_results(&self, survey_id: &str) -> Result<Vec<RawResponseRow>> {
            if self.fail_results {
                return Err(anyhow!("storage unavailable"));
            }
            Ok(self.rows.get(survey_id).cloned().unwrap_or_default())
        }
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl SurveyStore for BrokenStore {
        async fn list_surveys(&self) -> Result<Vec<Survey>> {
            Err(anyhow!("network down"))
        }

        async fn list_results(&self, _survey_id: &str) -> Result<Vec<RawResponseRow>> {
            Err(anyhow!("network down"))
        }
    }

    fn survey(id: &str) -> Survey {
        Survey {
            id: id.into(),
            title: format!("Survey {id}"),
            questions: vec![Question {
                id: "q_1".into(),
                order: 1,
                text: "Coffee or tea?".into(),
                kind: QuestionType::Radio,
                type_label: "radio".into(),
                required: true,
                options: vec![OptionRef::new("Coffee", "c"), OptionRef::new("Tea", "t")],
            }],
        }
    }

    fn row(value: &str, at: &str) -> RawResponseRow {
        RawResponseRow {
            answers: json!({"q_1": value}),
            created_at: Some(at.to_string()),
        }
    }

    fn store(fail_results: bool) -> MemoryStore {
        let mut rows = HashMap::new();
        rows.insert(
            "s1".to_string(),
            vec![
                row("c", "2024-01-10T09:00:00Z"),
                row("Tea", "2024-03-02T09:00:00Z"),
                row("c", "2024-03-05T09:00:00Z"),
            ],
        );
        MemoryStore {
            surveys: vec![survey("s1"), survey("s2")],
            rows,
            fail_results,
        }
    }

    #[tokio::test]
    async fn test_load_survey_builds_report() {
        let store = store(false);
        let mut session = AnalyticsSession::connect(&store).await;
        assert_eq!(session.surveys().len(), 2);

        let report = session.load_survey(&store, "s1").await.unwrap();
        assert_eq!(report.stats.total_responses, 3);
        assert_eq!(report.stats.questions[0].options[0].count, 2);
        assert_eq!(report.raw_responses.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_empty() {
        let store = store(true);
        let mut session = AnalyticsSession::connect(&store).await;
        let report = session.load_survey(&store, "s1").await.unwrap();
        assert_eq!(report.stats.total_responses, 0);
        assert_eq!(report.stats.completion_rate, 0);
    }

    #[tokio::test]
    async fn test_listing_failure_leaves_session_empty() {
        let session = AnalyticsSession::connect(&BrokenStore).await;
        assert!(session.surveys().is_empty());
        assert_eq!(session.portfolio(), PortfolioSummary::default());
    }

    #[tokio::test]
    async fn test_range_recomputes_from_snapshot() {
        let store = store(false);
        let mut session = AnalyticsSession::connect(&store).await;
        session.load_survey(&store, "s1").await;

        let march = DateRange::between(
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
            Some(Utc.with_ymd_and_hms(2024, 3, 31, 0, 0, 0).unwrap()),
        );
        session.set_range(march);
        let report = session.report("s1").unwrap();
        assert_eq!(report.stats.total_responses, 2);
        assert_eq!(report.stats.questions[0].options[1].count, 1);

        assert_eq!(session.distribution("s1", "q_1").counts, vec![1, 1]);

        assert_eq!(session.range(), march);

        session.set_range(DateRange::all_time());
        assert!(session.range().is_unbounded());
        assert_eq!(session.report("s1").unwrap().stats.total_responses, 3);
    }

    #[test]
    fn test_stale_ticket_is_discarded() {
        let mut session = AnalyticsSession::new(vec![survey("s1"), survey("s2")]);
        let slow = session.begin_fetch("s1");
        let fresh = session.begin_fetch("s2");

        assert!(session.accept(fresh, vec![row("t", "2024-01-01T00:00:00Z")]));
        assert!(!session.accept(slow, vec![row("c", "2024-01-01T00:00:00Z")]));

        assert!(session.report("s1").is_none());
        assert_eq!(session.report("s2").unwrap().stats.total_responses, 1);
    }

    #[test]
    fn test_unknown_question_distribution_is_empty() {
        let session = AnalyticsSession::new(vec![survey("s1")]);
        assert!(session.distribution("s1", "nope").is_empty());
        assert!(session.distribution("missing", "q_1").is_empty());
    }

    #[tokio::test]
    async fn test_portfolio_uses_loaded_snapshots() {
        let store = store(false);
        let mut session = AnalyticsSession::connect(&store).await;
        session.load_survey(&store, "s1").await;
        let summary = session.portfolio();
        assert_eq!(summary.survey_count, 2);
        assert_eq!(summary.total_responses, 3);
        assert_eq!(summary.average_completion, 100);
    }
}
