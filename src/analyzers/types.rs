//! Result types produced by the analyzers.
//!
//! All of these are derived values: they are rebuilt from scratch on every
//! aggregation and serialize with camelCase keys for the JSON export.

use serde::{Deserialize, Serialize};

use crate::model::{NormalizedResponse, QuestionType};

/// Count and share of one canonical option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionStat {
    pub label: String,
    pub count: usize,
    pub percent: u32,
}

/// Chart-ready distribution for a single question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
    /// Answer elements that matched no option, in first-seen order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmatched: Vec<(String, usize)>,
}

impl Distribution {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStats {
    pub id: String,
    /// 1-based position among the aggregated questions.
    pub number: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub responded_count: usize,
    pub dropoff_rate: u32,
    pub options: Vec<OptionStat>,
    pub text_answers: Vec<String>,
}

impl QuestionStats {
    /// The most selected option. Ties go to the earliest option; a question
    /// where nothing was selected has no top option.
    pub fn top_option(&self) -> Option<&OptionStat> {
        let mut best: Option<&OptionStat> = None;
        for opt in &self.options {
            if best.is_none_or(|b| opt.count > b.count) {
                best = Some(opt);
            }
        }
        best.filter(|b| b.count > 0)
    }

    /// KPI text for the top option, e.g. `"Yes – 60%"`.
    pub fn top_option_label(&self) -> Option<String> {
        self.top_option()
            .map(|o| format!("{} – {}%", o.label, o.percent))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyStats {
    pub total_responses: usize,
    pub completion_rate: u32,
    pub questions: Vec<QuestionStats>,
}

impl SurveyStats {
    pub fn question(&self, question_id: &str) -> Option<&QuestionStats> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

/// Statistics kept together with the responses they were computed from,
/// so exports can be produced later without recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyReport {
    pub survey_id: String,
    pub title: String,
    #[serde(flatten)]
    pub stats: SurveyStats,
    pub raw_responses: Vec<NormalizedResponse>,
}

/// Totals across every survey the operator owns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub survey_count: usize,
    pub total_responses: usize,
    /// Mean completion rate over surveys that have at least one response.
    pub average_completion: u32,
}
