//! Survey schema and response types shared by the whole pipeline.
//!
//! Everything here is already in canonical shape: heterogeneous persisted
//! payloads are converted into these types once, by [`crate::parser`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::parse_timestamp;

/// Reserved id of the respondent-name question.
pub const IDENTITY_QUESTION_ID: &str = "q_name";

/// Canonical answer type of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Radio,
    Checkbox,
    Scale,
}

impl QuestionType {
    /// Maps a persisted type label onto a canonical type.
    ///
    /// Builder labels are free text such as `"객관식 (복수 선택)"`, so the
    /// label is matched on keywords rather than exact names. Unknown labels
    /// fall back to [`QuestionType::Text`].
    pub fn from_label(label: &str) -> Self {
        let lower = label.trim().to_lowercase();
        let multiple_choice = mentions_multiple_choice(&lower);
        let multi_select = ["복수", "체크", "multi", "check"]
            .iter()
            .any(|k| lower.contains(k));

        match lower.as_str() {
            "text" => QuestionType::Text,
            "radio" => QuestionType::Radio,
            "checkbox" => QuestionType::Checkbox,
            "scale" => QuestionType::Scale,
            _ if multiple_choice && multi_select => QuestionType::Checkbox,
            _ if multiple_choice => QuestionType::Radio,
            _ if lower.contains("주관식") => QuestionType::Text,
            _ if lower.contains("scale") || lower.contains("척도") => QuestionType::Scale,
            _ => QuestionType::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Scale => "scale",
        }
    }

    pub fn is_multi_select(&self) -> bool {
        matches!(self, QuestionType::Checkbox)
    }
}

fn mentions_multiple_choice(lower: &str) -> bool {
    lower.contains("객관식") || lower.contains("multiple choice") || lower.contains("multiple-choice")
}

/// A choice in canonical `{label, value}` form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRef {
    pub label: String,
    pub value: String,
}

impl OptionRef {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub order: i64,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Type label as persisted, before normalization.
    pub type_label: String,
    pub required: bool,
    pub options: Vec<OptionRef>,
}

impl Question {
    /// Whether this question collects the respondent's name.
    ///
    /// Identity questions are kept out of every statistic but still feed the
    /// name column of the wide export.
    pub fn is_identity(&self) -> bool {
        if self.id.eq_ignore_ascii_case(IDENTITY_QUESTION_ID) {
            return true;
        }
        self.text.contains("이름")
    }

    /// Whether answers should be distributed over the option list.
    pub fn is_choice(&self) -> bool {
        matches!(self.kind, QuestionType::Radio | QuestionType::Checkbox)
            || mentions_multiple_choice(&self.type_label.to_lowercase())
    }

    /// Resolves a stored answer element against the option list.
    ///
    /// Exact value matches win over label matches.
    pub fn resolve_option(&self, raw: &str) -> Option<&OptionRef> {
        self.options
            .iter()
            .find(|o| o.value == raw)
            .or_else(|| self.options.iter().find(|o| o.label == raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Survey {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
}

impl Survey {
    pub fn identity_question(&self) -> Option<&Question> {
        self.questions.iter().find(|q| q.is_identity())
    }

    /// Questions that take part in aggregation, in declared order.
    pub fn measured_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|q| !q.is_identity())
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| ids_match(&q.id, question_id))
    }
}

/// Question ids are compared in their string form, so a numeric id
/// persisted as `3` matches an answer keyed by `"3"`.
pub fn ids_match(a: &str, b: &str) -> bool {
    a == b
}

/// An answer payload after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Null,
    Text(String),
    List(Vec<String>),
}

impl AnswerValue {
    /// Individual selections, with scalars wrapped as a one-element list.
    pub fn elements(&self) -> Vec<&str> {
        match self {
            AnswerValue::Null => Vec::new(),
            AnswerValue::Text(s) => vec![s.as_str()],
            AnswerValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }

    /// Null, `""` and `[]` all count as "did not answer".
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Null => true,
            AnswerValue::Text(s) => s.is_empty(),
            AnswerValue::List(items) => items.is_empty(),
        }
    }

    /// Single-line rendering, list items joined with `", "`.
    pub fn joined(&self) -> String {
        self.elements().join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerPair {
    pub question_id: String,
    pub value: AnswerValue,
}

impl AnswerPair {
    pub fn new(question_id: impl Into<String>, value: AnswerValue) -> Self {
        Self {
            question_id: question_id.into(),
            value,
        }
    }
}

/// A persisted result row as returned by the store.
///
/// `answers` is left untyped: it may be a list of pairs, a keyed map, or
/// JSON serialized into a string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResponseRow {
    #[serde(default)]
    pub answers: serde_json::Value,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<String>,
}

/// One respondent's submission in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResponse {
    pub answers: Vec<AnswerPair>,
    pub created_at: Option<String>,
}

impl NormalizedResponse {
    pub fn new(answers: Vec<AnswerPair>, created_at: Option<String>) -> Self {
        Self {
            answers,
            created_at,
        }
    }

    pub fn submitted_at(&self) -> Option<DateTime<Utc>> {
        self.created_at.as_deref().and_then(parse_timestamp)
    }

    pub fn answers_for<'a>(&'a self, question_id: &'a str) -> impl Iterator<Item = &'a AnswerPair> {
        self.answers
            .iter()
            .filter(move |a| ids_match(&a.question_id, question_id))
    }

    /// First answer recorded for the question, if any.
    pub fn answer_for(&self, question_id: &str) -> Option<&AnswerPair> {
        self.answers
            .iter()
            .find(|a| ids_match(&a.question_id, question_id))
    }

    /// Whether the respondent gave a non-empty answer to the question.
    pub fn answered(&self, question_id: &str) -> bool {
        self.answers_for(question_id).any(|a| !a.value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, text: &str, kind: QuestionType) -> Question {
        Question {
            id: id.to_string(),
            order: 1,
            text: text.to_string(),
            kind,
            type_label: kind.as_str().to_string(),
            required: true,
            options: vec![OptionRef::new("Yes", "y"), OptionRef::new("No", "n")],
        }
    }

    #[test]
    fn test_type_from_label() {
        assert_eq!(QuestionType::from_label("radio"), QuestionType::Radio);
        assert_eq!(QuestionType::from_label("Checkbox"), QuestionType::Checkbox);
        assert_eq!(QuestionType::from_label("객관식 (단일 선택)"), QuestionType::Radio);
        assert_eq!(QuestionType::from_label("객관식 (복수 선택)"), QuestionType::Checkbox);
        assert_eq!(QuestionType::from_label("주관식 (자유 기록)"), QuestionType::Text);
        assert_eq!(QuestionType::from_label("척도"), QuestionType::Scale);
        assert_eq!(QuestionType::from_label("dropdown"), QuestionType::Text);
    }

    #[test]
    fn test_identity_detection() {
        assert!(question("q_name", "Who?", QuestionType::Text).is_identity());
        assert!(question("Q_NAME", "Who?", QuestionType::Text).is_identity());
        assert!(question("q_1", "당신의 이름을 알려주세요", QuestionType::Text).is_identity());
        assert!(!question("q_1", "Name of your team", QuestionType::Text).is_identity());
    }

    #[test]
    fn test_textual_multiple_choice_is_choice() {
        let mut q = question("q_1", "Pick", QuestionType::Text);
        assert!(!q.is_choice());
        q.type_label = "객관식".to_string();
        assert!(q.is_choice());
    }

    #[test]
    fn test_resolve_option_prefers_value() {
        let mut q = question("q_1", "Pick", QuestionType::Radio);
        q.options = vec![OptionRef::new("b", "a"), OptionRef::new("a", "z")];
        assert_eq!(q.resolve_option("a").unwrap().label, "b");
        assert_eq!(q.resolve_option("a").unwrap().value, "a");
        assert!(q.resolve_option("missing").is_none());
    }

    #[test]
    fn test_answered_ignores_empty_values() {
        let r = NormalizedResponse::new(
            vec![
                AnswerPair::new("q_1", AnswerValue::List(vec![])),
                AnswerPair::new("q_2", AnswerValue::Text("x".into())),
                AnswerPair::new("q_3", AnswerValue::Null),
            ],
            None,
        );
        assert!(!r.answered("q_1"));
        assert!(r.answered("q_2"));
        assert!(!r.answered("q_3"));
        assert!(!r.answered("q_4"));
    }

    #[test]
    fn test_answer_for_returns_first_match() {
        let r = NormalizedResponse::new(
            vec![
                AnswerPair::new("q_1", AnswerValue::Text("first".into())),
                AnswerPair::new("q_1", AnswerValue::Text("second".into())),
            ],
            None,
        );
        let id = String::from("q_1");
        let found = r.answer_for(&id);
        drop(id);
        assert_eq!(found.map(|a| a.value.joined()).as_deref(), Some("first"));
        assert!(r.answer_for("q_2").is_none());
    }
}
