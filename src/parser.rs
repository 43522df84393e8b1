//! Boundary normalization for persisted survey and result payloads.
//!
//! The store hands back loosely-shaped JSON: options may be bare strings or
//! objects, answers may be a list of pairs, a keyed map, or either of those
//! serialized into a string. Everything is converted here, once, so the
//! analyzers only ever see [`crate::model`] types. None of these functions
//! fail; malformed pieces become empty structures.

use serde_json::Value;
use tracing::{debug, warn};

use crate::model::{
    AnswerPair, AnswerValue, NormalizedResponse, OptionRef, Question, QuestionType,
    RawResponseRow, Survey,
};

/// Stringifies a JSON scalar the way the builder front-end renders it.
///
/// Whole floats print without a fractional part so that `1.0` and `1`
/// identify the same option or question.
pub fn json_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items.iter().map(json_to_string).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Returns the field unless it is absent or `null`.
fn field<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

/// Parses serialized JSON text, falling back to `fallback` when the text is
/// not valid JSON. Non-string values pass through untouched.
fn decode_text(value: &Value, fallback: Value) -> Value {
    match value {
        Value::String(text) => match serde_json::from_str(text) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "Unparsable JSON text, substituting empty value");
                fallback
            }
        },
        other => other.clone(),
    }
}

/// Converts a question's raw option list into canonical `{label, value}` pairs.
///
/// Anything other than a list yields no options. Each element maps to
/// exactly one option:
///
/// - scalars use their string form as both label and value;
/// - objects take `label`, then `text`, then the string form of `value`,
///   then `id`, then the 1-based position as the label, and `value`, then
///   `label`, then `text`, then the resolved label as the value.
pub fn normalize_options(raw: &Value) -> Vec<OptionRef> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| match item {
            Value::Object(obj) => {
                let label = field(obj, "label")
                    .or_else(|| field(obj, "text"))
                    .or_else(|| field(obj, "value"))
                    .or_else(|| field(obj, "id"))
                    .map(json_to_string)
                    .unwrap_or_else(|| (idx + 1).to_string());
                let value = field(obj, "value")
                    .or_else(|| field(obj, "label"))
                    .or_else(|| field(obj, "text"))
                    .map(json_to_string)
                    .unwrap_or_else(|| label.clone());
                OptionRef { label, value }
            }
            Value::Array(_) => {
                let label = (idx + 1).to_string();
                OptionRef {
                    value: label.clone(),
                    label,
                }
            }
            scalar => {
                let s = json_to_string(scalar);
                OptionRef {
                    label: s.clone(),
                    value: s,
                }
            }
        })
        .collect()
}

/// Converts one raw answer payload into a typed value.
pub fn normalize_answer_value(raw: &Value) -> AnswerValue {
    match raw {
        Value::Null => AnswerValue::Null,
        Value::Array(items) => AnswerValue::List(items.iter().map(json_to_string).collect()),
        other => AnswerValue::Text(json_to_string(other)),
    }
}

/// Converts one row's answer payload into `{questionId, value}` pairs.
///
/// In the list form every element yields one pair, so the pair count always
/// matches the persisted entry count. Entries without a usable `questionId`
/// get an empty id, which matches no question.
pub fn normalize_answers(raw: &Value) -> Vec<AnswerPair> {
    match decode_text(raw, Value::Null) {
        Value::Array(items) => items
            .iter()
            .map(|item| {
                let Some(obj) = item.as_object() else {
                    debug!(kind = json_kind(item), "Answer entry is not an object");
                    return AnswerPair::new("", AnswerValue::Null);
                };
                let question_id = field(obj, "questionId").map(json_to_string).unwrap_or_default();
                let value = obj.get("value").map(normalize_answer_value).unwrap_or(AnswerValue::Null);
                AnswerPair { question_id, value }
            })
            .collect(),
        Value::Object(map) => map
            .iter()
            .map(|(question_id, value)| AnswerPair {
                question_id: question_id.clone(),
                value: normalize_answer_value(value),
            })
            .collect(),
        Value::Null => Vec::new(),
        other => {
            debug!(kind = json_kind(&other), "Unsupported answers shape, treating as empty");
            Vec::new()
        }
    }
}

/// Normalizes persisted result rows, preserving their order.
pub fn normalize_responses(rows: &[RawResponseRow]) -> Vec<NormalizedResponse> {
    rows.iter()
        .map(|row| NormalizedResponse {
            answers: normalize_answers(&row.answers),
            created_at: row.created_at.clone(),
        })
        .collect()
}

/// Reads a JSON result listing field by field, so a malformed timestamp
/// never costs a row its answers. Entries that are not objects become rows
/// with no answers; a payload that is not a list yields nothing.
pub fn parse_response_rows(payload: &Value) -> Vec<RawResponseRow> {
    let Some(items) = payload.as_array() else {
        warn!(kind = json_kind(payload), "Result listing is not an array");
        return Vec::new();
    };

    items
        .iter()
        .map(|item| {
            let Some(obj) = item.as_object() else {
                warn!(kind = json_kind(item), "Result row is not an object, keeping it with no answers");
                return RawResponseRow::default();
            };
            let created_at = match field(obj, "created_at").or_else(|| field(obj, "createdAt")) {
                Some(Value::String(s)) => Some(s.clone()),
                Some(other @ (Value::Number(_) | Value::Bool(_))) => {
                    debug!(value = %other, "Non-text created_at kept verbatim");
                    Some(json_to_string(other))
                }
                Some(other) => {
                    debug!(kind = json_kind(other), "Unusable created_at dropped");
                    None
                }
                None => None,
            };
            RawResponseRow {
                answers: obj.get("answers").cloned().unwrap_or(Value::Null),
                created_at,
            }
        })
        .collect()
}

fn parse_question(idx: usize, raw: &Value) -> Question {
    let empty = serde_json::Map::new();
    let obj = raw.as_object().unwrap_or(&empty);

    let id = field(obj, "id")
        .map(json_to_string)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| format!("q_{}", idx + 1));
    let order = field(obj, "order")
        .and_then(Value::as_f64)
        .filter(|f| f.is_finite())
        .map(|f| f as i64)
        .unwrap_or(idx as i64 + 1);
    let text = field(obj, "text")
        .map(json_to_string)
        .unwrap_or_default()
        .trim()
        .to_string();
    let type_label = field(obj, "type").map(json_to_string).unwrap_or_default();
    let required = !matches!(obj.get("required"), Some(Value::Bool(false)));
    let options = field(obj, "options")
        .map(|v| normalize_options(&decode_text(v, Value::Array(Vec::new()))))
        .unwrap_or_default();

    Question {
        id,
        order,
        text,
        kind: QuestionType::from_label(&type_label),
        type_label,
        required,
        options,
    }
}

/// Builds a [`Survey`] from one persisted survey row.
///
/// Returns `None` when the row carries neither `survey_id` nor `id`.
pub fn parse_survey_row(row: &Value) -> Option<Survey> {
    let obj = row.as_object()?;
    let id = field(obj, "survey_id")
        .or_else(|| field(obj, "id"))
        .map(json_to_string)?;
    let title = field(obj, "title").map(json_to_string).unwrap_or_default();

    let questions = match field(obj, "questions").map(|v| decode_text(v, Value::Array(Vec::new()))) {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(idx, q)| parse_question(idx, q))
            .collect(),
        _ => Vec::new(),
    };

    Some(Survey {
        id,
        title,
        questions,
    })
}

/// Builds schemas from a survey listing, skipping rows without an id.
pub fn parse_survey_rows(payload: &Value) -> Vec<Survey> {
    let Some(rows) = payload.as_array() else {
        warn!(kind = json_kind(payload), "Survey listing is not an array");
        return Vec::new();
    };

    rows.iter()
        .filter_map(|row| {
            let survey = parse_survey_row(row);
            if survey.is_none() {
                warn!("Survey row without an id skipped");
            }
            survey
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_not_a_list() {
        assert!(normalize_options(&json!("A,B")).is_empty());
        assert!(normalize_options(&json!(null)).is_empty());
        assert!(normalize_options(&json!({"label": "A"})).is_empty());
    }

    #[test]
    fn test_options_mixed_shapes() {
        let opts = normalize_options(&json!([
            "Yes",
            3,
            {"label": "Blue", "value": "b"},
            {"text": "Green"},
            {"value": 7},
            {"id": "x9"},
            {},
            {"label": null, "text": "Red", "value": null}
        ]));

        assert_eq!(opts.len(), 8);
        assert_eq!(opts[0], OptionRef::new("Yes", "Yes"));
        assert_eq!(opts[1], OptionRef::new("3", "3"));
        assert_eq!(opts[2], OptionRef::new("Blue", "b"));
        assert_eq!(opts[3], OptionRef::new("Green", "Green"));
        assert_eq!(opts[4], OptionRef::new("7", "7"));
        assert_eq!(opts[5], OptionRef::new("x9", "x9"));
        assert_eq!(opts[6], OptionRef::new("7", "7"));
        assert_eq!(opts[7], OptionRef::new("Red", "Red"));
    }

    #[test]
    fn test_map_and_pair_forms_agree() {
        let rows = vec![
            RawResponseRow {
                answers: json!({"q_1": "A"}),
                created_at: None,
            },
            RawResponseRow {
                answers: json!([{"questionId": "q_1", "value": "A"}]),
                created_at: None,
            },
        ];
        let normalized = normalize_responses(&rows);
        assert_eq!(normalized[0].answers, normalized[1].answers);
    }

    #[test]
    fn test_serialized_answers_are_decoded() {
        let answers = normalize_answers(&json!(r#"{"q_1": ["a", "b"], "q_2": null}"#));
        assert_eq!(
            answers,
            vec![
                AnswerPair::new("q_1", AnswerValue::List(vec!["a".into(), "b".into()])),
                AnswerPair::new("q_2", AnswerValue::Null),
            ]
        );
    }

    #[test]
    fn test_malformed_answers_become_empty() {
        assert!(normalize_answers(&json!("{not json")).is_empty());
        assert!(normalize_answers(&json!(42)).is_empty());
        assert!(normalize_answers(&json!("\"just a string\"")).is_empty());
    }

    #[test]
    fn test_numeric_question_ids_stringify() {
        let answers = normalize_answers(&json!([{"questionId": 3, "value": 2.0}]));
        assert_eq!(answers, vec![AnswerPair::new("3", AnswerValue::Text("2".into()))]);
    }

    #[test]
    fn test_row_order_is_preserved() {
        let rows: Vec<RawResponseRow> = (0..5)
            .map(|i| RawResponseRow {
                answers: json!({"q": i}),
                created_at: Some(format!("2024-01-0{}T00:00:00Z", i + 1)),
            })
            .collect();
        let normalized = normalize_responses(&rows);
        let stamps: Vec<_> = normalized.iter().map(|r| r.created_at.clone().unwrap()).collect();
        assert_eq!(stamps[0], "2024-01-01T00:00:00Z");
        assert_eq!(stamps[4], "2024-01-05T00:00:00Z");
    }

    #[test]
    fn test_parse_survey_row_defaults() {
        let survey = parse_survey_row(&json!({
            "survey_id": "s1",
            "title": "Onboarding",
            "questions": r#"[
                {"text": "  Your name?  ", "type": "주관식"},
                {"id": 5, "order": 9, "text": "Pick", "type": "객관식 (복수 선택)", "required": false, "options": ["a", "b"]}
            ]"#
        }))
        .unwrap();

        assert_eq!(survey.id, "s1");
        assert_eq!(survey.questions.len(), 2);
        let q1 = &survey.questions[0];
        assert_eq!(q1.id, "q_1");
        assert_eq!(q1.order, 1);
        assert_eq!(q1.text, "Your name?");
        assert_eq!(q1.kind, QuestionType::Text);
        assert!(q1.required);
        let q2 = &survey.questions[1];
        assert_eq!(q2.id, "5");
        assert_eq!(q2.order, 9);
        assert_eq!(q2.kind, QuestionType::Checkbox);
        assert!(!q2.required);
        assert_eq!(q2.options.len(), 2);
    }

    #[test]
    fn test_parse_survey_rows_skips_missing_ids() {
        let surveys = parse_survey_rows(&json!([
            {"id": "a", "questions": "oops"},
            {"title": "no id"}
        ]));
        assert_eq!(surveys.len(), 1);
        assert!(surveys[0].questions.is_empty());
    }

    #[test]
    fn test_parse_response_rows_tolerates_bad_entries() {
        let rows = parse_response_rows(&json!([
            {"answers": {"q_1": "A"}, "created_at": "2024-05-01T10:00:00Z"},
            {"answers": {"q_1": "B"}, "created_at": 1714557600000u64},
            {"answers": {"q_1": "C"}, "created_at": "2024-05-02T10:00:00Z", "createdAt": "2024-05-03T10:00:00Z"},
            {"answers": {"q_1": "D"}, "createdAt": {"seconds": 1}},
            "garbage"
        ]));
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].created_at.as_deref(), Some("2024-05-01T10:00:00Z"));

        assert_eq!(rows[1].created_at.as_deref(), Some("1714557600000"));
        assert_eq!(rows[2].created_at.as_deref(), Some("2024-05-02T10:00:00Z"));
        assert_eq!(rows[3].created_at, None);

        let normalized = normalize_responses(&rows);
        for (idx, expected) in ["A", "B", "C", "D"].iter().enumerate() {
            assert_eq!(normalized[idx].answers, vec![AnswerPair::new("q_1", AnswerValue::Text(expected.to_string()))]);
        }
        assert!(rows[4].answers.is_null());
        assert!(normalized[4].answers.is_empty());
        assert!(parse_response_rows(&json!({"error": "DB error"})).is_empty());
    }

    #[test]
    fn test_pair_form_keeps_every_entry() {
        let answers = normalize_answers(&json!([
            {"questionId": "q_1", "value": "a"},
            {"questionId": "q_2", "value": "b"},
            {"value": "c"},
            "stray"
        ]));
        assert_eq!(answers.len(), 4);
        assert_eq!(answers[2], AnswerPair::new("", AnswerValue::Text("c".into())));
        assert_eq!(answers[3], AnswerPair::new("", AnswerValue::Null));
    }
}
