use crate::analyzers::distribution::option_stats_with;
use crate::analyzers::types::{QuestionStats, SurveyReport, SurveyStats};
use crate::analyzers::utility::percent;
use crate::model::{NormalizedResponse, Question, Survey};

/// Share of responses that carry one answer per declared question.
///
/// The declared count includes identity questions: completion asks whether
/// the respondent got through the whole survey, not just the measured part.
pub fn completion_rate(survey: &Survey, responses: &[NormalizedResponse]) -> u32 {
    let declared = survey.questions.len();
    if responses.is_empty() || declared == 0 {
        return 0;
    }

    let completed = responses
        .iter()
        .filter(|r| r.answers.len() == declared)
        .count();
    percent(completed, responses.len())
}

/// Non-blank free-text answers in response order.
fn collect_text_answers(question: &Question, responses: &[NormalizedResponse]) -> Vec<String> {
    responses
        .iter()
        .flat_map(|r| r.answers_for(&question.id))
        .map(|a| a.value.joined())
        .filter(|s| !s.trim().is_empty())
        .collect()
}

fn question_stats(
    question: &Question,
    number: usize,
    responses: &[NormalizedResponse],
) -> QuestionStats {
    let total = responses.len();
    let responded_count = responses.iter().filter(|r| r.answered(&question.id)).count();

    let (options, text_answers) = if question.is_choice() {
        (option_stats_with(question, responses, responded_count), Vec::new())
    } else {
        (Vec::new(), collect_text_answers(question, responses))
    };

    let text = if question.text.is_empty() {
        format!("Question {number}")
    } else {
        question.text.clone()
    };

    QuestionStats {
        id: question.id.clone(),
        number,
        text,
        kind: question.kind,
        responded_count,
        dropoff_rate: percent(total - responded_count, total),
        options,
        text_answers,
    }
}

/// Aggregates every measured question of `survey` over an already filtered
/// response set.
///
/// Identity questions are left out and the remaining questions are numbered
/// from 1 in declared order. Pure: the same inputs always give the same
/// output.
pub fn compute_survey_stats(survey: &Survey, responses: &[NormalizedResponse]) -> SurveyStats {
    let questions = survey
        .measured_questions()
        .enumerate()
        .map(|(idx, q)| question_stats(q, idx + 1, responses))
        .collect();

    SurveyStats {
        total_responses: responses.len(),
        completion_rate: completion_rate(survey, responses),
        questions,
    }
}

/// Aggregates and keeps the responses alongside, ready for export.
pub fn build_report(survey: &Survey, responses: Vec<NormalizedResponse>) -> SurveyReport {
    SurveyReport {
        survey_id: survey.id.clone(),
        title: survey.title.clone(),
        stats: compute_survey_stats(survey, &responses),
        raw_responses: responses,
    }
}
