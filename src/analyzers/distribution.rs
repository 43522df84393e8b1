use tracing::debug;

use crate::analyzers::types::{Distribution, OptionStat};
use crate::analyzers::utility::percent;
use crate::model::{NormalizedResponse, Question};

/// Per-key selection counts for one question, keyed by canonical option
/// value in option order, followed by any ad-hoc keys in first-seen order.
struct Tally {
    entries: Vec<(String, usize)>,
}

impl Tally {
    fn seeded(question: &Question) -> Self {
        let mut tally = Tally {
            entries: Vec::with_capacity(question.options.len()),
        };
        for opt in &question.options {
            if tally.position(&opt.value).is_none() {
                tally.entries.push((opt.value.clone(), 0));
            }
        }
        tally
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    fn bump(&mut self, key: &str) {
        match self.position(key) {
            Some(idx) => self.entries[idx].1 += 1,
            None => self.entries.push((key.to_string(), 1)),
        }
    }

    fn count(&self, key: &str) -> usize {
        self.position(key).map(|idx| self.entries[idx].1).unwrap_or(0)
    }
}

fn tally(question: &Question, responses: &[NormalizedResponse]) -> Tally {
    let mut tally = Tally::seeded(question);

    for response in responses {
        // A response selects each key at most once.
        let mut seen: Vec<&str> = Vec::new();
        for answer in response.answers_for(&question.id) {
            for element in answer.value.elements() {
                let key = question
                    .resolve_option(element)
                    .map(|o| o.value.as_str())
                    .unwrap_or(element);
                if !seen.contains(&key) {
                    seen.push(key);
                    tally.bump(key);
                }
            }
        }
    }

    tally
}

/// Counts selections of each option of `question` across `responses`.
///
/// Answer elements are matched by option value first, then by label, so
/// both storage conventions count towards the same option. Elements that
/// match nothing are reported in [`Distribution::unmatched`]. A question
/// without options has an empty distribution, whatever its type.
pub fn compute_distribution(question: &Question, responses: &[NormalizedResponse]) -> Distribution {
    if question.options.is_empty() {
        return Distribution::default();
    }

    let tally = tally(question, responses);
    let labels = question.options.iter().map(|o| o.label.clone()).collect();
    let counts = question.options.iter().map(|o| tally.count(&o.value)).collect();
    let unmatched: Vec<(String, usize)> = tally
        .entries
        .iter()
        .filter(|(key, _)| !question.options.iter().any(|o| &o.value == key))
        .cloned()
        .collect();

    if !unmatched.is_empty() {
        debug!(
            question_id = %question.id,
            unmatched = unmatched.len(),
            "Answers reference values outside the option list"
        );
    }

    Distribution {
        labels,
        counts,
        unmatched,
    }
}

/// Option counts with percentages relative to the number of responses that
/// answered the question, not the number of selections. Checkbox shares can
/// therefore add up to more than 100.
pub fn compute_option_stats(question: &Question, responses: &[NormalizedResponse]) -> Vec<OptionStat> {
    let answered = responses.iter().filter(|r| r.answered(&question.id)).count();
    option_stats_with(question, responses, answered)
}

pub(crate) fn option_stats_with(
    question: &Question,
    responses: &[NormalizedResponse],
    answered: usize,
) -> Vec<OptionStat> {
    let distribution = compute_distribution(question, responses);

    distribution
        .labels
        .into_iter()
        .zip(distribution.counts)
        .map(|(label, count)| OptionStat {
            label,
            count,
            percent: percent(count, answered),
        })
        .collect()
}
