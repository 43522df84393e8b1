use crate::analyzers::aggregate::completion_rate;
use crate::analyzers::types::PortfolioSummary;
use crate::analyzers::utility::mean_rate;
use crate::model::{NormalizedResponse, Survey};

/// Rolls every survey's response set up into portfolio totals.
///
/// Surveys without responses count towards `survey_count` but are left out
/// of the completion average.
pub fn summarize_portfolio(entries: &[(&Survey, &[NormalizedResponse])]) -> PortfolioSummary {
    let total_responses = entries.iter().map(|(_, responses)| responses.len()).sum();
    let rates: Vec<u32> = entries
        .iter()
        .filter(|(_, responses)| !responses.is_empty())
        .map(|(survey, responses)| completion_rate(survey, responses))
        .collect();

    PortfolioSummary {
        survey_count: entries.len(),
        total_responses,
        average_completion: mean_rate(&rates),
    }
}
