//! Directory-backed [`SurveyStore`](crate::services::survey_store::SurveyStore)
//! for offline analysis of exported data.

mod store;

pub use store::DirectorySurveyStore;
