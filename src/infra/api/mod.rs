//! HTTP-backed [`SurveyStore`](crate::services::survey_store::SurveyStore).

mod client;

pub use client::ApiSurveyStore;
