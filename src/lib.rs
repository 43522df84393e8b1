//! Response analytics for survey results.
//!
//! Raw survey schemas and result rows go through [`parser`], are narrowed by
//! [`filter`], aggregated by [`analyzers`] and exported by [`output`].
//! [`session`] ties the steps together over a [`services::survey_store::SurveyStore`].

pub mod analyzers;
pub mod config;
pub mod fetch;
pub mod filter;
pub mod infra;
pub mod model;
pub mod output;
pub mod parser;
pub mod services;
pub mod session;
