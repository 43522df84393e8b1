pub mod survey_store;
