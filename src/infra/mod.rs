pub mod api;
pub mod local;
