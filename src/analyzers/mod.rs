//! Response analytics.
//!
//! Distributions per question, survey-level aggregation with completion and
//! dropoff rates, and portfolio totals. Everything here is a pure function
//! of its inputs; filtering by date happens before these are called.

pub mod aggregate;
pub mod distribution;
pub mod summary;
pub mod types;
pub mod utility;
