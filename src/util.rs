//! Process-wide helpers.

pub mod telemetry;
