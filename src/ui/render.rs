pub mod common;
pub mod geometry;
pub mod spectrum;
