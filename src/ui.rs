pub mod app;
pub mod chart_view;
pub mod feed_subscription;
pub mod render;
pub mod settings;
pub mod theme;

pub use app::{UiConfig, run};
