mod chart;
mod feed;
mod ui;
mod util;

use feed::FeedSource;
use ui::UiConfig;
use ui::settings::ChartSettings;
use util::telemetry;

use tracing::{error, info};

fn main() {
    telemetry::init();
    info!("Spectrum Chart starting up");

    let settings = ChartSettings::load_or_default();
    let source = FeedSource::from_env();

    let mut ui_config = UiConfig::new(settings);
    match feed::spawn(source) {
        Ok(receiver) => ui_config = ui_config.with_feed(receiver),
        Err(err) => error!("[feed] failed to start {source:?} source: {err}"),
    }

    if let Err(err) = ui::run(ui_config) {
        error!("[ui] failed: {err}");
    }
}
