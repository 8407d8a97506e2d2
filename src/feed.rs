//! Spectrum data producers. Each source runs on its own thread and hands
//! frames to the UI over a bounded channel, dropping frames while the UI lags.
//! Chart commands share the channel and are never dropped.

pub mod stdin;
pub mod synthetic;

use crate::chart::command::ChartCommand;
use async_channel::{Receiver as AsyncReceiver, Sender as AsyncSender, TrySendError};
use serde::Deserialize;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub const FEED_ENV_VAR: &str = "SPECTRUM_CHART_FEED";

const CHANNEL_CAPACITY: usize = 16;
const DROP_REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// One magnitude array destined for a chart layer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedFrame {
    pub layer: String,
    pub magnitudes: Vec<f32>,
    #[serde(default)]
    pub frequencies: Option<Vec<f32>>,
}

#[derive(Debug, Clone)]
pub enum FeedMessage {
    Frame(FeedFrame),
    Command(ChartCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedSource {
    #[default]
    Synthetic,
    Stdin,
}

impl FeedSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "synthetic" | "" => Some(Self::Synthetic),
            "stdin" | "-" => Some(Self::Stdin),
            _ => None,
        }
    }

    /// Source named by the environment, falling back to the synthetic feed.
    pub fn from_env() -> Self {
        match std::env::var(FEED_ENV_VAR) {
            Ok(value) => Self::parse(&value).unwrap_or_else(|| {
                warn!("[feed] unknown {FEED_ENV_VAR} value {value:?}; using synthetic feed");
                Self::Synthetic
            }),
            Err(_) => Self::Synthetic,
        }
    }

    fn thread_name(self) -> &'static str {
        match self {
            Self::Synthetic => "spectrum-chart-synthetic-feed",
            Self::Stdin => "spectrum-chart-stdin-feed",
        }
    }
}

/// Publishing end handed to a source loop.
#[derive(Debug)]
pub struct FeedSender {
    sender: AsyncSender<FeedMessage>,
    dropped: u64,
    reported: u64,
    last_report: Instant,
}

impl FeedSender {
    fn new(sender: AsyncSender<FeedMessage>) -> Self {
        Self {
            sender,
            dropped: 0,
            reported: 0,
            last_report: Instant::now(),
        }
    }

    /// Offers a frame without blocking. Returns `false` once the receiver is
    /// gone and the source should stop.
    pub fn publish(&mut self, frame: FeedFrame) -> bool {
        match self.sender.try_send(FeedMessage::Frame(frame)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.dropped += 1,
            Err(TrySendError::Closed(_)) => return false,
        }

        if self.last_report.elapsed() >= DROP_REPORT_INTERVAL {
            if self.dropped > self.reported {
                warn!(
                    "[feed] dropped {} frames (total {})",
                    self.dropped - self.reported,
                    self.dropped
                );
                self.reported = self.dropped;
            }
            self.last_report = Instant::now();
        }
        true
    }

    /// Queues a command, waiting for room. Returns `false` once the receiver
    /// is gone.
    pub fn command(&self, command: ChartCommand) -> bool {
        self.sender.send_blocking(FeedMessage::Command(command)).is_ok()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Starts `source` on a background thread.
pub fn spawn(source: FeedSource) -> io::Result<Arc<AsyncReceiver<FeedMessage>>> {
    let (sender, receiver) = async_channel::bounded(CHANNEL_CAPACITY);
    let sender = FeedSender::new(sender);

    thread::Builder::new()
        .name(source.thread_name().into())
        .spawn(move || {
            info!("[feed] {source:?} source started");
            match source {
                FeedSource::Synthetic => synthetic::run(sender),
                FeedSource::Stdin => stdin::run(sender),
            }
            info!("[feed] {source:?} source stopped");
        })?;

    Ok(Arc::new(receiver))
}
