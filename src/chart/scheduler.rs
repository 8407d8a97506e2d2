//! Frame pacing: decides whether the next frame is driven by the display's
//! frame callback or by a fixed timer, and counts frames per second.

use std::time::{Duration, Instant};

pub const DEFAULT_FRAME_BUDGET: Duration = Duration::from_millis(16);
const FPS_WINDOW: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSource {
    /// Next frame follows the display refresh.
    AnimationFrame,
    /// Last draw overran the budget; next frame comes from a timer.
    Timer(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Running,
    Paused,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct FrameScheduler {
    budget: Duration,
    state: RunState,
    source: TickSource,
}

impl FrameScheduler {
    pub fn new(budget: Duration) -> Self {
        let budget = if budget.is_zero() {
            DEFAULT_FRAME_BUDGET
        } else {
            budget
        };
        Self {
            budget,
            state: RunState::Running,
            source: TickSource::AnimationFrame,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Pausing keeps ticks arriving but suppresses drawing.
    pub fn pause(&mut self, paused: bool) {
        if self.state == RunState::Stopped {
            return;
        }
        self.state = if paused {
            RunState::Paused
        } else {
            RunState::Running
        };
    }

    pub fn is_paused(&self) -> bool {
        self.state == RunState::Paused
    }

    /// Ends the loop for good.
    pub fn stop(&mut self) {
        self.state = RunState::Stopped;
    }

    pub fn is_stopped(&self) -> bool {
        self.state == RunState::Stopped
    }

    /// Whether a tick arriving now should draw.
    pub fn should_draw(&self) -> bool {
        self.state == RunState::Running
    }

    /// Where the next tick should come from, or `None` once stopped.
    pub fn tick_source(&self) -> Option<TickSource> {
        (!self.is_stopped()).then_some(self.source)
    }

    /// Records how long the last draw took and picks the next tick source.
    pub fn record(&mut self, draw_time: Duration) -> TickSource {
        self.source = if draw_time > self.budget {
            TickSource::Timer(self.budget)
        } else {
            TickSource::AnimationFrame
        };
        self.source
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_BUDGET)
    }
}

/// Frames per second, refreshed once per one-second window.
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    window_start: Option<Instant>,
    frames: u32,
    fps: u32,
}

impl FpsCounter {
    pub fn tick(&mut self, now: Instant) -> u32 {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return self.fps;
        };

        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed >= FPS_WINDOW {
            self.fps = (self.frames as f64 / elapsed.as_secs_f64()).round() as u32;
            self.frames = 0;
            self.window_start = Some(now);
        }
        self.fps
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
