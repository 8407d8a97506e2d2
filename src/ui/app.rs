//! Application shell: one window hosting the chart, fed by the data feed and
//! driven by the chart's frame scheduler.

use crate::chart::SpectrumChart;
use crate::chart::layer::LayerOptions;
use crate::chart::scheduler::TickSource;
use crate::feed::{FeedFrame, FeedMessage};
use crate::ui::chart_view::{self, ChartEvent};
use crate::ui::feed_subscription::feed_subscription;
use crate::ui::settings::ChartSettings;
use crate::ui::theme;
use async_channel::Receiver as AsyncReceiver;

use iced::alignment::{Horizontal, Vertical};
use iced::keyboard::{self, Key};
use iced::widget::{container, row, stack, text};
use iced::{Element, Length, Result, Settings, Size, Subscription, Task, daemon, exit, window};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const WINDOW_SIZE: Size = Size::new(960.0, 540.0);
const EXIT_CONFIRM_WINDOW: Duration = Duration::from_secs(2);
const TOOLTIP_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct UiConfig {
    settings: ChartSettings,
    feed: Option<Arc<AsyncReceiver<FeedMessage>>>,
}

impl UiConfig {
    pub fn new(settings: ChartSettings) -> Self {
        Self {
            settings,
            feed: None,
        }
    }

    pub fn with_feed(mut self, feed: Arc<AsyncReceiver<FeedMessage>>) -> Self {
        self.feed = Some(feed);
        self
    }
}

pub fn run(config: UiConfig) -> Result {
    let settings = Settings {
        id: Some(String::from("spectrum-chart")),
        antialiasing: true,
        ..Settings::default()
    };
    daemon(UiApp::title, update, view)
        .settings(settings)
        .subscription(|state: &UiApp| state.subscription())
        .theme(|state, window| state.theme(window))
        .run_with(move || UiApp::new(config))
}

#[derive(Debug)]
struct UiApp {
    chart: SpectrumChart,
    instance_key: usize,
    feed: Option<Arc<AsyncReceiver<FeedMessage>>>,
    main_window_id: window::Id,
    exit_warning_until: Option<Instant>,
}

#[derive(Debug, Clone)]
enum Message {
    Tick(Instant),
    TooltipPoll(Instant),
    Feed(FeedMessage),
    Chart(ChartEvent),
    ScaleFactor(f32),
    Window(window::Id, window::Event),
    TogglePause,
    ResetPeaks,
    QuitRequested,
}

impl UiApp {
    fn new(config: UiConfig) -> (Self, Task<Message>) {
        let UiConfig { settings, feed } = config;
        let chart = settings.build_chart();
        info!(
            "[ui] chart ready with {} layers, decay {:?}",
            chart.layer_count(),
            chart.decay_time()
        );

        let (main_window_id, open_main) = window::open(window::Settings {
            size: WINDOW_SIZE,
            min_size: Some(Size::new(240.0, 160.0)),
            resizable: true,
            ..window::Settings::default()
        });

        (
            Self {
                chart,
                instance_key: chart_view::next_instance_key(),
                feed,
                main_window_id,
                exit_warning_until: None,
            },
            open_main.then(window::get_scale_factor).map(Message::ScaleFactor),
        )
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = Vec::with_capacity(5);

        match self.chart.tick_source() {
            Some(TickSource::AnimationFrame) => {
                subscriptions.push(window::frames().map(Message::Tick));
            }
            Some(TickSource::Timer(interval)) => {
                subscriptions.push(iced::time::every(interval).map(Message::Tick));
            }
            None => {}
        }

        if self.chart.tooltip_pending() {
            subscriptions.push(iced::time::every(TOOLTIP_POLL_INTERVAL).map(Message::TooltipPoll));
        }

        if let Some(receiver) = &self.feed {
            subscriptions.push(feed_subscription(Arc::clone(receiver)).map(Message::Feed));
        }

        subscriptions.push(window::events().map(|(id, event)| Message::Window(id, event)));

        subscriptions.push(keyboard::on_key_press(|key, modifiers| match key {
            Key::Character(ref v) if modifiers.is_empty() && v.eq_ignore_ascii_case("p") => {
                Some(Message::TogglePause)
            }
            Key::Character(ref v) if modifiers.is_empty() && v.eq_ignore_ascii_case("r") => {
                Some(Message::ResetPeaks)
            }
            Key::Character(ref v) if modifiers.is_empty() && v.eq_ignore_ascii_case("q") => {
                Some(Message::QuitRequested)
            }
            _ => None,
        }));

        Subscription::batch(subscriptions)
    }

    fn title(&self, _window: window::Id) -> String {
        if self.chart.is_paused() {
            "Spectrum Chart (paused)".to_string()
        } else {
            "Spectrum Chart".to_string()
        }
    }

    fn theme(&self, _window: window::Id) -> iced::Theme {
        theme::theme(self.chart.preferences().background.rgba())
    }

    fn ingest(&mut self, frame: FeedFrame) {
        if self.chart.layer(&frame.layer).is_none() {
            info!("[ui] adding layer {:?} for incoming feed", frame.layer);
            self.chart.add_spectrum(&frame.layer, &LayerOptions::default());
        }
        self.chart.update_spectrum(
            &frame.layer,
            &frame.magnitudes,
            frame.frequencies.as_deref(),
            Instant::now(),
        );
    }

    fn on_chart_event(&mut self, event: ChartEvent) {
        match event {
            ChartEvent::Resized { width, height } => {
                if self.chart.resize(width, height) {
                    debug!("[ui] chart resized to {width}x{height}");
                }
            }
            ChartEvent::PointerMoved(position) => {
                self.chart.pointer_moved(position, Instant::now());
            }
            ChartEvent::PointerLeft => self.chart.pointer_left(),
            ChartEvent::Clicked => self.chart.reset_peak_hold(None),
        }
    }

    fn on_window_event(&mut self, id: window::Id, event: window::Event) -> Task<Message> {
        if id != self.main_window_id {
            return Task::none();
        }
        match event {
            window::Event::Moved(_) | window::Event::Resized(_) => {
                window::get_scale_factor(id).map(Message::ScaleFactor)
            }
            window::Event::CloseRequested | window::Event::Closed => {
                self.chart.stop();
                exit()
            }
            _ => Task::none(),
        }
    }

    fn main_window_view(&self) -> Element<'_, Message> {
        let chart = chart_view::widget(&self.chart, self.instance_key).map(Message::Chart);

        let mut toasts = Vec::new();
        if self.chart.is_paused() {
            toasts.push("paused (press p to resume)");
        }
        if let Some(deadline) = self.exit_warning_until
            && Instant::now() < deadline
        {
            toasts.push("press q again to exit");
        }

        if toasts.is_empty() {
            return chart;
        }

        let toast_elements: Vec<Element<'_, Message>> = toasts
            .into_iter()
            .map(|msg| container(text(msg).size(11)).padding([2, 6]).into())
            .collect();
        let toast_row = row(toast_elements).spacing(12);

        stack![
            chart,
            container(toast_row)
                .width(Length::Fill)
                .height(Length::Fill)
                .align_x(Horizontal::Center)
                .align_y(Vertical::Bottom)
                .padding(4)
        ]
        .into()
    }
}

fn update(app: &mut UiApp, message: Message) -> Task<Message> {
    match message {
        Message::Tick(now) => {
            app.chart.tick(now);
            Task::none()
        }
        Message::TooltipPoll(now) => {
            app.chart.poll_tooltip(now);
            Task::none()
        }
        Message::Feed(FeedMessage::Frame(frame)) => {
            app.ingest(frame);
            Task::none()
        }
        Message::Feed(FeedMessage::Command(command)) => {
            debug!("[ui] applying {command:?}");
            if let Err(err) = app.chart.apply(command) {
                warn!("[ui] chart command rejected: {err:#}");
            }
            Task::none()
        }
        Message::Chart(event) => {
            app.on_chart_event(event);
            Task::none()
        }
        Message::ScaleFactor(ratio) => {
            if app.chart.set_device_pixel_ratio(ratio) {
                debug!("[ui] device pixel ratio {ratio}");
            }
            Task::none()
        }
        Message::Window(id, event) => app.on_window_event(id, event),
        Message::TogglePause => {
            let paused = !app.chart.is_paused();
            app.chart.pause(paused);
            Task::none()
        }
        Message::ResetPeaks => {
            app.chart.reset_peak_hold(None);
            Task::none()
        }
        Message::QuitRequested => {
            let now = Instant::now();
            if let Some(deadline) = app.exit_warning_until
                && now < deadline
            {
                app.chart.stop();
                return exit();
            }
            app.exit_warning_until = Some(now + EXIT_CONFIRM_WINDOW);
            Task::none()
        }
    }
}

fn view(app: &UiApp, window: window::Id) -> Element<'_, Message> {
    if window == app.main_window_id {
        app.main_window_view()
    } else {
        container(text(""))
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}
