//! iced widget hosting a [`SpectrumChart`]: background, grid, the GPU curve
//! primitive and text overlays. Reports its size and pointer activity back to
//! the application as [`ChartEvent`]s.

use crate::chart::SpectrumChart;
use crate::chart::grid::{GridLabel, GridLine, LabelAlign, LabelBaseline};
use crate::chart::preferences::{FontStyle, FontWeight, Preferences};
use crate::ui::render::spectrum::{ChartParams, ChartPrimitive};
use crate::ui::theme;
use iced::advanced::graphics::text::Paragraph as RenderParagraph;
use iced::advanced::renderer::{self, Quad};
use iced::advanced::text::{self, Paragraph as _, Renderer as _};
use iced::advanced::widget::{Tree, tree};
use iced::advanced::{Clipboard, Layout, Renderer as _, Shell, Widget, layout, mouse};
use iced::event::{self, Event};
use iced::font::{Family, Weight};
use iced::{Background, Color, Element, Font, Length, Point, Rectangle, Size};
use iced_wgpu::primitive::Renderer as _;
use std::sync::atomic::{AtomicUsize, Ordering};

const FPS_MARGIN: f32 = 10.0;
const TOOLTIP_PADDING: f32 = 4.0;

static NEXT_CHART_INSTANCE: AtomicUsize = AtomicUsize::new(1);

/// Allocates a key for the GPU buffers of one chart widget.
pub fn next_instance_key() -> usize {
    NEXT_CHART_INSTANCE.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChartEvent {
    Resized { width: f32, height: f32 },
    PointerMoved([f32; 2]),
    PointerLeft,
    Clicked,
}

#[derive(Debug, Default)]
struct ViewState {
    reported: Option<Size>,
    hovered: bool,
}

#[derive(Debug)]
pub struct ChartView<'a> {
    chart: &'a SpectrumChart,
    instance_key: usize,
}

impl<'a> ChartView<'a> {
    pub fn new(chart: &'a SpectrumChart, instance_key: usize) -> Self {
        Self {
            chart,
            instance_key,
        }
    }
}

impl<'a> Widget<ChartEvent, iced::Theme, iced::Renderer> for ChartView<'a> {
    fn tag(&self) -> tree::Tag {
        tree::Tag::of::<ViewState>()
    }

    fn state(&self) -> tree::State {
        tree::State::new(ViewState::default())
    }

    fn size(&self) -> Size<Length> {
        Size::new(Length::Fill, Length::Fill)
    }

    fn layout(
        &self,
        _tree: &mut Tree,
        _renderer: &iced::Renderer,
        limits: &layout::Limits,
    ) -> layout::Node {
        let size = limits.resolve(Length::Fill, Length::Fill, Size::new(0.0, 0.0));
        layout::Node::new(size)
    }

    fn on_event(
        &mut self,
        tree: &mut Tree,
        event: Event,
        layout: Layout<'_>,
        cursor: mouse::Cursor,
        _renderer: &iced::Renderer,
        _clipboard: &mut dyn Clipboard,
        shell: &mut Shell<'_, ChartEvent>,
        _viewport: &Rectangle,
    ) -> event::Status {
        let state = tree.state.downcast_mut::<ViewState>();
        let bounds = layout.bounds();

        if state.reported != Some(bounds.size()) {
            state.reported = Some(bounds.size());
            shell.publish(ChartEvent::Resized {
                width: bounds.width,
                height: bounds.height,
            });
        }

        match event {
            Event::Mouse(mouse::Event::CursorMoved { .. }) => {
                if let Some(position) = cursor.position_in(bounds) {
                    state.hovered = true;
                    shell.publish(ChartEvent::PointerMoved([position.x, position.y]));
                } else if state.hovered {
                    state.hovered = false;
                    shell.publish(ChartEvent::PointerLeft);
                }
                event::Status::Ignored
            }
            Event::Mouse(mouse::Event::CursorLeft) if state.hovered => {
                state.hovered = false;
                shell.publish(ChartEvent::PointerLeft);
                event::Status::Ignored
            }
            Event::Mouse(mouse::Event::ButtonPressed(mouse::Button::Left))
                if cursor.is_over(bounds) =>
            {
                shell.publish(ChartEvent::Clicked);
                event::Status::Captured
            }
            _ => event::Status::Ignored,
        }
    }

    fn draw(
        &self,
        _tree: &Tree,
        renderer: &mut iced::Renderer,
        theme: &iced::Theme,
        _style: &renderer::Style,
        layout: Layout<'_>,
        _cursor: mouse::Cursor,
        _viewport: &Rectangle,
    ) {
        let bounds = layout.bounds();
        let preferences = self.chart.preferences();

        renderer.fill_quad(
            Quad {
                bounds,
                border: Default::default(),
                shadow: Default::default(),
            },
            Background::Color(theme::rgba_to_color(preferences.background.rgba())),
        );

        let grid = self.chart.grid();
        if !grid.lines.is_empty() {
            renderer.with_layer(bounds, |renderer| {
                draw_grid(renderer, bounds, preferences, &grid.lines, &grid.labels);
            });
        }

        let frame = self.chart.frame();
        if let Some(plot) = frame.plot {
            let plot_bounds = Rectangle::new(
                Point::new(bounds.x + plot.left, bounds.y + plot.top),
                Size::new(plot.width(), plot.height()),
            );
            renderer.draw_primitive(
                plot_bounds,
                ChartPrimitive::new(ChartParams {
                    origin: [bounds.x, bounds.y],
                    frame,
                    instance_key: self.instance_key,
                }),
            );
        }

        let fps = self.chart.fps();
        let tooltip = self.chart.tooltip();
        if fps.is_some() || tooltip.is_some() {
            renderer.with_layer(bounds, |renderer| {
                if let Some(fps) = fps {
                    draw_fps(renderer, bounds, preferences, fps);
                }
                if let Some(tooltip) = tooltip {
                    draw_tooltip(
                        renderer,
                        theme,
                        bounds,
                        preferences,
                        &tooltip.text,
                        tooltip.position,
                    );
                }
            });
        }
    }
}

pub fn widget<'a>(chart: &'a SpectrumChart, instance_key: usize) -> Element<'a, ChartEvent> {
    Element::new(ChartView::new(chart, instance_key))
}

fn font_for(style: &FontStyle) -> Font {
    let family = match style.font.to_ascii_lowercase().as_str() {
        "monospace" => Family::Monospace,
        "serif" => Family::Serif,
        _ => Family::SansSerif,
    };
    let weight = match style.weight {
        FontWeight::Normal => Weight::Normal,
        FontWeight::Bold => Weight::Bold,
    };
    Font {
        family,
        weight,
        ..Font::DEFAULT
    }
}

fn measure(content: &str, font: Font, size: f32) -> Size {
    RenderParagraph::with_text(text::Text {
        content,
        bounds: Size::INFINITY,
        size: iced::Pixels(size),
        font,
        horizontal_alignment: iced::alignment::Horizontal::Left,
        vertical_alignment: iced::alignment::Vertical::Top,
        line_height: text::LineHeight::default(),
        shaping: text::Shaping::Basic,
        wrapping: text::Wrapping::None,
    })
    .min_bounds()
}

fn put_text(
    renderer: &mut iced::Renderer,
    content: &str,
    font: Font,
    size: f32,
    origin: Point,
    extent: Size,
    color: Color,
) {
    renderer.fill_text(
        text::Text {
            content: content.to_string(),
            bounds: extent,
            size: iced::Pixels(size),
            font,
            horizontal_alignment: iced::alignment::Horizontal::Left,
            vertical_alignment: iced::alignment::Vertical::Top,
            line_height: text::LineHeight::default(),
            shaping: text::Shaping::Basic,
            wrapping: text::Wrapping::None,
        },
        origin,
        color,
        Rectangle::new(origin, extent),
    );
}

fn solid(renderer: &mut iced::Renderer, bounds: Rectangle, color: Color) {
    renderer.fill_quad(
        Quad {
            bounds,
            border: Default::default(),
            shadow: Default::default(),
        },
        Background::Color(color),
    );
}

fn draw_grid(
    renderer: &mut iced::Renderer,
    bounds: Rectangle,
    preferences: &Preferences,
    lines: &[GridLine],
    labels: &[GridLabel],
) {
    let grid = &preferences.grid;
    for line in lines {
        let style = if line.emphasized {
            &grid.emphasized_line
        } else {
            &grid.normal_line
        };
        let width = style.width.max(0.0);
        if width == 0.0 {
            continue;
        }
        let color = theme::rgba_to_color(style.color.rgba());

        let rect = if line.is_vertical() {
            Rectangle::new(
                Point::new(bounds.x + line.from[0] - width * 0.5, bounds.y + line.from[1]),
                Size::new(width, line.to[1] - line.from[1]),
            )
        } else {
            Rectangle::new(
                Point::new(bounds.x + line.from[0], bounds.y + line.from[1] - width * 0.5),
                Size::new(line.to[0] - line.from[0], width),
            )
        };
        solid(renderer, rect, color);
    }

    let text_color = preferences.text.color.rgba();
    for label in labels {
        let style = if label.emphasized {
            &preferences.text.emphasized
        } else {
            &preferences.text.normal
        };
        let font = font_for(style);
        let extent = measure(&label.text, font, style.size);
        if extent.width <= 0.0 || extent.height <= 0.0 {
            continue;
        }

        let [x, y] = label.position;
        let left = match label.align {
            LabelAlign::Left => x,
            LabelAlign::Center => x - extent.width * 0.5,
            LabelAlign::Right => x - extent.width,
        };
        let top = match label.baseline {
            LabelBaseline::Middle => y - extent.height * 0.5,
            LabelBaseline::Bottom => y - extent.height,
        };
        let color = theme::rgba_to_color(label.color.unwrap_or(text_color));
        put_text(
            renderer,
            &label.text,
            font,
            style.size,
            Point::new(bounds.x + left, bounds.y + top),
            extent,
            color,
        );
    }
}

fn draw_fps(renderer: &mut iced::Renderer, bounds: Rectangle, preferences: &Preferences, fps: u32) {
    let content = format!("{fps} FPS");
    let style = &preferences.text.normal;
    let font = font_for(style);
    let extent = measure(&content, font, style.size);
    let origin = Point::new(
        bounds.x + bounds.width - FPS_MARGIN - extent.width,
        bounds.y + FPS_MARGIN * 0.5,
    );
    put_text(
        renderer,
        &content,
        font,
        style.size,
        origin,
        extent,
        theme::rgba_to_color(preferences.text.color.rgba()),
    );
}

fn draw_tooltip(
    renderer: &mut iced::Renderer,
    theme: &iced::Theme,
    bounds: Rectangle,
    preferences: &Preferences,
    content: &str,
    position: [f32; 2],
) {
    let style = &preferences.text.normal;
    let font = font_for(style);
    let extent = measure(content, font, style.size);
    if extent.width <= 0.0 || extent.height <= 0.0 {
        return;
    }

    let max_x = (bounds.width - extent.width - TOOLTIP_PADDING * 2.0).max(0.0);
    let max_y = (bounds.height - extent.height - TOOLTIP_PADDING * 2.0).max(0.0);
    let origin = Point::new(
        bounds.x + position[0].clamp(0.0, max_x) + TOOLTIP_PADDING,
        bounds.y + position[1].clamp(0.0, max_y) + TOOLTIP_PADDING,
    );

    let palette = theme.extended_palette();
    renderer.fill_quad(
        Quad {
            bounds: Rectangle::new(
                Point::new(origin.x - TOOLTIP_PADDING, origin.y - TOOLTIP_PADDING),
                Size::new(
                    extent.width + TOOLTIP_PADDING * 2.0,
                    extent.height + TOOLTIP_PADDING * 2.0,
                ),
            ),
            border: theme::sharp_border(),
            shadow: Default::default(),
        },
        Background::Color(theme::with_alpha(palette.background.strong.color, 0.9)),
    );

    put_text(
        renderer,
        content,
        font,
        style.size,
        origin,
        extent,
        theme::rgba_to_color(preferences.text.color.rgba()),
    );
}
