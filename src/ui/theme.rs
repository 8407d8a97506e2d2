//! Window theme and conversions from chart colors to iced colors.
//!
//! Chart colors are sRGB as written in preferences. iced converts its own
//! colors to linear space; vertices handed straight to wgpu are converted here.

use crate::chart::color::Rgba;
use iced::border::Border;
use iced::theme::palette::{self, Extended, Pair};
use iced::{Color, Theme};

const TEXT_LIGHT: Color = Color::from_rgb(0.902, 0.910, 0.925);
const TEXT_DARK: Color = Color::from_rgb(0.10, 0.10, 0.10);
const TEXT_MUTED_LIGHT: Color = Color::from_rgb(0.655, 0.671, 0.698);
const TEXT_MUTED_DARK: Color = Color::from_rgb(0.40, 0.40, 0.40);
const BORDER_SUBTLE: Color = Color::from_rgb(0.596, 0.604, 0.624);

const ACCENT_PRIMARY: Color = Color::from_rgb(0.129, 0.588, 0.953);
const ACCENT_SUCCESS: Color = Color::from_rgb(0.298, 0.686, 0.314);
const ACCENT_DANGER: Color = Color::from_rgb(1.0, 0.341, 0.133);

pub fn luminance(color: Color) -> f32 {
    0.2126 * color.r + 0.7152 * color.g + 0.0722 * color.b
}

fn offset(color: Color, amount: f32) -> Color {
    Color {
        r: (color.r + amount).clamp(0.0, 1.0),
        g: (color.g + amount).clamp(0.0, 1.0),
        b: (color.b + amount).clamp(0.0, 1.0),
        a: color.a,
    }
}

fn scaled(color: Color, factor: f32) -> Color {
    Color::new(
        (color.r * factor).min(1.0),
        (color.g * factor).min(1.0),
        (color.b * factor).min(1.0),
        1.0,
    )
}

/// Theme whose palette follows the chart background.
pub fn theme(background: Rgba) -> Theme {
    Theme::custom_with_fn(
        "Spectrum Chart".to_string(),
        palette(rgba_to_color(background)),
        extended_palette,
    )
}

fn palette(background: Color) -> palette::Palette {
    let text = if luminance(background) > 0.5 {
        TEXT_DARK
    } else {
        TEXT_LIGHT
    };
    palette::Palette {
        background,
        text,
        primary: ACCENT_PRIMARY,
        success: ACCENT_SUCCESS,
        danger: ACCENT_DANGER,
    }
}

fn extended_palette(base: palette::Palette) -> Extended {
    let is_light = luminance(base.background) > 0.5;
    let muted = if is_light {
        TEXT_MUTED_DARK
    } else {
        TEXT_MUTED_LIGHT
    };
    let step = if is_light { -0.05 } else { 0.05 };
    let surface = offset(base.background, step);
    let elevated = offset(base.background, step * 2.0);

    let accent = |color: Color| {
        (
            Pair::new(color, TEXT_LIGHT),
            Pair::new(scaled(color, 0.7), muted),
            Pair::new(scaled(color, 1.2), TEXT_LIGHT),
        )
    };
    let (primary, primary_weak, primary_strong) = accent(base.primary);
    let (success, success_weak, success_strong) = accent(base.success);
    let (danger, danger_weak, danger_strong) = accent(base.danger);

    Extended {
        background: palette::Background {
            base: Pair::new(base.background, base.text),
            weak: Pair::new(surface, base.text),
            strong: Pair::new(elevated, base.text),
        },
        primary: palette::Primary {
            base: primary,
            weak: primary_weak,
            strong: primary_strong,
        },
        secondary: palette::Secondary {
            base: Pair::new(surface, base.text),
            weak: Pair::new(base.background, muted),
            strong: Pair::new(elevated, base.text),
        },
        success: palette::Success {
            base: success,
            weak: success_weak,
            strong: success_strong,
        },
        danger: palette::Danger {
            base: danger,
            weak: danger_weak,
            strong: danger_strong,
        },
        is_dark: !is_light,
    }
}

pub fn sharp_border() -> Border {
    Border {
        color: BORDER_SUBTLE,
        width: 1.0,
        radius: 0.0.into(),
    }
}

pub fn with_alpha(color: Color, alpha: f32) -> Color {
    Color {
        a: alpha.clamp(0.0, 1.0),
        ..color
    }
}

#[inline]
pub fn rgba_to_color(rgba: Rgba) -> Color {
    Color::from_rgba(rgba.r, rgba.g, rgba.b, rgba.a)
}

/// Linear-space RGBA for vertices that bypass iced's color handling.
#[inline]
pub fn rgba_to_linear(rgba: Rgba) -> [f32; 4] {
    rgba_to_color(rgba).into_linear()
}
