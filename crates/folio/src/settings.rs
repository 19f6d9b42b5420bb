//! Document-wide decoration: header, footer, watermark, margins and zoom.
//!
//! None of this touches page content. Inputs are coerced rather than
//! rejected: margins clamp into range, unknown zoom levels are ignored.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const ZOOM_LEVELS: [u16; 6] = [50, 75, 100, 125, 150, 200];

/// Largest margin the controls accept, in px at 96 units per inch.
pub const MAX_MARGIN: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Zoom(u16);

impl Zoom {
    pub const DEFAULT: Zoom = Zoom(100);

    /// A zoom level, if `percent` is one of [`ZOOM_LEVELS`].
    pub fn new(percent: u16) -> Option<Self> {
        ZOOM_LEVELS.contains(&percent).then_some(Zoom(percent))
    }

    pub fn percent(self) -> u16 {
        self.0
    }

    pub fn scale(self) -> f32 {
        f32::from(self.0) / 100.0
    }

    fn index(self) -> usize {
        ZOOM_LEVELS.iter().position(|&z| z == self.0).unwrap_or(2)
    }

    pub fn zoom_in(self) -> Self {
        let next = (self.index() + 1).min(ZOOM_LEVELS.len() - 1);
        Zoom(ZOOM_LEVELS[next])
    }

    pub fn zoom_out(self) -> Self {
        Zoom(ZOOM_LEVELS[self.index().saturating_sub(1)])
    }

    pub fn is_min(self) -> bool {
        self.0 <= ZOOM_LEVELS[0]
    }

    pub fn is_max(self) -> bool {
        self.0 >= ZOOM_LEVELS[ZOOM_LEVELS.len() - 1]
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u16> for Zoom {
    type Error = String;

    fn try_from(percent: u16) -> Result<Self, Self::Error> {
        Zoom::new(percent).ok_or_else(|| {
            format!("zoom {}% is not one of {:?}", percent, ZOOM_LEVELS)
        })
    }
}

impl From<Zoom> for u16 {
    fn from(zoom: Zoom) -> Self {
        zoom.0
    }
}

impl fmt::Display for Zoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginSide {
    Top,
    Right,
    Bottom,
    Left,
}

impl FromStr for MarginSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(MarginSide::Top),
            "right" => Ok(MarginSide::Right),
            "bottom" => Ok(MarginSide::Bottom),
            "left" => Ok(MarginSide::Left),
            other => Err(format!("unknown margin side '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginPreset {
    Narrow,
    Normal,
    Wide,
}

impl MarginPreset {
    pub fn margins(self) -> Margins {
        match self {
            MarginPreset::Narrow => Margins::uniform(48),
            MarginPreset::Normal => Margins {
                top: 96,
                right: 72,
                bottom: 96,
                left: 72,
            },
            MarginPreset::Wide => Margins {
                top: 96,
                right: 144,
                bottom: 96,
                left: 144,
            },
        }
    }
}

impl FromStr for MarginPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "narrow" => Ok(MarginPreset::Narrow),
            "normal" => Ok(MarginPreset::Normal),
            "wide" => Ok(MarginPreset::Wide),
            other => Err(format!("unknown margin preset '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Margins {
    pub fn uniform(value: u32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn get(&self, side: MarginSide) -> u32 {
        match side {
            MarginSide::Top => self.top,
            MarginSide::Right => self.right,
            MarginSide::Bottom => self.bottom,
            MarginSide::Left => self.left,
        }
    }

    pub fn set(&mut self, side: MarginSide, value: u32) {
        let value = value.min(MAX_MARGIN);
        match side {
            MarginSide::Top => self.top = value,
            MarginSide::Right => self.right = value,
            MarginSide::Bottom => self.bottom = value,
            MarginSide::Left => self.left = value,
        }
    }

    /// Set a side from raw text field input, see [`parse_margin_input`].
    pub fn set_from_input(&mut self, side: MarginSide, input: &str) {
        self.set(side, parse_margin_input(input));
    }

    pub fn clamped(self) -> Self {
        Self {
            top: self.top.min(MAX_MARGIN),
            right: self.right.min(MAX_MARGIN),
            bottom: self.bottom.min(MAX_MARGIN),
            left: self.left.min(MAX_MARGIN),
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        MarginPreset::Normal.margins()
    }
}

/// Read a margin typed into a text field. The leading integer is used
/// (`"12px"` is 12); anything without one, including `"abc"`, is 0.
/// Negative values become 0 and large ones clamp to [`MAX_MARGIN`].
pub fn parse_margin_input(input: &str) -> u32 {
    let trimmed = input.trim_start();
    let (negative, rest) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();

    if digits.is_empty() {
        log::debug!("Margin input {:?} is not a number, using 0", input);
        return 0;
    }
    if negative {
        return 0;
    }

    digits
        .parse::<u64>()
        .map(|v| v.min(u64::from(MAX_MARGIN)) as u32)
        .unwrap_or(MAX_MARGIN)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecorationSettings {
    pub header_text: String,
    pub footer_text: String,
    pub watermark_text: String,
    pub show_watermark: bool,
    pub margins: Margins,
    pub zoom: Zoom,
}

impl Default for DecorationSettings {
    fn default() -> Self {
        Self {
            header_text: String::from("Document Header"),
            footer_text: String::from("Document Footer"),
            watermark_text: String::from("CONFIDENTIAL"),
            show_watermark: true,
            margins: Margins::default(),
            zoom: Zoom::DEFAULT,
        }
    }
}

impl DecorationSettings {
    /// Apply a zoom percentage. Values outside [`ZOOM_LEVELS`] are ignored.
    pub fn set_zoom(&mut self, percent: u16) -> bool {
        match Zoom::new(percent) {
            Some(zoom) => {
                self.zoom = zoom;
                true
            }
            None => {
                log::warn!("Ignoring unsupported zoom level {}%", percent);
                false
            }
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom = self.zoom.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.zoom = self.zoom.zoom_out();
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = Zoom::DEFAULT;
    }

    pub fn toggle_watermark(&mut self) {
        self.show_watermark = !self.show_watermark;
    }

    pub fn apply_preset(&mut self, preset: MarginPreset) {
        self.margins = preset.margins();
    }

    /// Custom properties the page stylesheet reads.
    pub fn css_variables(&self) -> Vec<(&'static str, String)> {
        vec![
            ("--header-text", format!("{:?}", self.header_text)),
            ("--footer-text", format!("{:?}", self.footer_text)),
            ("--watermark-text", format!("{:?}", self.watermark_text)),
            (
                "--show-watermark",
                if self.show_watermark { "block" } else { "none" }.to_string(),
            ),
            ("--margin-top", format!("{}px", self.margins.top)),
            ("--margin-right", format!("{}px", self.margins.right)),
            ("--margin-bottom", format!("{}px", self.margins.bottom)),
            ("--margin-left", format!("{}px", self.margins.left)),
        ]
    }
}
