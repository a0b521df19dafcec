use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub page: PageConfig,
    pub font: FontConfig,
    pub layout: LayoutConfig,
    pub document: DocumentConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub width: f32,
    pub height: f32,
    pub size: Option<PaperSize>,
    pub margins: Margins,
    pub numbers: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            width: 612.0,
            height: 792.0,
            size: None,
            margins: Margins::default(),
            numbers: false,
        }
    }
}

impl PageConfig {
    /// Page dimensions in points, honouring a named paper size when one is set.
    pub fn dimensions(&self) -> (f32, f32) {
        match self.size {
            Some(size) => size.dimensions(),
            None => (self.width, self.height),
        }
    }

    /// Width available to content between the left and right margins.
    pub fn content_width(&self) -> f32 {
        self.dimensions().0 - self.margins.left - self.margins.right
    }

    /// Height available to content between the top and bottom margins.
    pub fn content_height(&self) -> f32 {
        self.dimensions().1 - self.margins.top - self.margins.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    Letter,
    Legal,
    A4,
    A5,
}

impl PaperSize {
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PaperSize::Letter => (612.0, 792.0),
            PaperSize::Legal => (612.0, 1008.0),
            PaperSize::A4 => (595.0, 842.0),
            PaperSize::A5 => (420.0, 595.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(72.0)
    }
}

impl Margins {
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Helvetica when true, Times otherwise. Code always uses Courier.
    pub sans: bool,
    pub base_size: f32,
    pub code_size: f32,
    /// Line height as a multiple of the font size.
    pub line_height: f32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            sans: true,
            base_size: 11.0,
            code_size: 10.0,
            line_height: 1.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub list_indent: f32,
    /// Heading size multipliers for levels 1 through 6.
    pub heading_scale: [f32; 6],
    /// Lines of the following block that must fit on the same page as a heading.
    pub keep_heading_with_lines: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            list_indent: 18.0,
            heading_scale: [2.0, 1.6, 1.35, 1.15, 1.0, 0.9],
            keep_heading_with_lines: 1,
        }
    }
}

impl LayoutConfig {
    /// Size multiplier for a heading level. Levels outside 1-6 are clamped.
    pub fn scale_for_heading(&self, level: u8) -> f32 {
        let index = usize::from(level.clamp(1, 6)) - 1;
        self.heading_scale[index]
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    /// Compress page content streams with FlateDecode.
    pub compress: bool,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            creator: Some("mdpdf".to_string()),
            compress: false,
        }
    }
}

impl Config {
    /// The settings shipped in `default_config.toml`.
    pub fn compiled_default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Load config from a TOML file, or return defaults if not found.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                log::warn!("ignoring invalid config {}: {}", path.display(), e);
                Self::compiled_default()
            }),
            Err(_) => Self::compiled_default(),
        }
    }

    /// Load config from a TOML file, failing if it is missing or malformed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Replace settings that cannot produce a usable page with their defaults.
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        let defaults = Config::default();

        let (width, height) = config.page.dimensions();
        let usable = positive(config.page.content_width()) && positive(config.page.content_height());
        if !(positive(width) && positive(height) && usable) {
            log::warn!(
                "page geometry {}x{} with margins {:?} leaves no room for content, using defaults",
                width,
                height,
                config.page.margins
            );
            config.page.width = defaults.page.width;
            config.page.height = defaults.page.height;
            config.page.size = None;
            config.page.margins = defaults.page.margins;
        }

        if !positive(config.font.base_size) {
            log::warn!("invalid base font size {}, using default", config.font.base_size);
            config.font.base_size = defaults.font.base_size;
        }
        if !positive(config.font.code_size) {
            log::warn!("invalid code font size {}, using default", config.font.code_size);
            config.font.code_size = defaults.font.code_size;
        }
        if !(positive(config.font.line_height) && config.font.line_height >= 1.0) {
            config.font.line_height = defaults.font.line_height;
        }
        if !(config.layout.list_indent.is_finite() && config.layout.list_indent >= 0.0) {
            config.layout.list_indent = defaults.layout.list_indent;
        }
        if !config.layout.heading_scale.iter().all(|s| positive(*s)) {
            config.layout.heading_scale = defaults.layout.heading_scale;
        }

        // The tallest line must fit on an empty page for pagination to hold.
        let tallest = config.layout.heading_scale.iter().cloned().fold(1.0, f32::max)
            * config.font.base_size.max(config.font.code_size)
            * config.font.line_height;
        if tallest > config.page.content_height() {
            log::warn!("font sizes exceed the usable page height, using default fonts");
            config.font = defaults.font.clone();
            config.layout.heading_scale = defaults.layout.heading_scale;
            if 2.0 * config.font.base_size * config.font.line_height > config.page.content_height() {
                config.page.width = defaults.page.width;
                config.page.height = defaults.page.height;
                config.page.size = None;
                config.page.margins = defaults.page.margins;
            }
        }

        config
    }
}

fn positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}
