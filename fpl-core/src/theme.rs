//! Theme context shared by front-ends.
//!
//! A `ThemeContext` is created once at the front-end root and handed down by
//! shared reference; `set_mode` is the only mutator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AssistantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        };
        f.write_str(s)
    }
}

impl FromStr for ThemeMode {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "system" => Ok(ThemeMode::System),
            other => Err(AssistantError::InvalidThemeMode(other.to_string())),
        }
    }
}

/// Hex colour strings, `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub background: &'static str,
    pub background_alt: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
    pub primary: &'static str,
    pub secondary: &'static str,
    pub accent: &'static str,
    pub card: &'static str,
    pub highlight: &'static str,
    pub border: &'static str,
}

pub const LIGHT_PALETTE: Palette = Palette {
    background: "#F5F5F5",
    background_alt: "#FFFFFF",
    text: "#212121",
    text_secondary: "#757575",
    primary: "#03A9F4",
    secondary: "#FFC107",
    accent: "#7C4DFF",
    card: "#FFFFFF",
    highlight: "#64B5F6",
    border: "#E0E0E0",
};

pub const DARK_PALETTE: Palette = Palette {
    background: "#121212",
    background_alt: "#1E1E1E",
    text: "#FFFFFF",
    text_secondary: "#B0B0B0",
    primary: "#03A9F4",
    secondary: "#FFC107",
    accent: "#7C4DFF",
    card: "#1E1E1E",
    highlight: "#64B5F6",
    border: "#333333",
};

impl Palette {
    pub fn for_dark(is_dark: bool) -> &'static Palette {
        if is_dark {
            &DARK_PALETTE
        } else {
            &LIGHT_PALETTE
        }
    }
}

/// Parse `#RRGGBB` into its components. Returns `None` for anything else.
pub fn hex_to_rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
    let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
    let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
    Some((r, g, b))
}

#[derive(Debug, Clone)]
pub struct ThemeContext {
    mode: ThemeMode,
    system_dark: bool,
}

impl ThemeContext {
    pub fn new(mode: ThemeMode, system_dark: bool) -> Self {
        Self { mode, system_dark }
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode
    }

    pub fn is_dark(&self) -> bool {
        match self.mode {
            ThemeMode::System => self.system_dark,
            ThemeMode::Dark => true,
            ThemeMode::Light => false,
        }
    }

    pub fn palette(&self) -> &'static Palette {
        Palette::for_dark(self.is_dark())
    }

    pub fn set_mode(&mut self, mode: ThemeMode) {
        tracing::debug!(from = %self.mode, to = %mode, "Theme mode changed");
        self.mode = mode;
    }
}

impl From<&crate::config::ThemeConfig> for ThemeContext {
    fn from(config: &crate::config::ThemeConfig) -> Self {
        Self::new(config.mode, config.system_dark)
    }
}
