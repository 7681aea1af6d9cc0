//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::Palette;
use candytrials::{Blocker, CandyColor};
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Candy palette and UI colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Candy colours in `CandyColor::index` order: red, blue, green, yellow, purple, orange.
    pub candy: [Color; 6],
    /// Cell background under frozen candies.
    pub ice: Color,
    /// Bracket colour around locked candies.
    pub lock: Color,
    /// Board background.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (score, moves).
    pub main_fg: Color,
    /// Highlight / titles.
    pub title: Color,
    /// Secondary text and hints.
    pub inactive_fg: Color,
    /// Cursor cell background.
    pub cursor: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

/// Compile-time `0xRRGGBB` colour.
const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_CANDY: [Color; 6] = [
    rgb(0xE0_6C75),
    rgb(0x61_AFEF),
    rgb(0x98_C379),
    rgb(0xE5_C07B),
    rgb(0xC6_78DD),
    rgb(0xD1_9A66),
];

/// Theme keys for each candy, with btop fallbacks.
const CANDY_KEYS: [&[&str]; 6] = [
    &["candy_red", "cpu_end", "temp_end"],
    &["candy_blue", "cpu_box"],
    &["candy_green", "mem_box", "cpu_start"],
    &["candy_yellow", "title", "cpu_mid"],
    &["candy_purple", "net_box"],
    &["candy_orange", "used_mid", "download_mid"],
];

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// One Dark hex values.
    pub const fn onedark_default() -> Self {
        Self {
            candy: ONEDARK_CANDY,
            ice: rgb(0x2C_5D6B),
            lock: rgb(0x9D_A5B4),
            bg: rgb(0x31_353F),
            div_line: rgb(0x3F_444F),
            main_fg: rgb(0xAB_B2BF),
            title: rgb(0xE5_C07B),
            inactive_fg: rgb(0x5C_6370),
            cursor: rgb(0x4B_5263),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark when no path is given or the file does not exist.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                let s = std::fs::read_to_string(p)?;
                Self::from_map(&parse_theme_file(&s))
            }
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    /// Override candy colours for high-contrast or colorblind play.
    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => {
                self.candy = [
                    rgb(0xFF_0000),
                    rgb(0x00_88FF),
                    rgb(0x00_FF00),
                    rgb(0xFF_FF00),
                    rgb(0xFF_00FF),
                    rgb(0xFF_8800),
                ];
                self.ice = rgb(0x00_5F87);
            }
            Palette::Colorblind => {
                // Tol "vibrant" scheme.
                self.candy = [
                    rgb(0xCC_3311),
                    rgb(0x00_77BB),
                    rgb(0x00_9988),
                    rgb(0xBB_BB00),
                    rgb(0xEE_3377),
                    rgb(0xEE_7733),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k).and_then(|v| parse_hex(v).ok()));
        let defaults = Self::onedark_default();
        let mut candy = defaults.candy;
        for (slot, keys) in candy.iter_mut().zip(CANDY_KEYS) {
            if let Some(color) = get(keys) {
                *slot = color;
            }
        }
        Self {
            candy,
            ice: get(&["ice", "hi_fg"]).unwrap_or(defaults.ice),
            lock: get(&["lock", "selected_fg"]).unwrap_or(defaults.lock),
            bg: get(&["meter_bg"]).unwrap_or(defaults.bg),
            div_line: get(&["div_line"]).unwrap_or(defaults.div_line),
            main_fg: get(&["main_fg"]).unwrap_or(defaults.main_fg),
            title: get(&["title"]).unwrap_or(defaults.title),
            inactive_fg: get(&["inactive_fg"]).unwrap_or(defaults.inactive_fg),
            cursor: get(&["selected_bg"]).unwrap_or(defaults.cursor),
        }
    }

    #[inline]
    pub fn candy_color(&self, color: CandyColor) -> Color {
        self.candy[color.index()]
    }

    /// Background for a cell carrying `blocker`.
    pub fn blocker_bg(&self, blocker: Blocker) -> Color {
        match blocker {
            Blocker::Ice => self.ice,
            Blocker::None | Blocker::Lock => self.bg,
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some(stripped) = line.strip_prefix("theme[") else {
            continue;
        };
        let Some((key, rest)) = stripped.split_once(']') else {
            continue;
        };
        let Some((_, value)) = rest.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        if !value.is_empty() {
            map.insert(key.trim().to_string(), value.to_string());
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(s.to_string());
    let channel = |range: std::ops::Range<usize>| {
        s.get(range)
            .and_then(|digits| u8::from_str_radix(digits, 16).ok())
            .ok_or_else(invalid)
    };
    match s.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}
