//! Color themes for the terminal UI.

use ratatui::style::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available color themes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Blue,
    Green,
}

/// Colors used by the SQL highlighter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxPalette {
    pub text: Color,
    pub keyword: Color,
    pub string: Color,
    pub number: Color,
    pub comment: Color,
    pub operator: Color,
}

impl Theme {
    pub const ALL: [Theme; 4] = [Theme::Light, Theme::Dark, Theme::Blue, Theme::Green];

    /// The next theme in [`Theme::ALL`], wrapping around.
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Blue => "blue",
            Theme::Green => "green",
        }
    }

    pub fn bg(&self) -> Color {
        match self {
            Theme::Dark => Color::Rgb(0x2d, 0x2d, 0x2d),
            _ => Color::Rgb(0xff, 0xff, 0xff),
        }
    }

    pub fn fg(&self) -> Color {
        match self {
            Theme::Light => Color::Rgb(0x33, 0x33, 0x33),
            Theme::Dark => Color::Rgb(0xff, 0xff, 0xff),
            Theme::Blue => Color::Rgb(0x0d, 0x47, 0xa1),
            Theme::Green => Color::Rgb(0x1b, 0x5e, 0x20),
        }
    }

    /// Focused borders, selected rows and headers
    pub fn highlight(&self) -> Color {
        match self {
            Theme::Light => Color::Rgb(0x00, 0x78, 0xd4),
            Theme::Dark => Color::Rgb(0x56, 0x9c, 0xd6),
            Theme::Blue => Color::Rgb(0x19, 0x76, 0xd2),
            Theme::Green => Color::Rgb(0x38, 0x8e, 0x3c),
        }
    }

    /// Background of the selected row
    pub fn selection(&self) -> Color {
        match self {
            Theme::Light => Color::Rgb(0xe3, 0xf2, 0xfd),
            Theme::Dark => Color::Rgb(0x4a, 0x4a, 0x4a),
            Theme::Blue => Color::Rgb(0xbb, 0xde, 0xfb),
            Theme::Green => Color::Rgb(0xc8, 0xe6, 0xc9),
        }
    }

    pub fn muted(&self) -> Color {
        match self {
            Theme::Dark => Color::Rgb(0xcc, 0xcc, 0xcc),
            _ => Color::Rgb(0x75, 0x75, 0x75),
        }
    }

    pub fn success(&self) -> Color {
        Color::Rgb(0x2e, 0x7d, 0x32)
    }

    pub fn warning(&self) -> Color {
        Color::Rgb(0xf5, 0x7c, 0x00)
    }

    pub fn error(&self) -> Color {
        Color::Rgb(0xd3, 0x2f, 0x2f)
    }

    pub fn syntax(&self) -> SyntaxPalette {
        match self {
            Theme::Light => SyntaxPalette {
                text: self.fg(),
                keyword: Color::Rgb(0x00, 0x00, 0xff),
                string: Color::Rgb(0x00, 0x80, 0x00),
                number: Color::Rgb(0xff, 0x80, 0x00),
                comment: Color::Rgb(0x80, 0x80, 0x80),
                operator: Color::Rgb(0x80, 0x00, 0x80),
            },
            Theme::Dark => SyntaxPalette {
                text: self.fg(),
                keyword: Color::Rgb(0x56, 0x9c, 0xd6),
                string: Color::Rgb(0xce, 0x91, 0x78),
                number: Color::Rgb(0xb5, 0xce, 0xa8),
                comment: Color::Rgb(0x6a, 0x99, 0x55),
                operator: Color::Rgb(0xd4, 0xd4, 0xd4),
            },
            Theme::Blue => SyntaxPalette {
                text: self.fg(),
                keyword: Color::Rgb(0x19, 0x76, 0xd2),
                string: Color::Rgb(0x38, 0x8e, 0x3c),
                number: Color::Rgb(0xf5, 0x7c, 0x00),
                comment: Color::Rgb(0x75, 0x75, 0x75),
                operator: Color::Rgb(0x7b, 0x1f, 0xa2),
            },
            Theme::Green => SyntaxPalette {
                text: self.fg(),
                keyword: Color::Rgb(0x38, 0x8e, 0x3c),
                string: Color::Rgb(0x2e, 0x7d, 0x32),
                number: Color::Rgb(0xf5, 0x7c, 0x00),
                comment: Color::Rgb(0x75, 0x75, 0x75),
                operator: Color::Rgb(0x7b, 0x1f, 0xa2),
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "blue" => Ok(Theme::Blue),
            "green" => Ok(Theme::Green),
            other => Err(format!(
                "unknown theme '{}' (expected light, dark, blue or green)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_cycles_through_all() {
        let mut theme = Theme::Light;
        for _ in 0..Theme::ALL.len() {
            theme = theme.next();
        }
        assert_eq!(theme, Theme::Light);
        assert_eq!(Theme::Green.next(), Theme::Light);
    }

    #[test]
    fn test_parse_roundtrip() {
        for theme in Theme::ALL {
            assert_eq!(theme.as_str().parse::<Theme>(), Ok(theme));
        }
        assert!("solarized".parse::<Theme>().is_err());
        assert_eq!(" DARK ".parse::<Theme>(), Ok(Theme::Dark));
    }
}
