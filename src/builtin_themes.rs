//! Built-in themes for quaver
//!
//! This module contains pre-defined themes for popular color schemes.

use crate::tui::Theme;
use ratatui::style::Color;

// Helper function to convert hex RGB to Color::Rgb
const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb(r, g, b)
}

/// Names in cycling order for the settings screen.
pub const THEME_NAMES: &[&str] = &[
    "catppuccin-mocha",
    "catppuccin-latte",
    "dracula",
    "gruvbox-dark",
    "monokai",
];

/// Looks a theme up by its config name, falling back to the default.
pub fn by_name(name: &str) -> Theme {
    match name {
        "catppuccin-latte" => catppuccin_latte(),
        "dracula" => dracula(),
        "gruvbox-dark" => gruvbox_dark(),
        "monokai" => monokai(),
        _ => catppuccin_mocha(),
    }
}

/// Catppuccin Mocha theme
///
/// A soothing pastel theme with warm, cozy colors.
/// Based on [Catppuccin](https://github.com/catppuccin/catppuccin)
pub fn catppuccin_mocha() -> Theme {
    Theme {
        background: rgb(30, 30, 46),    // #1e1e2e
        foreground: rgb(205, 214, 244), // #cdd6f4
        accent: rgb(203, 166, 247),     // #cba6f7 (mauve)
        muted: rgb(108, 112, 134),      // #6c7086 (overlay0)
    }
}

/// Catppuccin Latte theme
///
/// A soothing pastel theme with light, warm colors.
/// Based on [Catppuccin](https://github.com/catppuccin/catppuccin)
pub fn catppuccin_latte() -> Theme {
    Theme {
        background: rgb(239, 241, 245), // #eff1f5 (base)
        foreground: rgb(76, 79, 105),   // #4c4f69 (text)
        accent: rgb(136, 57, 239),      // #8839ef (mauve)
        muted: rgb(156, 160, 176),      // #9ca0b0 (overlay0)
    }
}

/// Dracula theme
///
/// A dark theme with high contrast and vibrant accent colors.
/// Based on [Dracula Theme](https://draculatheme.com/)
pub fn dracula() -> Theme {
    Theme {
        background: rgb(40, 42, 54),    // #282a36
        foreground: rgb(248, 248, 242), // #f8f8f2
        accent: rgb(189, 147, 249),     // #bd93f9 (purple)
        muted: rgb(98, 114, 164),       // #6272a4 (comment)
    }
}

/// Gruvbox Dark theme
///
/// A warm, retro theme designed to be easy on the eyes.
/// Based on [Gruvbox](https://github.com/morhetz/gruvbox)
pub fn gruvbox_dark() -> Theme {
    Theme {
        background: rgb(40, 40, 40),    // #282828
        foreground: rgb(235, 219, 178), // #ebdbb2
        accent: rgb(254, 128, 25),      // #fe8019 (orange)
        muted: rgb(146, 131, 116),      // #928374 (gray)
    }
}

/// Monokai theme
///
/// A classic dark theme with vibrant colors and high contrast.
/// Originally from TextMate editor.
pub fn monokai() -> Theme {
    Theme {
        background: rgb(39, 40, 34),    // #272822
        foreground: rgb(248, 248, 242), // #f8f8f2
        accent: rgb(249, 38, 114),      // #f92672 (pink)
        muted: rgb(117, 113, 94),       // #75715e (comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_falls_back_to_default() {
        assert_eq!(by_name("no-such-theme"), catppuccin_mocha());
        assert_eq!(by_name("dracula"), dracula());
    }

    #[test]
    fn every_listed_name_resolves() {
        for name in THEME_NAMES {
            let theme = by_name(name);
            if *name != "catppuccin-mocha" {
                assert_ne!(theme, catppuccin_mocha(), "{name}");
            }
        }
    }
}
