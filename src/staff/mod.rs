//! Staff members and their theme colours.

pub mod commands;

use anyhow::{bail, Result};

/// Colours handed out to new staff, in order.
pub const PALETTE: [&str; 8] = [
    "#3B82F6", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#14B8A6", "#F97316",
];

/// Used once every palette colour is taken.
pub const FALLBACK_COLOR: &str = "#6B7280";

/// First palette colour not in `used`, compared case-insensitively.
pub fn next_available_color<'a, I>(used: I) -> &'static str
where
    I: IntoIterator<Item = &'a str>,
{
    let used: Vec<String> = used.into_iter().map(|c| c.to_ascii_uppercase()).collect();
    PALETTE
        .iter()
        .copied()
        .find(|color| !used.iter().any(|u| u == color))
        .unwrap_or(FALLBACK_COLOR)
}

/// Accept `#RRGGBB` (or `RRGGBB`) and return it upper-cased with the hash.
pub fn normalize_color(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("Invalid theme color '{input}', expected #RRGGBB");
    }
    Ok(format!("#{}", hex.to_ascii_uppercase()))
}

pub fn normalize_name(input: &str) -> Result<String> {
    let name = input.trim();
    if name.is_empty() {
        bail!("Staff name cannot be empty");
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_is_handed_out_in_order() {
        assert_eq!(next_available_color(Vec::<&str>::new()), "#3B82F6");
        assert_eq!(next_available_color(["#3b82f6"]), "#10B981");
        assert_eq!(next_available_color(["#10B981", "#FFFFFF"]), "#3B82F6");
    }

    #[test]
    fn exhausted_palette_falls_back_to_gray() {
        assert_eq!(next_available_color(PALETTE), FALLBACK_COLOR);
    }

    #[test]
    fn colors_are_normalized() {
        assert_eq!(normalize_color("#3b82f6").unwrap(), "#3B82F6");
        assert_eq!(normalize_color(" 10b981 ").unwrap(), "#10B981");
        assert!(normalize_color("#12345").is_err());
        assert!(normalize_color("#GGGGGG").is_err());
        assert!(normalize_color("blue").is_err());
    }

    #[test]
    fn names_are_trimmed_and_required() {
        assert_eq!(normalize_name("  Aiko ").unwrap(), "Aiko");
        assert!(normalize_name("   ").is_err());
    }
}
