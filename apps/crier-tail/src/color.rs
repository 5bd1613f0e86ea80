use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A table color class understood by the page stylesheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(&'static str);

impl Color {
    pub const fn new(class: &'static str) -> Self {
        Self(class)
    }

    pub fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

pub const DEFAULT_PALETTE: &[Color] = &[
    Color::new("red"),
    Color::new("orange"),
    Color::new("yellow"),
    Color::new("olive"),
    Color::new("green"),
    Color::new("teal"),
    Color::new("blue"),
    Color::new("violet"),
    Color::new("purple"),
    Color::new("pink"),
    Color::new("brown"),
    Color::new("grey"),
    Color::new("black"),
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaletteError {
    #[error("color palette must contain at least one color")]
    Empty,
}

/// Hands out palette colors to hosts in first-seen order.
///
/// Assignments are never evicted. Once every slot is taken the cursor wraps
/// and later hosts share colors with earlier ones.
#[derive(Debug, Clone)]
pub struct ColorAssigner {
    palette: &'static [Color],
    next_slot: usize,
    assigned: HashMap<String, Color>,
}

impl Default for ColorAssigner {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE,
            next_slot: 0,
            assigned: HashMap::new(),
        }
    }
}

impl ColorAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_palette(palette: &'static [Color]) -> Result<Self, PaletteError> {
        if palette.is_empty() {
            return Err(PaletteError::Empty);
        }
        Ok(Self {
            palette,
            ..Self::default()
        })
    }

    pub fn color_for(&mut self, host: &str) -> Color {
        if let Some(color) = self.assigned.get(host) {
            return *color;
        }
        let color = self.palette[self.next_slot];
        self.next_slot = (self.next_slot + 1) % self.palette.len();
        self.assigned.insert(host.to_owned(), color);
        color
    }

    pub fn hosts_seen(&self) -> usize {
        self.assigned.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &[Color] = &[Color::new("red"), Color::new("blue")];

    #[test]
    fn repeated_lookups_are_stable() {
        let mut colors = ColorAssigner::new();
        let first = colors.color_for("web-1");
        colors.color_for("db-1");
        assert_eq!(colors.color_for("web-1"), first);
        assert_eq!(colors.hosts_seen(), 2);
    }

    #[test]
    fn nth_host_gets_nth_slot_modulo_palette() {
        let mut colors = ColorAssigner::with_palette(TINY).expect("palette");
        assert_eq!(colors.color_for("a").as_str(), "red");
        assert_eq!(colors.color_for("b").as_str(), "blue");
        assert_eq!(colors.color_for("c").as_str(), "red");
        assert_eq!(colors.color_for("a").as_str(), "red");
        assert_eq!(colors.color_for("d").as_str(), "blue");
    }

    #[test]
    fn default_palette_is_walked_in_order() {
        let mut colors = ColorAssigner::new();
        for (n, expected) in DEFAULT_PALETTE.iter().enumerate() {
            assert_eq!(colors.color_for(&format!("host-{n}")), *expected);
        }
        assert_eq!(colors.color_for("one-more"), DEFAULT_PALETTE[0]);
    }

    #[test]
    fn empty_palette_is_rejected() {
        assert_eq!(
            ColorAssigner::with_palette(&[]).unwrap_err(),
            PaletteError::Empty
        );
    }
}
