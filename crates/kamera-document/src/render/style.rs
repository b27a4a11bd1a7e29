// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report palette and page geometry.

use printpdf::Rgb;
use printpdf::color::Color;

/// An sRGB colour given as a `#rrggbb` literal's three bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hex(pub u8, pub u8, pub u8);

impl Hex {
    pub fn color(self) -> Color {
        Color::Rgb(Rgb::new(
            f32::from(self.0) / 255.0,
            f32::from(self.1) / 255.0,
            f32::from(self.2) / 255.0,
            None,
        ))
    }
}

pub const ACCENT: Hex = Hex(0xff, 0x6b, 0x35);
pub const ACCENT_LIGHT: Hex = Hex(0xff, 0x8c, 0x42);
pub const WHITE: Hex = Hex(0xff, 0xff, 0xff);
pub const BLACK: Hex = Hex(0x00, 0x00, 0x00);
pub const TEXT: Hex = Hex(0x21, 0x25, 0x29);
pub const TEXT_SECONDARY: Hex = Hex(0x49, 0x50, 0x57);
pub const MUTED: Hex = Hex(0x6c, 0x75, 0x7d);
pub const FOOTER: Hex = Hex(0x99, 0x99, 0x99);
pub const PANEL: Hex = Hex(0xf8, 0xf9, 0xfa);
pub const SECTION_PANEL: Hex = Hex(0xe9, 0xec, 0xef);
pub const BORDER: Hex = Hex(0xde, 0xe2, 0xe6);
pub const IMAGE_BORDER: Hex = Hex(0xce, 0xd4, 0xda);
pub const BADGE: Hex = Hex(0xff, 0xc1, 0x07);
pub const YES: Hex = Hex(0x28, 0xa7, 0x45);
pub const NO: Hex = Hex(0xdc, 0x35, 0x45);

/// Page size and the margins content is laid out against, in points with the
/// origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_top: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_bottom: f32,
    /// Where the cursor resumes after a page break.
    pub continuation_top: f32,
}

impl PageGeometry {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            margin_top: 70.0,
            margin_left: 50.0,
            margin_right: 50.0,
            margin_bottom: 50.0,
            continuation_top: 100.0,
        }
    }

    /// Width between the left and right margins.
    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Lowest offset content may reach before the bottom margin.
    pub fn max_y(&self) -> f32 {
        self.height - self.margin_bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a4_content_area() {
        let page = PageGeometry::new(595.28, 841.89);
        assert!((page.content_width() - 495.28).abs() < 0.001);
        assert!((page.max_y() - 791.89).abs() < 0.001);
    }

    #[test]
    fn hex_maps_to_unit_rgb() {
        assert_eq!(WHITE.color(), Color::Rgb(Rgb::new(1.0, 1.0, 1.0, None)));
        assert_eq!(BLACK.color(), Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
    }
}
