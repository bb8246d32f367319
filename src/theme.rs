use serde::{Deserialize, Serialize};

use crate::styled_buffer::{QuoteStyle, SeparatorStyle};

/// Colors are `0xRRGGBBAA`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub quote_color: u32,
    pub quote_stripe_width: u32,
    /// Gap between the stripe and the quoted text
    pub quote_gap: u32,

    pub separator_color: u32,
    pub separator_stroke_width: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            quote_color: 0xCCCCCCFF,    // Light gray quote bar
            quote_stripe_width: 4,      // Width of the quote bar
            quote_gap: 8,
            separator_color: 0x999999FF, // Mid gray rule
            separator_stroke_width: 1.0,
        }
    }
}

impl Theme {
    /// Quote parameters as stored on quote ranges
    pub fn quote_style(&self) -> QuoteStyle {
        QuoteStyle {
            color: self.quote_color,
            indent: self.quote_stripe_width + self.quote_gap,
            stripe_width: self.quote_stripe_width,
        }
    }

    pub fn separator_style(&self) -> SeparatorStyle {
        SeparatorStyle {
            color: self.separator_color,
            stroke_width: self.separator_stroke_width,
        }
    }
}

/// `0xRRGGBBAA` as a CSS `#rrggbb` color
pub fn css_color(color: u32) -> String {
    format!("#{:06x}", color >> 8)
}
