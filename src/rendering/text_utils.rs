//! Text measurement and truncation for table cells.

use eframe::egui;

const ELLIPSIS: &str = "..";

/// Horizontal padding inside a cell, both sides together.
pub const CELL_PADDING: f32 = 8.0;

/// Truncates `text` to fit `available_width` in the given font, ending with
/// ".." when shortened.
pub fn truncate_text_to_fit(
    text: &str,
    available_width: f32,
    font_id: &egui::FontId,
    painter: &egui::Painter,
) -> String {
    truncate_with(text, available_width - CELL_PADDING, |candidate| {
        painter
            .layout_no_wrap(candidate.to_string(), font_id.clone(), egui::Color32::WHITE)
            .size()
            .x
    })
}

/// Longest prefix of `text` (plus ellipsis) whose measured width fits.
pub fn truncate_with(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> String {
    if max_width <= 0.0 {
        return String::new();
    }
    if measure(text) <= max_width {
        return text.to_string();
    }
    let room = max_width - measure(ELLIPSIS);
    if room <= 0.0 {
        return String::new();
    }

    // Binary search over char counts; widths grow monotonically with length.
    let (mut low, mut high) = (0usize, text.chars().count());
    while low < high {
        let mid = (low + high).div_ceil(2);
        if measure(prefix(text, mid)) <= room {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    format!("{}{}", prefix(text, low), ELLIPSIS)
}

/// The first `chars` characters of `text`.
fn prefix(text: &str, chars: usize) -> &str {
    let end = text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i);
    &text[..end]
}
