use crate::config::Tolerances;
use crate::text_metrics;
use crate::theme::Theme;

/// Box size of a single-line label including its padding.
pub(crate) fn label_box_size(text: &str, theme: &Theme, tolerances: &Tolerances) -> (f32, f32) {
    let width = text_width(text, theme.font_size, &theme.font_family, theme.fast_text_metrics);
    let height = theme.font_size * theme.line_height.max(1.0);
    (
        width + 2.0 * tolerances.label_padding_x,
        height + 2.0 * tolerances.label_padding_y,
    )
}

/// Advance of `ch` relative to font size, by width class of a typical
/// sans-serif face. Labels are mostly tickers: capitals, digits, dots.
pub(crate) fn char_width_factor(ch: char) -> f32 {
    match ch {
        'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '|' | '!' | '\'' => 0.27,
        'f' | 't' | 'r' | ' ' | '(' | ')' | '[' | ']' | '-' | '_' | '/' => 0.34,
        'm' | 'w' | 'M' | 'W' | '@' | '%' => 0.9,
        'A'..='Z' => 0.67,
        '0'..='9' | '$' | '#' | '&' | '+' | '=' => 0.6,
        'a'..='z' => 0.56,
        '\u{1100}'..='\u{115F}'
        | '\u{2E80}'..='\u{A4CF}'
        | '\u{AC00}'..='\u{D7A3}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FF60}' => 1.0,
        _ => 0.58,
    }
}

pub(crate) fn text_width(text: &str, font_size: f32, font_family: &str, fast_metrics: bool) -> f32 {
    if fast_metrics {
        return fallback_text_width(text, font_size);
    }
    text_metrics::measure_text_width(text, font_size, font_family)
        .unwrap_or_else(|| fallback_text_width(text, font_size))
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}
