//! Label width measurement from installed system fonts.

use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static FONT_METRICS: Lazy<Mutex<FontMetrics>> = Lazy::new(|| Mutex::new(FontMetrics::new()));

/// Advance width of `text` in pixels, or `None` when no font in the family
/// stack could be loaded.
pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    if text.is_empty() || font_size <= 0.0 {
        return Some(0.0);
    }
    let mut guard = FONT_METRICS.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

struct FontMetrics {
    db: Database,
    system_fonts_loaded: bool,
    faces: HashMap<String, Option<AdvanceTable>>,
}

impl FontMetrics {
    fn new() -> Self {
        Self {
            db: Database::new(),
            system_fonts_loaded: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = family_key(font_family);
        if !self.faces.contains_key(&key) {
            let table = self.load(font_family);
            if table.is_none() {
                tracing::debug!(family = %key, "no font found, using width table");
            }
            self.faces.insert(key.clone(), table);
        }
        let table = self.faces.get_mut(&key)?.as_mut()?;
        Some(table.width(text, font_size))
    }

    fn load(&mut self, font_family: &str) -> Option<AdvanceTable> {
        let names: Vec<String> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\'').to_string())
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "monospace" | "ui-monospace" => Family::Monospace,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                _ => Family::Name(name.as_str()),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.system_fonts_loaded {
            self.db.load_system_fonts();
            self.system_fonts_loaded = true;
        }
        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| AdvanceTable::from_face_data(data, index))
            .flatten()
    }
}

/// Horizontal advances of one face, in font units.
struct AdvanceTable {
    data: Vec<u8>,
    index: u32,
    units_per_em: f32,
    ascii: [u16; 128],
    other: HashMap<char, Option<u16>>,
}

impl AdvanceTable {
    fn from_face_data(data: &[u8], index: u32) -> Option<Self> {
        let face = Face::parse(data, index).ok()?;
        let mut ascii = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Some(Self {
            data: data.to_vec(),
            index,
            units_per_em: face.units_per_em().max(1) as f32,
            ascii,
            other: HashMap::new(),
        })
    }

    fn width(&mut self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        let missing = font_size * 0.56;
        let mut width = 0.0f32;
        for ch in text.chars() {
            let advance = if ch.is_ascii() {
                Some(self.ascii[ch as usize]).filter(|a| *a > 0)
            } else {
                self.advance_of(ch)
            };
            width += match advance {
                Some(units) => units as f32 * scale,
                None => missing,
            };
        }
        width.max(0.0)
    }

    fn advance_of(&mut self, ch: char) -> Option<u16> {
        if let Some(cached) = self.other.get(&ch) {
            return *cached;
        }
        let advance = Face::parse(&self.data, self.index).ok().and_then(|face| {
            face.glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
        });
        self.other.insert(ch, advance);
        advance
    }
}

fn family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_zero_width() {
        assert_eq!(measure_text_width("", 12.0, "sans-serif"), Some(0.0));
        assert_eq!(measure_text_width("abc", 0.0, "sans-serif"), Some(0.0));
    }

    #[test]
    fn blank_family_falls_back_to_sans_serif_key() {
        assert_eq!(family_key("   "), "sans-serif");
        assert_eq!(family_key(" Inter "), "Inter");
    }
}
