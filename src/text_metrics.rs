use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Average advance, as a fraction of the font size, used when no font is available
/// or a glyph is missing.
pub const FALLBACK_ADVANCE: f32 = 0.56;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f32 = 1.2;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

/// Width of `text` in points when set at `size_pt` in `font_family`.
pub fn measure_text_width(text: &str, size_pt: f32, font_family: &str) -> f32 {
    if text.is_empty() || size_pt <= 0.0 {
        return 0.0;
    }
    let measured = TEXT_MEASURER
        .lock()
        .ok()
        .and_then(|mut guard| guard.measure(text, size_pt, font_family));
    measured.unwrap_or_else(|| fallback_width(text, size_pt))
}

fn fallback_width(text: &str, size_pt: f32) -> f32 {
    text.chars().filter(|c| *c != '\n').count() as f32 * size_pt * FALLBACK_ADVANCE
}

/// Greedy word wrap to `max_width_pt`. Explicit newlines always break; a word wider
/// than the line is split by characters.
pub fn wrap_text(text: &str, size_pt: f32, font_family: &str, max_width_pt: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        if max_width_pt <= 0.0 || measure_text_width(raw, size_pt, font_family) <= max_width_pt {
            lines.push(raw.to_string());
            continue;
        }
        let mut current = String::new();
        for word in raw.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure_text_width(&candidate, size_pt, font_family) <= max_width_pt {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure_text_width(word, size_pt, font_family) <= max_width_pt {
                current = word.to_string();
            } else {
                for ch in word.chars() {
                    current.push(ch);
                    if measure_text_width(&current, size_pt, font_family) > max_width_pt
                        && current.chars().count() > 1
                    {
                        current.pop();
                        lines.push(std::mem::take(&mut current));
                        current.push(ch);
                    }
                }
            }
        }
        lines.push(current);
    }
    lines
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontFace>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, size_pt: f32, font_family: &str) -> Option<f32> {
        let key = normalize_family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = self.load_face(&key);
            if face.is_none() {
                tracing::debug!(family = %key, "no system font matched; using average advance");
            }
            self.faces.insert(key.clone(), face);
        }
        let face = self.faces.get_mut(&key)?.as_mut()?;
        Some(face.measure_width(&text.replace('\t', "    "), size_pt))
    }

    fn load_face(&mut self, font_family: &str) -> Option<FontFace> {
        let names: Vec<&str> = font_family
            .split(',')
            .map(|part| part.trim().trim_matches('"').trim_matches('\''))
            .filter(|part| !part.is_empty())
            .collect();
        let mut families: Vec<Family<'_>> = names
            .iter()
            .map(|name| match name.to_ascii_lowercase().as_str() {
                "serif" => Family::Serif,
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => Family::SansSerif,
                "monospace" | "ui-monospace" => Family::Monospace,
                _ => Family::Name(name),
            })
            .collect();
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        self.db
            .with_face_data(id, |data, index| FontFace::parse(data.to_vec(), index))
            .flatten()
    }
}

/// Owned font bytes plus an ASCII advance table; other glyphs are looked up on demand.
struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
    advances: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
            advances: HashMap::new(),
        })
    }

    fn advance(&mut self, ch: char) -> Option<u16> {
        if ch.is_ascii() {
            return Some(self.ascii_advances[ch as usize]).filter(|a| *a > 0);
        }
        if let Some(cached) = self.advances.get(&ch) {
            return *cached;
        }
        let advance = Face::parse(&self.data, self.index).ok().and_then(|face| {
            face.glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
        });
        self.advances.insert(ch, advance);
        advance
    }

    fn measure_width(&mut self, text: &str, size_pt: f32) -> f32 {
        let scale = size_pt / self.units_per_em as f32;
        let fallback = size_pt * FALLBACK_ADVANCE;
        text.chars()
            .filter(|c| *c != '\n')
            .map(|ch| match self.advance(ch) {
                Some(advance) => advance as f32 * scale,
                None => fallback,
            })
            .sum::<f32>()
            .max(0.0)
    }
}

fn normalize_family_key(font_family: &str) -> String {
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

    const FAMILY: &str = "sans-serif";

    #[test]
    fn empty_text_has_no_width() {
        assert_eq!(measure_text_width("", 12.0, FAMILY), 0.0);
        assert_eq!(measure_text_width("abc", 0.0, FAMILY), 0.0);
    }

    #[test]
    fn width_grows_with_text_and_size() {
        let short = measure_text_width("abc", 12.0, FAMILY);
        let long = measure_text_width("abcabc", 12.0, FAMILY);
        let big = measure_text_width("abc", 24.0, FAMILY);
        assert!(short > 0.0);
        assert!(long > short);
        assert!(big > short);
    }

    #[test]
    fn wrap_respects_explicit_newlines() {
        let lines = wrap_text("one\ntwo", 12.0, FAMILY, 10_000.0);
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn wrapped_lines_fit_or_are_single_characters() {
        let text = "The quick brown fox jumps over the lazy dog again and again";
        let max = measure_text_width("The quick brown", 12.0, FAMILY);
        let lines = wrap_text(text, 12.0, FAMILY, max);
        assert!(lines.len() > 1);
        for line in &lines {
            let width = measure_text_width(line, 12.0, FAMILY);
            assert!(width <= max || line.chars().count() == 1, "{line:?} too wide");
        }
        let rejoined = lines.join(" ");
        assert_eq!(rejoined.split_whitespace().collect::<Vec<_>>().join(" "), text);
    }
}
