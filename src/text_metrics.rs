//! Text measurement.
//!
//! The layout engine never measures text itself; it asks a [`TextMeasurer`].
//! Hosts with a live rendering surface (a browser canvas, a GUI toolkit)
//! implement the trait over their own metrics. Headless callers use
//! [`FontMetricsMeasurer`], which reads glyph advances from system fonts, and
//! tests use [`FixedWidthMeasurer`] for exact, font-independent numbers.

use crate::config::LayoutConfig;
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static FONT_CACHE: Lazy<Mutex<FontCache>> = Lazy::new(|| Mutex::new(FontCache::new()));

const AVERAGE_SAMPLE: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

pub trait TextMeasurer {
    /// Advance width of a single line of text, in pixels.
    fn text_width(&self, text: &str, font_size: f32) -> f32;

    fn average_char_width(&self, font_size: f32) -> f32 {
        let count = AVERAGE_SAMPLE.chars().count() as f32;
        self.text_width(AVERAGE_SAMPLE, font_size) / count
    }
}

/// Measures with real font metrics, falling back to a calibrated
/// per-character table when no usable font is installed.
#[derive(Debug, Clone)]
pub struct FontMetricsMeasurer {
    pub font_family: String,
    /// Skip font lookup for ASCII text and use the calibrated table.
    pub fast: bool,
}

impl FontMetricsMeasurer {
    pub fn new(font_family: &str) -> Self {
        Self {
            font_family: font_family.to_string(),
            fast: false,
        }
    }

    pub fn fast(font_family: &str) -> Self {
        Self {
            font_family: font_family.to_string(),
            fast: true,
        }
    }

    pub fn for_config(config: &LayoutConfig) -> Self {
        Self {
            font_family: config.font_family.clone(),
            fast: config.fast_text_metrics,
        }
    }
}

impl TextMeasurer for FontMetricsMeasurer {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        if text.is_empty() || font_size <= 0.0 {
            return 0.0;
        }
        if self.fast && text.is_ascii() {
            return fallback_text_width(text, font_size);
        }
        let measured = FONT_CACHE
            .lock()
            .ok()
            .and_then(|mut cache| cache.measure(text, font_size, &self.font_family));
        measured.unwrap_or_else(|| fallback_text_width(text, font_size))
    }
}

/// Every character advances by `char_width` em.
#[derive(Debug, Clone, Copy)]
pub struct FixedWidthMeasurer {
    pub char_width: f32,
}

impl Default for FixedWidthMeasurer {
    fn default() -> Self {
        Self { char_width: 0.5 }
    }
}

impl TextMeasurer for FixedWidthMeasurer {
    fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().filter(|ch| *ch != '\n').count() as f32 * self.char_width * font_size
    }
}

pub(crate) fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

fn char_width_factor(ch: char) -> f32 {
    // Widths in em, measured from a Trebuchet/Verdana-like sans stack.
    match ch {
        ' ' => 0.306,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'I' | 'i' | 'j' | 'l' => 0.26,
        'f' | 't' | 'r' => 0.34,
        'M' | 'W' | 'm' | 'w' => 0.86,
        'A'..='Z' => 0.66,
        'a'..='z' => 0.56,
        '0'..='9' => 0.6,
        '@' | '#' | '%' | '&' => 0.946,
        '\n' => 0.0,
        _ => 0.568,
    }
}

struct FontCache {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<String, Option<FontFace>>,
}

impl FontCache {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            faces: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = normalize_family_key(font_family);
        if !self.faces.contains_key(&key) {
            let face = self.load_face(font_family);
            if face.is_none() {
                tracing::debug!(family = %key, "no usable font face, using fallback widths");
            }
            self.faces.insert(key.clone(), face);
        }
        let face = self.faces.get_mut(&key)?.as_mut()?;
        let normalized = text.replace('\t', "    ");
        Some(face.measure_width(&normalized, font_size))
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
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    Family::SansSerif
                }
                "monospace" | "ui-monospace" => Family::Monospace,
                "cursive" => Family::Cursive,
                "fantasy" => Family::Fantasy,
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

    fn measure_width(&mut self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;

        let missing: Vec<char> = text
            .chars()
            .filter(|ch| !ch.is_ascii() && !self.advances.contains_key(ch))
            .collect();
        if !missing.is_empty() {
            let face = Face::parse(&self.data, self.index).ok();
            for ch in missing {
                let advance = face.as_ref().and_then(|face| {
                    face.glyph_index(ch)
                        .and_then(|glyph| face.glyph_hor_advance(glyph))
                });
                self.advances.insert(ch, advance);
            }
        }

        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = if ch.is_ascii() {
                Some(self.ascii_advances[ch as usize]).filter(|advance| *advance > 0)
            } else {
                self.advances.get(&ch).copied().flatten()
            };
            width += match advance {
                Some(advance) => advance as f32 * scale,
                None => fallback,
            };
        }
        width.max(0.0)
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

    #[test]
    fn fixed_width_counts_characters() {
        let measurer = FixedWidthMeasurer { char_width: 0.5 };
        assert_eq!(measurer.text_width("abcd", 10.0), 20.0);
        assert_eq!(measurer.text_width("", 10.0), 0.0);
        assert_eq!(measurer.average_char_width(10.0), 5.0);
    }

    #[test]
    fn fallback_width_scales_with_font_size() {
        let w16 = fallback_text_width("Hello", 16.0);
        let w32 = fallback_text_width("Hello", 32.0);
        assert!((w32 - w16 * 2.0).abs() < 0.01);
    }

    #[test]
    fn fallback_factors_are_positive_for_printable_chars() {
        for ch in ['a', 'Z', ' ', '0', '@', '\u{4e2d}'] {
            assert!(char_width_factor(ch) > 0.0, "char {:?} has zero width", ch);
        }
    }

    #[test]
    fn fast_measurer_skips_font_lookup_for_ascii() {
        let measurer = FontMetricsMeasurer::fast("sans-serif");
        let width = measurer.text_width("Hello", 16.0);
        assert_eq!(width, fallback_text_width("Hello", 16.0));
    }

    #[test]
    fn font_measurer_never_returns_zero_for_text() {
        let measurer = FontMetricsMeasurer::new("sans-serif");
        assert!(measurer.text_width("Hello world", 14.0) > 0.0);
        assert_eq!(measurer.text_width("", 14.0), 0.0);
    }

    #[test]
    fn family_key_defaults_to_sans_serif() {
        assert_eq!(normalize_family_key("   "), "sans-serif");
        assert_eq!(normalize_family_key(" Inter "), "Inter");
    }
}
