//! The typeface the drawn layouts are set in, and text measurement against it.
//!
//! Widths are the glyph advances from the font's own `hmtx` table, the same numbers the PDF
//! viewer uses to place the glyphs, so wrapped lines end where the drawn text ends.

use std::sync::Arc;

use owned_ttf_parser::{AsFaceRef, Face, OwnedFace};
use tracing::warn;

use crate::error::Error;

/// Millimetres per PDF point
pub const PT_TO_MM: f32 = 0.352_778;

const DEJAVU_SANS: &[u8] = include_bytes!("../fonts/DejaVuSans.ttf");
const DEJAVU_SANS_BOLD: &[u8] = include_bytes!("../fonts/DejaVuSans-Bold.ttf");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

fn parse(bytes: &[u8]) -> Result<Arc<OwnedFace>, Error> {
    OwnedFace::from_vec(bytes.to_vec(), 0)
        .map(Arc::new)
        .map_err(|e| Error::render(format!("unreadable font: {e}")))
}

/// A regular and a bold face, both with full Unicode coverage for Lithuanian text
#[derive(Debug, Clone)]
pub struct Typeface {
    regular: Arc<OwnedFace>,
    bold: Arc<OwnedFace>,
}

impl Typeface {
    /// DejaVu Sans and DejaVu Sans Bold, compiled into the binary
    pub fn bundled() -> Result<Typeface, Error> {
        Ok(Typeface {
            regular: parse(DEJAVU_SANS)?,
            bold: parse(DEJAVU_SANS_BOLD)?,
        })
    }

    /// Use `custom` for both weights when it parses as a TrueType/OpenType font, otherwise the
    /// bundled faces.
    pub fn with_override(custom: Option<&[u8]>) -> Result<Typeface, Error> {
        if let Some(bytes) = custom {
            match parse(bytes) {
                Ok(face) => {
                    return Ok(Typeface {
                        regular: face.clone(),
                        bold: face,
                    });
                }
                Err(e) => warn!(error = %e, "configured font rejected, using DejaVu Sans"),
            }
        }
        Typeface::bundled()
    }

    fn owned(&self, weight: Weight) -> &OwnedFace {
        match weight {
            Weight::Regular => &*self.regular,
            Weight::Bold => &*self.bold,
        }
    }

    pub(crate) fn face(&self, weight: Weight) -> &Face<'_> {
        self.owned(weight).as_face_ref()
    }

    /// Raw font file of `weight`, for embedding
    pub(crate) fn font_data(&self, weight: Weight) -> &[u8] {
        self.owned(weight).as_slice()
    }

    /// `true` when one face serves both weights
    pub(crate) fn single_face(&self) -> bool {
        Arc::ptr_eq(&self.regular, &self.bold)
    }

    /// Width of `text` in millimetres at `size` points. Characters the face has no glyph for
    /// are not drawn and take no space.
    pub fn width(&self, text: &str, size: f32, weight: Weight) -> f32 {
        let face = self.face(weight);
        let units: u32 = text
            .chars()
            .filter_map(|c| face.glyph_index(c))
            .filter_map(|glyph| face.glyph_hor_advance(glyph))
            .map(u32::from)
            .sum();
        units as f32 / f32::from(face.units_per_em()) * size * PT_TO_MM
    }

    /// Greedy word wrap of `text` into lines no wider than `max_width` millimetres.
    ///
    /// Explicit newlines are kept as line breaks. A single word wider than `max_width` is broken
    /// between characters. Always returns at least one (possibly empty) line.
    pub fn wrap(&self, text: &str, size: f32, weight: Weight, max_width: f32) -> Vec<String> {
        let fits = |s: &str| self.width(s, size, weight) <= max_width;
        let mut lines = Vec::new();

        for paragraph in text.lines() {
            let mut current = String::new();
            for word in paragraph.split_whitespace() {
                let candidate = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{current} {word}")
                };
                if fits(&candidate) {
                    current = candidate;
                    continue;
                }
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                if fits(word) {
                    current = word.to_string();
                    continue;
                }
                for c in word.chars() {
                    current.push(c);
                    if !fits(&current) && current.chars().count() > 1 {
                        current.pop();
                        lines.push(std::mem::take(&mut current));
                        current.push(c);
                    }
                }
            }
            lines.push(current);
        }

        if lines.is_empty() {
            lines.push(String::new());
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typeface() -> Typeface {
        Typeface::bundled().unwrap()
    }

    #[test]
    fn width_scales_with_size() {
        let t = typeface();
        let small = t.width("Kremas", 10.0, Weight::Regular);
        let large = t.width("Kremas", 20.0, Weight::Regular);
        assert!((large - 2.0 * small).abs() < 1e-4);
    }

    #[test]
    fn width_comes_from_the_font_tables() {
        let t = typeface();
        let face = t.face(Weight::Regular);
        let glyph = face.glyph_index('0').unwrap();
        let advance = f32::from(face.glyph_hor_advance(glyph).unwrap());
        let expected = advance / f32::from(face.units_per_em()) * 10.0 * PT_TO_MM;
        assert!((t.width("0", 10.0, Weight::Regular) - expected).abs() < 1e-4);
        assert!((t.width("000", 10.0, Weight::Regular) - 3.0 * expected).abs() < 1e-3);
        assert!(t.width("W", 10.0, Weight::Regular) > t.width("i", 10.0, Weight::Regular));
    }

    #[test]
    fn lithuanian_letters_have_glyphs() {
        let t = typeface();
        for weight in [Weight::Regular, Weight::Bold] {
            let face = t.face(weight);
            for c in "ąčęėįšųūžĄČĘĖĮŠŲŪŽ€•–".chars() {
                assert!(face.glyph_index(c).is_some(), "no glyph for {c}");
            }
        }
    }

    #[test]
    fn bold_is_a_separate_wider_face() {
        let t = typeface();
        assert!(!t.single_face());
        let regular = t.width("Suma su PVM", 10.0, Weight::Regular);
        assert!(t.width("Suma su PVM", 10.0, Weight::Bold) > regular);
    }

    #[test]
    fn override_serves_both_weights() {
        let t = Typeface::with_override(Some(DEJAVU_SANS_BOLD)).unwrap();
        assert!(t.single_face());
        assert_eq!(t.font_data(Weight::Regular), DEJAVU_SANS_BOLD);
        assert_eq!(
            t.width("Pirkėjas", 10.0, Weight::Regular),
            t.width("Pirkėjas", 10.0, Weight::Bold)
        );
    }

    #[test]
    fn unreadable_override_falls_back_to_bundled() {
        let t = Typeface::with_override(Some(&b"not a font at all"[..])).unwrap();
        assert!(!t.single_face());
        assert_eq!(t.font_data(Weight::Regular), DEJAVU_SANS);
    }

    #[test]
    fn short_text_stays_on_one_line() {
        let lines = typeface().wrap("Kremas", 10.0, Weight::Regular, 50.0);
        assert_eq!(lines, vec!["Kremas".to_string()]);
    }

    #[test]
    fn long_text_wraps_at_words() {
        let t = typeface();
        let text = "Drėkinamasis veido kremas su hialurono rūgštimi ir vitaminu E 50 ml";
        let lines = t.wrap(text, 10.0, Weight::Regular, 40.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(t.width(line, 10.0, Weight::Regular) <= 40.0);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn overlong_word_is_broken() {
        let t = typeface();
        let word = "W".repeat(40);
        let lines = t.wrap(&word, 10.0, Weight::Bold, 30.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        for line in &lines {
            assert!(t.width(line, 10.0, Weight::Bold) <= 30.0);
        }
    }

    #[test]
    fn newlines_are_kept() {
        let lines = typeface().wrap("a\nb", 10.0, Weight::Regular, 100.0);
        assert_eq!(lines, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn empty_text_yields_one_empty_line() {
        let lines = typeface().wrap("", 10.0, Weight::Regular, 100.0);
        assert_eq!(lines, vec![String::new()]);
    }
}
