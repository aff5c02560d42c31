//! Drawing a [`DocumentLayout`] into PDF bytes with printpdf.

use std::io::Cursor;

use printpdf::{
    Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Polygon, Rgb,
    image_crate::{DynamicImage, GenericImageView},
    path::{PaintMode, WindingOrder},
};
use crate::{
    error::{AddContext, Error},
    layout::{Block, DocumentLayout, PAGE_HEIGHT, PAGE_WIDTH, Shade, Tone},
    metrics::{Typeface, Weight},
};

const LOGO_DPI: f32 = 300.0;
const MM_PER_INCH: f32 = 25.4;
const RULE_THICKNESS: f32 = 0.5;

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Ink => rgb(0.12, 0.12, 0.12),
        Tone::Muted => rgb(0.42, 0.42, 0.42),
        Tone::Brand => rgb(0.70, 0.31, 0.45),
    }
}

fn shade_color(shade: Shade) -> Color {
    match shade {
        Shade::Header => rgb(0.95, 0.89, 0.92),
        Shade::Stripe => rgb(0.97, 0.97, 0.97),
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

fn embed(
    doc: &PdfDocumentReference,
    typeface: &Typeface,
    weight: Weight,
) -> Result<IndirectFontRef, Error> {
    doc.add_external_font(Cursor::new(typeface.font_data(weight)))
        .map_err(|e| Error::render(e.to_string()))
}

impl Fonts {
    /// Embed the typeface, once when a single face serves both weights
    fn load(doc: &PdfDocumentReference, typeface: &Typeface) -> Result<Fonts, Error> {
        let regular = embed(doc, typeface, Weight::Regular).add_context("embedding regular font")?;
        let bold = if typeface.single_face() {
            regular.clone()
        } else {
            embed(doc, typeface, Weight::Bold).add_context("embedding bold font")?
        };
        Ok(Fonts { regular, bold })
    }

    fn get(&self, weight: Weight) -> &IndirectFontRef {
        match weight {
            Weight::Regular => &self.regular,
            Weight::Bold => &self.bold,
        }
    }
}

fn draw_logo(layer: &PdfLayerReference, image: &DynamicImage, x: f32, y: f32, width: f32, height: f32) {
    let (width_px, height_px) = image.dimensions();
    if width_px == 0 || height_px == 0 {
        return;
    }
    // images are drawn at their pixel size for the given dpi, scale that to the target box
    let natural_width = width_px as f32 / LOGO_DPI * MM_PER_INCH;
    let natural_height = height_px as f32 / LOGO_DPI * MM_PER_INCH;
    let flattened = DynamicImage::ImageRgb8(image.to_rgb8());
    Image::from_dynamic_image(&flattened).add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(Mm(x)),
            translate_y: Some(Mm(y)),
            scale_x: Some(width / natural_width),
            scale_y: Some(height / natural_height),
            dpi: Some(LOGO_DPI),
            ..Default::default()
        },
    );
}

fn draw_block(layer: &PdfLayerReference, fonts: &Fonts, logo: Option<&DynamicImage>, block: &Block) {
    match block {
        Block::Text {
            x,
            y,
            size,
            weight,
            tone,
            text,
        } => {
            layer.set_fill_color(tone_color(*tone));
            layer.use_text(text, *size, Mm(*x), Mm(*y), fonts.get(*weight));
        }
        Block::Line { x1, y1, x2, y2 } => {
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(*x1), Mm(*y1)), false),
                    (Point::new(Mm(*x2), Mm(*y2)), false),
                ],
                is_closed: false,
            });
        }
        Block::Rect {
            x,
            y,
            width,
            height,
            shade,
        } => {
            layer.set_fill_color(shade_color(*shade));
            layer.add_polygon(Polygon {
                rings: vec![vec![
                    (Point::new(Mm(*x), Mm(*y)), false),
                    (Point::new(Mm(x + width), Mm(*y)), false),
                    (Point::new(Mm(x + width), Mm(y + height)), false),
                    (Point::new(Mm(*x), Mm(y + height)), false),
                ]],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            });
        }
        Block::Logo {
            x,
            y,
            width,
            height,
        } => {
            if let Some(image) = logo {
                draw_logo(layer, image, *x, *y, *width, *height);
            }
        }
    }
}

/// Draw every page of `layout` and serialize the document.
///
/// # Arguments
/// * `layout` - Pages of positioned blocks
/// * `title` - Document title stored in the PDF metadata
/// * `typeface` - Faces embedded for the regular and bold text
/// * `logo` - Image drawn into [`Block::Logo`] areas. Those areas stay empty when absent
///
/// # Errors
/// [`crate::Error`] with a render kind if printpdf fails to embed a font or serialize the
/// document
pub fn draw(
    layout: &DocumentLayout,
    title: &str,
    typeface: &Typeface,
    logo: Option<&DynamicImage>,
) -> Result<Vec<u8>, Error> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "invoice");
    let fonts = Fonts::load(&doc, typeface).add_context("drawing pdf")?;

    for (index, page) in layout.pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "invoice")
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);
        layer.set_outline_color(rgb(0.80, 0.80, 0.80));
        layer.set_outline_thickness(RULE_THICKNESS);

        // fills first so text stays on top of shaded rows
        for block in page.blocks.iter().filter(|b| matches!(b, Block::Rect { .. })) {
            draw_block(&layer, &fonts, logo, block);
        }
        for block in page.blocks.iter().filter(|b| !matches!(b, Block::Rect { .. })) {
            draw_block(&layer, &fonts, logo, block);
        }
    }

    doc.save_to_bytes()
        .map_err(|e| Error::render(e.to_string()))
        .add_context("serializing pdf")
}
