//! Page layout of the drawn invoice variants.
//!
//! An [`Invoice`] is turned into pages of positioned [`Block`]s that the PDF collaborator draws
//! verbatim. All coordinates are millimetres on an A4 page with the origin in the lower left
//! corner, text `y` being the baseline. Keeping layout separate from drawing lets the geometry be
//! checked without parsing PDF output.

use std::ops::Range;

use crate::{
    invoice::{Invoice, VAT_PERCENT},
    metrics::{PT_TO_MM, Typeface, Weight},
    money::format_eur,
};

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN: f32 = 15.0;
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const LINE_SPACING: f32 = 1.25;
const CELL_PADDING: f32 = 2.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 9.5;
const TITLE_SIZE: f32 = 18.0;
const GROSS_SIZE: f32 = 12.0;
const SECTION_GAP: f32 = 6.0;
const LOGO_WIDTH: f32 = 32.0;
const TOTALS_VALUE_WIDTH: f32 = 32.0;

pub const TITLE: &str = "PVM sąskaita faktūra";

/// Height of one line of text at `size` points
pub fn line_height(size: f32) -> f32 {
    size * LINE_SPACING * PT_TO_MM
}

/// Height of a table row band holding `lines` lines
fn row_height(lines: usize) -> f32 {
    lines as f32 * line_height(TABLE_SIZE) + 2.0 * CELL_PADDING
}

/// Distance from the top of a line box to its baseline
fn ascent(size: f32) -> f32 {
    size * PT_TO_MM
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Ink,
    Muted,
    Brand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shade {
    /// Table header background
    Header,
    /// Every other table row
    Stripe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Text {
        x: f32,
        y: f32,
        size: f32,
        weight: Weight,
        tone: Tone,
        text: String,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        shade: Shade,
    },
    /// Where the logo goes, lower left corner and size
    Logo {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentLayout {
    pub pages: Vec<Page>,
}

impl DocumentLayout {
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.pages.iter().flat_map(|p| p.blocks.iter())
    }

    /// All text runs in drawing order
    pub fn texts(&self) -> Vec<&str> {
        self.blocks()
            .filter_map(|b| match b {
                Block::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// A product table column and its share of the content width
#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub title: &'static str,
    pub share: f32,
    pub align: Align,
}

pub const COLUMNS: [Column; 5] = [
    Column {
        title: "Prekė",
        share: 0.40,
        align: Align::Left,
    },
    Column {
        title: "Kiekis",
        share: 0.10,
        align: Align::Right,
    },
    Column {
        title: "Kaina be PVM",
        share: 0.17,
        align: Align::Right,
    },
    Column {
        title: "PVM",
        share: 0.15,
        align: Align::Right,
    },
    Column {
        title: "Suma su PVM",
        share: 0.18,
        align: Align::Right,
    },
];

/// Left edges of every column followed by the right edge of the last one
pub fn column_edges() -> [f32; COLUMNS.len() + 1] {
    let mut edges = [MARGIN; COLUMNS.len() + 1];
    for (i, column) in COLUMNS.iter().enumerate() {
        edges[i + 1] = edges[i] + column.share * CONTENT_WIDTH;
    }
    edges
}

/// Logo dimensions in pixels, used to keep its aspect ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoSize {
    pub width_px: u32,
    pub height_px: u32,
}

/// Places blocks top to bottom, starting new pages as needed
struct Composer<'a> {
    typeface: &'a Typeface,
    pages: Vec<Page>,
    blocks: Vec<Block>,
    /// Top of the next free line
    y: f32,
}

impl<'a> Composer<'a> {
    fn new(typeface: &'a Typeface) -> Self {
        Self {
            typeface,
            pages: Vec::new(),
            blocks: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn page_break(&mut self) {
        let blocks = std::mem::take(&mut self.blocks);
        self.pages.push(Page { blocks });
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Make room for `height` millimetres, starting a new page if needed
    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.blocks.is_empty() {
            self.page_break();
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn aligned_x(&self, text: &str, size: f32, weight: Weight, left: f32, right: f32, align: Align) -> f32 {
        let width = self.typeface.width(text, size, weight);
        match align {
            Align::Left => left,
            Align::Right => right - width,
            Align::Center => left + (right - left - width) / 2.0,
        }
    }

    fn text_at(&mut self, x: f32, y: f32, size: f32, weight: Weight, tone: Tone, text: &str) {
        self.blocks.push(Block::Text {
            x,
            y,
            size,
            weight,
            tone,
            text: text.to_string(),
        });
    }

    /// Wrapped paragraph across the full content width
    fn paragraph(&mut self, text: &str, size: f32, weight: Weight, tone: Tone, align: Align) {
        for line in self.typeface.wrap(text, size, weight, CONTENT_WIDTH) {
            let height = line_height(size);
            self.ensure(height);
            let x = self.aligned_x(&line, size, weight, MARGIN, MARGIN + CONTENT_WIDTH, align);
            let baseline = self.y - ascent(size);
            self.text_at(x, baseline, size, weight, tone, &line);
            self.y -= height;
        }
    }

    fn rule(&mut self, x1: f32, x2: f32) {
        self.blocks.push(Block::Line {
            x1,
            y1: self.y,
            x2,
            y2: self.y,
        });
    }

    fn logo(&mut self, size: LogoSize) {
        if size.width_px == 0 || size.height_px == 0 {
            return;
        }
        let height = LOGO_WIDTH * size.height_px as f32 / size.width_px as f32;
        self.ensure(height);
        self.blocks.push(Block::Logo {
            x: MARGIN,
            y: self.y - height,
            width: LOGO_WIDTH,
            height,
        });
        self.y -= height + SECTION_GAP / 2.0;
    }

    /// Two side-by-side columns of lines, the first line of each in bold
    fn party_columns(&mut self, left: &[String], right: &[String]) {
        let half = CONTENT_WIDTH / 2.0;
        let lh = line_height(BODY_SIZE);
        let wrap_column = |lines: &[String]| -> Vec<(String, Weight)> {
            lines
                .iter()
                .enumerate()
                .flat_map(|(i, l)| {
                    let weight = if i < 2 { Weight::Bold } else { Weight::Regular };
                    self.typeface
                        .wrap(l, BODY_SIZE, weight, half - CELL_PADDING * 2.0)
                        .into_iter()
                        .map(move |w| (w, weight))
                })
                .collect()
        };
        let left = wrap_column(left);
        let right = wrap_column(right);
        let right_x = MARGIN + half + CELL_PADDING;
        for row in 0..left.len().max(right.len()) {
            self.ensure(lh);
            let baseline = self.y - ascent(BODY_SIZE);
            for (column, x) in [(&left, MARGIN), (&right, right_x)] {
                if let Some((line, weight)) = column.get(row) {
                    self.text_at(x, baseline, BODY_SIZE, *weight, Tone::Ink, line);
                }
            }
            self.y -= lh;
        }
    }

    /// Wrap every cell within its column
    fn wrap_cells(&self, cells: &[String], weight: Weight) -> Vec<Vec<String>> {
        let edges = column_edges();
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let width = edges[i + 1] - edges[i] - 2.0 * CELL_PADDING;
                self.typeface.wrap(cell, TABLE_SIZE, weight, width)
            })
            .collect()
    }

    /// Table lines that still fit above the bottom margin
    fn lines_left(&self) -> usize {
        ((self.y - MARGIN - 2.0 * CELL_PADDING) / line_height(TABLE_SIZE))
            .floor()
            .max(0.0) as usize
    }

    /// Place `lines` of an already wrapped row as one band, followed by a rule
    fn row_band(
        &mut self,
        wrapped: &[Vec<String>],
        lines: Range<usize>,
        weight: Weight,
        shade: Option<Shade>,
    ) {
        let edges = column_edges();
        let lh = line_height(TABLE_SIZE);
        let height = row_height(lines.len());
        let top = self.y;
        if let Some(shade) = shade {
            self.blocks.push(Block::Rect {
                x: MARGIN,
                y: top - height,
                width: CONTENT_WIDTH,
                height,
                shade,
            });
        }
        for (i, cell_lines) in wrapped.iter().enumerate() {
            let left = edges[i] + CELL_PADDING;
            let right = edges[i + 1] - CELL_PADDING;
            for (n, line) in cell_lines.iter().skip(lines.start).take(lines.len()).enumerate() {
                let x = self.aligned_x(line, TABLE_SIZE, weight, left, right, COLUMNS[i].align);
                let baseline = top - CELL_PADDING - n as f32 * lh - ascent(TABLE_SIZE);
                self.text_at(x, baseline, TABLE_SIZE, weight, Tone::Ink, line);
            }
        }
        self.y -= height;
        self.rule(MARGIN, MARGIN + CONTENT_WIDTH);
    }

    fn header_cells(&self) -> Vec<Vec<String>> {
        let titles: Vec<String> = COLUMNS.iter().map(|c| c.title.to_string()).collect();
        self.wrap_cells(&titles, Weight::Bold)
    }

    fn table_header(&mut self) {
        let wrapped = self.header_cells();
        let lines = row_lines(&wrapped);
        self.row_band(&wrapped, 0..lines, Weight::Bold, Some(Shade::Header));
    }

    /// New page that picks the table up again under its header
    fn continue_table(&mut self) {
        self.page_break();
        self.rule(MARGIN, MARGIN + CONTENT_WIDTH);
        self.table_header();
    }

    /// One product row, as tall as its tallest wrapped cell. A row that does not fit moves to
    /// the next page; a row taller than a whole page is split into bands across pages.
    fn product_row(&mut self, cells: &[String], shade: Option<Shade>) {
        let wrapped = self.wrap_cells(cells, Weight::Regular);
        let lines = row_lines(&wrapped);
        let header = row_height(row_lines(&self.header_cells()));
        let page_room = PAGE_HEIGHT - 2.0 * MARGIN - header - 2.0 * CELL_PADDING;
        let lines_per_page = (page_room / line_height(TABLE_SIZE)).floor() as usize;
        if self.lines_left() < lines && lines <= lines_per_page {
            self.continue_table();
        }

        let mut start = 0;
        while start < lines {
            let mut room = self.lines_left();
            if room == 0 {
                self.continue_table();
                room = self.lines_left().max(1);
            }
            let end = (start + room).min(lines);
            self.row_band(&wrapped, start..end, Weight::Regular, shade);
            start = end;
        }
    }

    /// Label and amount pairs right-aligned at the end of the page
    fn totals(&mut self, rows: &[(String, String, bool)]) {
        let value_right = MARGIN + CONTENT_WIDTH - CELL_PADDING;
        let label_right = value_right - TOTALS_VALUE_WIDTH;
        for (label, value, emphasized) in rows {
            let (size, weight, tone) = if *emphasized {
                (GROSS_SIZE, Weight::Bold, Tone::Brand)
            } else {
                (BODY_SIZE, Weight::Regular, Tone::Ink)
            };
            let rule_gap = if *emphasized { 2.0 } else { 0.0 };
            self.ensure(line_height(size) + 1.0 + rule_gap);
            if *emphasized {
                self.gap(rule_gap / 2.0);
                self.rule(label_right - 40.0, MARGIN + CONTENT_WIDTH);
                self.gap(rule_gap / 2.0);
            }
            let baseline = self.y - ascent(size);
            let label_x = self.aligned_x(label, size, weight, MARGIN, label_right, Align::Right);
            self.text_at(label_x, baseline, size, weight, tone, label);
            let value_x = self.aligned_x(value, size, weight, label_right, value_right, Align::Right);
            self.text_at(value_x, baseline, size, weight, tone, value);
            self.y -= line_height(size) + 1.0;
        }
    }

    fn finish(mut self) -> DocumentLayout {
        if !self.blocks.is_empty() || self.pages.is_empty() {
            self.page_break();
        }
        DocumentLayout { pages: self.pages }
    }
}

/// Line count of the tallest cell
fn row_lines(wrapped: &[Vec<String>]) -> usize {
    wrapped.iter().map(Vec::len).max().unwrap_or(1).max(1)
}

fn metadata_line(invoice: &Invoice) -> String {
    format!(
        "Data: {}   Užsakymo Nr.: {}   Sąskaitos Nr.: {}",
        invoice.issued_on().format("%Y-%m-%d"),
        invoice.payment_reference(),
        invoice.number()
    )
}

fn party_lines(heading: &str, party: &crate::invoice::Party) -> Vec<String> {
    let mut lines = vec![heading.to_string(), party.name().to_string()];
    lines.extend(party.detail_lines());
    lines
}

fn totals_rows(invoice: &Invoice) -> Vec<(String, String, bool)> {
    let totals = invoice.totals();
    vec![
        (
            String::from("Tarpinė suma (be PVM):"),
            format_eur(&totals.net),
            false,
        ),
        (
            format!("PVM ({VAT_PERCENT}%):"),
            format_eur(&totals.vat),
            false,
        ),
        (
            String::from("Bendra suma (su PVM):"),
            format_eur(&totals.gross),
            true,
        ),
    ]
}

/// Lay out the invoice with a product table.
///
/// Regions from the top: logo (only when `logo` is given), title, metadata line, seller and
/// buyer side by side, product table, totals. Table rows are as tall as their wrapped content,
/// every second row is shaded, and a row that does not fit on the page moves to a new page
/// under a repeated header. A row taller than a page continues across pages.
pub fn table_layout(invoice: &Invoice, logo: Option<LogoSize>, typeface: &Typeface) -> DocumentLayout {
    let mut c = Composer::new(typeface);
    if let Some(logo) = logo {
        c.logo(logo);
    }
    c.paragraph(TITLE, TITLE_SIZE, Weight::Bold, Tone::Brand, Align::Center);
    c.gap(SECTION_GAP / 2.0);
    c.paragraph(&metadata_line(invoice), BODY_SIZE, Weight::Regular, Tone::Muted, Align::Left);
    c.gap(SECTION_GAP);
    c.party_columns(
        &party_lines("Pardavėjas", invoice.seller()),
        &party_lines("Pirkėjas", invoice.buyer()),
    );
    if let Some(method) = invoice.delivery_method() {
        c.gap(SECTION_GAP / 2.0);
        c.paragraph(
            &format!("Pristatymo būdas: {method}"),
            BODY_SIZE,
            Weight::Regular,
            Tone::Ink,
            Align::Left,
        );
    }
    c.gap(SECTION_GAP);

    c.ensure(line_height(TABLE_SIZE) * 2.0 + 4.0 * CELL_PADDING);
    c.rule(MARGIN, MARGIN + CONTENT_WIDTH);
    c.table_header();
    for (index, item) in invoice.line_items().iter().enumerate() {
        let cells = [
            item.name().to_string(),
            item.quantity().to_string(),
            format_eur(item.unit_price()),
            format_eur(&item.vat()),
            format_eur(&item.gross()),
        ];
        let shade = (index % 2 == 1).then_some(Shade::Stripe);
        c.product_row(&cells, shade);
    }
    c.gap(SECTION_GAP);
    c.totals(&totals_rows(invoice));
    c.finish()
}

/// Lay out the invoice as plain flowing lines: parties one after the other and a bullet per
/// product, no table.
pub fn simple_text_layout(
    invoice: &Invoice,
    logo: Option<LogoSize>,
    typeface: &Typeface,
) -> DocumentLayout {
    let mut c = Composer::new(typeface);
    if let Some(logo) = logo {
        c.logo(logo);
    }
    c.paragraph(TITLE, TITLE_SIZE, Weight::Bold, Tone::Ink, Align::Center);
    c.gap(SECTION_GAP);
    c.paragraph(&metadata_line(invoice), BODY_SIZE, Weight::Regular, Tone::Ink, Align::Left);

    for lines in [
        party_lines("Pardavėjas:", invoice.seller()),
        party_lines("Pirkėjas:", invoice.buyer()),
    ] {
        c.gap(SECTION_GAP / 2.0);
        for (i, line) in lines.iter().enumerate() {
            let weight = if i == 0 { Weight::Bold } else { Weight::Regular };
            c.paragraph(line, BODY_SIZE, weight, Tone::Ink, Align::Left);
        }
    }
    if let Some(method) = invoice.delivery_method() {
        c.paragraph(
            &format!("Pristatymo būdas: {method}"),
            BODY_SIZE,
            Weight::Regular,
            Tone::Ink,
            Align::Left,
        );
    }

    c.gap(SECTION_GAP / 2.0);
    c.paragraph("Produktai:", BODY_SIZE, Weight::Bold, Tone::Ink, Align::Left);
    for item in invoice.line_items() {
        c.paragraph(
            &format!(
                "• {} x {} – {} be PVM ({} su PVM)",
                item.name(),
                item.quantity(),
                format_eur(item.unit_price()),
                format_eur(&item.gross())
            ),
            BODY_SIZE,
            Weight::Regular,
            Tone::Ink,
            Align::Left,
        );
    }

    c.gap(SECTION_GAP / 2.0);
    for (label, value, emphasized) in totals_rows(invoice) {
        let weight = if emphasized { Weight::Bold } else { Weight::Regular };
        c.paragraph(&format!("{label} {value}"), BODY_SIZE, weight, Tone::Ink, Align::Left);
    }
    c.finish()
}
