//! Block-based paginated document written as PDF.
//!
//! A [`Document`] is an ordered list of [`Block`]s. Rendering flows them
//! top-down onto A4 pages with 72pt margins, starting a new page whenever
//! a block does not fit. Tables break between rows and repeat their header
//! on the next page.
//!
//! Text uses the built-in Helvetica faces with WinAnsi encoding, so no font
//! files are embedded. Characters outside that encoding print as `?`.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use pdf_writer::{Content, Filter, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use resvg::tiny_skia;
use tracing::debug;

use crate::error::{ReportError, Result};

pub const PAGE_WIDTH: f64 = 595.0;
pub const PAGE_HEIGHT: f64 = 842.0;
pub const MARGIN: f64 = 72.0;
pub const CONTENT_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN;

const TITLE_SIZE: f64 = 24.0;
const HEADING_SIZE: f64 = 16.0;
const HEADING_SPACE_BEFORE: f64 = 20.0;
const HEADING_SPACE_AFTER: f64 = 12.0;
const KV_ROW_HEIGHT: f64 = 22.0;
const KV_FONT_SIZE: f64 = 12.0;
const HEADER_ROW_HEIGHT: f64 = 20.0;
const BODY_ROW_HEIGHT: f64 = 18.0;
const CELL_PADDING: f64 = 4.0;

type Rgb = (f32, f32, f32);

const BLACK: Rgb = (0.0, 0.0, 0.0);
const DARK_BLUE: Rgb = (0.0, 0.0, 0.545);
const LIGHT_GREY: Rgb = (0.827, 0.827, 0.827);
const GREY: Rgb = (0.5, 0.5, 0.5);
const WHITE_SMOKE: Rgb = (0.96, 0.96, 0.96);
const BEIGE: Rgb = (0.96, 0.96, 0.86);
const WHITE: Rgb = (1.0, 1.0, 1.0);

/// One unit of document content.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Large centered title
    Title(String),
    /// Section heading
    Heading(String),
    /// Two-column label/value grid
    KeyValueTable(Vec<(String, String)>),
    /// Grid with a header row; `widths` are column widths in points
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
        widths: Vec<f64>,
    },
    /// PNG image scaled to the given size in points
    Image {
        path: PathBuf,
        width: f64,
        height: f64,
    },
    /// Vertical gap in points
    Spacer(f64),
    PageBreak,
}

/// Result of laying out and serializing a document.
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    pub bytes: Vec<u8>,
    pub page_count: usize,
    pub image_count: usize,
}

/// An ordered list of blocks plus document metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub title: String,
    pub author: String,
    blocks: Vec<Block>,
}

impl Document {
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Text of every heading, in order.
    pub fn headings(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn image_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Image { .. }))
            .count()
    }

    /// Lay out all blocks and serialize the PDF in memory.
    pub fn render_pdf(&self) -> Result<RenderedPdf> {
        let mut pdf = Pdf::new();
        let mut alloc = Ref::new(1);
        let catalog_id = alloc.bump();
        let page_tree_id = alloc.bump();
        let font_id = alloc.bump();
        let bold_font_id = alloc.bump();
        let info_id = alloc.bump();

        let mut layout = Layout::new();
        let mut images = 0;
        for block in &self.blocks {
            if let Block::Image {
                path,
                width,
                height,
            } = block
            {
                let image_id = alloc.bump();
                let (px_w, px_h) = embed_png(&mut pdf, image_id, path)?;
                debug!(
                    "Embedded {} ({}x{} px) as image {}",
                    path.display(),
                    px_w,
                    px_h,
                    images + 1
                );
                images += 1;
                layout.image(image_id, *width, *height);
            } else {
                layout.place(block);
            }
        }
        let pages = layout.finish();

        let page_ids: Vec<Ref> = pages.iter().map(|_| alloc.bump()).collect();
        pdf.catalog(catalog_id).pages(page_tree_id);
        pdf.pages(page_tree_id)
            .kids(page_ids.iter().copied())
            .count(page_ids.len() as i32);

        for (page, page_id) in pages.into_iter().zip(&page_ids) {
            let content_id = alloc.bump();
            let mut writer = pdf.page(*page_id);
            writer.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH as f32, PAGE_HEIGHT as f32));
            writer.parent(page_tree_id);
            writer.contents(content_id);

            let mut resources = writer.resources();
            resources
                .fonts()
                .pair(Name(b"F1"), font_id)
                .pair(Name(b"F2"), bold_font_id);
            if !page.images.is_empty() {
                let mut x_objects = resources.x_objects();
                for (name, id) in &page.images {
                    x_objects.pair(Name(name.as_bytes()), *id);
                }
                x_objects.finish();
            }
            resources.finish();
            writer.finish();

            pdf.stream(content_id, &page.content.finish());
        }

        pdf.type1_font(font_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.type1_font(bold_font_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));

        pdf.document_info(info_id)
            .title(TextStr(&self.title))
            .author(TextStr(&self.author))
            .creator(TextStr(concat!("lex-report ", env!("CARGO_PKG_VERSION"))));

        Ok(RenderedPdf {
            bytes: pdf.finish(),
            page_count: page_ids.len(),
            image_count: images,
        })
    }

    /// Render and write the PDF to `path`, creating the parent directory.
    pub fn write_pdf(&self, path: &Path) -> Result<RenderedPdf> {
        let rendered = self.render_pdf()?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                ReportError::RenderError(format!(
                    "cannot create output directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        std::fs::write(path, &rendered.bytes).map_err(|e| {
            ReportError::RenderError(format!("cannot write {}: {e}", path.display()))
        })?;
        Ok(rendered)
    }
}

/// Decode a PNG, flatten it onto white and add it as an RGB image XObject.
fn embed_png(pdf: &mut Pdf, id: Ref, path: &Path) -> Result<(u32, u32)> {
    let pixmap = tiny_skia::Pixmap::load_png(path).map_err(|e| {
        ReportError::RenderError(format!("cannot read image {}: {e}", path.display()))
    })?;

    // Pixels are premultiplied, so compositing over white is c + (255 - a).
    let mut rgb = Vec::with_capacity((pixmap.width() * pixmap.height() * 3) as usize);
    for px in pixmap.pixels() {
        let back = 255 - px.alpha();
        rgb.extend_from_slice(&[
            px.red().saturating_add(back),
            px.green().saturating_add(back),
            px.blue().saturating_add(back),
        ]);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let compressed = encoder
        .write_all(&rgb)
        .and_then(|_| encoder.finish())
        .map_err(|e| {
            ReportError::RenderError(format!("cannot compress image {}: {e}", path.display()))
        })?;

    let mut image = pdf.image_xobject(id, &compressed);
    image.filter(Filter::FlateDecode);
    image.width(pixmap.width() as i32);
    image.height(pixmap.height() as i32);
    image.color_space().device_rgb();
    image.bits_per_component(8);
    image.finish();

    Ok((pixmap.width(), pixmap.height()))
}

// ============================================================================
// Layout
// ============================================================================

struct PageState {
    content: Content,
    images: Vec<(String, Ref)>,
    is_empty: bool,
}

impl PageState {
    fn new() -> Self {
        Self {
            content: Content::new(),
            images: Vec::new(),
            is_empty: true,
        }
    }
}

/// Top-down flow layout. `cursor` is the distance from the top page edge.
struct Layout {
    pages: Vec<PageState>,
    cursor: f64,
    image_seq: usize,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: vec![PageState::new()],
            cursor: MARGIN,
            image_seq: 0,
        }
    }

    fn finish(self) -> Vec<PageState> {
        self.pages
    }

    fn bottom() -> f64 {
        PAGE_HEIGHT - MARGIN
    }

    fn remaining(&self) -> f64 {
        Self::bottom() - self.cursor
    }

    fn page(&mut self) -> &mut PageState {
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn new_page(&mut self) {
        self.pages.push(PageState::new());
        self.cursor = MARGIN;
    }

    /// Start a new page unless `height` fits or the page is still empty.
    fn ensure_space(&mut self, height: f64) {
        if height > self.remaining() && !self.page().is_empty {
            self.new_page();
        }
    }

    fn place(&mut self, block: &Block) {
        match block {
            Block::Title(text) => self.title(text),
            Block::Heading(text) => self.heading(text),
            Block::KeyValueTable(rows) => self.key_value_table(rows),
            Block::Table {
                header,
                rows,
                widths,
            } => self.table(header, rows, widths),
            Block::Spacer(height) => {
                if *height >= self.remaining() {
                    self.new_page();
                } else {
                    self.cursor += height;
                }
            }
            Block::PageBreak => {
                if !self.page().is_empty {
                    self.new_page();
                }
            }
            // Images need an object id, see `image`
            Block::Image { .. } => {}
        }
    }

    fn title(&mut self, text: &str) {
        let line_height = TITLE_SIZE * 1.2;
        let lines = wrap(text, TITLE_SIZE, true, CONTENT_WIDTH);
        self.ensure_space(line_height * lines.len() as f64);

        for line in lines {
            let width = text_width(&line, TITLE_SIZE, true);
            let x = MARGIN + (CONTENT_WIDTH - width).max(0.0) / 2.0;
            let baseline = self.cursor + TITLE_SIZE;
            self.text(x, baseline, TITLE_SIZE, true, DARK_BLUE, &line);
            self.cursor += line_height;
        }
    }

    fn heading(&mut self, text: &str) {
        let lines = wrap(text, HEADING_SIZE, true, CONTENT_WIDTH);
        let line_height = HEADING_SIZE * 1.2;
        let before = if self.page().is_empty {
            0.0
        } else {
            HEADING_SPACE_BEFORE
        };
        // Keep a heading together with at least one table row
        let needed = before
            + line_height * lines.len() as f64
            + HEADING_SPACE_AFTER
            + HEADER_ROW_HEIGHT
            + BODY_ROW_HEIGHT;
        if needed > self.remaining() && !self.page().is_empty {
            self.new_page();
        } else {
            self.cursor += before;
        }

        for line in lines {
            self.text(MARGIN, self.cursor + HEADING_SIZE, HEADING_SIZE, true, DARK_BLUE, &line);
            self.cursor += line_height;
        }
        self.cursor += HEADING_SPACE_AFTER;
    }

    fn key_value_table(&mut self, rows: &[(String, String)]) {
        let widths = [144.0, 216.0];
        let left = MARGIN + (CONTENT_WIDTH - widths.iter().sum::<f64>()) / 2.0;

        for (label, value) in rows {
            self.ensure_space(KV_ROW_HEIGHT);
            let mut x = left;
            for (text, width) in [label, value].into_iter().zip(widths) {
                self.fill_rect(x, self.cursor, width, KV_ROW_HEIGHT, LIGHT_GREY);
                self.stroke_rect(x, self.cursor, width, KV_ROW_HEIGHT, 1.0);
                let fitted = fit(text, KV_FONT_SIZE, true, width - 2.0 * CELL_PADDING);
                self.text(
                    x + CELL_PADDING,
                    self.cursor + 15.0,
                    KV_FONT_SIZE,
                    true,
                    BLACK,
                    &fitted,
                );
                x += width;
            }
            self.cursor += KV_ROW_HEIGHT;
        }
    }

    fn table(&mut self, header: &[String], rows: &[Vec<String>], widths: &[f64]) {
        let total: f64 = widths.iter().sum();
        let left = MARGIN + (CONTENT_WIDTH - total).max(0.0) / 2.0;

        self.ensure_space(HEADER_ROW_HEIGHT + BODY_ROW_HEIGHT);
        self.table_row(left, header, widths, true, 0);

        for (idx, row) in rows.iter().enumerate() {
            if BODY_ROW_HEIGHT > self.remaining() {
                self.new_page();
                self.table_row(left, header, widths, true, 0);
            }
            self.table_row(left, row, widths, false, idx);
        }
    }

    fn table_row(&mut self, left: f64, cells: &[String], widths: &[f64], header: bool, idx: usize) {
        let (height, size, background, color) = if header {
            (HEADER_ROW_HEIGHT, 11.0, GREY, WHITE_SMOKE)
        } else if idx % 2 == 0 {
            (BODY_ROW_HEIGHT, 10.0, BEIGE, BLACK)
        } else {
            (BODY_ROW_HEIGHT, 10.0, WHITE, BLACK)
        };

        let mut x = left;
        for (cell, width) in cells.iter().zip(widths) {
            self.fill_rect(x, self.cursor, *width, height, background);
            self.stroke_rect(x, self.cursor, *width, height, 1.0);

            let fitted = fit(cell, size, header, width - 2.0 * CELL_PADDING);
            let text_w = text_width(&fitted, size, header);
            let baseline = self.cursor + height / 2.0 + size * 0.35;
            self.text(x + (width - text_w) / 2.0, baseline, size, header, color, &fitted);
            x += width;
        }
        self.cursor += height;
    }

    fn image(&mut self, id: Ref, width: f64, height: f64) {
        let (width, height) = if width > CONTENT_WIDTH {
            (CONTENT_WIDTH, height * CONTENT_WIDTH / width)
        } else {
            (width, height)
        };
        self.ensure_space(height);

        self.image_seq += 1;
        let name = format!("Im{}", self.image_seq);
        let x = MARGIN + (CONTENT_WIDTH - width) / 2.0;
        let y = PAGE_HEIGHT - self.cursor - height;

        let page = self.page();
        page.content.save_state();
        page.content
            .transform([width as f32, 0.0, 0.0, height as f32, x as f32, y as f32]);
        page.content.x_object(Name(name.as_bytes()));
        page.content.restore_state();
        page.images.push((name, id));
        page.is_empty = false;

        self.cursor += height;
    }

    // --- drawing primitives, `top` measured from the upper page edge ---

    fn fill_rect(&mut self, x: f64, top: f64, w: f64, h: f64, color: Rgb) {
        let page = self.page();
        page.content.set_fill_rgb(color.0, color.1, color.2);
        page.content
            .rect(x as f32, (PAGE_HEIGHT - top - h) as f32, w as f32, h as f32);
        page.content.fill_nonzero();
        page.is_empty = false;
    }

    fn stroke_rect(&mut self, x: f64, top: f64, w: f64, h: f64, line_width: f32) {
        let page = self.page();
        page.content.set_stroke_rgb(0.0, 0.0, 0.0);
        page.content.set_line_width(line_width);
        page.content
            .rect(x as f32, (PAGE_HEIGHT - top - h) as f32, w as f32, h as f32);
        page.content.stroke();
    }

    fn text(&mut self, x: f64, baseline: f64, size: f64, bold: bool, color: Rgb, text: &str) {
        let font = if bold { Name(b"F2") } else { Name(b"F1") };
        let encoded = encode_win_ansi(text);
        let page = self.page();
        page.content.set_fill_rgb(color.0, color.1, color.2);
        page.content.begin_text();
        page.content.set_font(font, size as f32);
        page.content
            .next_line(x as f32, (PAGE_HEIGHT - baseline) as f32);
        page.content.show(Str(&encoded));
        page.content.end_text();
        page.is_empty = false;
    }
}

// ============================================================================
// Text metrics
// ============================================================================

/// Helvetica advance widths (1/1000 em) for ASCII 32..=126.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
];

/// Helvetica widths for WinAnsi 0x80..=0xFF. Unassigned codes are 0.
const HELVETICA_HIGH: [u16; 128] = [
    556, 0, 222, 556, 333, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0, // 0x80
    0, 222, 222, 333, 333, 350, 556, 1000, 333, 1000, 500, 333, 944, 0, 500, 667, // 0x90
    278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // 0xF0
];

/// Helvetica-Bold advance widths (1/1000 em) for ASCII 32..=126.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0..?
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // @..O
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // P.._
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // `..o
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // p..~
];

/// Helvetica-Bold widths for WinAnsi 0x80..=0xFF. Unassigned codes are 0.
const HELVETICA_BOLD_HIGH: [u16; 128] = [
    556, 0, 278, 556, 500, 1000, 556, 556, 333, 1000, 667, 333, 1000, 0, 611, 0, // 0x80
    0, 278, 278, 500, 500, 350, 556, 1000, 333, 1000, 556, 333, 944, 0, 500, 667, // 0x90
    278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333, // 0xA0
    400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611, // 0xB0
    722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // 0xC0
    722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // 0xD0
    556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278, // 0xE0
    611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556, // 0xF0
];

/// Encode `text` as WinAnsi bytes for the built-in fonts.
///
/// Latin-1 maps to itself, the typographic quotes, dashes and a few other
/// marks map into 0x80..=0x9F. Whitespace control characters become spaces
/// and anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(ch: char) -> u8 {
    match ch {
        ' '..='~' | '\u{A0}'..='\u{FF}' => ch as u8,
        '\t' | '\n' | '\r' => b' ',
        '\u{2212}' => b'-',
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => b'?',
    }
}

/// Width of `text` in points once encoded.
pub fn text_width(text: &str, size: f64, bold: bool) -> f64 {
    let (low, high) = if bold {
        (&HELVETICA_BOLD, &HELVETICA_BOLD_HIGH)
    } else {
        (&HELVETICA, &HELVETICA_HIGH)
    };
    let units: u32 = encode_win_ansi(text)
        .into_iter()
        .map(|b| match b {
            b' '..=b'~' => u32::from(low[(b - b' ') as usize]),
            0x80..=0xFF => u32::from(high[(b - 0x80) as usize]),
            _ => 0,
        })
        .sum();
    units as f64 * size / 1000.0
}

/// Truncate `text` with "..." so it fits in `max_width`.
fn fit(text: &str, size: f64, bold: bool, max_width: f64) -> String {
    if text_width(text, size, bold) <= max_width {
        return text.to_string();
    }

    let mut kept = text.to_string();
    while !kept.is_empty() && text_width(&format!("{kept}..."), size, bold) > max_width {
        kept.pop();
    }
    format!("{kept}...")
}

/// Greedy word wrap.
fn wrap(text: &str, size: f64, bold: bool, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, size, bold) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
