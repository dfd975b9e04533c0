//! Export of a verse selection as a paginated word-by-word document.
//!
//! [`ExportDocument`] is the backend-neutral shape: a title block plus ordered
//! rows grouped by verse. [`PdfRenderer`] lays those rows out as an A4 table
//! using the base-14 Helvetica fonts.

use crate::selection::Selection;
use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str, TextStr};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

pub const DOCUMENT_HEADING: &str = "Word by Word Analysis";
pub const FOOTER_CREDIT: &str = "Generated by Word by Word Quran PDF Generator";
pub const WORD_COLUMN_TITLE: &str = "Arabic Text";
pub const NOTE_COLUMN_TITLE: &str = "Description/Notes";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("layout error: {0}")]
    Layout(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportRow {
    /// Blank spacer between consecutive verses.
    Separator,
    VerseHeading { number: u32 },
    Word { text: String, annotation: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub title: String,
    pub subtitle: String,
    pub heading: String,
    pub file_stem: String,
    pub rows: Vec<ExportRow>,
}

impl ExportDocument {
    pub fn from_selection(selection: &Selection) -> Self {
        let mut rows = Vec::with_capacity(selection.word_count() + selection.verses.len() * 2);
        for (index, verse) in selection.verses.iter().enumerate() {
            if index > 0 {
                rows.push(ExportRow::Separator);
            }
            rows.push(ExportRow::VerseHeading {
                number: verse.number,
            });
            rows.extend(verse.words.iter().map(|word| ExportRow::Word {
                text: word.text.clone(),
                annotation: word.description.clone(),
            }));
        }
        Self {
            title: selection.english_name.clone(),
            subtitle: format!("Verses {} to {}", selection.range.start, selection.range.end),
            heading: DOCUMENT_HEADING.to_string(),
            file_stem: export_file_stem(
                &selection.english_name,
                selection.range.start,
                selection.range.end,
            ),
            rows,
        }
    }

    pub fn verse_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|row| matches!(row, ExportRow::VerseHeading { .. }))
            .count()
    }

    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{extension}", self.file_stem)
    }
}

/// `<EnglishName>_verses_<start>-<end>`, with path separators replaced.
pub fn export_file_stem(english_name: &str, start: u32, end: u32) -> String {
    let safe: String = english_name
        .chars()
        .map(|ch| match ch {
            '/' | '\\' => '-',
            other => other,
        })
        .collect();
    format!("{safe}_verses_{start}-{end}")
}

/// A layout backend that turns an [`ExportDocument`] into file bytes.
pub trait DocumentRenderer {
    fn extension(&self) -> &'static str;
    fn render(&self, document: &ExportDocument) -> Result<Vec<u8>, ExportError>;
}

/// Renders `document` and writes it into `dir`.
///
/// Rendering happens fully in memory first, so a layout failure leaves no
/// file behind.
pub fn write_export<R>(
    renderer: &R,
    document: &ExportDocument,
    dir: &Path,
) -> Result<PathBuf, ExportError>
where
    R: DocumentRenderer + ?Sized,
{
    let bytes = renderer.render(document)?;
    fs::create_dir_all(dir)?;
    let path = dir.join(document.file_name(renderer.extension()));
    fs::write(&path, &bytes)?;
    info!(
        path = %path.display(),
        bytes = bytes.len(),
        rows = document.rows.len(),
        "Export written"
    );
    Ok(path)
}

const MM: f32 = 72.0 / 25.4;
const REGULAR: Name<'static> = Name(b"F1");
const BOLD: Name<'static> = Name(b"F2");
const AVG_GLYPH_WIDTH: f32 = 0.5;

#[derive(Debug, Clone, Copy)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub word_column: f32,
    pub note_column: f32,
    /// Distance from the top edge to the table on the first page.
    pub first_table_top: f32,
    /// Space reserved above the bottom edge for the footer.
    pub footer_reserve: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            width: 210.0 * MM,
            height: 297.0 * MM,
            margin: 15.0 * MM,
            word_column: 80.0 * MM,
            note_column: 100.0 * MM,
            first_table_top: 50.0 * MM,
            footer_reserve: 20.0 * MM,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PdfRenderer {
    pub geometry: PageGeometry,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Rgb(f32, f32, f32);

const HEADER_FILL: Rgb = Rgb(143.0 / 255.0, 188.0 / 255.0, 143.0 / 255.0);
const VERSE_FILL: Rgb = Rgb(200.0 / 255.0, 220.0 / 255.0, 200.0 / 255.0);
const SEPARATOR_FILL: Rgb = Rgb(248.0 / 255.0, 248.0 / 255.0, 248.0 / 255.0);
const GRID: Rgb = Rgb(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0);

const HEADER_HEIGHT: f32 = 30.0;
const VERSE_HEIGHT: f32 = 26.0;
const SEPARATOR_HEIGHT: f32 = 8.0;
const WORD_SIZE: f32 = 16.0;
const NOTE_SIZE: f32 = 10.0;
const NOTE_LEADING: f32 = 12.0;
const CELL_PAD: f32 = 8.0;

/// Row after layout: its height and, for word rows, wrapped note lines.
struct PlacedRow<'a> {
    row: &'a ExportRow,
    height: f32,
    note_lines: Vec<String>,
}

impl PdfRenderer {
    fn table_width(&self) -> f32 {
        self.geometry.word_column + self.geometry.note_column
    }

    fn place<'a>(&self, row: &'a ExportRow) -> PlacedRow<'a> {
        match row {
            ExportRow::Separator => PlacedRow {
                row,
                height: SEPARATOR_HEIGHT,
                note_lines: Vec::new(),
            },
            ExportRow::VerseHeading { .. } => PlacedRow {
                row,
                height: VERSE_HEIGHT,
                note_lines: Vec::new(),
            },
            ExportRow::Word { annotation, .. } => {
                let max_chars = ((self.geometry.note_column - 2.0 * CELL_PAD)
                    / (NOTE_SIZE * AVG_GLYPH_WIDTH))
                    .floor()
                    .max(1.0) as usize;
                let note_lines: Vec<String> = annotation
                    .lines()
                    .flat_map(|line| wrap_line(line, max_chars))
                    .collect();
                let note_height = note_lines.len() as f32 * NOTE_LEADING + 2.0 * CELL_PAD;
                let word_height = WORD_SIZE * 1.2 + 2.0 * CELL_PAD;
                PlacedRow {
                    row,
                    height: note_height.max(word_height),
                    note_lines,
                }
            }
        }
    }

    /// Splits rows into pages. Each page holds the rows drawn below its header.
    fn paginate<'a>(
        &self,
        document: &'a ExportDocument,
    ) -> Result<Vec<Vec<PlacedRow<'a>>>, ExportError> {
        let geometry = &self.geometry;
        let bottom = geometry.footer_reserve;
        let later_top = geometry.height - geometry.margin - HEADER_HEIGHT;
        let mut cursor = geometry.height - geometry.first_table_top - HEADER_HEIGHT;
        let mut pages = vec![Vec::new()];
        for row in &document.rows {
            let placed = self.place(row);
            if placed.height > later_top - bottom {
                return Err(ExportError::Layout(format!(
                    "row of height {:.0}pt does not fit on a page",
                    placed.height
                )));
            }
            if cursor - placed.height < bottom {
                pages.push(Vec::new());
                cursor = later_top;
            }
            cursor -= placed.height;
            if let Some(page) = pages.last_mut() {
                page.push(placed);
            }
        }
        Ok(pages)
    }

    fn draw_page(
        &self,
        content: &mut Content,
        rows: &[PlacedRow<'_>],
        first: bool,
        document: &ExportDocument,
    ) {
        let geometry = &self.geometry;
        let center = geometry.width / 2.0;
        let left = geometry.margin;
        let split = left + geometry.word_column;

        let mut top = if first {
            let title_y = geometry.height - 20.0 * MM;
            draw_centered(content, BOLD, 18.0, center, title_y, &document.title);
            draw_centered(content, REGULAR, 12.0, center, title_y - 10.0 * MM, &document.subtitle);
            draw_centered(content, REGULAR, 12.0, center, title_y - 20.0 * MM, &document.heading);
            geometry.height - geometry.first_table_top
        } else {
            geometry.height - geometry.margin
        };

        let table_width = self.table_width();
        fill_box(content, HEADER_FILL, left, top - HEADER_HEIGHT, table_width, HEADER_HEIGHT);
        grid_box(content, left, top - HEADER_HEIGHT, geometry.word_column, HEADER_HEIGHT);
        grid_box(content, split, top - HEADER_HEIGHT, geometry.note_column, HEADER_HEIGHT);
        let header_base = top - HEADER_HEIGHT / 2.0 - 5.0;
        let word_center = left + geometry.word_column / 2.0;
        let note_center = split + geometry.note_column / 2.0;
        draw_centered(content, BOLD, 14.0, word_center, header_base, WORD_COLUMN_TITLE);
        draw_centered(content, BOLD, 14.0, note_center, header_base, NOTE_COLUMN_TITLE);
        top -= HEADER_HEIGHT;

        for placed in rows {
            let bottom = top - placed.height;
            match placed.row {
                ExportRow::Separator => {
                    fill_box(content, SEPARATOR_FILL, left, bottom, table_width, placed.height);
                    grid_box(content, left, bottom, table_width, placed.height);
                }
                ExportRow::VerseHeading { number } => {
                    fill_box(content, VERSE_FILL, left, bottom, table_width, placed.height);
                    grid_box(content, left, bottom, geometry.word_column, placed.height);
                    grid_box(content, split, bottom, geometry.note_column, placed.height);
                    let label = format!("Verse {number}");
                    let baseline = bottom + placed.height / 2.0 - 4.0;
                    let column_center = left + geometry.word_column / 2.0;
                    draw_centered(content, BOLD, 12.0, column_center, baseline, &label);
                }
                ExportRow::Word { text, .. } => {
                    grid_box(content, left, bottom, geometry.word_column, placed.height);
                    grid_box(content, split, bottom, geometry.note_column, placed.height);
                    let width = approx_width(text, WORD_SIZE);
                    let x = (split - CELL_PAD - width).max(left + CELL_PAD);
                    draw_text(content, REGULAR, WORD_SIZE, x, top - CELL_PAD - WORD_SIZE, text);
                    let mut line_y = top - CELL_PAD - NOTE_SIZE;
                    for line in &placed.note_lines {
                        draw_text(content, REGULAR, NOTE_SIZE, split + CELL_PAD, line_y, line);
                        line_y -= NOTE_LEADING;
                    }
                }
            }
            top = bottom;
        }
    }

    fn draw_footer(&self, content: &mut Content, page: usize, total: usize) {
        let center = self.geometry.width / 2.0;
        draw_centered(content, REGULAR, 8.0, center, 10.0 * MM, &format!("Page {page} of {total}"));
        draw_centered(content, REGULAR, 8.0, center, 5.0 * MM, FOOTER_CREDIT);
    }
}

impl DocumentRenderer for PdfRenderer {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, document: &ExportDocument) -> Result<Vec<u8>, ExportError> {
        let pages = self.paginate(document)?;
        let total = pages.len();

        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let regular_id = Ref::new(3);
        let bold_id = Ref::new(4);
        let info_id = Ref::new(5);
        let page_ids: Vec<Ref> = (0..total).map(|i| Ref::new(6 + 2 * i as i32)).collect();
        let content_ids: Vec<Ref> = (0..total).map(|i| Ref::new(7 + 2 * i as i32)).collect();

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id)
            .kids(page_ids.iter().copied())
            .count(total as i32);
        pdf.type1_font(regular_id)
            .base_font(Name(b"Helvetica"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        pdf.type1_font(bold_id)
            .base_font(Name(b"Helvetica-Bold"))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        let title = format!("{} - {}", document.title, document.subtitle);
        pdf.document_info(info_id)
            .title(TextStr(&title))
            .subject(TextStr(&document.heading))
            .producer(TextStr(concat!("quran-wbw-rs ", env!("CARGO_PKG_VERSION"))));

        let media = Rect::new(0.0, 0.0, self.geometry.width, self.geometry.height);
        for (index, rows) in pages.iter().enumerate() {
            let mut page = pdf.page(page_ids[index]);
            page.media_box(media);
            page.parent(tree_id);
            page.contents(content_ids[index]);
            page.resources()
                .fonts()
                .pair(REGULAR, regular_id)
                .pair(BOLD, bold_id);
            page.finish();

            let mut content = Content::new();
            self.draw_page(&mut content, rows, index == 0, document);
            self.draw_footer(&mut content, index + 1, total);
            pdf.stream(content_ids[index], &content.finish());
        }

        Ok(pdf.finish())
    }
}

fn fill_box(content: &mut Content, color: Rgb, x: f32, y: f32, w: f32, h: f32) {
    content.set_fill_rgb(color.0, color.1, color.2);
    content.rect(x, y, w, h);
    content.fill_nonzero();
    content.set_fill_rgb(0.0, 0.0, 0.0);
}

fn grid_box(content: &mut Content, x: f32, y: f32, w: f32, h: f32) {
    content.set_stroke_rgb(GRID.0, GRID.1, GRID.2);
    content.set_line_width(0.2 * MM);
    content.rect(x, y, w, h);
    content.stroke();
}

/// Shows `text` with the WinAnsi font. Runs the font cannot encode are wrapped
/// in a `/Span` carrying the real text as `/ActualText`, so extraction and
/// search see the original words.
fn draw_text(content: &mut Content, font: Name<'_>, size: f32, x: f32, y: f32, text: &str) {
    let lossy = !text.chars().all(is_win_ansi);
    if lossy {
        content
            .begin_marked_content_with_properties(Name(b"Span"))
            .properties()
            .actual_text(TextStr(text));
    }
    content.begin_text();
    content.set_font(font, size);
    content.next_line(x, y);
    content.show(Str(&win_ansi_bytes(text)));
    content.end_text();
    if lossy {
        content.end_marked_content();
    }
}

fn draw_centered(
    content: &mut Content,
    font: Name<'_>,
    size: f32,
    center: f32,
    y: f32,
    text: &str,
) {
    let x = center - approx_width(text, size) / 2.0;
    draw_text(content, font, size, x, y, text);
}

fn approx_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * AVG_GLYPH_WIDTH
}

/// Maps text to single-byte WinAnsi codes; glyphs outside Latin-1 become `?`.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| if is_win_ansi(ch) { u32::from(ch) as u8 } else { b'?' })
        .collect()
}

fn is_win_ansi(ch: char) -> bool {
    matches!(u32::from(ch), 0x20..=0x7E | 0xA0..=0xFF)
}

fn wrap_line(line: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
