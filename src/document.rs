//! Renders the processing endpoint's replacement document as terminal text.
//!
//! The markup is treated as untrusted. Nothing in it is executed or fetched:
//! only the title, headings, running text and table cells are kept, and
//! control characters are stripped so the markup cannot drive the terminal.

use scraper::{ElementRef, Html, Selector};
use textwrap::wrap;

const SKIP_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "object", "embed", "head", "form",
    "button", "select",
];

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "header", "footer", "nav", "aside", "ul", "ol",
    "li", "dl", "dt", "dd", "blockquote", "pre", "figure", "figcaption", "hr",
];

const MAX_CELL_WIDTH: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph(String),
    Table { rows: Vec<Vec<String>>, has_header: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Heading(u8),
    Text,
    TableHeader,
    TableRow,
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocLine {
    pub kind: LineKind,
    pub text: String,
}

impl DocLine {
    fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    pub title: String,
    pub blocks: Vec<Block>,
}

impl RenderedDocument {
    /// Lays the document out for a viewport `width` columns wide.
    pub fn lines(&self, width: usize) -> Vec<DocLine> {
        let width = width.max(1);
        let mut lines = Vec::new();

        for block in &self.blocks {
            if !lines.is_empty() {
                lines.push(DocLine::new(LineKind::Blank, ""));
            }
            match block {
                Block::Heading { level, text } => {
                    for line in wrap(text, width) {
                        lines.push(DocLine::new(LineKind::Heading(*level), line));
                    }
                }
                Block::Paragraph(text) => {
                    for line in wrap(text, width) {
                        lines.push(DocLine::new(LineKind::Text, line));
                    }
                }
                Block::Table { rows, has_header } => {
                    for (i, row) in format_table(rows).into_iter().enumerate() {
                        let kind = if i == 0 && *has_header {
                            LineKind::TableHeader
                        } else {
                            LineKind::TableRow
                        };
                        lines.push(DocLine::new(kind, row));
                    }
                }
            }
        }

        lines
    }

    pub fn to_plain_text(&self, width: usize) -> String {
        let mut out = String::new();
        if !self.title.is_empty() {
            out.push_str(&self.title);
            out.push_str("\n\n");
        }
        for line in self.lines(width) {
            out.push_str(line.text.trim_end());
            out.push('\n');
        }
        out
    }
}

pub struct DocumentRenderer;

impl DocumentRenderer {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, html: &str) -> RenderedDocument {
        let document = Html::parse_document(html);
        let title = self.extract_title(&document);

        let mut blocks = Vec::new();
        let mut inline = String::new();
        let root = Selector::parse("body")
            .ok()
            .and_then(|selector| document.select(&selector).next())
            .unwrap_or_else(|| document.root_element());
        self.collect_blocks(root, &mut blocks, &mut inline);
        flush_paragraph(&mut inline, &mut blocks);

        RenderedDocument { title, blocks }
    }

    fn extract_title(&self, document: &Html) -> String {
        Selector::parse("title")
            .ok()
            .and_then(|selector| {
                document
                    .select(&selector)
                    .next()
                    .map(|el| clean_text(&el.text().collect::<String>()))
            })
            .unwrap_or_default()
    }

    fn collect_blocks(&self, element: ElementRef, blocks: &mut Vec<Block>, inline: &mut String) {
        for child in element.children() {
            if let Some(text) = child.value().as_text() {
                inline.push_str(text);
                inline.push(' ');
                continue;
            }

            let Some(child) = ElementRef::wrap(child) else {
                continue;
            };
            let name = child.value().name();
            if SKIP_TAGS.contains(&name) {
                continue;
            }

            match name {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    flush_paragraph(inline, blocks);
                    let text = clean_text(&child.text().collect::<String>());
                    if !text.is_empty() {
                        let level = name[1..].parse().unwrap_or(1);
                        blocks.push(Block::Heading { level, text });
                    }
                }
                "table" => {
                    flush_paragraph(inline, blocks);
                    let (rows, has_header) = self.extract_table(child);
                    if !rows.is_empty() {
                        blocks.push(Block::Table { rows, has_header });
                    }
                }
                "br" => flush_paragraph(inline, blocks),
                _ if BLOCK_TAGS.contains(&name) => {
                    flush_paragraph(inline, blocks);
                    self.collect_blocks(child, blocks, inline);
                    flush_paragraph(inline, blocks);
                }
                _ => self.collect_blocks(child, blocks, inline),
            }
        }
    }

    fn extract_table(&self, table: ElementRef) -> (Vec<Vec<String>>, bool) {
        let mut rows = Vec::new();
        let mut has_header = false;

        let table_rows = table
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| el.value().name() == "tr");

        for tr in table_rows {
            let cells: Vec<ElementRef> = tr
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|el| matches!(el.value().name(), "th" | "td"))
                .collect();
            if cells.is_empty() {
                continue;
            }
            if rows.is_empty() {
                has_header = cells.iter().all(|c| c.value().name() == "th");
            }
            rows.push(
                cells
                    .iter()
                    .map(|c| clean_text(&c.text().collect::<String>()))
                    .collect(),
            );
        }

        (rows, has_header)
    }
}

fn flush_paragraph(inline: &mut String, blocks: &mut Vec<Block>) {
    let text = clean_text(inline);
    if !text.is_empty() {
        blocks.push(Block::Paragraph(text));
    }
    inline.clear();
}

/// Drops control characters and collapses runs of whitespace.
fn clean_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| !c.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn truncate_cell(cell: &str) -> String {
    if cell.chars().count() <= MAX_CELL_WIDTH {
        cell.to_string()
    } else {
        let mut out: String = cell.chars().take(MAX_CELL_WIDTH - 1).collect();
        out.push('…');
        out
    }
}

/// Pads cells into aligned columns separated by ` | `.
fn format_table(rows: &[Vec<String>]) -> Vec<String> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| truncate_cell(c)).collect())
        .collect();

    let widths: Vec<usize> = (0..columns)
        .map(|col| {
            cells
                .iter()
                .filter_map(|row| row.get(col))
                .map(|c| c.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    cells
        .iter()
        .map(|row| {
            (0..columns)
                .map(|col| {
                    let cell = row.get(col).map(String::as_str).unwrap_or("");
                    format!("{:<width$}", cell, width = widths[col])
                })
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        })
        .collect()
}
