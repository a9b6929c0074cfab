//! Table sub-converter.
//!
//! Each table category gets its own algorithm: history tables become a fixed
//! four-column view, layout tables dissolve into their cell content, complex
//! tables become titled sections, and standard tables become GitHub-style
//! pipe tables. Every row and cell a renderer touches is marked processed.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use wikidown_core::TableStyle;

use crate::classify::TableKind;
use crate::dom::{attr, child_elements, collapsed_text, row_cells, sel, table_rows, tag};
use crate::engine::{render_children, Ctx};
use crate::{Result, WikidownError};

static ANCHOR: Lazy<Selector> = Lazy::new(|| sel("a[href]"));
static AVATAR: Lazy<Selector> = Lazy::new(|| sel("img"));

pub(crate) fn render_table(ctx: &mut Ctx, table: ElementRef, kind: TableKind) -> Result<String> {
    if !ctx.processed.insert(table) {
        return Ok(String::new());
    }

    let rendered = match kind {
        TableKind::History => render_history(table),
        TableKind::Layout => Ok(render_layout(ctx, table)),
        TableKind::Complex => Ok(render_complex(ctx, table)),
        TableKind::Standard => render_standard(ctx, table),
    };

    ctx.processed.mark_subtree(table);
    rendered
}

fn has_header_cell(row: ElementRef) -> bool {
    child_elements(row).any(|c| tag(c) == "th")
}

/// Flatten rendered cell markup to a single pipe-safe line.
fn flatten_cell(markdown: &str) -> String {
    let one_line: String = markdown
        .trim()
        .chars()
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();
    crate::dom::collapse_whitespace(&one_line)
        .trim()
        .replace('|', "\\|")
}

fn cell_markdown(ctx: &mut Ctx, cell: ElementRef) -> String {
    let rendered = render_children(ctx, cell);
    flatten_cell(&rendered)
}

/// Plain text of a cell, newline-collapsed and pipe-escaped.
fn cell_text(cell: ElementRef) -> String {
    collapsed_text(cell).replace('|', "\\|")
}

/// Fixed four-column version history table. Cells are consumed wholesale as
/// text or links; nothing inside renders again.
fn render_history(table: ElementRef) -> Result<String> {
    let data_rows: Vec<ElementRef> = table_rows(table)
        .into_iter()
        .filter(|row| !has_header_cell(*row))
        .collect();
    if data_rows.is_empty() {
        return Err(WikidownError::Render(
            "version history table has no data rows".to_string(),
        ));
    }

    let mut out =
        String::from("\n\n| Version | Published | Changed By | Comment |\n| --- | --- | --- | --- |\n");

    for row in data_rows {
        let cells = row_cells(row);
        let version = cells
            .first()
            .map(|cell| linked_or_text(*cell))
            .unwrap_or_default();
        let published = cells.get(1).map(|cell| cell_text(*cell)).unwrap_or_default();
        let changed_by = cells
            .get(2)
            .map(|cell| changed_by_cell(*cell))
            .unwrap_or_default();
        let comment = cells.get(3).map(|cell| cell_text(*cell)).unwrap_or_default();

        out.push_str(&format!(
            "| {version} | {published} | {changed_by} | {comment} |\n"
        ));
    }
    out.push('\n');
    Ok(out)
}

/// A markdown link when the cell carries an anchor, plain escaped text
/// otherwise.
fn linked_or_text(cell: ElementRef) -> String {
    if let Some(anchor) = cell.select(&ANCHOR).next() {
        let text = flatten_cell(&collapsed_text(anchor));
        let href = attr(anchor, "href").unwrap_or("#");
        format!("[{text}]({href})")
    } else {
        cell_text(cell)
    }
}

/// Avatar image fragment plus a linked or plain username.
fn changed_by_cell(cell: ElementRef) -> String {
    let mut out = String::new();
    if let Some(avatar) = cell.select(&AVATAR).next() {
        if let Some(src) = attr(avatar, "src") {
            out.push_str(&format!("![]({src}) "));
        }
    }
    out.push_str(&linked_or_text(cell));
    out
}

/// Layout tables lose their table semantics: each cell's block content is
/// emitted sequentially as a flat run of blocks.
fn render_layout(ctx: &mut Ctx, table: ElementRef) -> String {
    let mut out = String::from("\n\n");
    for row in table_rows(table) {
        for cell in row_cells(row) {
            if ctx.processed.contains(cell) {
                continue;
            }
            let blocks = render_children(ctx, cell);
            let blocks = blocks.trim();
            if !blocks.is_empty() {
                out.push_str(blocks);
                out.push_str("\n\n");
            }
        }
    }
    out
}

/// Complex tables become a sequence of titled sections: the first cell of
/// each row becomes a level-2 heading, remaining cells become paragraphs.
fn render_complex(ctx: &mut Ctx, table: ElementRef) -> String {
    let mut out = String::from("\n\n");
    for row in table_rows(table) {
        if ctx.processed.contains(row) {
            continue;
        }
        let cells = row_cells(row);
        let mut cells = cells.into_iter();

        if let Some(first) = cells.next() {
            let heading = cell_markdown(ctx, first);
            if !heading.is_empty() {
                out.push_str(&format!("## {heading}\n\n"));
            }
        }
        for cell in cells {
            let body = render_children(ctx, cell);
            let body = body.trim();
            if !body.is_empty() {
                out.push_str(body);
                out.push_str("\n\n");
            }
        }
    }
    out
}

/// GitHub-style pipe table. Column count is the maximum cell count across
/// all rows; short rows are padded with empty cells.
fn render_standard(ctx: &mut Ctx, table: ElementRef) -> Result<String> {
    if ctx.options.table_style == TableStyle::Html {
        return Ok(format!("\n\n{}\n\n", table.html()));
    }

    let rows = table_rows(table);
    let header_index = rows
        .iter()
        .position(|row| has_header_cell(*row))
        .unwrap_or(0);

    let mut rendered_rows: Vec<Vec<String>> = Vec::with_capacity(rows.len());
    for row in &rows {
        rendered_rows.push(
            row_cells(*row)
                .into_iter()
                .map(|cell| cell_markdown(ctx, cell))
                .collect(),
        );
    }

    let columns = rendered_rows.iter().map(Vec::len).max().unwrap_or(0);
    if columns == 0 {
        return Err(WikidownError::Render("table has no cells".to_string()));
    }

    let mut out = String::from("\n\n");
    for (index, cells) in rendered_rows.iter().enumerate() {
        out.push('|');
        for column in 0..columns {
            let cell = cells.get(column).map(String::as_str).unwrap_or("");
            out.push_str(&format!(" {cell} |"));
        }
        out.push('\n');

        if index == header_index {
            out.push('|');
            for _ in 0..columns {
                out.push_str(" --- |");
            }
            out.push('\n');
        }
    }
    out.push('\n');
    Ok(out)
}
