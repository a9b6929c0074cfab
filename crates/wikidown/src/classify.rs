//! Element classification.
//!
//! Pure predicates that resolve each element to a single category before any
//! rendering happens. Tables follow a fixed precedence (History > Layout >
//! Complex > Standard), so a table matching several predicates still gets
//! exactly one renderer.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};

use crate::dom::{
    attr, child_elements, class_attr, class_or_id_contains, collapsed_text, row_cells, sel,
    table_rows, tag,
};

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| sel("p"));
static LINE_BREAK: Lazy<Selector> = Lazy::new(|| sel("br"));
static RICH_CELL_CONTENT: Lazy<Selector> =
    Lazy::new(|| sel("h1, h2, h3, h4, h5, h6, img, ul, ol, table, .panel"));

/// Table categories, one renderer each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// Page version history view
    History,
    /// Table used for visual arrangement, not data
    Layout,
    /// Data table whose cells carry block structure
    Complex,
    /// Plain data table
    Standard,
}

/// Panel and macro kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroKind {
    Info,
    Warning,
    Note,
    Tip,
    Code,
    Expand,
    Toc,
    Status,
    Jira,
}

impl MacroKind {
    /// Lowercase kind name, used for placeholders and panel CSS classes.
    pub fn name(self) -> &'static str {
        match self {
            MacroKind::Info => "info",
            MacroKind::Warning => "warning",
            MacroKind::Note => "note",
            MacroKind::Tip => "tip",
            MacroKind::Code => "code",
            MacroKind::Expand => "expand",
            MacroKind::Toc => "toc",
            MacroKind::Status => "status",
            MacroKind::Jira => "jira",
        }
    }

    /// Kinds rendered as call-out panels.
    pub fn is_panel(self) -> bool {
        matches!(
            self,
            MacroKind::Info | MacroKind::Warning | MacroKind::Note | MacroKind::Tip
        )
    }
}

/// Classify a table element. First matching category wins.
pub fn classify_table(table: ElementRef) -> TableKind {
    if is_history_table(table) {
        TableKind::History
    } else if is_layout_table(table) {
        TableKind::Layout
    } else if is_complex_table(table) {
        TableKind::Complex
    } else {
        TableKind::Standard
    }
}

fn is_history_table(table: ElementRef) -> bool {
    if class_or_id_contains(table, "page-history") || class_or_id_contains(table, "tableview") {
        return true;
    }

    // Header row text carrying a version token together with a
    // changed-by/published token also marks a history view. Only the
    // table's own first row counts, never a nested table's.
    let Some(header_row) = table_rows(table).into_iter().next() else {
        return false;
    };
    let header = collapsed_text(header_row).to_ascii_lowercase();
    let versionish = header.contains("version") || header.contains("v.");
    let authorish = header.contains("changed by") || header.contains("published");
    versionish && authorish
}

fn is_layout_table(table: ElementRef) -> bool {
    let classes = class_attr(table).to_ascii_lowercase();
    if classes.contains("layout")
        || classes.contains("sectioncolumnwrapper")
        || classes.contains("wysiwyg-macro")
    {
        return true;
    }

    if inside_layout_container(table) && !has_visible_border(table) {
        return true;
    }

    single_block_cell(table)
}

fn inside_layout_container(table: ElementRef) -> bool {
    table
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| {
            let classes = class_attr(ancestor).to_ascii_lowercase();
            classes.contains("layout")
                || classes.contains("column")
                || classes.contains("section")
                || classes.contains("panelcontent")
                || classes.contains("panel-content")
        })
}

fn has_visible_border(table: ElementRef) -> bool {
    match attr(table, "border") {
        Some("0") => false,
        Some(_) => true,
        None => {
            let Some(style) = attr(table, "style") else {
                return false;
            };
            let style: String = style
                .to_ascii_lowercase()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            style.contains("border")
                && !style.contains("border:none")
                && !style.contains("border:0")
                && !style.contains("border-style:none")
        }
    }
}

/// A single-row, single-cell table whose sole cell holds block-level children
/// is a wrapper, not data.
fn single_block_cell(table: ElementRef) -> bool {
    let rows = table_rows(table);
    if rows.len() != 1 {
        return false;
    }
    let cells = row_cells(rows[0]);
    if cells.len() != 1 {
        return false;
    }
    child_elements(cells[0]).any(|child| matches!(tag(child), "div" | "table" | "ul" | "ol" | "p"))
}

fn is_complex_table(table: ElementRef) -> bool {
    table_rows(table)
        .into_iter()
        .flat_map(row_cells)
        .any(is_complex_cell)
}

fn is_complex_cell(cell: ElementRef) -> bool {
    const LONG_TEXT: usize = 100;

    cell.select(&RICH_CELL_CONTENT).next().is_some()
        || cell.select(&PARAGRAPH).count() > 1
        || cell.select(&LINE_BREAK).count() > 2
        || collapsed_text(cell).len() > LONG_TEXT
}

/// Classify a panel or macro element; `None` when the element is neither.
pub fn classify_macro(element: ElementRef) -> Option<MacroKind> {
    if let Some(name) = attr(element, "data-macro-name") {
        return Some(kind_from_macro_name(name));
    }

    let classes = class_attr(element).to_ascii_lowercase();
    if classes.contains("expand-container") {
        Some(MacroKind::Expand)
    } else if classes.contains("toc-macro") {
        Some(MacroKind::Toc)
    } else if classes.contains("status-macro") || classes.contains("aui-lozenge") {
        Some(MacroKind::Status)
    } else if classes.contains("jira-issue") {
        Some(MacroKind::Jira)
    } else if classes.contains("code") && classes.contains("panel") {
        Some(MacroKind::Code)
    } else if is_panel_class(&classes) {
        if classes.contains("warning") || classes.contains("error") {
            Some(MacroKind::Warning)
        } else if classes.contains("note") {
            Some(MacroKind::Note)
        } else if classes.contains("tip") || classes.contains("success") {
            Some(MacroKind::Tip)
        } else {
            Some(MacroKind::Info)
        }
    } else {
        None
    }
}

fn is_panel_class(classes: &str) -> bool {
    classes.contains("panel")
        || classes.contains("information-macro")
        || classes.contains("message")
        || classes.contains("admonition")
}

fn kind_from_macro_name(name: &str) -> MacroKind {
    match name.to_ascii_lowercase().as_str() {
        "warning" => MacroKind::Warning,
        "note" => MacroKind::Note,
        "tip" => MacroKind::Tip,
        "code" => MacroKind::Code,
        "expand" => MacroKind::Expand,
        "toc" => MacroKind::Toc,
        "status" => MacroKind::Status,
        "jira" | "jiraissues" => MacroKind::Jira,
        _ => MacroKind::Info,
    }
}

/// Non-content elements skipped entirely during the walk.
pub fn should_ignore(element: ElementRef) -> bool {
    const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "button"];
    const DENYLIST: &[&str] = &[
        "breadcrumb",
        "footer",
        "navigation",
        "sidebar",
        "page-actions",
        "page-metadata-secondary",
    ];

    if SKIPPED_TAGS.contains(&tag(element)) {
        return true;
    }

    if attr(element, "aria-hidden") == Some("true") {
        return true;
    }

    if let Some(style) = attr(element, "style") {
        let style: String = style
            .to_ascii_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if style.contains("display:none") || style.contains("visibility:hidden") {
            return true;
        }
    }

    DENYLIST
        .iter()
        .any(|needle| class_or_id_contains(element, needle))
}
