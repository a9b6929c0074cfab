//! DOM access layer over the parsed HTML tree.
//!
//! The conversion core treats the tree as a read-only capability: cached
//! selectors, attribute/class helpers, and the per-call identity set used for
//! traversal bookkeeping. Everything here works on `scraper::ElementRef`
//! values, which are cheap copies of tree positions.

use std::collections::HashSet;

use ego_tree::NodeId;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

// Hardcoded selectors never fail to parse; a failure here is a bug.

static MAIN_CONTENT: Lazy<Selector> = Lazy::new(|| sel("#main-content"));
static WIKI_CONTENT_IN_CONTENT: Lazy<Selector> = Lazy::new(|| sel("#content .wiki-content"));
static WIKI_CONTENT: Lazy<Selector> = Lazy::new(|| sel(".wiki-content"));
static CONTENT: Lazy<Selector> = Lazy::new(|| sel("#content"));
static VIEW: Lazy<Selector> = Lazy::new(|| sel(".view"));
static BODY: Lazy<Selector> = Lazy::new(|| sel("body"));

pub(crate) fn sel(css: &str) -> Selector {
    Selector::parse(css).expect("BUG: hardcoded CSS selector is invalid")
}

/// Resolve the main content region by testing known locations in order.
/// The document body is the final fallback.
pub(crate) fn resolve_main_content(doc: &Html) -> Option<ElementRef<'_>> {
    for selector in [
        &*MAIN_CONTENT,
        &*WIKI_CONTENT_IN_CONTENT,
        &*WIKI_CONTENT,
        &*CONTENT,
        &*VIEW,
        &*BODY,
    ] {
        if let Some(element) = doc.select(selector).next() {
            return Some(element);
        }
    }
    None
}

/// Per-call set of node identities already rendered by a specialized rule.
///
/// Created fresh at the start of each conversion and discarded at its end;
/// consulted before any rendering of an element is emitted.
#[derive(Debug, Default)]
pub(crate) struct ProcessedSet {
    seen: HashSet<NodeId>,
}

impl ProcessedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, element: ElementRef) -> bool {
        self.seen.contains(&element.id())
    }

    /// Returns `false` when the element was already present.
    pub fn insert(&mut self, element: ElementRef) -> bool {
        self.seen.insert(element.id())
    }

    /// Mark an element and every descendant node as consumed.
    pub fn mark_subtree(&mut self, element: ElementRef) {
        for node in element.descendants() {
            self.seen.insert(node.id());
        }
    }
}

/// Tag name of an element, lowercase in practice (html5ever lowercases).
pub(crate) fn tag(element: ElementRef) -> &str {
    element.value().name()
}

pub(crate) fn attr<'a>(element: ElementRef<'a>, name: &str) -> Option<&'a str> {
    element.value().attr(name)
}

pub(crate) fn class_attr(element: ElementRef) -> &str {
    element.value().attr("class").unwrap_or("")
}

pub(crate) fn id_attr(element: ElementRef) -> &str {
    element.value().attr("id").unwrap_or("")
}

pub(crate) fn has_class(element: ElementRef, name: &str) -> bool {
    element
        .value()
        .classes()
        .any(|class| class.eq_ignore_ascii_case(name))
}

/// Case-insensitive substring match against the class and id attributes.
pub(crate) fn class_or_id_contains(element: ElementRef, needle: &str) -> bool {
    let needle = needle.to_ascii_lowercase();
    class_attr(element).to_ascii_lowercase().contains(&needle)
        || id_attr(element).to_ascii_lowercase().contains(&needle)
}

/// Immediate element children.
pub(crate) fn child_elements(element: ElementRef) -> impl Iterator<Item = ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap)
}

/// Rows of a table: direct `tr` children plus rows inside
/// `thead`/`tbody`/`tfoot` sections, in document order. Rows of nested
/// tables are never included.
pub(crate) fn table_rows(table: ElementRef) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match tag(child) {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(child).filter(|c| tag(*c) == "tr"));
            }
            _ => {}
        }
    }
    rows
}

/// Immediate `td`/`th` cells of a row.
pub(crate) fn row_cells(row: ElementRef) -> Vec<ElementRef<'_>> {
    child_elements(row)
        .filter(|c| matches!(tag(*c), "td" | "th"))
        .collect()
}

/// All text content of a subtree with whitespace runs collapsed to spaces.
pub(crate) fn collapsed_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
        .trim()
        .to_string()
}

/// Collapse whitespace runs to single spaces.
pub(crate) fn collapse_whitespace(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut prev_was_whitespace = false;

    for c in s.chars() {
        if c.is_whitespace() {
            if !prev_was_whitespace {
                result.push(' ');
                prev_was_whitespace = true;
            }
        } else {
            result.push(c);
            prev_was_whitespace = false;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_main_content_priority() {
        let html = Html::parse_document(
            r#"<html><body><div id="content"><div class="wiki-content">inner</div></div></body></html>"#,
        );
        let content = resolve_main_content(&html).unwrap();
        assert_eq!(class_attr(content), "wiki-content");
    }

    #[test]
    fn test_resolve_main_content_body_fallback() {
        let html = Html::parse_document("<html><body><p>text</p></body></html>");
        let content = resolve_main_content(&html).unwrap();
        assert_eq!(tag(content), "body");
    }

    #[test]
    fn test_processed_set_one_time_membership() {
        let html = Html::parse_document("<html><body><div><p>a</p></div></body></html>");
        let div = html.select(&sel("div")).next().unwrap();
        let p = html.select(&sel("p")).next().unwrap();

        let mut processed = ProcessedSet::new();
        assert!(!processed.contains(div));
        assert!(processed.insert(div));
        assert!(!processed.insert(div));

        processed.mark_subtree(div);
        assert!(processed.contains(p));
    }

    #[test]
    fn test_table_rows_exclude_nested_tables() {
        let html = Html::parse_document(
            r#"<table id="outer"><tr><td><table><tr><td>x</td></tr><tr><td>y</td></tr></table></td></tr></table>"#,
        );
        let outer = html.select(&sel("#outer")).next().unwrap();
        let rows = table_rows(outer);
        assert_eq!(rows.len(), 1);
        assert_eq!(row_cells(rows[0]).len(), 1);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a  b\n\tc"), "a b c");
        assert_eq!(collapse_whitespace("plain"), "plain");
    }

    #[test]
    fn test_class_or_id_contains() {
        let html = Html::parse_document(r#"<div id="page-history-container" class="X">x</div>"#);
        let div = html.select(&sel("div")).next().unwrap();
        assert!(class_or_id_contains(div, "page-history"));
        assert!(!class_or_id_contains(div, "footer"));
    }
}
