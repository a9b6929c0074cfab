//! Metadata and breadcrumb extraction.
//!
//! Pulls title, last-modified editor, author/date and the navigation trail
//! from the known locations of a wiki export, and renders the YAML
//! frontmatter block and the visible breadcrumb trail line. Also collects
//! attachment links for the appended attachments list.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use wikidown_core::{AttachmentInfo, Breadcrumb, ConversionOptions, DocumentMetadata};

use crate::dom::{attr, collapsed_text, sel};

static TITLE_LOCATIONS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["#title-text", "#title-heading", ".pagetitle", "h1.page-title"]
        .iter()
        .map(|css| sel(css))
        .collect()
});
static DOCUMENT_TITLE: Lazy<Selector> = Lazy::new(|| sel("title"));
static MODIFIED_LOCATIONS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".last-modified",
        "#content-metadata .editor",
        ".page-metadata-modification-info",
    ]
    .iter()
    .map(|css| sel(css))
    .collect()
});
static PAGE_METADATA: Lazy<Selector> = Lazy::new(|| sel(".page-metadata"));
static BREADCRUMB_ITEMS: Lazy<Selector> = Lazy::new(|| sel("#breadcrumbs li"));
static ANCHOR: Lazy<Selector> = Lazy::new(|| sel("a"));
static ATTACHMENT_ANCHORS: Lazy<Selector> = Lazy::new(|| {
    sel(r#"a[href*="/download/attachments/"], .attachments a[href], #attachments a[href]"#)
});

static MODIFIED_BY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)last (?:updated|modified) by\s+([^,]+?)(?:\s+on\s|,|$)")
        .expect("BUG: invalid editor pattern")
});
static CREATED_BY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)created by\s+(.+?)(?:,|\s+on\s|\s+last\s|$)")
        .expect("BUG: invalid author pattern")
});
static CREATED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([A-Za-z]{3,9}\.? \d{1,2},? \d{4})\b").expect("BUG: invalid date pattern")
});

/// Extract all document metadata in one pass. Built once per conversion,
/// read-only afterward.
pub fn extract_metadata(doc: &Html, options: &ConversionOptions) -> DocumentMetadata {
    let raw_title = raw_title(doc);
    let title = strip_space_prefix(&raw_title);

    let blob = doc
        .select(&PAGE_METADATA)
        .next()
        .map(collapsed_text)
        .unwrap_or_default();

    let last_modified = if options.last_modified {
        extract_last_modified(doc, &blob)
    } else {
        String::new()
    };

    let breadcrumbs = if options.breadcrumbs {
        extract_breadcrumbs(doc, &raw_title)
    } else {
        Vec::new()
    };

    DocumentMetadata {
        title,
        last_modified,
        created_by: capture(&CREATED_BY, &blob),
        created_date: capture(&CREATED_DATE, &blob),
        breadcrumbs,
    }
}

fn raw_title(doc: &Html) -> String {
    for selector in TITLE_LOCATIONS.iter() {
        if let Some(element) = doc.select(selector).next() {
            let text = collapsed_text(element);
            if !text.is_empty() {
                return text;
            }
        }
    }
    if let Some(title) = doc.select(&DOCUMENT_TITLE).next() {
        let text = collapsed_text(title);
        if !text.is_empty() {
            return text;
        }
    }
    debug!("no title location matched, using placeholder");
    "Untitled Page".to_string()
}

/// Strip a "Space : Parent : " style prefix, keeping the final segment.
fn strip_space_prefix(raw: &str) -> String {
    match raw.rfind(" : ") {
        Some(idx) => raw[idx + 3..].trim().to_string(),
        None => raw.trim().to_string(),
    }
}

fn extract_last_modified(doc: &Html, blob: &str) -> String {
    for selector in MODIFIED_LOCATIONS.iter() {
        if let Some(element) = doc.select(selector).next() {
            let text = collapsed_text(element);
            if !text.is_empty() {
                return text;
            }
        }
    }
    // Only the combined metadata blob is present; pull just the editor name.
    capture(&MODIFIED_BY, blob)
}

fn capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

fn extract_breadcrumbs(doc: &Html, raw_title: &str) -> Vec<Breadcrumb> {
    let items: Vec<ElementRef> = doc.select(&BREADCRUMB_ITEMS).collect();

    if !items.is_empty() {
        return items
            .iter()
            .filter_map(|item| {
                if let Some(anchor) = item.select(&ANCHOR).next() {
                    let text = collapsed_text(anchor);
                    if text.is_empty() {
                        return None;
                    }
                    let href = attr(anchor, "href").map(normalize_href);
                    Some(Breadcrumb::new(text, href))
                } else {
                    // Current page entries carry no anchor.
                    let text = collapsed_text(*item);
                    (!text.is_empty()).then(|| Breadcrumb::new(text, None))
                }
            })
            .collect();
    }

    // No breadcrumb container: derive the trail from the title segments.
    let segments: Vec<&str> = raw_title.split(" : ").map(str::trim).collect();
    if segments.len() < 2 {
        return Vec::new();
    }
    segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| Breadcrumb::new(s, None))
        .collect()
}

/// Normalize an export-local href to a relative Markdown link target.
/// Scheme-qualified, fragment and already-relative targets pass through.
fn normalize_href(href: &str) -> String {
    if href.starts_with('#')
        || href.starts_with("./")
        || href.starts_with("../")
        || href.contains("://")
        || href.starts_with("mailto:")
    {
        href.to_string()
    } else if let Some(rest) = href.strip_prefix('/') {
        format!("./{rest}")
    } else {
        format!("./{href}")
    }
}

fn strip_query(href: &str) -> &str {
    href.split('?').next().unwrap_or(href)
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}

/// Render the YAML frontmatter block, or the empty string when metadata,
/// breadcrumbs and last-modified are all disabled.
pub fn generate_frontmatter(meta: &DocumentMetadata, options: &ConversionOptions) -> String {
    if !(options.metadata || options.breadcrumbs || options.last_modified) {
        return String::new();
    }

    let mut out = String::from("---\n");
    out.push_str(&format!("title: \"{}\"\n", escape_quotes(&meta.title)));

    if options.metadata && options.created_by && !meta.created_by.is_empty() {
        out.push_str(&format!(
            "created_by: \"{}\"\n",
            escape_quotes(&meta.created_by)
        ));
    }
    if options.metadata && options.created_date && !meta.created_date.is_empty() {
        out.push_str(&format!(
            "created_date: \"{}\"\n",
            escape_quotes(&meta.created_date)
        ));
    }
    if options.last_modified && !meta.last_modified.is_empty() {
        out.push_str(&format!(
            "last_modified: \"{}\"\n",
            escape_quotes(&meta.last_modified)
        ));
    }
    if options.breadcrumbs && !meta.breadcrumbs.is_empty() {
        out.push_str("breadcrumbs:\n");
        for crumb in &meta.breadcrumbs {
            out.push_str(&format!("  - title: \"{}\"\n", escape_quotes(&crumb.text)));
            let url = strip_query(crumb.href.as_deref().unwrap_or("#"));
            out.push_str(&format!("    url: \"{}\"\n", escape_quotes(url)));
        }
    }

    out.push_str("---\n\n");
    out
}

/// Render the visible breadcrumb trail line, or the empty string when the
/// trail is empty.
pub fn breadcrumb_trail(meta: &DocumentMetadata) -> String {
    if meta.breadcrumbs.is_empty() {
        return String::new();
    }
    let crumbs: Vec<String> = meta
        .breadcrumbs
        .iter()
        .map(|crumb| {
            let url = strip_query(crumb.href.as_deref().unwrap_or("#"));
            format!("[{}]({})", crumb.text, url)
        })
        .collect();
    format!("> {}\n\n", crumbs.join(" > "))
}

/// Collect attachment links from the whole document, keyed by attachment id
/// in document order.
pub(crate) fn collect_attachments(doc: &Html) -> IndexMap<String, AttachmentInfo> {
    let mut attachments = IndexMap::new();

    for anchor in doc.select(&ATTACHMENT_ANCHORS) {
        let Some(href) = attr(anchor, "href") else {
            continue;
        };
        let filename = {
            let text = collapsed_text(anchor);
            if text.is_empty() {
                strip_query(href)
                    .rsplit('/')
                    .next()
                    .unwrap_or(href)
                    .to_string()
            } else {
                text
            }
        };
        let id = attr(anchor, "data-linked-resource-id")
            .unwrap_or(href)
            .to_string();

        attachments.entry(id.clone()).or_insert(AttachmentInfo {
            id,
            filename,
            container_id: attr(anchor, "data-linked-resource-container-id").map(String::from),
            href: href.to_string(),
        });
    }

    attachments
}

/// One bullet per attachment.
pub(crate) fn attachments_list(attachments: &IndexMap<String, AttachmentInfo>) -> String {
    let mut out = String::new();
    for attachment in attachments.values() {
        out.push_str(&format!(
            "* [{}]({})\n",
            attachment.filename, attachment.href
        ));
    }
    out
}
