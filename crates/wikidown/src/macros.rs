//! Panel and macro sub-converter.
//!
//! Renders call-out panels, expand blocks, code macros, the TOC placeholder,
//! Jira issue lists and status badges. A second invocation on an already
//! processed element returns an empty string, so a dedicated dispatch rule
//! and the generic fallback can never both render the same node.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Selector};
use wikidown_core::{CodeBlockStyle, PanelStyle};

use crate::classify::MacroKind;
use crate::dom::{attr, child_elements, collapsed_text, has_class, sel, tag};
use crate::engine::{render_children, Ctx};
use crate::{Result, WikidownError};

static PANEL_TITLE: Lazy<Selector> = Lazy::new(|| sel(".panelHeader, .title, .admonition-title"));
static PANEL_BODY: Lazy<Selector> = Lazy::new(|| {
    sel(".panelContent, .confluence-information-macro-body, .panel-body, .rich-text-body")
});
static EXPAND_CONTROL: Lazy<Selector> = Lazy::new(|| sel(".expand-control-text"));
static EXPAND_CONTENT: Lazy<Selector> = Lazy::new(|| sel(".expand-content"));
static PRE: Lazy<Selector> = Lazy::new(|| sel("pre"));
static BROWSE_LINK: Lazy<Selector> = Lazy::new(|| sel(r#"a[href*="/browse/"]"#));

static LANGUAGE_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"language=([A-Za-z0-9#+-]+)").expect("BUG: invalid language pattern"));
static COLOUR_PARAM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"colou?r=([A-Za-z]+)").expect("BUG: invalid colour pattern"));

pub(crate) fn render_macro(ctx: &mut Ctx, element: ElementRef, kind: MacroKind) -> Result<String> {
    if !ctx.processed.insert(element) {
        return Ok(String::new());
    }

    let rendered = match kind {
        MacroKind::Code => render_code(ctx, element),
        MacroKind::Expand => Ok(render_expand(ctx, element)),
        MacroKind::Toc => Ok(render_toc(ctx)),
        MacroKind::Jira => Ok(render_jira(ctx, element)),
        MacroKind::Status => Ok(render_status(ctx, element)),
        _ => Ok(render_panel(ctx, element, kind)),
    };

    ctx.processed.mark_subtree(element);
    rendered
}

/// Panel title from the optional header sub-element.
fn panel_title(element: ElementRef) -> Option<ElementRef<'_>> {
    element.select(&PANEL_TITLE).next()
}

/// True when `target` is `parent` itself or sits anywhere in its subtree.
fn contains_node(parent: ElementRef, target: ElementRef) -> bool {
    parent.id() == target.id() || target.ancestors().any(|ancestor| ancestor.id() == parent.id())
}

/// Build a panel/expand body by iterating the immediate children of the body
/// sub-element, or all children except the title when no body exists. The
/// title may sit inside a wrapper child, so the skip checks containment.
fn panel_body(ctx: &mut Ctx, element: ElementRef, title: Option<ElementRef>) -> String {
    let (parent, skip) = match element.select(&PANEL_BODY).next() {
        Some(body) => (body, None),
        None => (element, title),
    };

    let mut lines = String::new();
    for child in child_elements(parent) {
        if skip.map(|t| contains_node(child, t)).unwrap_or(false) {
            continue;
        }
        match tag(child) {
            "br" => lines.push('\n'),
            "p" => {
                let text = render_children(ctx, child);
                let text = text.trim().to_string();
                if !text.is_empty() {
                    lines.push_str(&text);
                    lines.push_str("\n\n");
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag(child).as_bytes()[1] - b'0';
                let text = collapsed_text(child);
                lines.push_str(&format!("{} {}\n", "#".repeat(level as usize), text));
            }
            _ => {
                let text = render_children(ctx, child);
                let text = text.trim().to_string();
                if !text.is_empty() {
                    lines.push_str(&text);
                    lines.push('\n');
                }
            }
        }
    }
    lines.trim_end().to_string()
}

fn render_panel(ctx: &mut Ctx, element: ElementRef, kind: MacroKind) -> String {
    let title_element = panel_title(element);
    let title = title_element.map(collapsed_text).unwrap_or_default();
    let body = panel_body(ctx, element, title_element);

    if !ctx.options.panels {
        return format!("\n\n{}\n\n", body.trim());
    }

    match ctx.options.panel_style {
        PanelStyle::Blockquote => {
            let mut out = String::from("\n\n");
            if !title.is_empty() {
                out.push_str(&format!("> **{title}**\n"));
            }
            for line in body.lines() {
                out.push_str(&format!("> {line}\n"));
            }
            out.push('\n');
            out
        }
        PanelStyle::Div => {
            let heading = if title.is_empty() {
                String::new()
            } else {
                format!("<h3>{title}</h3>")
            };
            format!(
                "\n\n<div class=\"panel {}\">{}{}</div>\n\n",
                kind.name(),
                heading,
                body
            )
        }
        PanelStyle::Section => {
            let mut out = String::from("\n\n");
            if !title.is_empty() {
                out.push_str(&format!("## {title}\n\n"));
            }
            out.push_str(&body);
            out.push_str("\n\n");
            out
        }
    }
}

fn render_expand(ctx: &mut Ctx, element: ElementRef) -> String {
    let title = element
        .select(&EXPAND_CONTROL)
        .next()
        .map(collapsed_text)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Details".to_string());

    let body = match element.select(&EXPAND_CONTENT).next() {
        Some(content) => panel_body(ctx, content, None),
        None => panel_body(ctx, element, None),
    };

    if !ctx.options.expand_macros {
        return format!("\n\n{}\n\n", body.trim());
    }

    format!("\n\n<details>\n<summary>{title}</summary>\n\n{body}\n</details>\n\n")
}

fn render_code(ctx: &mut Ctx, element: ElementRef) -> Result<String> {
    let pre = element
        .select(&PRE)
        .next()
        .or_else(|| (tag(element) == "pre").then_some(element))
        .ok_or_else(|| WikidownError::Render("code macro has no pre content".to_string()))?;

    let code = pre.text().collect::<String>();
    let code = code.trim_end();

    if !ctx.options.code_blocks {
        return Ok(format!("\n\n{}\n\n", code.trim()));
    }

    let language = attr(element, "data-macro-parameters")
        .or_else(|| attr(pre, "data-macro-parameters"))
        .and_then(|params| LANGUAGE_PARAM.captures(params))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or("");

    Ok(match ctx.options.code_block_style {
        CodeBlockStyle::Fenced => format!("\n\n```{language}\n{code}\n```\n\n"),
        CodeBlockStyle::Indented => {
            let indented: Vec<String> =
                code.lines().map(|line| format!("    {line}")).collect();
            format!("\n\n{}\n\n", indented.join("\n"))
        }
    })
}

/// Real TOC generation is out of scope; a placeholder marker is emitted.
fn render_toc(ctx: &Ctx) -> String {
    if !ctx.options.toc {
        return String::new();
    }
    "\n\n## Table of Contents\n\n[TOC]\n\n".to_string()
}

fn render_jira(ctx: &mut Ctx, element: ElementRef) -> String {
    if !ctx.options.jira_issues {
        return format!("\n\n{}\n\n", collapsed_text(element));
    }

    let mut bullets = String::new();
    for anchor in element.select(&BROWSE_LINK) {
        let Some(href) = attr(anchor, "href") else {
            continue;
        };
        let key = {
            let text = collapsed_text(anchor);
            if text.is_empty() {
                href.rsplit('/').next().unwrap_or(href).to_string()
            } else {
                text
            }
        };
        bullets.push_str(&format!("* [{key}]({href})\n"));
    }

    if bullets.is_empty() {
        return "\n\n*Jira issue list could not be extracted*\n\n".to_string();
    }
    format!("\n\n{bullets}\n")
}

fn render_status(ctx: &Ctx, element: ElementRef) -> String {
    let text = collapsed_text(element);
    if !ctx.options.status_badges {
        return text;
    }

    if ctx.options.panel_style == PanelStyle::Div {
        let colour = attr(element, "data-macro-parameters")
            .and_then(|params| COLOUR_PARAM.captures(params))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_ascii_lowercase())
            .or_else(|| lozenge_colour(element))
            .unwrap_or_else(|| "grey".to_string());
        format!("<span class=\"status-badge status-{colour}\">{text}</span>")
    } else {
        format!("[{text}]")
    }
}

fn lozenge_colour(element: ElementRef) -> Option<String> {
    for (class, colour) in [
        ("aui-lozenge-success", "green"),
        ("aui-lozenge-error", "red"),
        ("aui-lozenge-current", "yellow"),
        ("aui-lozenge-complete", "blue"),
    ] {
        if has_class(element, class) {
            return Some(colour.to_string());
        }
    }
    None
}
