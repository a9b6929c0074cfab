//! Conversion engine: the rule dispatcher.
//!
//! Locates the main content region, walks it depth-first, classifies each
//! element and dispatches it to the matching sub-converter or to the generic
//! fallback renderer, then assembles the document in a fixed order and runs
//! the normalizer.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use wikidown_core::{
    CodeBlockStyle, ConversionOptions, HeadingStyle, ImageStyle, LinkStyle, MacroHandling,
};

use crate::classify::{classify_macro, classify_table, should_ignore, TableKind};
use crate::dom::{
    attr, child_elements, class_attr, collapse_whitespace, collapsed_text, resolve_main_content,
    sel, tag, ProcessedSet,
};
use crate::{macros, metadata, normalize, tables};
use crate::{Result, WikidownError};

static TABLE: Lazy<Selector> = Lazy::new(|| sel("table"));

/// Per-call conversion state: the immutable options and the set of node
/// identities already rendered. Created fresh for every `convert` call and
/// discarded at its return.
pub(crate) struct Ctx<'a> {
    pub options: &'a ConversionOptions,
    pub processed: ProcessedSet,
}

/// The main service for converting wiki-export HTML to Markdown.
pub struct Converter {
    options: ConversionOptions,
}

impl Converter {
    /// Create a new converter with default options
    pub fn new() -> Self {
        Self {
            options: ConversionOptions::default(),
        }
    }

    /// Create a converter with custom options
    pub fn with_options(options: ConversionOptions) -> Self {
        Self { options }
    }

    /// Get the current options
    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Get mutable access to options
    pub fn options_mut(&mut self) -> &mut ConversionOptions {
        &mut self.options
    }

    /// Convert one exported HTML document to Markdown.
    ///
    /// No state survives the call; batch callers may run conversions
    /// concurrently across documents.
    pub fn convert(&self, html: &str) -> Result<String> {
        if html.trim().is_empty() {
            return Err(WikidownError::Parse("input document is empty".to_string()));
        }

        let doc = Html::parse_document(html);
        let meta = metadata::extract_metadata(&doc, &self.options);
        let content = resolve_main_content(&doc).ok_or(WikidownError::MissingContent)?;

        let mut ctx = Ctx {
            options: &self.options,
            processed: ProcessedSet::new(),
        };
        let body = render_children(&mut ctx, content);

        let mut out = String::new();
        out.push_str(&metadata::generate_frontmatter(&meta, &self.options));
        if self.options.breadcrumbs {
            out.push_str(&metadata::breadcrumb_trail(&meta));
        }
        if self.options.title_heading && !meta.title.is_empty() {
            out.push_str(&format!("# {}\n\n", meta.title));
        }
        out.push_str(&body);

        // A history table outside the content region is appended, unless the
        // walk already consumed one.
        if self.options.history {
            self.append_history(&doc, &mut ctx, &mut out);
        }

        if self.options.attachments {
            let attachments = metadata::collect_attachments(&doc);
            if !attachments.is_empty() {
                out.push_str("\n\n");
                out.push_str(&metadata::attachments_list(&attachments));
            }
        }

        Ok(normalize::normalize(&out))
    }

    fn append_history(&self, doc: &Html, ctx: &mut Ctx, out: &mut String) {
        let history = doc.select(&TABLE).find(|table| {
            !ctx.processed.contains(*table) && classify_table(*table) == TableKind::History
        });
        let Some(history) = history else {
            return;
        };
        match tables::render_table(ctx, history, TableKind::History) {
            Ok(markdown) => out.push_str(&markdown),
            Err(err) => warn!(error = %err, "skipping unrenderable version history table"),
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the children of an element: text nodes flow through with
/// whitespace collapsed, element nodes are dispatched individually.
pub(crate) fn render_children(ctx: &mut Ctx, element: ElementRef) -> String {
    let mut out = String::new();

    for child in element.children() {
        match child.value() {
            scraper::Node::Text(text) => {
                let raw: &str = text;
                if raw.trim().is_empty() {
                    // Between inline siblings a source line break is a word
                    // separator; after a block (output ends in a newline) the
                    // whitespace is formatting, not content.
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push(' ');
                    }
                } else {
                    out.push_str(&collapse_whitespace(raw));
                }
            }
            scraper::Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    out.push_str(&render_element(ctx, child_element));
                }
            }
            _ => {}
        }
    }

    out
}

/// Classify one element and dispatch it. Consulting the processed set first
/// guarantees each element renders at most once per conversion.
fn render_element(ctx: &mut Ctx, element: ElementRef) -> String {
    if ctx.processed.contains(element) {
        return String::new();
    }
    if should_ignore(element) {
        ctx.processed.mark_subtree(element);
        return String::new();
    }

    if tag(element) == "table" {
        if !ctx.options.tables {
            ctx.processed.mark_subtree(element);
            let text = collapsed_text(element);
            return block(&text);
        }
        let kind = classify_table(element);
        return match tables::render_table(ctx, element, kind) {
            Ok(markdown) => markdown,
            Err(err) => recover(ctx, element, err),
        };
    }

    if let Some(kind) = classify_macro(element) {
        return match ctx.options.macro_handling {
            MacroHandling::Render => match macros::render_macro(ctx, element, kind) {
                Ok(markdown) => markdown,
                Err(err) => recover(ctx, element, err),
            },
            MacroHandling::Placeholder => {
                ctx.processed.mark_subtree(element);
                format!("\n\n<!-- macro: {} -->\n\n", kind.name())
            }
            MacroHandling::Strip => {
                ctx.processed.mark_subtree(element);
                String::new()
            }
        };
    }

    render_plain(ctx, element)
}

/// Generic fallback renderer for standard inline and block constructs.
fn render_plain(ctx: &mut Ctx, element: ElementRef) -> String {
    match tag(element) {
        "h1" => render_heading(ctx, element, 1),
        "h2" => render_heading(ctx, element, 2),
        "h3" => render_heading(ctx, element, 3),
        "h4" => render_heading(ctx, element, 4),
        "h5" => render_heading(ctx, element, 5),
        "h6" => render_heading(ctx, element, 6),

        "p" => {
            let content = render_children(ctx, element);
            let content = content.trim();
            if content.is_empty() {
                String::new()
            } else {
                block(content)
            }
        }

        "strong" | "b" => wrap_inline(ctx, element, "**", "**"),
        "em" | "i" | "u" => wrap_inline(ctx, element, "_", "_"),
        "s" | "del" => wrap_inline(ctx, element, "~~", "~~"),
        "code" => {
            let content = collapsed_text(element);
            if content.is_empty() {
                String::new()
            } else {
                format!("`{content}`")
            }
        }

        "ul" => render_list(ctx, element, false),
        "ol" => render_list(ctx, element, true),

        "a" => render_link(ctx, element),
        "img" => render_image(ctx, element),

        "br" => "\n".to_string(),
        "hr" => "\n\n---\n\n".to_string(),

        "pre" => render_pre(ctx, element),

        "blockquote" => {
            let content = render_children(ctx, element);
            let content = content.trim().to_string();
            if content.is_empty() {
                return String::new();
            }
            let quoted: Vec<String> = content.lines().map(|line| format!("> {line}")).collect();
            block(&quoted.join("\n"))
        }

        // Unknown wrappers contribute their children only.
        other => {
            debug!(tag = other, "no dedicated rule, rendering children");
            render_children(ctx, element)
        }
    }
}

fn block(content: &str) -> String {
    format!("\n\n{content}\n\n")
}

fn wrap_inline(ctx: &mut Ctx, element: ElementRef, open: &str, close: &str) -> String {
    let content = render_children(ctx, element);
    if content.trim().is_empty() {
        return String::new();
    }
    if !ctx.options.emphasis {
        return content;
    }
    format!("{open}{content}{close}")
}

fn render_heading(ctx: &mut Ctx, element: ElementRef, level: usize) -> String {
    let content = render_children(ctx, element);
    let content = content.trim();
    if content.is_empty() {
        return String::new();
    }
    if !ctx.options.headings {
        return block(content);
    }

    match ctx.options.heading_style {
        HeadingStyle::Setext if level <= 2 => {
            let underline = if level == 1 { "=" } else { "-" };
            block(&format!(
                "{}\n{}",
                content,
                underline.repeat(content.chars().count())
            ))
        }
        _ => block(&format!("{} {}", "#".repeat(level), content)),
    }
}

fn render_list(ctx: &mut Ctx, list: ElementRef, ordered: bool) -> String {
    if !ctx.options.lists {
        ctx.processed.mark_subtree(list);
        return block(&collapsed_text(list));
    }

    let task_list = class_attr(list).contains("inline-task-list");
    let mut out = String::from("\n\n");
    let mut index = 0usize;

    for item in child_elements(list).filter(|c| tag(*c) == "li") {
        if ctx.processed.contains(item) {
            continue;
        }
        index += 1;

        let content = render_children(ctx, item);
        let content = content
            .trim()
            .replace("\n\n", "\n")
            .replace('\n', "\n    ");

        let marker = if task_list {
            if class_attr(item).contains("checked") {
                "- [x] ".to_string()
            } else {
                "- [ ] ".to_string()
            }
        } else if ordered {
            format!("{index}. ")
        } else {
            "- ".to_string()
        };

        out.push_str(&marker);
        out.push_str(&content);
        out.push('\n');
    }
    out.push('\n');
    out
}

fn render_link(ctx: &mut Ctx, anchor: ElementRef) -> String {
    let content = render_children(ctx, anchor);
    let text = content.trim();

    let mention = class_attr(anchor).contains("confluence-userlink");
    let text = if mention && !text.starts_with('@') {
        format!("@{text}")
    } else {
        text.to_string()
    };

    if !ctx.options.links {
        return text;
    }

    match attr(anchor, "href") {
        Some(href) if !href.is_empty() && !text.is_empty() => match ctx.options.link_style {
            // Full reference tracking would need document-wide label state,
            // so both styles emit the inline form.
            LinkStyle::Inlined | LinkStyle::Referenced => format!("[{text}]({href})"),
        },
        _ => text,
    }
}

fn render_image(ctx: &mut Ctx, image: ElementRef) -> String {
    let alt = attr(image, "alt").unwrap_or("").trim();

    // Emoticons carry their meaning in the alt text.
    if class_attr(image).contains("emoticon") {
        return alt.to_string();
    }

    if !ctx.options.images {
        return alt.to_string();
    }

    match ctx.options.image_style {
        ImageStyle::Html => image.html(),
        ImageStyle::Markdown => {
            let Some(src) = attr(image, "src") else {
                return alt.to_string();
            };
            match attr(image, "title") {
                Some(title) if !title.is_empty() => format!("![{alt}]({src} \"{title}\")"),
                _ => format!("![{alt}]({src})"),
            }
        }
    }
}

/// A `pre` outside any code macro still becomes a code block.
fn render_pre(ctx: &mut Ctx, pre: ElementRef) -> String {
    ctx.processed.mark_subtree(pre);
    let code = pre.text().collect::<String>();
    let code = code.trim_end().trim_start_matches('\n');
    if code.trim().is_empty() {
        return String::new();
    }
    if !ctx.options.code_blocks {
        return block(code.trim());
    }
    match ctx.options.code_block_style {
        CodeBlockStyle::Fenced => format!("\n\n```\n{code}\n```\n\n"),
        CodeBlockStyle::Indented => {
            let indented: Vec<String> = code.lines().map(|line| format!("    {line}")).collect();
            block(&indented.join("\n"))
        }
    }
}

/// A failing specialized renderer is not fatal: fall back to plain trimmed
/// text for the subtree and continue with the rest of the document.
fn recover(ctx: &mut Ctx, element: ElementRef, err: WikidownError) -> String {
    warn!(error = %err, tag = tag(element), "sub-renderer failed, falling back to plain text");
    ctx.processed.mark_subtree(element);
    let text = collapsed_text(element);
    if text.is_empty() {
        String::new()
    } else {
        block(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikidown_core::PanelStyle;

    fn convert(html: &str) -> String {
        Converter::new().convert(html).unwrap()
    }

    #[test]
    fn test_empty_input_is_a_parse_error() {
        let converter = Converter::new();
        assert!(matches!(
            converter.convert("   \n "),
            Err(WikidownError::Parse(_))
        ));
    }

    #[test]
    fn test_simple_paragraph() {
        let result = convert("<html><body><p>Hello World</p></body></html>");
        assert!(result.contains("Hello World"));
    }

    #[test]
    fn test_heading_atx_default() {
        let result = convert("<html><body><h2>Section</h2></body></html>");
        assert!(result.contains("## Section"));
    }

    #[test]
    fn test_heading_setext() {
        let options = ConversionOptions {
            heading_style: HeadingStyle::Setext,
            title_heading: false,
            ..Default::default()
        };
        let result = Converter::with_options(options)
            .convert("<html><body><h1>Top</h1></body></html>")
            .unwrap();
        assert!(result.contains("Top\n==="));
    }

    #[test]
    fn test_inline_formatting() {
        let result = convert(
            "<html><body><p><strong>bold</strong> <em>italic</em> <s>gone</s> <code>x|y</code></p></body></html>",
        );
        assert!(result.contains("**bold**"));
        assert!(result.contains("_italic_"));
        assert!(result.contains("~~gone~~"));
        assert!(result.contains("`x|y`"));
    }

    #[test]
    fn test_source_line_break_between_inline_siblings_is_a_space() {
        // Pretty-printed exports break lines between inline elements.
        let result =
            convert("<html><body><p><strong>bold</strong>\n<em>italic</em></p></body></html>");
        assert!(result.contains("**bold** _italic_"));
    }

    #[test]
    fn test_indentation_after_block_stays_formatting() {
        let result =
            convert("<html><body>\n  <p>first</p>\n  <p>second</p>\n</body></html>");
        assert!(result.contains("first\n\nsecond"));
    }

    #[test]
    fn test_lists() {
        let result = convert(
            "<html><body><ul><li>one</li><li>two</li></ul><ol><li>first</li><li>second</li></ol></body></html>",
        );
        assert!(result.contains("- one"));
        assert!(result.contains("- two"));
        assert!(result.contains("1. first"));
        assert!(result.contains("2. second"));
    }

    #[test]
    fn test_task_list() {
        let result = convert(
            r#"<html><body><ul class="inline-task-list"><li class="checked">done</li><li>open</li></ul></body></html>"#,
        );
        assert!(result.contains("- [x] done"));
        assert!(result.contains("- [ ] open"));
    }

    #[test]
    fn test_links_and_images() {
        let result = convert(
            r#"<html><body><p><a href="page.html">Go</a> <img src="pic.png" alt="Pic" title="T"></p></body></html>"#,
        );
        assert!(result.contains("[Go](page.html)"));
        assert!(result.contains("![Pic](pic.png \"T\")"));
    }

    #[test]
    fn test_referenced_link_style_renders_inline() {
        let options = ConversionOptions {
            link_style: LinkStyle::Referenced,
            ..Default::default()
        };
        let result = Converter::with_options(options)
            .convert(r#"<html><body><p><a href="x.html">Go</a></p></body></html>"#)
            .unwrap();
        assert!(result.contains("[Go](x.html)"));
    }

    #[test]
    fn test_standard_table_padding_and_pipe_escape() {
        let result = convert(
            "<html><body><table>\
             <tr><th>A</th><th>B</th><th>C</th></tr>\
             <tr><td>a|b</td><td>2</td></tr>\
             </table></body></html>",
        );
        assert!(result.contains("| A | B | C |"));
        assert!(result.contains("| --- | --- | --- |"));
        assert!(result.contains("| a\\|b | 2 |  |"));
    }

    #[test]
    fn test_table_rendered_once() {
        let result = convert(
            "<html><body><div><table><tr><td>unique-cell</td><td>x</td></tr></table></div></body></html>",
        );
        assert_eq!(result.matches("unique-cell").count(), 1);
    }

    #[test]
    fn test_layout_table_dissolves() {
        let result = convert(
            r#"<html><body><table class="layoutMacro"><tr><td><p>left column</p></td><td><p>right column</p></td></tr></table></body></html>"#,
        );
        assert!(result.contains("left column"));
        assert!(result.contains("right column"));
        assert!(!result.contains('|'));
    }

    #[test]
    fn test_wrapper_table_dissolves_around_nested_data_table() {
        let result = convert(
            "<html><body><table><tr><td><table>\
             <tr><th>K</th><th>V</th></tr>\
             <tr><td>a</td><td>b</td></tr>\
             </table></td></tr></table></body></html>",
        );
        assert!(result.contains("| K | V |"));
        assert!(result.contains("| a | b |"));
        assert!(!result.contains("##"));
        assert!(!result.contains("\\|"));
    }

    #[test]
    fn test_failed_sub_renderer_falls_back_to_plain_text() {
        // A history view with no data rows cannot render as a table; its
        // text survives as a plain block and the walk continues.
        let result = convert(
            r#"<html><body><div id="main-content"><p>before</p>
               <table class="tableview"><tr><th>Version</th> <th>Published</th> <th>Changed By</th> <th>Comment</th></tr></table>
               <p>after</p></div></body></html>"#,
        );
        assert!(result.contains("before"));
        assert!(result.contains("after"));
        assert!(result.contains("Version Published Changed By Comment"));
        assert!(!result.contains("| Version |"));
    }

    #[test]
    fn test_complex_table_becomes_sections() {
        let long = "word ".repeat(30);
        let result = convert(&format!(
            "<html><body><table><tr><td>Topic</td><td>{long}</td></tr></table></body></html>"
        ));
        assert!(result.contains("## Topic"));
    }

    #[test]
    fn test_history_table_appended_outside_content() {
        let result = convert(
            r#"<html><body>
               <div id="main-content"><p>body text</p></div>
               <table class="tableview">
                 <tr><th>Version</th><th>Published</th><th>Changed By</th><th>Comment</th></tr>
                 <tr><td><a href="v2.html">v. 2</a></td><td>Jan 02, 2021</td><td>Jane</td><td>fix</td></tr>
               </table>
               </body></html>"#,
        );
        assert!(result.contains("| Version | Published | Changed By | Comment |"));
        assert!(result.contains("[v. 2](v2.html)"));
        let history_pos = result.find("| Version |").unwrap();
        let body_pos = result.find("body text").unwrap();
        assert!(body_pos < history_pos);
    }

    #[test]
    fn test_panel_blockquote() {
        let result = convert(
            r#"<html><body><div class="panel"><div class="panelHeader"><b>Heads up</b></div><div class="panelContent"><p>Read this.</p></div></div></body></html>"#,
        );
        assert!(result.contains("> **Heads up**"));
        assert!(result.contains("> Read this."));
    }

    #[test]
    fn test_panel_title_inside_wrapper_not_repeated_in_body() {
        let result = convert(
            r#"<html><body><div class="panel"><div><span class="title">Heads up</span></div><p>Body text.</p></div></body></html>"#,
        );
        assert!(result.contains("> **Heads up**"));
        assert!(result.contains("> Body text."));
        assert_eq!(result.matches("Heads up").count(), 1);
    }

    #[test]
    fn test_panel_section_style() {
        let options = ConversionOptions {
            panel_style: PanelStyle::Section,
            ..Default::default()
        };
        let result = Converter::with_options(options)
            .convert(
                r#"<html><body><div class="panel"><div class="panelHeader"><b>Note</b></div><div class="panelContent"><p>Body.</p></div></div></body></html>"#,
            )
            .unwrap();
        assert!(result.contains("## Note"));
        assert!(result.contains("Body."));
    }

    #[test]
    fn test_macro_placeholder_mode() {
        let options = ConversionOptions {
            macro_handling: MacroHandling::Placeholder,
            ..Default::default()
        };
        let result = Converter::with_options(options)
            .convert(
                r#"<html><body><div class="panel"><p>hidden body</p></div></body></html>"#,
            )
            .unwrap();
        assert!(result.contains("<!-- macro: info -->"));
        assert!(!result.contains("hidden body"));
    }

    #[test]
    fn test_macro_strip_mode() {
        let options = ConversionOptions {
            macro_handling: MacroHandling::Strip,
            ..Default::default()
        };
        let result = Converter::with_options(options)
            .convert(
                r#"<html><body><p>kept</p><div class="panel"><p>dropped</p></div></body></html>"#,
            )
            .unwrap();
        assert!(result.contains("kept"));
        assert!(!result.contains("dropped"));
    }

    #[test]
    fn test_code_macro_fenced_with_language() {
        let result = convert(
            r#"<html><body><div class="code panel" data-macro-parameters="language=rust"><pre>fn main() {}</pre></div></body></html>"#,
        );
        assert!(result.contains("```rust\nfn main() {}\n```"));
    }

    #[test]
    fn test_code_macro_indented() {
        let options = ConversionOptions {
            code_block_style: CodeBlockStyle::Indented,
            ..Default::default()
        };
        let result = Converter::with_options(options)
            .convert(
                r#"<html><body><div class="code panel"><pre>line one
line two</pre></div></body></html>"#,
            )
            .unwrap();
        assert!(result.contains("    line one\n    line two"));
    }

    #[test]
    fn test_expand_macro() {
        let result = convert(
            r#"<html><body><div class="expand-container"><div class="expand-control"><span class="expand-control-text">More info</span></div><div class="expand-content"><p>Hidden text.</p></div></div></body></html>"#,
        );
        assert!(result.contains("<details>"));
        assert!(result.contains("<summary>More info</summary>"));
        assert!(result.contains("Hidden text."));
        assert!(result.contains("</details>"));
    }

    #[test]
    fn test_toc_macro_placeholder() {
        let result = convert(
            r#"<html><body><div class="toc-macro"><ul><li>ignored</li></ul></div><p>after</p></body></html>"#,
        );
        assert!(result.contains("## Table of Contents"));
        assert!(result.contains("[TOC]"));
        assert!(!result.contains("ignored"));
    }

    #[test]
    fn test_jira_macro_bullets() {
        let result = convert(
            r#"<html><body><div data-macro-name="jira"><a href="https://issues.example.com/browse/ABC-1">ABC-1</a></div></body></html>"#,
        );
        assert!(result.contains("* [ABC-1](https://issues.example.com/browse/ABC-1)"));
    }

    #[test]
    fn test_status_macro_plain() {
        let result = convert(
            r#"<html><body><p><span class="status-macro aui-lozenge aui-lozenge-success">DONE</span></p></body></html>"#,
        );
        assert!(result.contains("[DONE]"));
    }

    #[test]
    fn test_ignored_regions_are_dropped() {
        let result = convert(
            r#"<html><body><div id="footer">footer junk</div><p>real content</p><script>var x;</script></body></html>"#,
        );
        assert!(result.contains("real content"));
        assert!(!result.contains("footer junk"));
        assert!(!result.contains("var x"));
    }

    #[test]
    fn test_attachments_list() {
        let options = ConversionOptions {
            attachments: true,
            ..Default::default()
        };
        let result = Converter::with_options(options)
            .convert(
                r#"<html><body><p>doc</p><a href="/download/attachments/9/plan.xlsx">plan.xlsx</a></body></html>"#,
            )
            .unwrap();
        assert!(result.contains("* [plan.xlsx](/download/attachments/9/plan.xlsx)"));
    }

    #[test]
    fn test_disabled_toggles_degrade_to_text() {
        let options = ConversionOptions {
            tables: false,
            images: false,
            links: false,
            ..Default::default()
        };
        let result = Converter::with_options(options)
            .convert(
                r#"<html><body><table><tr><td>cell text</td></tr></table><p><a href="x.html">anchor text</a> <img src="p.png" alt="alt text"></p></body></html>"#,
            )
            .unwrap();
        assert!(result.contains("cell text"));
        assert!(!result.contains("x.html"));
        assert!(result.contains("anchor text"));
        assert!(result.contains("alt text"));
        assert!(!result.contains("!["));
    }
}
