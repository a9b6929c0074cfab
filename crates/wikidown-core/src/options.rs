//! Configuration options for wiki-export conversion

/// Panel and admonition rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelStyle {
    /// Render panels as blockquotes with a bold title line
    #[default]
    Blockquote,
    /// Keep panels as literal `<div class="panel ...">` markup
    Div,
    /// Render panels as `##` sections
    Section,
}

/// Table rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableStyle {
    /// GitHub-style pipe tables
    #[default]
    GitHub,
    /// Keep standard data tables as literal HTML markup.
    /// Layout, history and complex tables are always restructured to Markdown.
    Html,
}

/// Code block style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeBlockStyle {
    /// Use fenced code blocks (```)
    #[default]
    Fenced,
    /// Use indented code blocks (4 spaces)
    Indented,
}

/// Image rendering style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageStyle {
    /// Render images as `![alt](src "title")`
    #[default]
    Markdown,
    /// Keep images as literal `<img>` markup
    Html,
}

/// Link style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStyle {
    /// Use inline links [text](url)
    #[default]
    Inlined,
    /// Use reference links [text][ref]
    Referenced,
}

/// Heading style options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingStyle {
    /// Use ATX-style headings (prefixed with #)
    #[default]
    Atx,
    /// Use setext-style headings (underlined with = or -)
    /// Only applies to h1 and h2, falls back to ATX for h3-h6
    Setext,
}

/// How embedded macros (code, expand, toc, jira, status) are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MacroHandling {
    /// Render each macro with its dedicated rule
    #[default]
    Render,
    /// Replace each macro with a one-line HTML comment naming its kind
    Placeholder,
    /// Omit macros entirely
    Strip,
}

/// Options for one conversion call.
///
/// Immutable for the duration of a `convert()` call. Toggles that are
/// disabled degrade the affected construct to its plain text content rather
/// than dropping the text it carries.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Panel/admonition style
    pub panel_style: PanelStyle,

    /// Table style for standard data tables
    pub table_style: TableStyle,

    /// Code block style
    pub code_block_style: CodeBlockStyle,

    /// Image style
    pub image_style: ImageStyle,

    /// Link style
    pub link_style: LinkStyle,

    /// Heading style for source headings
    pub heading_style: HeadingStyle,

    /// Macro handling mode
    pub macro_handling: MacroHandling,

    /// Emit the visible breadcrumb trail line and frontmatter breadcrumbs
    pub breadcrumbs: bool,

    /// Extract and emit the last-modified editor
    pub last_modified: bool,

    /// Emit YAML frontmatter metadata
    pub metadata: bool,

    /// Include created_by in frontmatter
    pub created_by: bool,

    /// Include created_date in frontmatter
    pub created_date: bool,

    /// Append the attachments list
    pub attachments: bool,

    /// Convert tables (disabled: plain text extraction)
    pub tables: bool,

    /// Convert images (disabled: alt text only)
    pub images: bool,

    /// Convert links (disabled: anchor text only)
    pub links: bool,

    /// Convert panels/admonitions (disabled: body text only)
    pub panels: bool,

    /// Convert code macros (disabled: raw code text)
    pub code_blocks: bool,

    /// Convert expand macros to `<details>` blocks
    pub expand_macros: bool,

    /// Emit the table-of-contents placeholder for toc macros
    pub toc: bool,

    /// Convert Jira issue macros to bullet lists
    pub jira_issues: bool,

    /// Convert status macros to badges
    pub status_badges: bool,

    /// Append the version-history table when present
    pub history: bool,

    /// Emit the level-1 title heading
    pub title_heading: bool,

    /// Convert lists (disabled: plain text extraction)
    pub lists: bool,

    /// Convert strong/emphasis markup (disabled: plain text)
    pub emphasis: bool,

    /// Convert source headings (disabled: plain text)
    pub headings: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            panel_style: PanelStyle::Blockquote,
            table_style: TableStyle::GitHub,
            code_block_style: CodeBlockStyle::Fenced,
            image_style: ImageStyle::Markdown,
            link_style: LinkStyle::Inlined,
            heading_style: HeadingStyle::Atx,
            macro_handling: MacroHandling::Render,
            breadcrumbs: true,
            last_modified: true,
            metadata: true,
            created_by: true,
            created_date: true,
            attachments: false,
            tables: true,
            images: true,
            links: true,
            panels: true,
            code_blocks: true,
            expand_macros: true,
            toc: true,
            jira_issues: true,
            status_badges: true,
            history: true,
            title_heading: true,
            lists: true,
            emphasis: true,
            headings: true,
        }
    }
}
