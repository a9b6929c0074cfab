//! # wikidown
//!
//! Convert wiki-platform HTML exports to Markdown.
//!
//! Generic HTML→Markdown conversion loses the structure wiki exports carry:
//! layout tables, call-out panels, embedded macros, version history, page
//! metadata and the navigation trail. wikidown classifies each element first
//! and dispatches it to a dedicated renderer, falling back to a generic
//! renderer for plain markup.
//!
//! ## Design
//!
//! Every element is resolved to a single category (table kind, macro kind,
//! ignored, or plain) before any rendering happens. A per-call set of already
//! rendered node identities guarantees that nested structures consumed by a
//! specialized rule are never rendered a second time by the fallback.
//!
//! ## Example
//!
//! ```rust
//! use wikidown::Converter;
//!
//! let converter = Converter::new();
//! let markdown = converter
//!     .convert("<html><body><h1>Hello World</h1></body></html>")
//!     .unwrap();
//! assert!(markdown.contains("Hello World"));
//! ```

pub mod classify;
mod dom;
mod engine;
mod macros;
pub mod metadata;
pub mod normalize;
mod tables;

pub use classify::{classify_macro, classify_table, should_ignore, MacroKind, TableKind};
pub use engine::Converter;
pub use metadata::{breadcrumb_trail, extract_metadata, generate_frontmatter};
pub use normalize::normalize;
pub use wikidown_core::{
    AttachmentInfo, Breadcrumb, CodeBlockStyle, ConversionOptions, DocumentMetadata, HeadingStyle,
    ImageStyle, LinkStyle, MacroHandling, PanelStyle, TableStyle,
};

/// Error type for wikidown operations
#[derive(Debug, thiserror::Error)]
pub enum WikidownError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No content container found in document")]
    MissingContent,

    #[error("Render error: {0}")]
    Render(String),
}

pub type Result<T> = std::result::Result<T, WikidownError>;
