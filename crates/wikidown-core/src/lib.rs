//! wikidown-core - Options and data model for wiki-export conversion
//!
//! This crate provides the configuration and shared data structures used by
//! the `wikidown` conversion engine. It carries no dependencies so that
//! downstream tools (batch exporters, editors) can consume the data model
//! without pulling in the HTML machinery.
//!
//! # Example
//!
//! ```rust
//! use wikidown_core::{ConversionOptions, PanelStyle};
//!
//! let options = ConversionOptions {
//!     panel_style: PanelStyle::Section,
//!     breadcrumbs: false,
//!     ..Default::default()
//! };
//! assert!(options.tables);
//! ```

mod metadata;
mod options;

pub use metadata::{AttachmentInfo, Breadcrumb, DocumentMetadata};
pub use options::{
    CodeBlockStyle, ConversionOptions, HeadingStyle, ImageStyle, LinkStyle, MacroHandling,
    PanelStyle, TableStyle,
};
