//! Document metadata extracted from a wiki-export page

/// One entry in a page's hierarchical navigation trail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    /// Visible crumb text
    pub text: String,
    /// Normalized link target; `None` for the current page
    pub href: Option<String>,
}

impl Breadcrumb {
    pub fn new(text: impl Into<String>, href: Option<String>) -> Self {
        Self {
            text: text.into(),
            href,
        }
    }
}

/// Metadata extracted once per conversion, read-only afterward
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentMetadata {
    /// Page title with any "Space : " style prefix stripped
    pub title: String,
    /// Last-modified editor name (empty when unavailable or disabled)
    pub last_modified: String,
    /// Page author (empty when unavailable)
    pub created_by: String,
    /// Creation date text (empty when unavailable)
    pub created_date: String,
    /// Navigation trail, outermost first
    pub breadcrumbs: Vec<Breadcrumb>,
}

/// A linked resource referenced by the page.
///
/// Consumed by the file collaborator that copies attachment files; the core
/// only identifies and lists them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentInfo {
    /// Unique attachment id (resource id or href)
    pub id: String,
    /// File name shown in the attachments list
    pub filename: String,
    /// Id of the containing page or element, when known
    pub container_id: Option<String>,
    /// Download link
    pub href: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breadcrumb_new() {
        let crumb = Breadcrumb::new("Home", Some("./index.html".to_string()));
        assert_eq!(crumb.text, "Home");
        assert_eq!(crumb.href.as_deref(), Some("./index.html"));
    }

    #[test]
    fn test_metadata_default_is_empty() {
        let meta = DocumentMetadata::default();
        assert!(meta.title.is_empty());
        assert!(meta.breadcrumbs.is_empty());
    }
}
