//! Responsive visibility filtering

use serde::{Deserialize, Serialize};

use crate::config::VisibilityConfig;
use crate::model::{ContentBlock, Responsive};

/// Viewport class derived from a width in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 3] = [Breakpoint::Mobile, Breakpoint::Tablet, Breakpoint::Desktop];

    /// Classify a width using the default boundaries (768, 1024)
    pub fn from_width(width: u32) -> Self {
        Self::classify(width, &VisibilityConfig::default())
    }

    pub fn classify(width: u32, bounds: &VisibilityConfig) -> Self {
        if width < bounds.tablet_min {
            Breakpoint::Mobile
        } else if width < bounds.desktop_min {
            Breakpoint::Tablet
        } else {
            Breakpoint::Desktop
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Breakpoint::Mobile => "mobile",
            Breakpoint::Tablet => "tablet",
            Breakpoint::Desktop => "desktop",
        }
    }

    fn flag(&self, responsive: &Responsive) -> Option<bool> {
        match self {
            Breakpoint::Mobile => responsive.mobile,
            Breakpoint::Tablet => responsive.tablet,
            Breakpoint::Desktop => responsive.desktop,
        }
    }

    /// CSS media query selecting this breakpoint
    pub fn media_query(&self, bounds: &VisibilityConfig) -> String {
        match self {
            Breakpoint::Mobile => format!("(max-width: {}px)", bounds.tablet_min.saturating_sub(1)),
            Breakpoint::Tablet => format!(
                "(min-width: {}px) and (max-width: {}px)",
                bounds.tablet_min,
                bounds.desktop_min.saturating_sub(1)
            ),
            Breakpoint::Desktop => format!("(min-width: {}px)", bounds.desktop_min),
        }
    }
}

/// What the renderer knows about the client viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Viewport {
    /// No width hint; visibility is left to CSS media queries
    #[default]
    Unknown,
    Width(u32),
}

impl Viewport {
    pub fn from_hint(width: Option<u32>) -> Self {
        width.map_or(Viewport::Unknown, Viewport::Width)
    }
}

/// Whether `block` renders at `width` with the default boundaries
pub fn is_visible(block: &ContentBlock, width: u32) -> bool {
    is_visible_at(block, Breakpoint::from_width(width))
}

pub fn is_visible_at(block: &ContentBlock, breakpoint: Breakpoint) -> bool {
    match block.responsive() {
        None => true,
        Some(responsive) => breakpoint.flag(responsive) != Some(false),
    }
}

/// Visibility decision for a viewport; unknown widths never filter
pub fn is_visible_in(block: &ContentBlock, viewport: Viewport, bounds: &VisibilityConfig) -> bool {
    match viewport {
        Viewport::Unknown => true,
        Viewport::Width(width) => is_visible_at(block, Breakpoint::classify(width, bounds)),
    }
}

/// Classes hiding `block` at the breakpoints it opts out of
pub fn hidden_classes(block: &ContentBlock) -> Vec<String> {
    let Some(responsive) = block.responsive() else {
        return Vec::new();
    };
    Breakpoint::ALL
        .iter()
        .filter(|bp| bp.flag(responsive) == Some(false))
        .map(|bp| format!("dc-hide-{}", bp.as_str()))
        .collect()
}

/// Media queries backing the `dc-hide-*` classes, so the browser
/// re-filters on resize without another render
pub fn responsive_stylesheet(bounds: &VisibilityConfig) -> String {
    let rules: Vec<String> = Breakpoint::ALL
        .iter()
        .map(|bp| {
            format!(
                "@media {} {{ .dc-hide-{} {{ display: none !important; }} }}",
                bp.media_query(bounds),
                bp.as_str()
            )
        })
        .collect();
    format!("<style id=\"dc-responsive\">\n{}\n</style>", rules.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockMetadata, BlockType};

    fn block_with(responsive: Option<Responsive>) -> ContentBlock {
        ContentBlock::new("1", BlockType::Text, "home", "hero").with_metadata(BlockMetadata {
            responsive,
            ..Default::default()
        })
    }

    #[test]
    fn test_breakpoints() {
        assert_eq!(Breakpoint::from_width(0), Breakpoint::Mobile);
        assert_eq!(Breakpoint::from_width(767), Breakpoint::Mobile);
        assert_eq!(Breakpoint::from_width(768), Breakpoint::Tablet);
        assert_eq!(Breakpoint::from_width(1023), Breakpoint::Tablet);
        assert_eq!(Breakpoint::from_width(1024), Breakpoint::Desktop);
    }

    #[test]
    fn test_no_responsive_always_visible() {
        let block = block_with(None);
        for width in [320, 800, 1920] {
            assert!(is_visible(&block, width));
        }
        let bare = ContentBlock::new("2", BlockType::Text, "home", "hero");
        assert!(is_visible(&bare, 500));
    }

    #[test]
    fn test_mobile_boundary() {
        let block = block_with(Some(Responsive {
            mobile: Some(false),
            ..Default::default()
        }));
        assert!(!is_visible(&block, 767));
        assert!(is_visible(&block, 768));
    }

    #[test]
    fn test_tablet_desktop_boundary() {
        let hide_tablet = block_with(Some(Responsive {
            tablet: Some(false),
            ..Default::default()
        }));
        assert!(!is_visible(&hide_tablet, 1023));
        assert!(is_visible(&hide_tablet, 1024));

        let hide_desktop = block_with(Some(Responsive {
            desktop: Some(false),
            ..Default::default()
        }));
        assert!(is_visible(&hide_desktop, 1023));
        assert!(!is_visible(&hide_desktop, 1024));
    }

    #[test]
    fn test_explicit_true_is_visible() {
        let block = block_with(Some(Responsive {
            mobile: Some(true),
            tablet: Some(true),
            desktop: Some(true),
        }));
        assert!(is_visible(&block, 100));
    }

    #[test]
    fn test_unknown_viewport_never_filters() {
        let block = block_with(Some(Responsive {
            mobile: Some(false),
            tablet: Some(false),
            desktop: Some(false),
        }));
        let bounds = VisibilityConfig::default();
        assert!(is_visible_in(&block, Viewport::Unknown, &bounds));
        assert!(!is_visible_in(&block, Viewport::Width(1200), &bounds));
        assert_eq!(
            hidden_classes(&block),
            vec!["dc-hide-mobile", "dc-hide-tablet", "dc-hide-desktop"]
        );
    }

    #[test]
    fn test_responsive_stylesheet() {
        let css = responsive_stylesheet(&VisibilityConfig::default());
        assert!(css.contains("@media (max-width: 767px) { .dc-hide-mobile"));
        assert!(css.contains("(min-width: 768px) and (max-width: 1023px)"));
        assert!(css.contains("@media (min-width: 1024px) { .dc-hide-desktop"));
    }
}
