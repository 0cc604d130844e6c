//! Content resolution - picks the active blocks and plugins for a page query
//!
//! Operates on an already fetched snapshot. Results keep input order and are
//! empty, never absent, when nothing matches.

use crate::model::{ContentBlock, Plugin};

/// Active blocks on `page`, optionally restricted to one `position`
pub fn resolve_blocks<'a>(
    blocks: &'a [ContentBlock],
    page: &str,
    position: Option<&str>,
) -> Vec<&'a ContentBlock> {
    blocks
        .iter()
        .filter(|b| b.is_active && b.page == page)
        .filter(|b| position.map_or(true, |p| b.position == p))
        .collect()
}

/// Plugins that apply to `page`
pub fn resolve_plugins<'a>(plugins: &'a [Plugin], page: &str) -> Vec<&'a Plugin> {
    plugins.iter().filter(|p| p.is_active_for(page)).collect()
}

/// First active block on `page` with the given name
pub fn find_block_by_name<'a>(
    blocks: &'a [ContentBlock],
    page: &str,
    name: &str,
) -> Option<&'a ContentBlock> {
    blocks
        .iter()
        .find(|b| b.is_active && b.page == page && b.name == name)
}

/// Distinct positions holding active blocks on `page`, in first-seen order
pub fn positions<'a>(blocks: &'a [ContentBlock], page: &str) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for block in resolve_blocks(blocks, page, None) {
        if !seen.contains(&block.position.as_str()) {
            seen.push(&block.position);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockType, PluginType};

    fn block(id: &str, page: &str, position: &str, active: bool) -> ContentBlock {
        let mut b = ContentBlock::new(id, BlockType::Text, page, position).with_name(id);
        b.is_active = active;
        b
    }

    fn sample() -> Vec<ContentBlock> {
        vec![
            block("a", "home", "hero", true),
            block("b", "home", "footer", true),
            block("c", "home", "hero", false),
            block("d", "crm", "hero", true),
            block("e", "home", "hero", true),
        ]
    }

    fn ids(blocks: &[&ContentBlock]) -> Vec<String> {
        blocks.iter().map(|b| b.id.clone()).collect()
    }

    #[test]
    fn test_resolve_by_page_and_position() {
        let blocks = sample();
        let resolved = resolve_blocks(&blocks, "home", Some("hero"));
        assert_eq!(ids(&resolved), vec!["a", "e"]);
    }

    #[test]
    fn test_resolve_whole_page_keeps_order() {
        let blocks = sample();
        let resolved = resolve_blocks(&blocks, "home", None);
        assert_eq!(ids(&resolved), vec!["a", "b", "e"]);
    }

    #[test]
    fn test_resolve_matches_definition_for_every_query() {
        let blocks = sample();
        for page in ["home", "crm", "missing"] {
            for position in ["hero", "footer", "nowhere"] {
                let expected: Vec<String> = blocks
                    .iter()
                    .filter(|b| b.page == page && b.position == position && b.is_active)
                    .map(|b| b.id.clone())
                    .collect();
                let resolved = resolve_blocks(&blocks, page, Some(position));
                assert_eq!(ids(&resolved), expected, "{}/{}", page, position);
            }
        }
    }

    #[test]
    fn test_resolve_nothing_is_empty() {
        let blocks = sample();
        assert!(resolve_blocks(&blocks, "home", Some("hero-title-missing")).is_empty());
        assert!(resolve_blocks(&[], "home", None).is_empty());
    }

    #[test]
    fn test_resolve_plugins() {
        let mut off = Plugin::new("off", PluginType::Style, "");
        off.is_active = false;
        let plugins = vec![
            Plugin::new("all", PluginType::Style, ""),
            Plugin::new("home", PluginType::Script, "").with_pages(&["home"]),
            Plugin::new("crm", PluginType::Component, "").with_pages(&["crm", "docs"]),
            off,
        ];

        let home: Vec<_> = resolve_plugins(&plugins, "home")
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(home, vec!["all", "home"]);

        let docs: Vec<_> = resolve_plugins(&plugins, "docs")
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(docs, vec!["all", "crm"]);
    }

    #[test]
    fn test_find_by_name_skips_inactive() {
        let blocks = sample();
        assert!(find_block_by_name(&blocks, "home", "c").is_none());
        assert_eq!(find_block_by_name(&blocks, "home", "e").unwrap().id, "e");
        assert!(find_block_by_name(&blocks, "crm", "e").is_none());
    }

    #[test]
    fn test_positions() {
        let blocks = sample();
        assert_eq!(positions(&blocks, "home"), vec!["hero", "footer"]);
        assert!(positions(&blocks, "docs").is_empty());
    }
}
