//! Content model - blocks, plugins and page snapshots served by the Content Store

mod block;
mod de;
mod plugin;
mod snapshot;

pub use block::{BlockMetadata, BlockType, ContentBlock, Responsive};
pub use plugin::{Plugin, PluginType};
pub use snapshot::ContentSnapshot;
