//! Configuration module

mod settings;

pub use settings::ContentConfig;
pub use settings::PluginConfig;
pub use settings::RenderConfig;
pub use settings::SandboxConfig;
pub use settings::ServerConfig;
pub use settings::StoreConfig;
pub use settings::VisibilityConfig;
