//! Configuration module

mod site;

pub use site::BackendConfig;
pub use site::BackendKind;
pub use site::GenerateConfig;
pub use site::ServerConfig;
pub use site::SiteConfig;
pub use site::ToolchainConfig;
