pub mod auth;
pub mod generation;
pub mod paths;
pub mod studio;

pub use auth::AuthConfig;
pub use generation::GenerationConfig;
pub use paths::ConfigPaths;
pub use studio::StudioConfig;
