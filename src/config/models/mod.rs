//! Configuration model definitions

pub mod auth;
pub mod directory;

pub use auth::{AuthConfig, AuthMode};
pub use directory::{DirectoryAttributes, DirectoryConfig, DirectoryEndpoint};
