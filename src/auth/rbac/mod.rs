//! Role-Based Access Control: hierarchy resolution and role administration

pub mod resolver;
pub mod service;

#[cfg(test)]
mod tests;

pub use resolver::RoleResolver;
pub use service::RbacService;
