//! Domain model definitions

pub mod request;
pub mod role;
pub mod user;

pub use request::RequestContext;
pub use role::{Criticality, Permission, Role};
pub use user::{HistoryAction, User, UserHistoryEntry, UserStatus};
